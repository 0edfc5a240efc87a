use std::path::PathBuf;

use clap::{ArgGroup, Parser, ValueEnum};
use rtl_automata::{Emitter, GraphFormat, TestbenchKind, TestbenchOptions};

/// Generate Verilog, state diagrams and testbenches from an FSM description.
#[derive(Parser, Debug)]
#[command(name = "rtl-automata")]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("outputs").required(true).multiple(true).args(["rtl", "graph", "testbench_file"])))]
pub struct Args {
    /// Machine description (YAML)
    #[arg(short = 'i', long)]
    pub input: PathBuf,

    /// Write the Verilog module here
    #[arg(short = 'r', long)]
    pub rtl: Option<PathBuf>,

    /// Write the state diagram here
    #[arg(short = 'g', long)]
    pub graph: Option<PathBuf>,

    /// State diagram syntax
    #[arg(long, value_enum, default_value = "dot")]
    pub graph_format: GraphFormatArg,

    /// Testbench flavour
    #[arg(short = 't', long, value_enum, requires = "testbench_file")]
    pub testbench: Option<TestbenchKindArg>,

    /// Write the testbench here
    #[arg(long, requires = "testbench")]
    pub testbench_file: Option<PathBuf>,

    /// Number of random stimulus cycles in the testbench
    #[arg(long, default_value_t = 100)]
    pub cycles: usize,

    /// Seed of the testbench stimulus
    #[arg(long, default_value_t = 1)]
    pub seed: u32,
}

impl Args {
    /// Requested `(emitter, destination)` pairs.
    pub fn emitters(&self) -> Vec<(Emitter, PathBuf)> {
        let mut out = Vec::new();
        if let Some(path) = &self.rtl {
            out.push((Emitter::Rtl, path.clone()));
        }
        if let Some(path) = &self.graph {
            out.push((Emitter::Graph(self.graph_format.into()), path.clone()));
        }
        if let (Some(kind), Some(path)) = (self.testbench, &self.testbench_file) {
            let opts = TestbenchOptions {
                cycles: self.cycles,
                seed: self.seed,
            };
            out.push((Emitter::Testbench(kind.into(), opts), path.clone()));
        }
        out
    }
}

/// Command-line wrapper for GraphFormat
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum GraphFormatArg {
    /// Graphviz
    Dot,
    /// Mermaid state diagram
    Mermaid,
}

impl From<GraphFormatArg> for GraphFormat {
    fn from(arg: GraphFormatArg) -> Self {
        match arg {
            GraphFormatArg::Dot => GraphFormat::Dot,
            GraphFormatArg::Mermaid => GraphFormat::Mermaid,
        }
    }
}

/// Command-line wrapper for TestbenchKind
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TestbenchKindArg {
    /// Verilog harness with `$random` stimulus
    Verilog,
    /// C++ harness for a Verilator model
    Verilator,
}

impl From<TestbenchKindArg> for TestbenchKind {
    fn from(arg: TestbenchKindArg) -> Self {
        match arg {
            TestbenchKindArg::Verilog => TestbenchKind::Verilog,
            TestbenchKindArg::Verilator => TestbenchKind::Verilator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_an_output() {
        assert!(Args::try_parse_from(["rtl-automata", "-i", "m.yaml"]).is_err());
    }

    #[test]
    fn needs_an_input() {
        assert!(Args::try_parse_from(["rtl-automata", "--rtl", "m.v"]).is_err());
    }

    #[test]
    fn testbench_needs_kind_and_file() {
        assert!(Args::try_parse_from(["rtl-automata", "-i", "m.yaml", "-t", "verilog"]).is_err());
        assert!(
            Args::try_parse_from(["rtl-automata", "-i", "m.yaml", "--testbench-file", "tb.v"])
                .is_err()
        );
    }

    #[test]
    fn collects_emitters() {
        let args = Args::try_parse_from([
            "rtl-automata",
            "-i",
            "m.yaml",
            "--rtl",
            "m.v",
            "--graph",
            "m.mmd",
            "--graph-format",
            "mermaid",
            "-t",
            "verilator",
            "--testbench-file",
            "tb.cpp",
            "--cycles",
            "10",
        ])
        .unwrap();
        let emitters = args.emitters();
        assert_eq!(emitters.len(), 3);
        assert_eq!(emitters[0].0, Emitter::Rtl);
        assert_eq!(emitters[1].0, Emitter::Graph(GraphFormat::Mermaid));
        assert_eq!(
            emitters[2],
            (
                Emitter::Testbench(
                    TestbenchKind::Verilator,
                    TestbenchOptions { cycles: 10, seed: 1 }
                ),
                PathBuf::from("tb.cpp")
            )
        );
    }
}
