//! State diagrams of a machine: Graphviz and Mermaid.

use std::fmt;

use strum_macros::{Display, EnumString};

use crate::model::{Machine, Transition};
use crate::parser::{format_assignments, Assignments};

/// Diagram syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum GraphFormat {
    #[default]
    Dot,
    Mermaid,
}

/// Graphviz rendering of a machine.
pub struct Dot<'a>(pub &'a Machine);

/// Mermaid `stateDiagram-v2` rendering of a machine.
pub struct Mermaid<'a>(pub &'a Machine);

/// Graphviz ID of the initial state marker.
const START: &str = "\"[*]\"";

/// `condition / out=expr, ...`, either part may be missing.
fn edge_label(tr: &Transition, sep: &str) -> String {
    let mut label = tr.condition.clone().unwrap_or_default();
    if !tr.mealy_outputs.is_empty() {
        if !label.is_empty() {
            label.push_str(" / ");
        }
        label.push_str(&format_assignments(&tr.mealy_outputs, sep));
    }
    label
}

fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn moore_lines(outputs: &Assignments) -> Vec<String> {
    outputs
        .iter()
        .map(|(target, expr)| format!("{target}={expr}"))
        .collect()
}

impl fmt::Display for Dot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.0;
        writeln!(f, "digraph {} {{", m.name())?;
        writeln!(f, "    rankdir=LR;")?;
        writeln!(f, "    node [shape=box, style=rounded];")?;

        // Initial state marker; brackets keep it apart from any state name.
        writeln!(
            f,
            "    {START} [shape=circle, label=\"\", style=filled, fillcolor=black, width=0.25];"
        )?;
        writeln!(f, "    {START} -> {};", m.initial_state().name)?;

        for state in m.states() {
            let mut label = escape_dot(&state.name);
            for line in moore_lines(&state.moore_outputs) {
                label.push_str("\\n");
                label.push_str(&escape_dot(&line));
            }
            let initial = if state.name == m.initial_state().name {
                ", peripheries=2"
            } else {
                ""
            };
            writeln!(f, "    {} [label=\"{}\"{}];", state.name, label, initial)?;
        }

        for tr in m.transitions() {
            let label = edge_label(tr, ", ");
            if label.is_empty() {
                writeln!(f, "    {} -> {};", tr.source, tr.destination)?;
            } else {
                writeln!(
                    f,
                    "    {} -> {} [label=\"{}\"];",
                    tr.source,
                    tr.destination,
                    escape_dot(&label)
                )?;
            }
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for Mermaid<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.0;
        writeln!(f, "stateDiagram-v2")?;
        writeln!(f, "    [*] --> {}", m.initial_state().name)?;
        for state in m.states() {
            let lines = moore_lines(&state.moore_outputs);
            if lines.is_empty() {
                writeln!(f, "    state {}", state.name)?;
            } else {
                writeln!(f, "    {} : {}", state.name, lines.join("<br>"))?;
            }
        }
        for tr in m.transitions() {
            let label = edge_label(tr, "<br>");
            if label.is_empty() {
                writeln!(f, "    {} --> {}", tr.source, tr.destination)?;
            } else {
                writeln!(f, "    {} --> {} : {}", tr.source, tr.destination, label)?;
            }
        }
        Ok(())
    }
}

/// Renders `machine` in `format`.
pub fn render_graph(machine: &Machine, format: GraphFormat) -> String {
    match format {
        GraphFormat::Dot => Dot(machine).to_string(),
        GraphFormat::Mermaid => Mermaid(machine).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const DOOR: &str = r#"
name: door
inputs:
  - open: {}
  - code: { width: 4 }
outputs:
  - lamp: {}
  - beep: {}
transitions:
  - SHUT: ["(open && code == 4'd7), AJAR, <beep=1'b1>", "SHUT"]
  - AJAR: ["<lamp=\"on\">", "(!open), SHUT"]
initial_state: SHUT
"#;

    #[test]
    fn dot_output() {
        let m = Machine::from_yaml(DOOR).unwrap();
        let dot = render_graph(&m, GraphFormat::Dot);
        assert!(dot.starts_with("digraph door {\n"));
        assert!(dot.contains("    \"[*]\" -> SHUT;\n"));
        assert!(dot.contains("    SHUT [label=\"SHUT\", peripheries=2];\n"));
        assert!(dot.contains("    AJAR [label=\"AJAR\\nlamp=\\\"on\\\"\"];\n"));
        assert!(dot.contains("    SHUT -> AJAR [label=\"open && code == 4'd7 / beep=1'b1\"];\n"));
        assert!(dot.contains("    SHUT -> SHUT;\n"));
        assert!(dot.ends_with("}\n"));
    }

    #[test]
    fn state_named_start_keeps_its_own_node() {
        let m = Machine::from_yaml(
            "name: m\noutputs:\n  - o: {}\ntransitions:\n  - start: [run]\n  - run: [start]\ninitial_state: start\n",
        )
        .unwrap();
        let dot = render_graph(&m, GraphFormat::Dot);
        assert!(dot.contains("    \"[*]\" -> start;\n"));
        assert!(dot.contains("    start [label=\"start\", peripheries=2];\n"));
        assert!(!dot.contains("start -> start"));
    }

    #[test]
    fn mermaid_output() {
        let m = Machine::from_yaml(DOOR).unwrap();
        let md = render_graph(&m, GraphFormat::Mermaid);
        assert_eq!(
            md,
            "stateDiagram-v2\n    [*] --> SHUT\n    state SHUT\n    AJAR : lamp=\"on\"\n    AJAR --> SHUT : !open\n    SHUT --> AJAR : open && code == 4'd7 / beep=1'b1\n    SHUT --> SHUT\n"
        );
    }

    #[test]
    fn format_names() {
        assert_eq!(GraphFormat::from_str("dot").unwrap(), GraphFormat::Dot);
        assert_eq!(GraphFormat::from_str("mermaid").unwrap(), GraphFormat::Mermaid);
        assert_eq!(GraphFormat::Mermaid.to_string(), "mermaid");
    }
}
