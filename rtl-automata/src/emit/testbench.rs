//! Random-stimulus testbenches.
//!
//! Both variants hold reset for two clock cycles, release it, then drive
//! every input with fresh random bits once per cycle.

use std::fmt;

use strum_macros::{Display, EnumString};

use crate::model::Machine;

/// Testbench flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum TestbenchKind {
    /// Plain Verilog harness using `$random`.
    Verilog,
    /// C++ `main` for a Verilator-built model.
    Verilator,
}

/// Stimulus parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestbenchOptions {
    pub cycles: usize,
    pub seed: u32,
}

impl Default for TestbenchOptions {
    fn default() -> Self {
        Self { cycles: 100, seed: 1 }
    }
}

const RESET_CYCLES: usize = 2;

/// Verilog testbench.
pub struct VerilogTestbench<'a>(pub &'a Machine, pub TestbenchOptions);

/// Verilator C++ harness.
pub struct VerilatorHarness<'a>(pub &'a Machine, pub TestbenchOptions);

/// `(asserted, released)` reset levels.
fn reset_levels(m: &Machine) -> (u8, u8) {
    if m.reset().is_active_low {
        (0, 1)
    } else {
        (1, 0)
    }
}

impl fmt::Display for VerilogTestbench<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (m, opts) = (self.0, self.1);
        let tb = format!("{}_tb", m.name());
        let rst = m.reset().port_name();
        let (on, off) = reset_levels(m);
        let vector = |w: usize| if w > 1 { format!("[{}:0] ", w - 1) } else { String::new() };

        writeln!(f, "// Random-stimulus testbench for `{}`, generated by rtl-automata.", m.name())?;
        writeln!(f, "`timescale 1ns / 1ps")?;
        writeln!(f)?;
        writeln!(f, "module {tb};")?;
        writeln!(f)?;
        writeln!(f, "    reg clk = 1'b0;")?;
        writeln!(f, "    reg {rst} = 1'b{on};")?;
        for p in m.ports().inputs() {
            writeln!(f, "    reg {}{} = {}'d0;", vector(p.width), p.name, p.width)?;
        }
        for p in m.ports().outputs() {
            writeln!(f, "    wire {}{};", vector(p.width), p.name)?;
        }
        writeln!(f)?;
        writeln!(f, "    integer cycle;")?;
        writeln!(f, "    integer seed = {};", opts.seed)?;
        writeln!(f)?;

        let connections = ["clk", rst]
            .into_iter()
            .chain(m.ports().inputs().map(|p| p.name.as_str()))
            .chain(m.ports().outputs().map(|p| p.name.as_str()))
            .map(|name| format!("        .{name}({name})"))
            .collect::<Vec<_>>();
        writeln!(f, "    {} dut (\n{}\n    );", m.name(), connections.join(",\n"))?;
        writeln!(f)?;
        writeln!(f, "    always #5 clk = ~clk;")?;
        writeln!(f)?;
        writeln!(f, "    initial begin")?;
        writeln!(f, "        $dumpfile(\"{tb}.vcd\");")?;
        writeln!(f, "        $dumpvars(0, {tb});")?;
        writeln!(f, "        repeat ({RESET_CYCLES}) @(posedge clk);")?;
        writeln!(f, "        @(negedge clk);")?;
        writeln!(f, "        {rst} = 1'b{off};")?;
        writeln!(
            f,
            "        for (cycle = 0; cycle < {}; cycle = cycle + 1) begin",
            opts.cycles
        )?;
        writeln!(f, "            @(negedge clk);")?;
        for p in m.ports().inputs() {
            // $random yields 32 bits per call.
            let words = vec!["$random(seed)"; p.width.div_ceil(32)];
            let value = if words.len() == 1 {
                words[0].to_owned()
            } else {
                format!("{{{}}}", words.join(", "))
            };
            writeln!(f, "            {} = {};", p.name, value)?;
        }
        writeln!(f, "        end")?;
        writeln!(f, "        $finish;")?;
        writeln!(f, "    end")?;
        writeln!(f)?;
        writeln!(f, "endmodule")
    }
}

impl fmt::Display for VerilatorHarness<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (m, opts) = (self.0, self.1);
        let model = format!("V{}", m.name());
        let rst = m.reset().port_name();
        let (on, off) = reset_levels(m);

        writeln!(f, "// Verilator harness for `{}`, generated by rtl-automata.", m.name())?;
        writeln!(f, "#include <cstdint>")?;
        writeln!(f, "#include <cstdlib>")?;
        writeln!(f, "#include <memory>")?;
        writeln!(f)?;
        writeln!(f, "#include \"{model}.h\"")?;
        writeln!(f, "#include \"verilated.h\"")?;
        writeln!(f)?;
        writeln!(f, "static void tick({model}& dut) {{")?;
        writeln!(f, "    dut.clk = 0;")?;
        writeln!(f, "    dut.eval();")?;
        writeln!(f, "    dut.clk = 1;")?;
        writeln!(f, "    dut.eval();")?;
        writeln!(f, "}}")?;
        writeln!(f)?;
        writeln!(f, "static uint64_t random_bits(int width) {{")?;
        writeln!(f, "    uint64_t value = 0;")?;
        writeln!(f, "    for (int i = 0; i < width; i += 16) {{")?;
        writeln!(
            f,
            "        value = (value << 16) | (static_cast<uint64_t>(std::rand()) & 0xffff);"
        )?;
        writeln!(f, "    }}")?;
        writeln!(
            f,
            "    return width >= 64 ? value : value & ((UINT64_C(1) << width) - 1);"
        )?;
        writeln!(f, "}}")?;
        writeln!(f)?;
        writeln!(f, "int main(int argc, char** argv) {{")?;
        writeln!(f, "    Verilated::commandArgs(argc, argv);")?;
        writeln!(f, "    std::srand({});", opts.seed)?;
        writeln!(f, "    auto dut = std::make_unique<{model}>();")?;
        writeln!(f)?;
        writeln!(f, "    dut->{rst} = {on};")?;
        for p in m.ports().inputs().filter(|p| p.width <= 64) {
            writeln!(f, "    dut->{} = 0;", p.name)?;
        }
        writeln!(f, "    for (int i = 0; i < {RESET_CYCLES}; ++i) {{")?;
        writeln!(f, "        tick(*dut);")?;
        writeln!(f, "    }}")?;
        writeln!(f, "    dut->{rst} = {off};")?;
        writeln!(f)?;
        writeln!(f, "    for (int cycle = 0; cycle < {}; ++cycle) {{", opts.cycles)?;
        for p in m.ports().inputs() {
            if p.width <= 64 {
                writeln!(f, "        dut->{} = random_bits({});", p.name, p.width)?;
            } else {
                // Wide signals are arrays of 32-bit words, least significant first.
                let words = p.width.div_ceil(32);
                for word in 0..words {
                    let bits = (p.width - word * 32).min(32);
                    writeln!(
                        f,
                        "        dut->{}[{}] = static_cast<uint32_t>(random_bits({}));",
                        p.name, word, bits
                    )?;
                }
            }
        }
        writeln!(f, "        tick(*dut);")?;
        writeln!(f, "    }}")?;
        writeln!(f)?;
        writeln!(f, "    dut->final();")?;
        writeln!(f, "    return 0;")?;
        writeln!(f, "}}")
    }
}

/// Renders the `kind` testbench for `machine`.
pub fn render_testbench(machine: &Machine, kind: TestbenchKind, opts: TestbenchOptions) -> String {
    match kind {
        TestbenchKind::Verilog => VerilogTestbench(machine, opts).to_string(),
        TestbenchKind::Verilator => VerilatorHarness(machine, opts).to_string(),
    }
}
