//! Declared inputs and outputs.

use std::fmt;

use indexmap::IndexMap;

use crate::document::{single_entry, PortDocument};
use crate::error::{Error, Result};

/// Identifiers the generated module declares itself.
pub(crate) const RESERVED: &[&str] = &["clk", "rst", "rst_n", "state", "state_d"];

/// IEEE 1364-2005 reserved words, plus the SystemVerilog ones used by the
/// generated formal block and common type names.
const KEYWORDS: &[&str] = &[
    "always", "and", "assign", "automatic", "begin", "buf", "bufif0", "bufif1", "case", "casex",
    "casez", "cell", "cmos", "config", "deassign", "default", "defparam", "design", "disable",
    "edge", "else", "end", "endcase", "endconfig", "endfunction", "endgenerate", "endmodule",
    "endprimitive", "endspecify", "endtable", "endtask", "event", "for", "force", "forever",
    "fork", "function", "generate", "genvar", "highz0", "highz1", "if", "ifnone", "incdir",
    "include", "initial", "inout", "input", "instance", "integer", "join", "large", "liblist",
    "library", "localparam", "macromodule", "medium", "module", "nand", "negedge", "nmos", "nor",
    "noshowcancelled", "not", "notif0", "notif1", "or", "output", "parameter", "pmos", "posedge",
    "primitive", "pull0", "pull1", "pulldown", "pullup", "pulsestyle_ondetect",
    "pulsestyle_onevent", "rcmos", "real", "realtime", "reg", "release", "repeat", "rnmos",
    "rpmos", "rtran", "rtranif0", "rtranif1", "scalared", "showcancelled", "signed", "small",
    "specify", "specparam", "strong0", "strong1", "supply0", "supply1", "table", "task", "time",
    "tran", "tranif0", "tranif1", "tri", "tri0", "tri1", "triand", "trior", "trireg", "unsigned",
    "use", "uwire", "vectored", "wait", "wand", "weak0", "weak1", "while", "wire", "wor", "xnor",
    "xor", "assert", "assume", "bit", "byte", "clocking", "cover", "endclocking", "enum", "iff",
    "int", "logic", "longint", "property", "shortint", "struct", "typedef", "unique",
];

/// Whether `name` is a Verilog or SystemVerilog keyword.
pub(crate) fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

/// An input port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub name: String,
    pub width: usize,
}

/// An output port. Registered outputs are stored in a flip-flop, the rest
/// are recomputed every cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPort {
    pub name: String,
    pub width: usize,
    pub is_registered: bool,
}

impl OutputPort {
    /// Name of the next-value register of a registered output.
    pub fn next_name(&self) -> String {
        format!("{}_d", self.name)
    }
}

/// A reference to an output, optionally narrowed by `[index]` or `[hi:lo]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputRef {
    pub name: String,
    pub index: Option<String>,
}

impl OutputRef {
    /// Splits `name` or `name[index]`. Returns `None` for anything else.
    pub fn parse(target: &str) -> Option<Self> {
        let target = target.trim();
        let (name, index) = match target.find('[') {
            Some(open) => {
                let index = target[open + 1..].strip_suffix(']')?.trim();
                if index.is_empty() || index.contains(['[', ']']) {
                    return None;
                }
                (target[..open].trim(), Some(index.to_owned()))
            }
            None => (target, None),
        };
        if !is_identifier(name) {
            return None;
        }
        Some(Self {
            name: name.to_owned(),
            index,
        })
    }

    /// Renders this reference against another base name, e.g. `busy_d[3]`.
    pub fn with_base(&self, base: &str) -> String {
        match &self.index {
            Some(index) => format!("{base}[{index}]"),
            None => base.to_owned(),
        }
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.with_base(&self.name))
    }
}

/// Verilog-style identifier: letter or underscore, then word characters.
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Inputs and outputs in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortTable {
    inputs: IndexMap<String, Port>,
    outputs: IndexMap<String, OutputPort>,
}

impl PortTable {
    /// Builds the table from the document's `inputs`/`outputs` sections.
    pub fn from_document(
        inputs: &[IndexMap<String, PortDocument>],
        outputs: &[IndexMap<String, PortDocument>],
    ) -> Result<Self> {
        let mut table = Self::default();
        for entry in inputs {
            let (name, port) = single_entry(entry, "inputs")?;
            if port.reg {
                return Err(Error::structural(format!(
                    "input `{name}` cannot be registered"
                )));
            }
            table.check_new_name(name, port.width)?;
            table.inputs.insert(
                name.clone(),
                Port {
                    name: name.clone(),
                    width: port.width,
                },
            );
        }
        for entry in outputs {
            let (name, port) = single_entry(entry, "outputs")?;
            table.check_new_name(name, port.width)?;
            table.outputs.insert(
                name.clone(),
                OutputPort {
                    name: name.clone(),
                    width: port.width,
                    is_registered: port.reg,
                },
            );
        }
        // `<out>_d` is only generated once all outputs are known.
        for out in table.outputs.values().filter(|o| o.is_registered) {
            let next = out.next_name();
            if table.inputs.contains_key(&next) || table.outputs.contains_key(&next) {
                return Err(Error::structural(format!(
                    "port `{next}` collides with the next-value register of `{}`",
                    out.name
                )));
            }
        }
        Ok(table)
    }

    fn check_new_name(&self, name: &str, width: usize) -> Result<()> {
        if !is_identifier(name) {
            return Err(Error::structural(format!("`{name}` is not a valid port name")));
        }
        if RESERVED.contains(&name) || is_keyword(name) {
            return Err(Error::structural(format!("port name `{name}` is reserved")));
        }
        if self.inputs.contains_key(name) || self.outputs.contains_key(name) {
            return Err(Error::structural(format!("port `{name}` is declared twice")));
        }
        if width == 0 {
            return Err(Error::structural(format!("port `{name}` has zero width")));
        }
        Ok(())
    }

    pub fn inputs(&self) -> impl Iterator<Item = &Port> {
        self.inputs.values()
    }

    pub fn outputs(&self) -> impl Iterator<Item = &OutputPort> {
        self.outputs.values()
    }

    pub fn input(&self, name: &str) -> Option<&Port> {
        self.inputs.get(name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputPort> {
        self.outputs.get(name)
    }

    pub fn has_outputs(&self) -> bool {
        !self.outputs.is_empty()
    }

    /// Whether `name` is a port or the next-value register of one.
    pub fn declares(&self, name: &str) -> bool {
        self.inputs.contains_key(name)
            || self.outputs.contains_key(name)
            || self
                .outputs
                .values()
                .any(|o| o.is_registered && o.next_name() == name)
    }

    /// Resolves `target` against the output table. Integer indices and
    /// `hi:lo` slices are range checked; anything else is passed through.
    pub fn resolve(&self, target: &OutputRef) -> Result<&OutputPort> {
        let port = self
            .output(&target.name)
            .ok_or_else(|| Error::reference(format!("unknown output `{}`", target.name)))?;
        if let Some(index) = &target.index {
            let bounds: Vec<Option<usize>> =
                index.split(':').map(|b| b.trim().parse().ok()).collect();
            for bound in bounds.into_iter().flatten() {
                if bound >= port.width {
                    return Err(Error::reference(format!(
                        "index `{index}` is out of range for output `{}` of width {}",
                        port.name, port.width
                    )));
                }
            }
        }
        Ok(port)
    }
}
