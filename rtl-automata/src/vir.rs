//! Verilog IR.
//!
//! Just enough structure to print a single synchronous module. Expressions
//! are kept as opaque strings.

use std::fmt;

const INDENT: usize = 4;

/// Module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// Module name.
    pub name: String,

    /// Leading comment lines.
    pub header: Vec<String>,

    /// Port declarations.
    pub port_decls: Vec<PortDeclaration>,

    /// Module items.
    pub module_items: Vec<ModuleItem>,
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.header {
            writeln!(f, "// {line}")?;
        }
        writeln!(f, "`default_nettype none")?;
        writeln!(f)?;
        writeln!(
            f,
            "module {} (\n{}\n);",
            self.name,
            indent(&join(&self.port_decls, ",\n"), INDENT)
        )?;
        for item in &self.module_items {
            writeln!(f)?;
            writeln!(f, "{}", indent(&item.to_string(), INDENT))?;
        }
        writeln!(f)?;
        writeln!(f, "endmodule")?;
        writeln!(f, "`default_nettype wire")
    }
}

/// Port declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortDeclaration {
    /// Input declaration.
    Input(usize, String),

    /// Output driven from a procedural block.
    OutputReg(usize, String),
}

impl fmt::Display for PortDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(width, ident) => write!(f, "input wire {}{}", range(*width), ident),
            Self::OutputReg(width, ident) => write!(f, "output reg {}{}", range(*width), ident),
        }
    }
}

/// Declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// Localparam declaration.
    LocalParam(usize, String, String),

    /// Reg declaration.
    Reg(usize, String),
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalParam(width, ident, value) => {
                write!(f, "localparam {}{} = {};", range(*width), ident, value)
            }
            Self::Reg(width, ident) => write!(f, "reg {}{};", range(*width), ident),
        }
    }
}

/// Module item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleItem {
    /// Declarations.
    Declarations(Vec<Declaration>),

    /// Always construct with its event control, e.g. `@(*)`.
    AlwaysConstruct(String, Vec<Statement>),

    /// Lines guarded by `` `ifdef ``.
    Ifdef(String, Vec<String>),
}

impl fmt::Display for ModuleItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declarations(decls) => f.write_str(&join(decls, "\n")),
            Self::AlwaysConstruct(event, stmts) => write!(f, "always {} {}", event, block(stmts)),
            Self::Ifdef(name, lines) => {
                write!(f, "`ifdef {}\n{}\n`endif", name, lines.join("\n"))
            }
        }
    }
}

/// Statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// Blocking assignment.
    BlockingAssignment(String, String),

    /// Nonblocking assignment.
    NonblockingAssignment(String, String),

    /// `if`/`else if` cascade with a trailing `else` body (empty when absent).
    Conditional(Vec<(String, Vec<Statement>)>, Vec<Statement>),

    /// Case statement.
    Case(String, Vec<(String, Vec<Statement>)>, Vec<Statement>),
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlockingAssignment(lvalue, expr) => write!(f, "{lvalue} = {expr};"),
            Self::NonblockingAssignment(lvalue, expr) => write!(f, "{lvalue} <= {expr};"),
            Self::Conditional(branches, else_stmt) => {
                for (idx, (cond, stmts)) in branches.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(" else ")?;
                    }
                    write!(f, "if ({}) {}", cond, block(stmts))?;
                }
                if !else_stmt.is_empty() {
                    write!(f, " else {}", block(else_stmt))?;
                }
                Ok(())
            }
            Self::Case(case_expr, case_items, default) => {
                let mut items = case_items
                    .iter()
                    .map(|(label, stmts)| format!("{}: {}", label, block(stmts)))
                    .collect::<Vec<_>>();
                if !default.is_empty() {
                    items.push(format!("default: {}", block(default)));
                }
                write!(
                    f,
                    "case ({})\n{}\nendcase",
                    case_expr,
                    indent(&items.join("\n"), INDENT)
                )
            }
        }
    }
}

/// `begin ... end` around indented statements.
fn block(stmts: &[Statement]) -> String {
    if stmts.is_empty() {
        "begin\nend".to_owned()
    } else {
        format!("begin\n{}\nend", indent(&join(stmts, "\n"), INDENT))
    }
}

/// `[w-1:0] ` for vectors, nothing for single bits.
fn range(width: usize) -> String {
    if width > 1 {
        format!("[{}:0] ", width - 1)
    } else {
        String::new()
    }
}

fn join<T: fmt::Display>(items: &[T], sep: &str) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(sep)
}

/// Indents every non-empty line in the string.
pub fn indent(s: &str, indent: usize) -> String {
    s.lines()
        .map(|l| {
            if l.is_empty() {
                String::new()
            } else {
                format!("{}{}", " ".repeat(indent), l)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assign(l: &str, r: &str) -> Statement {
        Statement::BlockingAssignment(l.into(), r.into())
    }

    #[test]
    fn cascade_layout() {
        let stmt = Statement::Conditional(
            vec![
                ("a".into(), vec![assign("x", "1")]),
                ("b".into(), vec![assign("x", "2")]),
            ],
            vec![assign("x", "3")],
        );
        assert_eq!(
            stmt.to_string(),
            "if (a) begin\n    x = 1;\nend else if (b) begin\n    x = 2;\nend else begin\n    x = 3;\nend"
        );
    }

    #[test]
    fn bare_if_has_no_else() {
        let stmt = Statement::Conditional(vec![("go".into(), vec![assign("s", "RUN")])], vec![]);
        assert_eq!(stmt.to_string(), "if (go) begin\n    s = RUN;\nend");
    }

    #[test]
    fn case_layout() {
        let stmt = Statement::Case(
            "state".into(),
            vec![("A".into(), vec![]), ("B".into(), vec![assign("o", "1")])],
            vec![assign("state_d", "A")],
        );
        assert_eq!(
            stmt.to_string(),
            "case (state)\n    A: begin\n    end\n    B: begin\n        o = 1;\n    end\n    default: begin\n        state_d = A;\n    end\nendcase"
        );
    }

    #[test]
    fn declarations() {
        assert_eq!(PortDeclaration::Input(1, "go".into()).to_string(), "input wire go");
        assert_eq!(
            PortDeclaration::OutputReg(8, "count".into()).to_string(),
            "output reg [7:0] count"
        );
        assert_eq!(
            Declaration::LocalParam(2, "RUN".into(), "2'd2".into()).to_string(),
            "localparam [1:0] RUN = 2'd2;"
        );
        assert_eq!(Declaration::Reg(1, "state".into()).to_string(), "reg state;");
    }
}
