//! Transition-line parser.
//!
//! Every entry in a state's clause list is decoded on its own into one of:
//!
//! ```text
//! (condition), DEST[, <out=expr;...>]    conditional arc, optional Mealy outputs
//! DEST                                   default arc (at most one per state)
//! <out=expr;out[3]=expr>                 Moore outputs of the state
//! ```
//!
//! Conditions and values are opaque Verilog text. Only the surrounding
//! punctuation is interpreted here; names are resolved by the model builder.

use std::fmt;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::port::{is_identifier, OutputRef};

/// Output assignments, `target -> expression`, in source order.
pub type Assignments = IndexMap<OutputRef, String>;

/// A single decoded clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    Conditional {
        condition: String,
        destination: String,
        mealy: Assignments,
    },
    Default {
        destination: String,
    },
    Moore(Assignments),
}

impl Clause {
    /// Parses one clause of `state`.
    pub fn parse(state: &str, text: &str) -> Result<Self> {
        let err = |msg: &str| Error::grammar(state, text, msg);
        let fields = split_top_level(text, ',').ok_or_else(|| err("unbalanced brackets"))?;

        match fields.as_slice() {
            [single] if single.starts_with('<') => {
                let body = angle_body(single).ok_or_else(|| err("unterminated output list"))?;
                Ok(Clause::Moore(parse_assignments(body).map_err(|m| err(m.as_str()))?))
            }
            [single] if single.starts_with('(') => {
                Err(err("a conditional arc needs a destination state"))
            }
            [single] => {
                if !is_identifier(single) {
                    return Err(err(
                        "expected a state name, a `(condition), STATE` arc or a `<...>` output list",
                    ));
                }
                Ok(Clause::Default {
                    destination: single.to_string(),
                })
            }
            [condition, destination, rest @ ..] if rest.len() <= 1 => {
                let condition = paren_body(condition)
                    .ok_or_else(|| err("the condition must be enclosed in parentheses"))?;
                if condition.is_empty() {
                    return Err(err("empty condition"));
                }
                if destination.starts_with(['<', '(', '[']) {
                    return Err(err("the second field must name the destination state"));
                }
                if !is_identifier(destination) {
                    return Err(err("invalid destination state name"));
                }
                let mealy = match rest.first() {
                    Some(list) => {
                        let body = angle_body(list)
                            .ok_or_else(|| err("Mealy outputs must be written as `<out=expr;...>`"))?;
                        parse_assignments(body).map_err(|m| err(m.as_str()))?
                    }
                    None => Assignments::new(),
                };
                Ok(Clause::Conditional {
                    condition: condition.to_string(),
                    destination: destination.to_string(),
                    mealy,
                })
            }
            _ => Err(err("expected one to three comma-separated fields")),
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Conditional {
                condition,
                destination,
                mealy,
            } => {
                write!(f, "({condition}), {destination}")?;
                if !mealy.is_empty() {
                    write!(f, ", <{}>", format_assignments(mealy, ";"))?;
                }
                Ok(())
            }
            Clause::Default { destination } => f.write_str(destination),
            Clause::Moore(assignments) => write!(f, "<{}>", format_assignments(assignments, ";")),
        }
    }
}

/// Joins assignments as `target=expr` pairs.
pub fn format_assignments(assignments: &Assignments, sep: &str) -> String {
    assignments
        .iter()
        .map(|(target, expr)| format!("{target}={expr}"))
        .collect::<Vec<_>>()
        .join(sep)
}

/// Parses `out=expr;out[1]=expr` (trailing `;` allowed).
fn parse_assignments(body: &str) -> std::result::Result<Assignments, String> {
    let mut assignments = Assignments::new();
    for pair in split_top_level(body, ';')
        .ok_or("unbalanced brackets in output list")?
        .into_iter()
        .filter(|p| !p.is_empty())
    {
        let (target, expr) = pair
            .split_once('=')
            .ok_or_else(|| format!("`{pair}` is not an `output=value` assignment"))?;
        let target = OutputRef::parse(target)
            .ok_or_else(|| format!("`{}` is not an output or indexed output", target.trim()))?;
        let expr = expr.trim();
        if expr.is_empty() {
            return Err(format!("`{target}` is assigned an empty value"));
        }
        if assignments.insert(target.clone(), expr.to_string()).is_some() {
            return Err(format!("`{target}` is assigned twice"));
        }
    }
    Ok(assignments)
}

/// Splits on `sep` outside of `()`, `[]` and `{}`. Fields are trimmed.
fn split_top_level(text: &str, sep: char) -> Option<Vec<&str>> {
    let mut fields = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, c) in text.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.checked_sub(1)?,
            c if c == sep && depth == 0 => {
                fields.push(text[start..idx].trim());
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    fields.push(text[start..].trim());
    Some(fields)
}

/// Inner text of `(...)` when the first parenthesis closes at the very end.
fn paren_body(field: &str) -> Option<&str> {
    let inner = field.strip_prefix('(')?.strip_suffix(')')?;
    let mut depth = 0usize;
    for c in inner.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1)?,
            _ => {}
        }
    }
    (depth == 0).then(|| inner.trim())
}

fn angle_body(field: &str) -> Option<&str> {
    field.strip_prefix('<')?.strip_suffix('>')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn out(name: &str, index: Option<&str>) -> OutputRef {
        OutputRef {
            name: name.into(),
            index: index.map(Into::into),
        }
    }

    #[test]
    fn parses_full_form() {
        let c = Clause::parse("S", "(go == 1 && cnt[3:0] == 4'd9), DONE, <busy=1'b0;cnt[3]=x>")
            .unwrap();
        let Clause::Conditional {
            condition,
            destination,
            mealy,
        } = c
        else {
            panic!("not conditional");
        };
        assert_eq!(condition, "go == 1 && cnt[3:0] == 4'd9");
        assert_eq!(destination, "DONE");
        assert_eq!(mealy[&out("busy", None)], "1'b0");
        assert_eq!(mealy[&out("cnt", Some("3"))], "x");
    }

    #[test]
    fn parses_minimal_form() {
        assert_eq!(
            Clause::parse("S", "IDLE").unwrap(),
            Clause::Default {
                destination: "IDLE".into()
            }
        );
        let c = Clause::parse("S", "(go), RUN").unwrap();
        assert!(matches!(c, Clause::Conditional { ref mealy, .. } if mealy.is_empty()));
    }

    #[test]
    fn parses_moore_list() {
        let Clause::Moore(a) = Clause::parse("S", "<outA=expr1;outB[3]=expr2;>").unwrap() else {
            panic!("not moore");
        };
        let keys: Vec<String> = a.keys().map(ToString::to_string).collect();
        assert_eq!(keys, ["outA", "outB[3]"]);
        assert_eq!(a[&out("outB", Some("3"))], "expr2");
    }

    #[test]
    fn commas_inside_brackets_are_not_separators() {
        let c = Clause::parse("S", "({a, b} == 2'b11), RUN, <o={a, b}>").unwrap();
        assert_eq!(c.to_string(), "({a, b} == 2'b11), RUN, <o={a, b}>");
    }

    #[rstest]
    #[case::empty("")]
    #[case::lonely_condition("(go)")]
    #[case::unparenthesized_condition("go, RUN")]
    #[case::split_parens("(a)||(b), RUN")]
    #[case::list_as_destination("(go), <busy=1>")]
    #[case::bare_mealy("(go), RUN, busy=1")]
    #[case::too_many_fields("(go), RUN, <a=1>, <b=2>")]
    #[case::unbalanced("(go, RUN")]
    #[case::unterminated_list("<busy=1")]
    #[case::missing_value("<busy=>")]
    #[case::missing_equals("<busy>")]
    #[case::double_assignment("<busy=1;busy=0>")]
    #[case::bad_target("<bu sy=1>")]
    #[case::empty_condition("(), RUN")]
    fn rejects_malformed(#[case] text: &str) {
        assert!(matches!(
            Clause::parse("S", text),
            Err(Error::Grammar { .. })
        ));
    }
}
