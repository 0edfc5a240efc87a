//! State encoding assignment.

use indexmap::IndexMap;
use serde::Deserialize;
use strum_macros::{Display, EnumString};

use crate::error::{Error, Result};

/// How state names are mapped to register values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Deserialize)]
pub enum EncodingScheme {
    /// 1, 2, 4, 8, ... with one register bit per state.
    #[default]
    #[strum(to_string = "onehot", serialize = "one-hot")]
    #[serde(rename = "onehot", alias = "one-hot")]
    OneHot,
    /// 0, 1, 2, ... with `clog2(states)` register bits.
    #[strum(to_string = "counter")]
    #[serde(rename = "counter")]
    Counter,
}

/// Register width and per-state values produced by an [`EncodingScheme`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoding {
    width: usize,
    values: IndexMap<String, u64>,
}

/// Returns ceiling log2.
pub const fn clog2(value: usize) -> usize {
    if value == 0 {
        0
    } else {
        (usize::BITS - (value - 1).leading_zeros()) as usize
    }
}

impl EncodingScheme {
    /// Assigns values to `states` in declaration order.
    pub fn assign<'a, I>(self, states: I) -> Result<Encoding>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let names: Vec<&str> = states.into_iter().collect();
        let width = match self {
            Self::OneHot => {
                if names.len() > u64::BITS as usize {
                    return Err(Error::EncodingOverflow {
                        scheme: self.to_string(),
                        states: names.len(),
                    });
                }
                names.len()
            }
            // A lone state still needs a one-bit register.
            Self::Counter => clog2(names.len()).max(1),
        };

        let values = names
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let value = match self {
                    Self::OneHot => 1u64 << idx,
                    Self::Counter => idx as u64,
                };
                (name.to_string(), value)
            })
            .collect();

        let encoding = Encoding { width, values };
        encoding.verify_unique()?;
        Ok(encoding)
    }
}

impl Encoding {
    /// Register width in bits.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Value assigned to `state`.
    pub fn value(&self, state: &str) -> Option<u64> {
        self.values.get(state).copied()
    }

    /// `(state, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Verilog literal for `value` at this encoding's width.
    pub fn literal(&self, value: u64) -> String {
        format!("{}'d{}", self.width, value)
    }

    /// Checks that no two states share a value.
    pub fn verify_unique(&self) -> Result<()> {
        let mut seen: IndexMap<u64, &str> = IndexMap::new();
        for (name, value) in self.iter() {
            if let Some(first) = seen.insert(value, name) {
                return Err(Error::EncodingConflict {
                    first: first.to_owned(),
                    second: name.to_owned(),
                    value,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("S{i}")).collect()
    }

    #[rstest]
    #[case(2)]
    #[case(3)]
    #[case(8)]
    #[case(64)]
    fn one_hot_doubles_from_one(#[case] n: usize) {
        let states = names(n);
        let enc = EncodingScheme::OneHot
            .assign(states.iter().map(String::as_str))
            .unwrap();
        assert_eq!(enc.width(), n);
        for (idx, (_, value)) in enc.iter().enumerate() {
            assert_eq!(value, 1u64 << idx);
        }
    }

    #[rstest]
    #[case(2, 1)]
    #[case(3, 2)]
    #[case(4, 2)]
    #[case(5, 3)]
    #[case(17, 5)]
    fn counter_counts_from_zero(#[case] n: usize, #[case] width: usize) {
        let states = names(n);
        let enc = EncodingScheme::Counter
            .assign(states.iter().map(String::as_str))
            .unwrap();
        assert_eq!(enc.width(), width);
        let values: Vec<u64> = enc.iter().map(|(_, v)| v).collect();
        assert_eq!(values, (0..n as u64).collect::<Vec<_>>());
    }

    #[test]
    fn one_hot_overflow() {
        let states = names(65);
        let err = EncodingScheme::OneHot
            .assign(states.iter().map(String::as_str))
            .unwrap_err();
        assert!(matches!(err, Error::EncodingOverflow { states: 65, .. }));
    }

    #[test]
    fn duplicate_values_are_detected() {
        let mut values = IndexMap::new();
        values.insert("A".to_owned(), 3);
        values.insert("B".to_owned(), 3);
        let enc = Encoding { width: 2, values };
        match enc.verify_unique() {
            Err(Error::EncodingConflict { first, second, value }) => {
                assert_eq!((first.as_str(), second.as_str(), value), ("A", "B", 3));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn scheme_names() {
        assert_eq!(EncodingScheme::from_str("onehot").unwrap(), EncodingScheme::OneHot);
        assert_eq!(EncodingScheme::from_str("one-hot").unwrap(), EncodingScheme::OneHot);
        assert_eq!(EncodingScheme::from_str("counter").unwrap(), EncodingScheme::Counter);
        assert_eq!(EncodingScheme::Counter.to_string(), "counter");
        assert!(EncodingScheme::from_str("gray").is_err());
    }

    #[test]
    fn clog2_values() {
        assert_eq!(clog2(1), 0);
        assert_eq!(clog2(2), 1);
        assert_eq!(clog2(3), 2);
        assert_eq!(clog2(1024), 10);
    }
}
