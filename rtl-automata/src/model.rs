//! The validated machine model.
//!
//! A [`Machine`] is only ever produced by [`Machine::from_document`], which
//! resolves every name and checks every invariant before returning. After
//! that the model is read-only; all emitters borrow it.

use std::cmp::Ordering;

use indexmap::IndexMap;

use crate::document::{single_entry, MachineDocument};
use crate::encoding::{Encoding, EncodingScheme};
use crate::error::{Error, Result};
use crate::parser::{Assignments, Clause};
use crate::port::{is_identifier, is_keyword, PortTable, RESERVED};

/// Reset style of the state register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reset {
    pub is_asynchronous: bool,
    pub is_active_low: bool,
}

impl Reset {
    /// `rst_n` for active-low resets, `rst` otherwise.
    pub fn port_name(&self) -> &'static str {
        if self.is_active_low {
            "rst_n"
        } else {
            "rst"
        }
    }

    /// Expression that is true while reset is asserted.
    pub fn active_expr(&self) -> String {
        if self.is_active_low {
            format!("!{}", self.port_name())
        } else {
            self.port_name().to_owned()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub name: String,
    pub encoding: u64,
    pub moore_outputs: Assignments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub source: String,
    pub destination: String,
    /// `None` marks the default arc of `source`.
    pub condition: Option<String>,
    pub mealy_outputs: Assignments,
}

impl Transition {
    /// Priority order: conditioned arcs first, by condition text, then the
    /// default arc.
    pub fn cmp_priority(&self, other: &Self) -> Ordering {
        match (&self.condition, &other.condition) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

/// Stable sort by [`Transition::cmp_priority`].
pub fn sort_transitions(transitions: &mut [Transition]) {
    transitions.sort_by(Transition::cmp_priority);
}

/// A fully validated finite state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    pub(crate) name: String,
    pub(crate) reset: Reset,
    pub(crate) ports: PortTable,
    pub(crate) encoding_scheme: EncodingScheme,
    pub(crate) encoding: Encoding,
    pub(crate) states: IndexMap<String, State>,
    pub(crate) transitions: Vec<Transition>,
    pub(crate) initial_state: String,
}

impl Machine {
    /// Parses and validates a YAML description.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Self::from_document(&MachineDocument::from_yaml(text)?)
    }

    /// Builds the model, failing on the first violated rule.
    pub fn from_document(doc: &MachineDocument) -> Result<Self> {
        if !is_identifier(&doc.name) || is_keyword(&doc.name) {
            return Err(Error::structural(format!(
                "`{}` is not a valid module name",
                doc.name
            )));
        }
        let ports = PortTable::from_document(&doc.inputs, &doc.outputs)?;

        // Every state must be known before destinations can be resolved.
        let mut declared: IndexMap<&str, &[String]> = IndexMap::new();
        for entry in &doc.transitions {
            let (name, clauses) = single_entry(entry, "transitions")?;
            if !is_identifier(name) {
                return Err(Error::structural(format!("`{name}` is not a valid state name")));
            }
            if RESERVED.contains(&name.as_str()) || is_keyword(name) || ports.declares(name) {
                return Err(Error::structural(format!(
                    "state name `{name}` is reserved or collides with a port"
                )));
            }
            let clauses = clauses.as_deref().unwrap_or_default();
            if declared.insert(name.as_str(), clauses).is_some() {
                return Err(Error::structural(format!("state `{name}` is declared twice")));
            }
        }

        let mut moore: IndexMap<&str, Assignments> = IndexMap::new();
        let mut transitions = Vec::new();
        for (&state, clauses) in &declared {
            let mut default_arc: Option<&str> = None;
            for text in clauses.iter() {
                let clause = Clause::parse(state, text)?;
                let resolve = |assignments: &Assignments| -> Result<()> {
                    for target in assignments.keys() {
                        ports.resolve(target).map_err(|e| {
                            Error::reference(format!("state `{state}`: {e} in clause `{text}`"))
                        })?;
                    }
                    Ok(())
                };
                let destination_known = |dest: &str| -> Result<()> {
                    if declared.contains_key(dest) {
                        Ok(())
                    } else {
                        Err(Error::reference(format!(
                            "state `{state}`: unknown destination state `{dest}` in clause `{text}`"
                        )))
                    }
                };

                match clause {
                    Clause::Moore(assignments) => {
                        resolve(&assignments)?;
                        if moore.insert(state, assignments).is_some() {
                            log::warn!(
                                "state `{state}` declares several Moore output lists; keeping `{text}`"
                            );
                        }
                    }
                    Clause::Default { destination } => {
                        if let Some(previous) = default_arc {
                            return Err(Error::grammar(
                                state,
                                text,
                                format!("second default arc (already defaults to `{previous}`)"),
                            ));
                        }
                        destination_known(&destination)?;
                        default_arc = Some(text.as_str());
                        transitions.push(Transition {
                            source: state.to_owned(),
                            destination,
                            condition: None,
                            mealy_outputs: Assignments::new(),
                        });
                    }
                    Clause::Conditional {
                        condition,
                        destination,
                        mealy,
                    } => {
                        destination_known(&destination)?;
                        resolve(&mealy)?;
                        transitions.push(Transition {
                            source: state.to_owned(),
                            destination,
                            condition: Some(condition),
                            mealy_outputs: mealy,
                        });
                    }
                }
            }
            log::debug!("parsed {} clause(s) of state `{state}`", clauses.len());
        }

        let invariant = |message: String| Error::Invariant {
            machine: doc.name.clone(),
            message,
        };
        if !declared.contains_key(doc.initial_state.as_str()) {
            return Err(Error::reference(format!(
                "initial state `{}` is not a declared state",
                doc.initial_state
            )));
        }
        if declared.len() < 2 {
            return Err(invariant(format!(
                "at least two states are required, found {}",
                declared.len()
            )));
        }
        if !ports.has_outputs() {
            return Err(invariant("at least one output is required".to_owned()));
        }

        let encoding = doc.encoding.assign(declared.keys().copied())?;
        let states = declared
            .keys()
            .map(|&name| {
                let value = encoding
                    .value(name)
                    .ok_or_else(|| Error::reference(format!("state `{name}` has no encoding")))?;
                let state = State {
                    name: name.to_owned(),
                    encoding: value,
                    moore_outputs: moore.swap_remove(name).unwrap_or_default(),
                };
                Ok((name.to_owned(), state))
            })
            .collect::<Result<IndexMap<_, _>>>()?;

        sort_transitions(&mut transitions);

        let machine = Self {
            name: doc.name.clone(),
            reset: Reset {
                is_asynchronous: doc.reset.asynchronous,
                is_active_low: doc.reset.active_low,
            },
            ports,
            encoding_scheme: doc.encoding,
            encoding,
            states,
            transitions,
            initial_state: doc.initial_state.clone(),
        };
        log::info!(
            "built machine `{}`: {} states, {} transitions, {} encoding ({} bits)",
            machine.name,
            machine.states.len(),
            machine.transitions.len(),
            machine.encoding_scheme,
            machine.encoding.width()
        );
        Ok(machine)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reset(&self) -> Reset {
        self.reset
    }

    pub fn ports(&self) -> &PortTable {
        &self.ports
    }

    pub fn encoding_scheme(&self) -> EncodingScheme {
        self.encoding_scheme
    }

    pub fn encoding(&self) -> &Encoding {
        &self.encoding
    }

    /// States in declaration order.
    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.values()
    }

    pub fn state(&self, name: &str) -> Option<&State> {
        self.states.get(name)
    }

    /// All transitions in priority order.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Outgoing transitions of `state`, in priority order.
    pub fn transitions_from<'a>(&'a self, state: &'a str) -> impl Iterator<Item = &'a Transition> {
        self.transitions.iter().filter(move |t| t.source == state)
    }

    pub fn initial_state(&self) -> &State {
        // Checked in `from_document`.
        &self.states[self.initial_state.as_str()]
    }
}
