//! Lower declarative finite state machine descriptions into synthesizable Verilog.
//!
//! A machine is described as a YAML document listing ports and, per state, a
//! handful of short clauses:
//!
//! ```text
//! (condition), DEST[, <out=expr;...>]    conditional arc with Mealy outputs
//! DEST                                   default arc
//! <out=expr;out[3]=expr>                 Moore outputs
//! ```
//!
//! [`Machine::from_yaml`] builds and validates the model; [`Emitter`] renders
//! it as RTL, a state diagram or a testbench; [`write_artifacts`] puts the
//! results on disk all at once.
//!
//! ```
//! use rtl_automata::{Emitter, Machine};
//!
//! let machine = Machine::from_yaml(r#"
//! name: handshake
//! inputs:
//!   - go: { width: 1 }
//! outputs:
//!   - busy: { width: 1 }
//! transitions:
//!   - IDLE: ["(go==1), RUN"]
//!   - RUN: ["<busy=1'b1>", "(go==0), IDLE"]
//! initial_state: IDLE
//! "#).unwrap();
//!
//! let rtl = Emitter::Rtl.render(&machine).unwrap();
//! assert!(rtl.contains("module handshake ("));
//! ```

pub mod document;
pub mod emit;
pub mod encoding;
pub mod error;
pub mod lower;
pub mod model;
pub mod parser;
pub mod port;
pub mod vir;

pub use document::MachineDocument;
pub use emit::{
    write_artifacts, Artifact, Emitter, GraphFormat, TestbenchKind, TestbenchOptions,
};
pub use encoding::{Encoding, EncodingScheme};
pub use error::{Error, Result};
pub use model::{Machine, Reset, State, Transition};
pub use port::{OutputPort, OutputRef, Port, PortTable};
