//! Lowering of a validated [`Machine`] into a synchronous Verilog module.
//!
//! The generated module has one clocked block holding the state register
//! and the registered outputs, and one combinational block computing their
//! next values:
//!
//! 1. defaults: stay in the current state, registered outputs hold their
//!    value, combinational outputs are zero;
//! 2. per state, Moore assignments;
//! 3. per state, an `if`/`else if`/`else` cascade over the outgoing arcs in
//!    priority order, each branch setting the next state and its Mealy
//!    assignments;
//! 4. a `default` case item sending unused encodings back to the initial
//!    state.

use crate::error::{Error, Result};
use crate::model::{Machine, State};
use crate::parser::Assignments;
use crate::port::OutputPort;
use crate::vir::{Declaration, Module, ModuleItem, PortDeclaration, Statement};

const CLOCK: &str = "clk";
const STATE: &str = "state";
const NEXT_STATE: &str = "state_d";

/// Lowers `machine` into a Verilog module.
pub fn lower(machine: &Machine) -> Result<Module> {
    let reset = machine.reset();
    let ports = machine.ports();
    let width = machine.encoding().width();

    let mut port_decls = vec![
        PortDeclaration::Input(1, CLOCK.to_owned()),
        PortDeclaration::Input(1, reset.port_name().to_owned()),
    ];
    port_decls.extend(ports.inputs().map(|p| PortDeclaration::Input(p.width, p.name.clone())));
    port_decls.extend(ports.outputs().map(|p| PortDeclaration::OutputReg(p.width, p.name.clone())));

    let params = machine
        .states()
        .map(|s| {
            Declaration::LocalParam(width, s.name.clone(), machine.encoding().literal(s.encoding))
        })
        .collect();

    let mut regs = vec![
        Declaration::Reg(width, STATE.to_owned()),
        Declaration::Reg(width, NEXT_STATE.to_owned()),
    ];
    regs.extend(registered(machine).map(|o| Declaration::Reg(o.width, o.next_name())));

    let module_items = vec![
        ModuleItem::Declarations(params),
        ModuleItem::Declarations(regs),
        ModuleItem::AlwaysConstruct(sequential_event(machine), sequential_block(machine)),
        ModuleItem::AlwaysConstruct("@(*)".to_owned(), combinational_block(machine)?),
        ModuleItem::Ifdef(
            "FORMAL".to_owned(),
            vec![
                format!("default clocking @(posedge {CLOCK}); endclocking"),
                format!("default disable iff ({});", reset.active_expr()),
            ],
        ),
    ];

    Ok(Module {
        name: machine.name().to_owned(),
        header: vec![
            format!("Generated by rtl-automata from machine `{}`.", machine.name()),
            format!(
                "{} state encoding, {} reset.",
                machine.encoding_scheme(),
                if reset.is_asynchronous { "asynchronous" } else { "synchronous" }
            ),
        ],
        port_decls,
        module_items,
    })
}

/// Lowers `machine` and prints the module.
pub fn render_rtl(machine: &Machine) -> Result<String> {
    Ok(lower(machine)?.to_string())
}

fn registered(machine: &Machine) -> impl Iterator<Item = &OutputPort> {
    machine.ports().outputs().filter(|o| o.is_registered)
}

fn zero(width: usize) -> String {
    format!("{width}'d0")
}

fn sequential_event(machine: &Machine) -> String {
    let reset = machine.reset();
    match (reset.is_asynchronous, reset.is_active_low) {
        (false, _) => format!("@(posedge {CLOCK})"),
        (true, false) => format!("@(posedge {CLOCK} or posedge {})", reset.port_name()),
        (true, true) => format!("@(posedge {CLOCK} or negedge {})", reset.port_name()),
    }
}

fn sequential_block(machine: &Machine) -> Vec<Statement> {
    let mut on_reset = vec![Statement::NonblockingAssignment(
        STATE.to_owned(),
        machine.initial_state().name.clone(),
    )];
    let mut on_clock = vec![Statement::NonblockingAssignment(
        STATE.to_owned(),
        NEXT_STATE.to_owned(),
    )];
    for out in registered(machine) {
        on_reset.push(Statement::NonblockingAssignment(out.name.clone(), zero(out.width)));
        on_clock.push(Statement::NonblockingAssignment(out.name.clone(), out.next_name()));
    }
    vec![Statement::Conditional(
        vec![(machine.reset().active_expr(), on_reset)],
        on_clock,
    )]
}

fn combinational_block(machine: &Machine) -> Result<Vec<Statement>> {
    let mut stmts = vec![Statement::BlockingAssignment(
        NEXT_STATE.to_owned(),
        STATE.to_owned(),
    )];
    for out in machine.ports().outputs() {
        stmts.push(if out.is_registered {
            Statement::BlockingAssignment(out.next_name(), out.name.clone())
        } else {
            Statement::BlockingAssignment(out.name.clone(), zero(out.width))
        });
    }

    let case_items = machine
        .states()
        .map(|state| Ok((state.name.clone(), state_body(machine, state)?)))
        .collect::<Result<Vec<_>>>()?;
    let fallback = vec![Statement::BlockingAssignment(
        NEXT_STATE.to_owned(),
        machine.initial_state().name.clone(),
    )];
    stmts.push(Statement::Case(STATE.to_owned(), case_items, fallback));
    Ok(stmts)
}

fn state_body(machine: &Machine, state: &State) -> Result<Vec<Statement>> {
    let context = |what: String| Error::reference(format!("state `{}`: {what}", state.name));

    let mut body = assignments(machine, &state.moore_outputs).map_err(context)?;

    let mut branches = Vec::new();
    let mut fallback = None;
    for transition in machine.transitions_from(&state.name) {
        if machine.state(&transition.destination).is_none() {
            return Err(context(format!(
                "transition to undeclared state `{}`",
                transition.destination
            )));
        }
        let mut stmts = vec![Statement::BlockingAssignment(
            NEXT_STATE.to_owned(),
            transition.destination.clone(),
        )];
        stmts.extend(assignments(machine, &transition.mealy_outputs).map_err(context)?);
        match &transition.condition {
            Some(condition) => branches.push((condition.clone(), stmts)),
            None => fallback = Some(stmts),
        }
    }

    match (branches.is_empty(), fallback) {
        (true, Some(stmts)) => body.extend(stmts),
        (true, None) => {}
        (false, fallback) => {
            body.push(Statement::Conditional(branches, fallback.unwrap_or_default()))
        }
    }
    log::debug!("lowered state `{}` ({} statements)", state.name, body.len());
    Ok(body)
}

/// Output assignments; registered outputs are written through `<out>_d`.
fn assignments(
    machine: &Machine,
    assignments: &Assignments,
) -> std::result::Result<Vec<Statement>, String> {
    assignments
        .iter()
        .map(|(target, expr)| {
            let out = machine
                .ports()
                .resolve(target)
                .map_err(|e| format!("{e} in `{target}={expr}`"))?;
            let base = if out.is_registered {
                out.next_name()
            } else {
                out.name.clone()
            };
            Ok(Statement::BlockingAssignment(target.with_base(&base), expr.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Transition;
    use crate::port::OutputRef;

    const HANDSHAKE: &str = r#"
name: handshake
inputs:
  - go: { width: 1 }
outputs:
  - busy: { width: 1 }
transitions:
  - IDLE: ["(go==1), RUN"]
  - RUN: ["<busy=1'b1>", "(go==0), IDLE"]
initial_state: IDLE
"#;

    const HANDSHAKE_RTL: &str = "\
// Generated by rtl-automata from machine `handshake`.
// onehot state encoding, asynchronous reset.
`default_nettype none

module handshake (
    input wire clk,
    input wire rst,
    input wire go,
    output reg busy
);

    localparam [1:0] IDLE = 2'd1;
    localparam [1:0] RUN = 2'd2;

    reg [1:0] state;
    reg [1:0] state_d;

    always @(posedge clk or posedge rst) begin
        if (rst) begin
            state <= IDLE;
        end else begin
            state <= state_d;
        end
    end

    always @(*) begin
        state_d = state;
        busy = 1'd0;
        case (state)
            IDLE: begin
                if (go==1) begin
                    state_d = RUN;
                end
            end
            RUN: begin
                busy = 1'b1;
                if (go==0) begin
                    state_d = IDLE;
                end
            end
            default: begin
                state_d = IDLE;
            end
        endcase
    end

    `ifdef FORMAL
    default clocking @(posedge clk); endclocking
    default disable iff (rst);
    `endif

endmodule
`default_nettype wire
";

    #[test]
    fn handshake_rtl() {
        let m = Machine::from_yaml(HANDSHAKE).unwrap();
        assert_eq!(render_rtl(&m).unwrap(), HANDSHAKE_RTL);
    }

    #[test]
    fn lowering_is_deterministic() {
        let m = Machine::from_yaml(HANDSHAKE).unwrap();
        assert_eq!(render_rtl(&m).unwrap(), render_rtl(&m).unwrap());
    }

    const COUNTER: &str = r#"
name: pulse
reset: { asynchronous: false, active_low: true }
encoding: counter
inputs:
  - start: {}
  - stop: {}
outputs:
  - level: { width: 4, reg: true }
  - done: {}
transitions:
  - WAIT: ["(start), RUN, <level=4'd1>"]
  - RUN: ["<level[0]=1'b1>", "(stop), WAIT, <done=1'b1>", "(start), HOLD", "HOLD"]
  - HOLD: ["WAIT"]
  - DEAD:
initial_state: WAIT
"#;

    #[test]
    fn registered_outputs_and_sync_reset() {
        let m = Machine::from_yaml(COUNTER).unwrap();
        let rtl = render_rtl(&m).unwrap();
        assert!(rtl.contains("    input wire rst_n,\n"));
        assert!(rtl.contains("    output reg [3:0] level,\n    output reg done\n);"));
        assert!(rtl.contains("localparam [1:0] WAIT = 2'd0;"));
        assert!(rtl.contains("localparam [1:0] DEAD = 2'd3;"));
        assert!(rtl.contains("reg [3:0] level_d;"));
        assert!(rtl.contains("always @(posedge clk) begin\n        if (!rst_n) begin\n            state <= WAIT;\n            level <= 4'd0;\n        end else begin\n            state <= state_d;\n            level <= level_d;\n"));
        assert!(rtl.contains("        level_d = level;\n        done = 1'd0;\n"));
        assert!(rtl.contains("default disable iff (!rst_n);"));
    }

    #[test]
    fn cascade_follows_priority_order() {
        let m = Machine::from_yaml(COUNTER).unwrap();
        let rtl = render_rtl(&m).unwrap();
        let run = "\
            RUN: begin
                level_d[0] = 1'b1;
                if (start) begin
                    state_d = HOLD;
                end else if (stop) begin
                    state_d = WAIT;
                    done = 1'b1;
                end else begin
                    state_d = HOLD;
                end
            end
";
        assert!(rtl.contains(run), "{rtl}");
        // A lone default arc needs no branch; a state without clauses keeps defaults.
        assert!(rtl.contains("            HOLD: begin\n                state_d = WAIT;\n            end\n"));
        assert!(rtl.contains("            DEAD: begin\n            end\n"));
        assert!(rtl.contains("            default: begin\n                state_d = WAIT;\n            end\n"));
    }

    #[test]
    fn mealy_after_moore() {
        let m = Machine::from_yaml(COUNTER).unwrap();
        let rtl = render_rtl(&m).unwrap();
        assert!(rtl.contains("if (start) begin\n                    state_d = RUN;\n                    level_d = 4'd1;\n"));
    }

    #[test]
    fn undeclared_references_abort_lowering() {
        let mut m = Machine::from_yaml(HANDSHAKE).unwrap();
        m.transitions.push(Transition {
            source: "RUN".into(),
            destination: "GONE".into(),
            condition: None,
            mealy_outputs: Assignments::new(),
        });
        let err = lower(&m).unwrap_err();
        assert!(matches!(err, Error::Reference(ref msg) if msg.contains("GONE")));

        let mut m = Machine::from_yaml(HANDSHAKE).unwrap();
        let mut moore = Assignments::new();
        moore.insert(OutputRef::parse("ghost[0]").unwrap(), "1".into());
        m.states.get_mut("IDLE").unwrap().moore_outputs = moore;
        let err = lower(&m).unwrap_err();
        assert!(matches!(err, Error::Reference(ref msg) if msg.contains("ghost")));
    }
}
