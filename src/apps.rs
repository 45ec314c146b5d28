//! Built-in demo application: a distributed CNOT between two parties.
//! alice holds the control qubit, bob the target; they share an EPR pair
//! and exchange two classical messages (alice's measurement outcome and
//! bob's disentangling measurement) with conditional X / Z corrections.

use crate::backend::Qubit;
use crate::connection::Connection;
use crate::error::SimError;
use crate::program::{ProgramRegistry, RoleContext, RoleOutput, RoleProgram};

const ALLOWED_PAULI_VALUES: [&str; 4] = ["0", "1", "+", "-"];

// prepares `qubit` (assumed freshly initialized to |0>) in a pauli basis state
fn set_pauli_state(conn: &mut Connection, qubit: Qubit, value: &str) -> Result<(), SimError> {
    match value {
        "0" => Ok(()),
        "1" => conn.x(qubit),
        "+" => conn.h(qubit),
        "-" => {
            conn.x(qubit)?;
            conn.h(qubit)
        }
        other => Err(SimError::Program(format!(
            "`{}` is not a valid pauli state (allowed: {:?})",
            other, ALLOWED_PAULI_VALUES
        ))),
    }
}

fn first_outcome(outcomes: Vec<u8>) -> Result<u8, SimError> {
    outcomes
        .first()
        .copied()
        .ok_or_else(|| SimError::Backend("flush returned no measurement outcome".to_string()))
}

fn pauli_input(ctx: &RoleContext, key: &str) -> Result<String, SimError> {
    match ctx.input(key) {
        None => {
            log::info!(
                "role {}: `{}` not specified, using default |0>",
                ctx.role(),
                key
            );
            Ok("0".to_string())
        }
        Some(value) => {
            let s = value.to_string();
            if !ALLOWED_PAULI_VALUES.contains(&s.as_str()) {
                return Err(SimError::Program(format!(
                    "`{}` is not a valid value for `{}` (allowed: {:?})",
                    s, key, ALLOWED_PAULI_VALUES
                )));
            }
            Ok(s)
        }
    }
}

/// Control side of the distributed CNOT.
pub struct DistCnotAlice;

impl RoleProgram for DistCnotAlice {
    fn run(&mut self, ctx: &mut RoleContext) -> Result<RoleOutput, SimError> {
        let control_state = pauli_input(ctx, "control")?;

        // one EPR pair with bob, plus the local control qubit
        let epr = ctx.connection.epr_qubit("bob")?;
        let control = ctx.connection.new_qubit()?;
        set_pauli_state(&mut ctx.connection, control, &control_state)?;

        // entangle the control with the epr half and measure the half
        ctx.connection.cnot(control, epr)?;
        ctx.connection.measure(epr)?;
        let m = first_outcome(ctx.connection.flush()?)?;

        // bob corrects his epr half based on our outcome
        ctx.socket("bob")?.send(i64::from(m));

        // bob's disentangling measurement decides our Z correction
        let epr_meas = ctx.socket("bob")?.recv()?;
        if epr_meas.as_int() == Some(1) {
            log::debug!("alice: applying Z correction");
            ctx.connection.z(control)?;
        }
        ctx.connection.flush()?;

        let mut output = RoleOutput::new();
        output.insert("m".to_string(), i64::from(m).into());
        Ok(output)
    }
}

/// Target side of the distributed CNOT.
pub struct DistCnotBob;

impl RoleProgram for DistCnotBob {
    fn run(&mut self, ctx: &mut RoleContext) -> Result<RoleOutput, SimError> {
        let target_state = pauli_input(ctx, "target")?;

        // one EPR pair with alice, plus the local target qubit
        let epr = ctx.connection.epr_qubit("alice")?;
        let target = ctx.connection.new_qubit()?;
        set_pauli_state(&mut ctx.connection, target, &target_state)?;
        ctx.connection.flush()?;

        // wait for alice's measurement outcome
        let m = ctx.socket("alice")?.recv()?;

        // outcome 1 means an X correction on the local epr half
        if m.as_int() == Some(1) {
            log::debug!("bob: applying X correction");
            ctx.connection.x(epr)?;
        }

        // the epr half now acts as the control of a local cnot
        ctx.connection.cnot(epr, target)?;
        ctx.connection.measure(target)?;
        let outcome = first_outcome(ctx.connection.flush()?)?;

        // disentangle from alice's control and tell her the outcome
        ctx.connection.h(epr)?;
        ctx.connection.measure(epr)?;
        let epr_meas = first_outcome(ctx.connection.flush()?)?;

        ctx.socket("alice")?.send(i64::from(epr_meas));

        let mut output = RoleOutput::new();
        output.insert("target".to_string(), i64::from(outcome).into());
        Ok(output)
    }
}

/// Registers both roles of the demo under "dist_cnot_alice" and
/// "dist_cnot_bob".
pub fn register_demo_programs(registry: &mut ProgramRegistry) {
    registry.register("dist_cnot_alice", |_inputs| {
        Ok(Box::new(DistCnotAlice))
    });
    registry.register("dist_cnot_bob", |_inputs| {
        Ok(Box::new(DistCnotBob))
    });
}
