use slotmap::SecondaryMap;

use crate::simulation::{evaluate, wire, Circuit, GateKey, LogicValue, PinKey, PinOwner, WireKey};

pub const DEFAULT_MAX_ITERATIONS: usize = 10;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SettleConfig {
    /// Passes allowed before giving up on a fixed point.
    pub max_iterations: usize,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self { max_iterations: DEFAULT_MAX_ITERATIONS }
    }
}

/// A wire whose level at the end of a settle differs from its level at the start.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct WireChange {
    pub wire: WireKey,
    pub previous: LogicValue,
    pub level: LogicValue,
    /// First gate among the wire's drivers; `None` when only sources drive it.
    pub source_gate: Option<GateKey>,
    /// Pass (starting at 1) in which the wire last changed.
    pub pass: usize,
}

/// A pin whose level at the end of a settle differs from its level at the start.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PinChange {
    pub pin: PinKey,
    pub previous: LogicValue,
    pub level: LogicValue,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SettleReport {
    pub changed_wires: Vec<WireChange>,
    pub changed_pins: Vec<PinChange>,
    pub converged: bool,
    pub iterations: usize,
}

impl SettleReport {
    pub fn changed(&self, wire: WireKey) -> Option<&WireChange> {
        self.changed_wires.iter().find(|c| c.wire == wire)
    }

    pub fn changed_pin(&self, pin: PinKey) -> Option<&PinChange> {
        self.changed_pins.iter().find(|c| c.pin == pin)
    }
}

/// Propagates levels through the circuit until nothing changes or `config.max_iterations` passes have run.
///
/// A pass re-evaluates every gate from its inputs, then resolves every wire from its drivers and copies wire levels onto the input pins
/// they feed; the first pass resolves wires once before the gates as well. Input pins without a wire float to HI_Z. Each pass moves a
/// change through one gate and onto the wire after it, so an acyclic circuit converges within (longest gate chain) + 1 passes, the last
/// being the one that sees no change. A circuit with feedback may not, in which case `converged` is false and the levels are whatever the
/// last pass left.
pub fn settle(circuit: &mut Circuit, config: &SettleConfig) -> SettleReport {
    let start: SecondaryMap<WireKey, LogicValue> = circuit.wires.iter().map(|(wk, w)| (wk, w.level)).collect();
    let start_pins: SecondaryMap<PinKey, LogicValue> = circuit.pins.iter().map(|(pk, p)| (pk, p.level)).collect();
    let mut last_change: SecondaryMap<WireKey, usize> = SecondaryMap::new();

    let mut converged = false;
    let mut iterations = 0;
    while iterations < config.max_iterations {
        iterations += 1;
        let changed = settle_pass(circuit, iterations, &mut last_change);
        if !changed {
            converged = true;
            break;
        }
    }

    let changed_wires: Vec<WireChange> = circuit
        .wires
        .iter()
        .filter_map(|(wk, w)| {
            let previous = *start.get(wk)?;
            if previous == w.level {
                return None;
            }
            let source_gate = w.drivers().iter().find_map(|d| match circuit.pins[*d].owner() {
                PinOwner::GateOutput(gk) => Some(gk),
                _ => None,
            });
            Some(WireChange { wire: wk, previous, level: w.level, source_gate, pass: last_change.get(wk).copied().unwrap_or(iterations) })
        })
        .collect();
    let changed_pins: Vec<PinChange> = circuit
        .pins
        .iter()
        .filter_map(|(pk, p)| {
            let previous = *start_pins.get(pk)?;
            (previous != p.level).then_some(PinChange { pin: pk, previous, level: p.level })
        })
        .collect();

    if converged {
        tracing::debug!(iterations, changed = changed_wires.len(), "circuit settled");
    } else {
        tracing::warn!(iterations, changed = changed_wires.len(), "circuit did not settle; it probably has unresolved feedback");
    }

    SettleReport { changed_wires, changed_pins, converged, iterations }
}

fn settle_pass(circuit: &mut Circuit, pass: usize, last_change: &mut SecondaryMap<WireKey, usize>) -> bool {
    // later passes start from wires already resolved at the end of the previous one
    let mut changed = pass == 1 && propagate_wires(circuit, pass, last_change);

    // gate outputs from their inputs
    let outputs: Vec<(PinKey, LogicValue)> = circuit
        .gates
        .values()
        .map(|g| {
            let inputs: Vec<LogicValue> = g.inputs().iter().map(|p| circuit.pins[*p].level).collect();
            (g.output(), evaluate(g.kind(), &inputs))
        })
        .collect();
    for (pk, level) in outputs {
        changed |= set_pin(circuit, pk, level);
    }

    changed |= propagate_wires(circuit, pass, last_change);

    tracing::trace!(pass, changed, "settle pass");
    changed
}

/// Resolves every wire from its drivers, then sets every input pin from the wire feeding it.
fn propagate_wires(circuit: &mut Circuit, pass: usize, last_change: &mut SecondaryMap<WireKey, usize>) -> bool {
    let mut changed = false;

    let wire_levels: Vec<(WireKey, LogicValue)> = circuit
        .wires
        .iter()
        .map(|(wk, w)| {
            let drivers: Vec<LogicValue> = w.drivers().iter().map(|d| circuit.pins[*d].level).collect();
            (wk, wire::calculate_state(&drivers))
        })
        .collect();
    for (wk, level) in wire_levels {
        let w = &mut circuit.wires[wk];
        if w.level != level {
            w.level = level;
            last_change.insert(wk, pass);
            changed = true;
        }
    }

    let input_levels: Vec<(PinKey, LogicValue)> = circuit
        .pins
        .iter()
        .filter(|(_, p)| !p.owner().is_driver())
        .map(|(pk, _)| (pk, circuit.incoming_wire(pk).map_or(LogicValue::HiZ, |wk| circuit.wires[wk].level)))
        .collect();
    for (pk, level) in input_levels {
        changed |= set_pin(circuit, pk, level);
    }

    changed
}

fn set_pin(circuit: &mut Circuit, pin: PinKey, level: LogicValue) -> bool {
    let p = &mut circuit.pins[pin];
    if p.level == level {
        false
    } else {
        p.level = level;
        true
    }
}
