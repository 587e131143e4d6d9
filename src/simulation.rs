pub mod gate;
pub mod logic;
pub mod value;
pub mod wire;

use slotmap::{SecondaryMap, SlotMap};

use crate::error::CircuitError;

pub use gate::{evaluate, pin_layout, GateKind, PinLayout, PinSlot};
pub use logic::{settle, PinChange, SettleConfig, SettleReport, WireChange};
pub use value::LogicValue;
pub use wire::{calculate_state, detect_conflict};

slotmap::new_key_type! {
    pub struct GateKey;
    pub struct PinKey;
    pub struct WireKey;
    pub struct SourceKey;
    pub struct SinkKey;
}

pub type GateMap = SlotMap<GateKey, Gate>;
pub type PinMap = SlotMap<PinKey, Pin>;
pub type WireMap = SlotMap<WireKey, Wire>;
pub type SourceMap = SlotMap<SourceKey, Source>;
pub type SinkMap = SlotMap<SinkKey, Sink>;

#[derive(Clone, Debug)]
pub struct Pin {
    pub(crate) level: LogicValue,
    owner: PinOwner,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PinOwner {
    GateInput(GateKey, usize),
    GateOutput(GateKey),
    Source(SourceKey),
    Sink(SinkKey),
}

#[derive(Clone, Debug)]
pub struct Gate {
    kind: GateKind,
    inputs: Vec<PinKey>,
    output: PinKey,
}

/// A switch: one output pin whose level is set from outside.
#[derive(Clone, Debug)]
pub struct Source {
    output: PinKey,
}

/// A light: one input pin that only displays what it receives.
#[derive(Clone, Debug)]
pub struct Sink {
    input: PinKey,
}

#[derive(Clone, Debug)]
pub struct Wire {
    drivers: Vec<PinKey>,
    destinations: Vec<PinKey>,
    pub(crate) level: LogicValue,
}

/// Sources, gates, sinks and the wires between their pins.
///
/// Wires are the only edges. Every wire records the output pins driving it and the input pins it feeds; an input pin is fed by at most one
/// wire, while a wire may have any number of drivers.
#[derive(Clone, Debug, Default)]
pub struct Circuit {
    pub(crate) gates: GateMap,
    pub(crate) pins: PinMap,
    pub(crate) wires: WireMap,
    pub(crate) sources: SourceMap,
    pub(crate) sinks: SinkMap,
    incoming: SecondaryMap<PinKey, WireKey>,
}

impl Pin {
    pub fn level(&self) -> LogicValue {
        self.level
    }
    pub fn owner(&self) -> PinOwner {
        self.owner
    }
}

impl PinOwner {
    /// Whether a pin with this owner may drive a wire.
    pub fn is_driver(self) -> bool {
        matches!(self, PinOwner::GateOutput(_) | PinOwner::Source(_))
    }
}

impl Gate {
    pub fn kind(&self) -> GateKind {
        self.kind
    }
    pub fn arity(&self) -> usize {
        self.inputs.len()
    }
    pub fn inputs(&self) -> &[PinKey] {
        &self.inputs
    }
    pub fn output(&self) -> PinKey {
        self.output
    }
}

impl Source {
    pub fn output(&self) -> PinKey {
        self.output
    }
}

impl Sink {
    pub fn input(&self) -> PinKey {
        self.input
    }
}

impl Wire {
    pub fn drivers(&self) -> &[PinKey] {
        &self.drivers
    }
    pub fn destinations(&self) -> &[PinKey] {
        &self.destinations
    }
    pub fn level(&self) -> LogicValue {
        self.level
    }
    fn touches(&self, pin: PinKey) -> bool {
        self.drivers.contains(&pin) || self.destinations.contains(&pin)
    }
}

impl Circuit {
    pub fn new() -> Self {
        Self::default()
    }

    // accessors {{{1
    pub fn gate(&self, gate: GateKey) -> Option<&Gate> {
        self.gates.get(gate)
    }
    pub fn pin(&self, pin: PinKey) -> Option<&Pin> {
        self.pins.get(pin)
    }
    pub fn wire(&self, wire: WireKey) -> Option<&Wire> {
        self.wires.get(wire)
    }
    pub fn source(&self, source: SourceKey) -> Option<&Source> {
        self.sources.get(source)
    }
    pub fn sink(&self, sink: SinkKey) -> Option<&Sink> {
        self.sinks.get(sink)
    }

    pub fn gates(&self) -> impl Iterator<Item = (GateKey, &Gate)> {
        self.gates.iter()
    }
    pub fn wires(&self) -> impl Iterator<Item = (WireKey, &Wire)> {
        self.wires.iter()
    }
    pub fn sources(&self) -> impl Iterator<Item = (SourceKey, &Source)> {
        self.sources.iter()
    }
    pub fn sinks(&self) -> impl Iterator<Item = (SinkKey, &Sink)> {
        self.sinks.iter()
    }

    pub fn pin_level(&self, pin: PinKey) -> Option<LogicValue> {
        self.pins.get(pin).map(Pin::level)
    }
    pub fn wire_level(&self, wire: WireKey) -> Option<LogicValue> {
        self.wires.get(wire).map(Wire::level)
    }
    pub fn sink_level(&self, sink: SinkKey) -> Option<LogicValue> {
        self.sinks.get(sink).and_then(|s| self.pin_level(s.input))
    }
    pub fn source_level(&self, source: SourceKey) -> Option<LogicValue> {
        self.sources.get(source).and_then(|s| self.pin_level(s.output))
    }
    pub fn gate_output_level(&self, gate: GateKey) -> Option<LogicValue> {
        self.gates.get(gate).and_then(|g| self.pin_level(g.output))
    }
    /// Current levels of a gate's input pins, in pin order.
    pub fn gate_input_levels(&self, gate: GateKey) -> Option<Vec<LogicValue>> {
        let gate = self.gates.get(gate)?;
        Some(gate.inputs.iter().map(|p| self.pins[*p].level).collect())
    }

    /// The wire feeding an input pin, if there is one.
    pub fn incoming_wire(&self, pin: PinKey) -> Option<WireKey> {
        self.incoming.get(pin).copied()
    }

    // gates {{{1
    /// Places a gate. Out of range arities are clamped; input pins start LOW and the output starts at whatever all LOW inputs produce.
    pub fn add_gate(&mut self, kind: GateKind, arity: usize) -> GateKey {
        let arity = kind.clamp_arity(arity);
        let Circuit { gates, pins, .. } = self;
        gates.insert_with_key(|gk| Gate {
            kind,
            inputs: (0..arity).map(|i| pins.insert(Pin { level: LogicValue::Low, owner: PinOwner::GateInput(gk, i) })).collect(),
            output: pins.insert(Pin { level: evaluate(kind, &vec![LogicValue::Low; arity]), owner: PinOwner::GateOutput(gk) }),
        })
    }

    /// Changes a gate's arity, keeping the pins (and their levels) at indexes that survive. Dropped pins are detached from their wires.
    pub fn set_arity(&mut self, gate: GateKey, arity: usize) -> Result<usize, CircuitError> {
        let g = self.gates.get(gate).ok_or(CircuitError::NoSuchGate(gate))?;
        let arity = g.kind.clamp_arity(arity);
        let current = g.inputs.len();

        if arity < current {
            let dropped = g.inputs[arity..].to_vec();
            self.detach_pins(&dropped);
            for pin in dropped {
                self.pins.remove(pin);
            }
            self.gates[gate].inputs.truncate(arity);
        } else {
            for i in current..arity {
                let pin = self.pins.insert(Pin { level: LogicValue::Low, owner: PinOwner::GateInput(gate, i) });
                self.gates[gate].inputs.push(pin);
            }
        }

        Ok(arity)
    }

    /// Removes a gate and its pins, detaching them from their wires.
    pub fn remove_gate(&mut self, gate: GateKey) -> Result<Gate, CircuitError> {
        let g = self.gates.remove(gate).ok_or(CircuitError::NoSuchGate(gate))?;
        let mut owned = g.inputs.clone();
        owned.push(g.output);
        self.detach_pins(&owned);
        for pin in owned {
            self.pins.remove(pin);
        }
        Ok(g)
    }

    // sources and sinks {{{1
    pub fn add_source(&mut self, level: LogicValue) -> SourceKey {
        let Circuit { sources, pins, .. } = self;
        sources.insert_with_key(|sk| Source { output: pins.insert(Pin { level, owner: PinOwner::Source(sk) }) })
    }

    pub fn set_source(&mut self, source: SourceKey, level: LogicValue) -> Result<(), CircuitError> {
        let s = self.sources.get(source).ok_or(CircuitError::NoSuchSource(source))?;
        self.pins[s.output].level = level;
        Ok(())
    }

    /// Flips a source between LOW and HIGH and returns the new level. A source that is not HIGH becomes HIGH.
    pub fn toggle_source(&mut self, source: SourceKey) -> Result<LogicValue, CircuitError> {
        let s = self.sources.get(source).ok_or(CircuitError::NoSuchSource(source))?;
        let pin = &mut self.pins[s.output];
        pin.level = if pin.level == LogicValue::High { LogicValue::Low } else { LogicValue::High };
        Ok(pin.level)
    }

    pub fn remove_source(&mut self, source: SourceKey) -> Result<(), CircuitError> {
        let s = self.sources.remove(source).ok_or(CircuitError::NoSuchSource(source))?;
        self.detach_pins(&[s.output]);
        self.pins.remove(s.output);
        Ok(())
    }

    pub fn add_sink(&mut self) -> SinkKey {
        let Circuit { sinks, pins, .. } = self;
        sinks.insert_with_key(|sk| Sink { input: pins.insert(Pin { level: LogicValue::Low, owner: PinOwner::Sink(sk) }) })
    }

    pub fn remove_sink(&mut self, sink: SinkKey) -> Result<(), CircuitError> {
        let s = self.sinks.remove(sink).ok_or(CircuitError::NoSuchSink(sink))?;
        self.detach_pins(&[s.input]);
        self.pins.remove(s.input);
        Ok(())
    }

    // wires {{{1
    /// Adds a wire from `drivers` (output pins) to `destinations` (input pins). Nothing is changed if any pin is rejected.
    pub fn add_wire(&mut self, drivers: &[PinKey], destinations: &[PinKey]) -> Result<WireKey, CircuitError> {
        let mut unique_drivers = Vec::with_capacity(drivers.len());
        for driver in drivers {
            self.check_driver(*driver)?;
            if !unique_drivers.contains(driver) {
                unique_drivers.push(*driver);
            }
        }
        let mut unique_destinations = Vec::with_capacity(destinations.len());
        for destination in destinations {
            self.check_destination(*destination)?;
            if !unique_destinations.contains(destination) {
                unique_destinations.push(*destination);
            }
        }

        let wire = self.wires.insert(Wire { drivers: unique_drivers, destinations: unique_destinations, level: LogicValue::HiZ });
        for destination in &self.wires[wire].destinations {
            self.incoming.insert(*destination, wire);
        }
        Ok(wire)
    }

    pub fn connect_driver(&mut self, wire: WireKey, pin: PinKey) -> Result<(), CircuitError> {
        if !self.wires.contains_key(wire) {
            return Err(CircuitError::NoSuchWire(wire));
        }
        self.check_driver(pin)?;
        let drivers = &mut self.wires[wire].drivers;
        if !drivers.contains(&pin) {
            drivers.push(pin);
        }
        Ok(())
    }

    pub fn connect_destination(&mut self, wire: WireKey, pin: PinKey) -> Result<(), CircuitError> {
        if !self.wires.contains_key(wire) {
            return Err(CircuitError::NoSuchWire(wire));
        }
        if self.incoming.get(pin) == Some(&wire) {
            return Ok(());
        }
        self.check_destination(pin)?;
        self.wires[wire].destinations.push(pin);
        self.incoming.insert(pin, wire);
        Ok(())
    }

    /// Detaches a pin from every wire referencing it, leaving the wires in place.
    pub fn disconnect(&mut self, pin: PinKey) -> Result<(), CircuitError> {
        if !self.pins.contains_key(pin) {
            return Err(CircuitError::NoSuchPin(pin));
        }
        for (_, wire) in self.wires.iter_mut() {
            wire.drivers.retain(|p| *p != pin);
            wire.destinations.retain(|p| *p != pin);
        }
        self.incoming.remove(pin);
        Ok(())
    }

    pub fn remove_wire(&mut self, wire: WireKey) -> Result<Wire, CircuitError> {
        let w = self.wires.remove(wire).ok_or(CircuitError::NoSuchWire(wire))?;
        for destination in &w.destinations {
            self.incoming.remove(*destination);
        }
        Ok(w)
    }

    /// Takes `pins` off every wire they are on. A wire left without drivers or without destinations connects nothing and is removed.
    fn detach_pins(&mut self, pins: &[PinKey]) {
        let mut emptied = Vec::new();
        for (wk, wire) in self.wires.iter_mut() {
            if !pins.iter().any(|p| wire.touches(*p)) {
                continue;
            }
            wire.drivers.retain(|p| !pins.contains(p));
            wire.destinations.retain(|p| !pins.contains(p));
            if wire.drivers.is_empty() || wire.destinations.is_empty() {
                emptied.push(wk);
            }
        }
        for pin in pins {
            self.incoming.remove(*pin);
        }
        for wire in emptied {
            // only just collected so it has to exist
            let _ = self.remove_wire(wire);
        }
    }

    fn check_driver(&self, pin: PinKey) -> Result<(), CircuitError> {
        let p = self.pins.get(pin).ok_or(CircuitError::NoSuchPin(pin))?;
        if p.owner.is_driver() {
            Ok(())
        } else {
            Err(CircuitError::NotADriver(pin))
        }
    }

    fn check_destination(&self, pin: PinKey) -> Result<(), CircuitError> {
        let p = self.pins.get(pin).ok_or(CircuitError::NoSuchPin(pin))?;
        if p.owner.is_driver() {
            return Err(CircuitError::NotADestination(pin));
        }
        match self.incoming.get(pin) {
            Some(wire) => Err(CircuitError::InputAlreadyWired { pin, wire: *wire }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{settle, Circuit, GateKind, LogicValue, PinOwner, SettleConfig};
    use crate::error::CircuitError;

    #[test]
    fn add_gate_clamps_and_initializes() {
        let mut c = Circuit::new();
        let nand = c.add_gate(GateKind::Nand, 12);
        assert_eq!(c.gate(nand).unwrap().arity(), 8);
        assert_eq!(c.gate_output_level(nand), Some(LogicValue::High));
        assert_eq!(c.gate_input_levels(nand).unwrap(), vec![LogicValue::Low; 8]);

        let not = c.add_gate(GateKind::Not, 3);
        assert_eq!(c.gate(not).unwrap().arity(), 1);
        let input = c.gate(not).unwrap().inputs()[0];
        assert_eq!(c.pin(input).unwrap().owner(), PinOwner::GateInput(not, 0));
    }

    #[test]
    fn set_arity_keeps_levels_by_index() {
        let mut c = Circuit::new();
        let and = c.add_gate(GateKind::And, 3);
        let first = c.gate(and).unwrap().inputs()[0];
        c.pins[first].level = LogicValue::High;

        assert_eq!(c.set_arity(and, 5), Ok(5));
        let inputs = c.gate(and).unwrap().inputs().to_vec();
        assert_eq!(inputs.len(), 5);
        assert_eq!(inputs[0], first);
        assert_eq!(c.pin_level(first), Some(LogicValue::High));
        assert_eq!(c.pin(inputs[4]).unwrap().owner(), PinOwner::GateInput(and, 4));
    }

    #[test]
    fn shrinking_arity_drops_wires() {
        let mut c = Circuit::new();
        let s = c.add_source(LogicValue::High);
        let and = c.add_gate(GateKind::And, 3);
        let third = c.gate(and).unwrap().inputs()[2];
        let kept = c.add_wire(&[c.source(s).unwrap().output()], &[c.gate(and).unwrap().inputs()[0]]).unwrap();
        let dropped = c.add_wire(&[c.source(s).unwrap().output()], &[third]).unwrap();

        assert_eq!(c.set_arity(and, 2), Ok(2));
        assert!(c.wire(kept).is_some());
        assert!(c.wire(dropped).is_none());
        assert!(c.pin(third).is_none());
        assert_eq!(c.incoming_wire(third), None);
    }

    #[test]
    fn remove_gate_removes_its_wires() {
        let mut c = Circuit::new();
        let s = c.add_source(LogicValue::Low);
        let light = c.add_sink();
        let not = c.add_gate(GateKind::Not, 1);
        let w_in = c.add_wire(&[c.source(s).unwrap().output()], &[c.gate(not).unwrap().inputs()[0]]).unwrap();
        let w_out = c.add_wire(&[c.gate(not).unwrap().output()], &[c.sink(light).unwrap().input()]).unwrap();

        c.remove_gate(not).unwrap();
        assert!(c.wire(w_in).is_none());
        assert!(c.wire(w_out).is_none());
        assert_eq!(c.pins.len(), 2);
        assert_eq!(c.remove_gate(not).unwrap_err(), CircuitError::NoSuchGate(not));
        // the sink input is free again
        let s_out = c.source(s).unwrap().output();
        assert!(c.add_wire(&[s_out], &[c.sink(light).unwrap().input()]).is_ok());
    }

    #[test]
    fn wiring_rules() {
        let mut c = Circuit::new();
        let a = c.add_source(LogicValue::Low);
        let b = c.add_source(LogicValue::High);
        let not = c.add_gate(GateKind::Not, 1);
        let a_out = c.source(a).unwrap().output();
        let b_out = c.source(b).unwrap().output();
        let not_in = c.gate(not).unwrap().inputs()[0];
        let not_out = c.gate(not).unwrap().output();

        assert_eq!(c.add_wire(&[not_in], &[]), Err(CircuitError::NotADriver(not_in)));
        assert_eq!(c.add_wire(&[a_out], &[b_out]), Err(CircuitError::NotADestination(b_out)));

        let w = c.add_wire(&[a_out, b_out, a_out], &[not_in]).unwrap();
        assert_eq!(c.wire(w).unwrap().drivers(), &[a_out, b_out]);
        assert_eq!(c.add_wire(&[not_out], &[not_in]), Err(CircuitError::InputAlreadyWired { pin: not_in, wire: w }));

        c.disconnect(not_in).unwrap();
        assert!(c.wire(w).unwrap().destinations().is_empty());
        c.connect_destination(w, not_in).unwrap();
        assert_eq!(c.incoming_wire(not_in), Some(w));
    }

    #[test]
    fn set_arity_on_unary_gates() {
        let mut c = Circuit::new();
        let s = c.add_source(LogicValue::High);
        let buffer = c.add_gate(GateKind::Buffer, 1);
        let not = c.add_gate(GateKind::Not, 1);
        let w = c.add_wire(&[c.source(s).unwrap().output()], &[c.gate(not).unwrap().inputs()[0]]).unwrap();

        assert_eq!(c.set_arity(buffer, 3), Ok(1));
        assert_eq!(c.gate(buffer).unwrap().arity(), 1);
        assert_eq!(c.set_arity(not, 0), Ok(1));
        assert_eq!(c.wire(w).unwrap().destinations(), c.gate(not).unwrap().inputs());
    }

    #[test]
    fn growing_arity_keeps_wires() {
        let mut c = Circuit::new();
        let a = c.add_source(LogicValue::High);
        let b = c.add_source(LogicValue::High);
        let and = c.add_gate(GateKind::And, 2);
        let inputs = c.gate(and).unwrap().inputs().to_vec();
        let wa = c.add_wire(&[c.source(a).unwrap().output()], &[inputs[0]]).unwrap();
        let wb = c.add_wire(&[c.source(b).unwrap().output()], &[inputs[1]]).unwrap();
        settle(&mut c, &SettleConfig::default());
        assert_eq!(c.gate_output_level(and), Some(LogicValue::High));

        assert_eq!(c.set_arity(and, 3), Ok(3));
        assert_eq!(c.incoming_wire(inputs[0]), Some(wa));
        assert_eq!(c.incoming_wire(inputs[1]), Some(wb));
        assert_eq!(c.wire(wa).unwrap().destinations(), &[inputs[0]]);

        // the new input is unwired, so it floats
        settle(&mut c, &SettleConfig::default());
        assert_eq!(c.gate_output_level(and), Some(LogicValue::HiZ));
        let third = c.gate(and).unwrap().inputs()[2];
        c.connect_destination(wb, third).unwrap();
        settle(&mut c, &SettleConfig::default());
        assert_eq!(c.gate_output_level(and), Some(LogicValue::High));
    }

    #[test]
    fn removing_a_gate_keeps_shared_nets() {
        let mut c = Circuit::new();
        let s = c.add_source(LogicValue::High);
        let kept = c.add_gate(GateKind::Buffer, 1);
        let removed = c.add_gate(GateKind::Buffer, 1);
        let light = c.add_sink();
        let kept_in = c.gate(kept).unwrap().inputs()[0];
        let net = c.add_wire(&[c.source(s).unwrap().output()], &[kept_in, c.gate(removed).unwrap().inputs()[0]]).unwrap();
        let removed_out = c.add_wire(&[c.gate(removed).unwrap().output()], &[]).unwrap();
        c.add_wire(&[c.gate(kept).unwrap().output()], &[c.sink(light).unwrap().input()]).unwrap();
        settle(&mut c, &SettleConfig::default());
        assert_eq!(c.sink_level(light), Some(LogicValue::High));

        c.remove_gate(removed).unwrap();
        assert_eq!(c.wire(net).unwrap().destinations(), &[kept_in]);
        assert!(c.wire(removed_out).is_none());
        settle(&mut c, &SettleConfig::default());
        assert_eq!(c.sink_level(light), Some(LogicValue::High));
    }

    #[test]
    fn remove_source_and_sink() {
        let mut c = Circuit::new();
        let s = c.add_source(LogicValue::High);
        let not = c.add_gate(GateKind::Not, 1);
        let light = c.add_sink();
        let not_in = c.gate(not).unwrap().inputs()[0];
        let light_in = c.sink(light).unwrap().input();
        let w = c.add_wire(&[c.source(s).unwrap().output()], &[not_in, light_in]).unwrap();

        c.remove_sink(light).unwrap();
        assert!(c.sink(light).is_none());
        assert!(c.pin(light_in).is_none());
        assert_eq!(c.incoming_wire(light_in), None);
        assert_eq!(c.wire(w).unwrap().destinations(), &[not_in]);
        assert_eq!(c.remove_sink(light), Err(CircuitError::NoSuchSink(light)));

        // the wire loses its only driver
        c.remove_source(s).unwrap();
        assert!(c.source(s).is_none());
        assert!(c.wire(w).is_none());
        assert_eq!(c.incoming_wire(not_in), None);
        assert_eq!(c.remove_source(s), Err(CircuitError::NoSuchSource(s)));
        assert_eq!(c.pins.len(), 2);
    }

    #[test]
    fn connect_driver() {
        let mut c = Circuit::new();
        let a = c.add_source(LogicValue::Low);
        let b = c.add_source(LogicValue::High);
        let light = c.add_sink();
        let a_out = c.source(a).unwrap().output();
        let b_out = c.source(b).unwrap().output();
        let light_in = c.sink(light).unwrap().input();
        let w = c.add_wire(&[a_out], &[light_in]).unwrap();

        c.connect_driver(w, b_out).unwrap();
        c.connect_driver(w, b_out).unwrap();
        assert_eq!(c.wire(w).unwrap().drivers(), &[a_out, b_out]);
        assert_eq!(c.connect_driver(w, light_in), Err(CircuitError::NotADriver(light_in)));
        settle(&mut c, &SettleConfig::default());
        assert_eq!(c.sink_level(light), Some(LogicValue::Conflict));

        c.remove_wire(w).unwrap();
        assert_eq!(c.connect_driver(w, a_out), Err(CircuitError::NoSuchWire(w)));
    }

    #[test]
    fn toggle() {
        let mut c = Circuit::new();
        let s = c.add_source(LogicValue::HiZ);
        assert_eq!(c.toggle_source(s), Ok(LogicValue::High));
        assert_eq!(c.toggle_source(s), Ok(LogicValue::Low));
        assert_eq!(c.source_level(s), Some(LogicValue::Low));
    }
}
