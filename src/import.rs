use std::collections::HashMap;

use json::JsonValue;

use crate::{
    error::ImportError,
    simulation::{Circuit, GateKey, GateKind, LogicValue, PinKey, SinkKey, SourceKey},
};

/// A circuit read from a JSON document, with the numbers the document used for its pins.
pub struct ImportedCircuit {
    pub circuit: Circuit,
    pub pins: HashMap<usize, PinKey>,
    pub sources: Vec<SourceKey>,
    pub gates: Vec<GateKey>,
    pub sinks: Vec<SinkKey>,
}

pub fn import(filename: &str) -> Result<ImportedCircuit, ImportError> {
    let contents = std::fs::read_to_string(filename)?;
    parse(&contents)
}

/// Builds a circuit from a document of the form
///
/// ```json
/// {
///     "sources": [{"output": 0, "level": "high"}],
///     "gates": [{"type": "not", "arity": 1, "inputs": [1], "output": 2}],
///     "sinks": [{"input": 3}],
///     "wires": [{"drivers": [0], "destinations": [1]}, {"drivers": [2], "destinations": [3]}]
/// }
/// ```
///
/// where every pin gets a number that is unique across the document and wires refer to pins by those numbers.
pub fn parse(contents: &str) -> Result<ImportedCircuit, ImportError> {
    let project = json::parse(contents)?;
    let JsonValue::Object(mut project) = project else {
        return Err("toplevel json must be object".into());
    };

    let mut imported = ImportedCircuit { circuit: Circuit::new(), pins: HashMap::new(), sources: Vec::new(), gates: Vec::new(), sinks: Vec::new() };

    for source in take_array(&mut project, "sources")? {
        parse_source(&mut imported, source)?;
    }
    for gate in take_array(&mut project, "gates")? {
        parse_gate(&mut imported, gate)?;
    }
    for sink in take_array(&mut project, "sinks")? {
        parse_sink(&mut imported, sink)?;
    }
    for wire in take_array(&mut project, "wires")? {
        let JsonValue::Object(mut wire) = wire else { return Err("wire must be object".into()) };
        let drivers = pin_numbers(take_array(&mut wire, "drivers")?)?.into_iter().map(|n| lookup(&imported.pins, n)).collect::<Result<Vec<_>, _>>()?;
        let destinations = pin_numbers(take_array(&mut wire, "destinations")?)?.into_iter().map(|n| lookup(&imported.pins, n)).collect::<Result<Vec<_>, _>>()?;
        imported.circuit.add_wire(&drivers, &destinations)?;
    }

    tracing::debug!(sources = imported.sources.len(), gates = imported.gates.len(), sinks = imported.sinks.len(), wires = imported.circuit.wires().count(), "imported circuit");
    Ok(imported)
}

fn parse_source(imported: &mut ImportedCircuit, source: JsonValue) -> Result<(), ImportError> {
    let JsonValue::Object(mut source) = source else { return Err("source must be object".into()) };
    let output = pin_number(&source.remove("output").ok_or("source must have field 'output'")?)?;
    let level = match source.remove("level") {
        Some(level) => {
            let name = level.as_str().ok_or("source level must be string")?;
            LogicValue::parse(name).ok_or_else(|| format!("invalid source level '{name}'"))?
        }
        None => LogicValue::Low,
    };

    let sk = imported.circuit.add_source(level);
    let pin = imported.circuit.source(sk).map(|s| s.output()).ok_or("source vanished while importing")?;
    assign_pin_number(&mut imported.pins, pin, output)?;
    imported.sources.push(sk);
    Ok(())
}

fn parse_gate(imported: &mut ImportedCircuit, gate: JsonValue) -> Result<(), ImportError> {
    let JsonValue::Object(mut gate) = gate else { return Err("gate must be object".into()) };
    let gate_type = gate.remove("type").ok_or("gate must have field 'type'")?;
    let gate_type = gate_type.as_str().ok_or("gate type must be string")?;
    let kind: GateKind = gate_type.parse().map_err(|e: crate::simulation::gate::UnknownGateKind| e.to_string())?;
    let inputs = pin_numbers(take_array(&mut gate, "inputs")?)?;
    let output = pin_number(&gate.remove("output").ok_or("gate must have field 'output'")?)?;
    let arity = match gate.remove("arity") {
        Some(arity) => arity.as_usize().ok_or("gate arity must be a non-negative integer")?,
        None => inputs.len(),
    };

    let gk = imported.circuit.add_gate(kind, arity);
    let g = imported.circuit.gate(gk).ok_or("gate vanished while importing")?;
    if g.arity() != inputs.len() {
        return Err(format!("{kind} gate has {} inputs but {} input pins were numbered", g.arity(), inputs.len()).into());
    }
    let (pins, output_pin) = (g.inputs().to_vec(), g.output());
    for (pin, number) in pins.into_iter().zip(inputs) {
        assign_pin_number(&mut imported.pins, pin, number)?;
    }
    assign_pin_number(&mut imported.pins, output_pin, output)?;
    imported.gates.push(gk);
    Ok(())
}

fn parse_sink(imported: &mut ImportedCircuit, sink: JsonValue) -> Result<(), ImportError> {
    let JsonValue::Object(mut sink) = sink else { return Err("sink must be object".into()) };
    let input = pin_number(&sink.remove("input").ok_or("sink must have field 'input'")?)?;

    let sk = imported.circuit.add_sink();
    let pin = imported.circuit.sink(sk).map(|s| s.input()).ok_or("sink vanished while importing")?;
    assign_pin_number(&mut imported.pins, pin, input)?;
    imported.sinks.push(sk);
    Ok(())
}

// a missing section is the same as an empty one
fn take_array(object: &mut json::object::Object, key: &str) -> Result<Vec<JsonValue>, ImportError> {
    match object.remove(key) {
        None => Ok(Vec::new()),
        Some(JsonValue::Array(items)) => Ok(items),
        Some(_) => Err(format!("'{key}' must be array").into()),
    }
}

fn pin_number(value: &JsonValue) -> Result<usize, ImportError> {
    value.as_usize().ok_or_else(|| "pin number must be a non-negative integer".into())
}

fn pin_numbers(values: Vec<JsonValue>) -> Result<Vec<usize>, ImportError> {
    values.iter().map(pin_number).collect()
}

fn assign_pin_number(pins: &mut HashMap<usize, PinKey>, pin: PinKey, number: usize) -> Result<(), ImportError> {
    if pins.insert(number, pin).is_some() {
        return Err(ImportError::DuplicatePin(number));
    }
    Ok(())
}

fn lookup(pins: &HashMap<usize, PinKey>, number: usize) -> Result<PinKey, ImportError> {
    pins.get(&number).copied().ok_or(ImportError::UnknownPin(number))
}

#[cfg(test)]
mod test {
    use super::parse;
    use crate::{
        error::{CircuitError, ImportError},
        simulation::{settle, LogicValue, SettleConfig},
    };

    const HALF_ADDER: &str = r#"{
        "sources": [{"output": 0, "level": "high"}, {"output": 1, "level": "high"}],
        "gates": [
            {"type": "xor", "inputs": [10, 11], "output": 12},
            {"type": "and", "arity": 2, "inputs": [20, 21], "output": 22}
        ],
        "sinks": [{"input": 30}, {"input": 31}],
        "wires": [
            {"drivers": [0], "destinations": [10, 20]},
            {"drivers": [1], "destinations": [11, 21]},
            {"drivers": [12], "destinations": [30]},
            {"drivers": [22], "destinations": [31]}
        ]
    }"#;

    #[test]
    fn half_adder() {
        let mut imported = parse(HALF_ADDER).unwrap();
        assert_eq!(imported.sources.len(), 2);
        assert_eq!(imported.gates.len(), 2);
        assert_eq!(imported.circuit.wires().count(), 4);

        assert!(settle(&mut imported.circuit, &SettleConfig::default()).converged);
        let levels = |imported: &super::ImportedCircuit| imported.sinks.iter().map(|s| imported.circuit.sink_level(*s).unwrap()).collect::<Vec<_>>();
        assert_eq!(levels(&imported), [LogicValue::Low, LogicValue::High]);

        imported.circuit.toggle_source(imported.sources[0]).unwrap();
        settle(&mut imported.circuit, &SettleConfig::default());
        assert_eq!(levels(&imported), [LogicValue::High, LogicValue::Low]);
    }

    #[test]
    fn missing_sections_are_empty() {
        let imported = parse("{}").unwrap();
        assert_eq!(imported.circuit.gates().count(), 0);
        assert!(imported.pins.is_empty());
    }

    #[test]
    fn errors() {
        assert!(matches!(parse("[]"), Err(ImportError::Format(_))));
        assert!(matches!(parse("{"), Err(ImportError::Json(_))));
        assert!(matches!(parse(r#"{"gates": [{"type": "mux", "inputs": [], "output": 0}]}"#), Err(ImportError::Format(m)) if m.contains("mux")));
        assert!(matches!(parse(r#"{"sources": [{"output": 0}, {"output": 0}]}"#), Err(ImportError::DuplicatePin(0))));
        assert!(matches!(parse(r#"{"wires": [{"drivers": [4], "destinations": []}]}"#), Err(ImportError::UnknownPin(4))));
        assert!(matches!(parse(r#"{"gates": [{"type": "and", "arity": 3, "inputs": [0, 1], "output": 2}]}"#), Err(ImportError::Format(_))));
        assert!(matches!(
            parse(r#"{"sources": [{"output": 0}], "sinks": [{"input": 1}], "wires": [{"drivers": [1], "destinations": [0]}]}"#),
            Err(ImportError::Circuit(CircuitError::NotADriver(_)))
        ));
    }
}
