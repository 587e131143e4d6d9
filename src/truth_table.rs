use std::time::SystemTime;

use crate::{
    error::InvalidSpec,
    simulation::{evaluate, pin_layout, Circuit, GateKey, GateKind, LogicValue},
    utils,
};

pub const MAX_INPUTS: usize = 10;

/// What a truth table is generated from: a gate kind and the names of its pins.
#[derive(Clone, PartialEq, Debug)]
pub struct GateSpec {
    pub gate: Option<GateKey>,
    pub kind: GateKind,
    pub input_names: Vec<String>,
    pub output_names: Vec<String>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Row {
    /// Row index in binary, zero padded to the number of inputs.
    pub id: String,
    pub inputs: Vec<LogicValue>,
    pub output: LogicValue,
    pub is_current: bool,
}

#[derive(Clone, PartialEq, Debug)]
pub struct TruthTable {
    pub gate: Option<GateKey>,
    pub kind: GateKind,
    pub input_names: Vec<String>,
    pub output_name: String,
    pub rows: Vec<Row>,
    /// Only for telling cached tables apart; rows never depend on it.
    pub generated_at: SystemTime,
}

impl GateSpec {
    /// Spec for a free-standing gate of the given kind, named the way the pin layout names its pins.
    pub fn for_kind(kind: GateKind, arity: usize) -> GateSpec {
        let layout = pin_layout(kind, arity);
        GateSpec { gate: None, kind, input_names: layout.inputs.into_iter().map(|p| p.name).collect(), output_names: vec![layout.output.name] }
    }

    pub fn for_gate(circuit: &Circuit, gate: GateKey) -> Option<GateSpec> {
        let g = circuit.gate(gate)?;
        Some(GateSpec { gate: Some(gate), ..GateSpec::for_kind(g.kind(), g.arity()) })
    }
}

pub fn validate(input_count: usize, output_count: usize) -> Result<(), InvalidSpec> {
    if input_count == 0 {
        return Err(InvalidSpec::NoInputs);
    }
    if input_count > MAX_INPUTS {
        return Err(InvalidSpec::TooManyInputs { got: input_count, max: MAX_INPUTS });
    }
    if output_count != 1 {
        return Err(InvalidSpec::OutputCount(output_count));
    }
    Ok(())
}

/// Evaluates the gate on every LOW/HIGH combination of its inputs, in increasing binary order with the first input as the most significant
/// bit.
pub fn generate(spec: &GateSpec) -> Result<TruthTable, InvalidSpec> {
    validate(spec.input_names.len(), spec.output_names.len())?;
    let width = spec.input_names.len();

    let rows = utils::enumerate_inputs(width)
        .into_iter()
        .enumerate()
        .map(|(index, inputs)| {
            let output = evaluate(spec.kind, &inputs);
            Row { id: utils::binary_id(index, width), inputs, output, is_current: false }
        })
        .collect();

    tracing::debug!(kind = %spec.kind, inputs = width, "generated truth table");

    Ok(TruthTable { gate: spec.gate, kind: spec.kind, input_names: spec.input_names.clone(), output_name: spec.output_names[0].clone(), rows, generated_at: SystemTime::now() })
}

impl TruthTable {
    /// Marks the row whose inputs equal `live_inputs` as current and clears every other row. Inputs that are HI_Z or CONFLICT (or the wrong
    /// number of inputs) match no row, so nothing is marked.
    pub fn update_current_row(&mut self, live_inputs: &[LogicValue]) -> Option<usize> {
        let current = row_index(live_inputs).filter(|i| self.rows.get(*i).is_some_and(|row| row.inputs == live_inputs));
        for (i, row) in self.rows.iter_mut().enumerate() {
            row.is_current = Some(i) == current;
        }
        current
    }

    /// Same as [`TruthTable::update_current_row`], reading the live inputs from the gate this table was generated for.
    pub fn refresh(&mut self, circuit: &Circuit) -> Option<usize> {
        let live = self.gate.and_then(|g| circuit.gate_input_levels(g)).unwrap_or_default();
        self.update_current_row(&live)
    }

    pub fn current_row(&self) -> Option<&Row> {
        self.rows.iter().find(|row| row.is_current)
    }
}

fn row_index(inputs: &[LogicValue]) -> Option<usize> {
    inputs.iter().try_fold(0usize, |acc, v| Some((acc << 1) | usize::from(v.as_bool()?)))
}
