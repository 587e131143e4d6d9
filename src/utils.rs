use crate::simulation::LogicValue;

/// Every LOW/HIGH combination of `arity` inputs, counting up in binary with the first input as the most significant bit.
pub(crate) fn enumerate_inputs(arity: usize) -> Vec<Vec<LogicValue>> {
    let mut inputs = vec![vec![]];
    for _ in 0..arity {
        let mut inputs_low = inputs.clone();
        let mut inputs_high = inputs;

        inputs_low.iter_mut().for_each(|i| i.insert(0, LogicValue::Low));
        inputs_high.iter_mut().for_each(|i| i.insert(0, LogicValue::High));

        inputs = inputs_low;
        inputs.extend(inputs_high);
    }
    inputs
}

/// `index` in binary, zero padded to `width` digits.
pub(crate) fn binary_id(index: usize, width: usize) -> String {
    format!("{index:0width$b}")
}
