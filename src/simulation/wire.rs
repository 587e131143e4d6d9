use crate::simulation::LogicValue;

/// Level of a wire given the levels of every output pin driving it.
///
/// HI_Z drivers do not assert anything and are ignored. No asserting drivers leaves the wire floating; asserting drivers that all agree give
/// their common level; any disagreement (including an asserting CONFLICT against anything else) is CONFLICT. The result does not depend on
/// the order of `drivers`.
pub fn calculate_state(drivers: &[LogicValue]) -> LogicValue {
    drivers.iter().copied().filter(|v| *v != LogicValue::HiZ).fold(LogicValue::HiZ, combine)
}

pub fn detect_conflict(drivers: &[LogicValue]) -> bool {
    calculate_state(drivers) == LogicValue::Conflict
}

// HiZ is the identity and Conflict absorbs, which keeps the fold commutative and associative
fn combine(acc: LogicValue, next: LogicValue) -> LogicValue {
    match (acc, next) {
        (LogicValue::HiZ, v) | (v, LogicValue::HiZ) => v,
        (a, b) if a == b => a,
        _ => LogicValue::Conflict,
    }
}
