use std::{fmt, str::FromStr};

use crate::simulation::LogicValue;

pub const MIN_ARITY: usize = 2;
pub const MAX_ARITY: usize = 8;

const VERTICAL_VALUE_SPACING: f64 = 20.0;
const GATE_WIDTH: f64 = 50.0;

#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug)]
pub enum GateKind {
    And,
    Or,
    Nand,
    Nor,
    Xor,
    Xnor,
    Buffer,
    Not,
}

impl GateKind {
    pub const ALL: [GateKind; 8] = [GateKind::And, GateKind::Or, GateKind::Nand, GateKind::Nor, GateKind::Xor, GateKind::Xnor, GateKind::Buffer, GateKind::Not];

    pub fn name(self) -> &'static str {
        match self {
            GateKind::And => "and",
            GateKind::Or => "or",
            GateKind::Nand => "nand",
            GateKind::Nor => "nor",
            GateKind::Xor => "xor",
            GateKind::Xnor => "xnor",
            GateKind::Buffer => "buffer",
            GateKind::Not => "not",
        }
    }

    pub fn is_unary(self) -> bool {
        matches!(self, GateKind::Buffer | GateKind::Not)
    }

    /// Arity a freshly placed gate of this kind gets.
    pub fn default_arity(self) -> usize {
        if self.is_unary() {
            1
        } else {
            MIN_ARITY
        }
    }

    /// Forces `arity` into the range this kind supports: 1 for BUFFER and NOT, `MIN_ARITY..=MAX_ARITY` for everything else.
    pub fn clamp_arity(self, arity: usize) -> usize {
        if self.is_unary() {
            1
        } else {
            arity.clamp(MIN_ARITY, MAX_ARITY)
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown gate kind '{0}'")]
pub struct UnknownGateKind(pub String);

impl FromStr for GateKind {
    type Err = UnknownGateKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        GateKind::ALL.into_iter().find(|k| k.name() == lower || (lower == "buf" && *k == GateKind::Buffer)).ok_or_else(|| UnknownGateKind(s.to_string()))
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name().to_ascii_uppercase())
    }
}

/// Output of a gate of the given kind for the given input levels.
///
/// Any CONFLICT input makes the output CONFLICT, otherwise any HI_Z input makes it HI_Z. Only fully determinate inputs go through boolean
/// evaluation. XNOR over all-LOW inputs is HIGH because zero HIGH inputs is an even count.
pub fn evaluate(kind: GateKind, inputs: &[LogicValue]) -> LogicValue {
    if inputs.contains(&LogicValue::Conflict) {
        return LogicValue::Conflict;
    }
    if inputs.contains(&LogicValue::HiZ) {
        return LogicValue::HiZ;
    }

    let highs = inputs.iter().filter(|v| **v == LogicValue::High).count();
    let all_high = highs == inputs.len();
    let any_high = highs > 0;

    match kind {
        GateKind::And => all_high.into(),
        GateKind::Or => any_high.into(),
        GateKind::Nand => (!all_high).into(),
        GateKind::Nor => (!any_high).into(),
        GateKind::Xor => (highs % 2 == 1).into(),
        GateKind::Xnor => (highs % 2 == 0).into(),
        GateKind::Buffer => inputs.first().copied().unwrap_or(LogicValue::HiZ),
        GateKind::Not => inputs.first().copied().map(LogicValue::invert).unwrap_or(LogicValue::HiZ),
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct PinSlot {
    pub name: String,
    /// Vertical offset of the pin from the top edge of the gate body.
    pub y: f64,
}

#[derive(Clone, PartialEq, Debug)]
pub struct PinLayout {
    pub width: f64,
    pub height: f64,
    pub inputs: Vec<PinSlot>,
    pub output: PinSlot,
}

fn centered_y(center_y: f64, num_args: usize, i: usize) -> f64 {
    let args_height: f64 = (num_args.saturating_sub(1) as f64) * VERTICAL_VALUE_SPACING;
    let args_start_y = center_y - (args_height / 2.0);
    args_start_y + (i as f64) * VERTICAL_VALUE_SPACING
}

pub fn input_pin_name(index: usize) -> String {
    // arity never goes past 8 so this stays within the alphabet
    char::from(b'A' + index as u8).to_string()
}

pub const OUTPUT_PIN_NAME: &str = "Y";

/// Pin names and positions for any gate; the same for every kind, only the arity matters.
pub fn pin_layout(kind: GateKind, arity: usize) -> PinLayout {
    let arity = kind.clamp_arity(arity);
    // one spacing of padding above and below the outermost pins
    let height = (arity - 1 + 2) as f64 * VERTICAL_VALUE_SPACING;
    let center = height / 2.0;

    PinLayout {
        width: GATE_WIDTH,
        height,
        inputs: (0..arity).map(|i| PinSlot { name: input_pin_name(i), y: centered_y(center, arity, i) }).collect(),
        output: PinSlot { name: OUTPUT_PIN_NAME.to_string(), y: center },
    }
}

#[cfg(test)]
mod test {
    use super::{evaluate, pin_layout, GateKind};
    use crate::simulation::LogicValue::{self, *};

    #[test]
    fn boolean_tables() {
        assert_eq!(evaluate(GateKind::And, &[High, High]), High);
        assert_eq!(evaluate(GateKind::And, &[High, Low]), Low);
        assert_eq!(evaluate(GateKind::Or, &[Low, Low]), Low);
        assert_eq!(evaluate(GateKind::Or, &[High, Low]), High);
        assert_eq!(evaluate(GateKind::Xor, &[High, Low]), High);
        assert_eq!(evaluate(GateKind::Xor, &[High, High]), Low);
        assert_eq!(evaluate(GateKind::Xor, &[High, High, High]), High);
        assert_eq!(evaluate(GateKind::Xnor, &[Low, Low, Low]), High);
        assert_eq!(evaluate(GateKind::Xnor, &[High, Low, Low]), Low);
        assert_eq!(evaluate(GateKind::Buffer, &[High]), High);
        assert_eq!(evaluate(GateKind::Not, &[High]), Low);
        assert_eq!(evaluate(GateKind::Not, &[Low]), High);
    }

    #[test]
    fn negated_kinds() {
        for inputs in crate::utils::enumerate_inputs(3) {
            assert_eq!(evaluate(GateKind::Nand, &inputs), evaluate(GateKind::And, &inputs).invert());
            assert_eq!(evaluate(GateKind::Nor, &inputs), evaluate(GateKind::Or, &inputs).invert());
            assert_eq!(evaluate(GateKind::Xnor, &inputs), evaluate(GateKind::Xor, &inputs).invert());
        }
    }

    #[test]
    fn conflict_beats_hi_z() {
        for kind in GateKind::ALL {
            let arity = kind.default_arity();
            for other in LogicValue::ALL {
                let mut with_conflict = vec![other; arity];
                with_conflict[0] = Conflict;
                assert_eq!(evaluate(kind, &with_conflict), Conflict, "{kind} {with_conflict:?}");

                if other != Conflict {
                    let mut with_hi_z = vec![other; arity];
                    with_hi_z[arity - 1] = HiZ;
                    assert_eq!(evaluate(kind, &with_hi_z), HiZ, "{kind} {with_hi_z:?}");
                }
            }
        }
    }

    #[test]
    fn arity_clamping() {
        assert_eq!(GateKind::And.clamp_arity(0), 2);
        assert_eq!(GateKind::And.clamp_arity(5), 5);
        assert_eq!(GateKind::Or.clamp_arity(20), 8);
        assert_eq!(GateKind::Not.clamp_arity(4), 1);
        assert_eq!(GateKind::Buffer.clamp_arity(0), 1);
    }

    #[test]
    fn parse_kind() {
        assert_eq!("XNOR".parse::<GateKind>().unwrap(), GateKind::Xnor);
        assert_eq!("buf".parse::<GateKind>().unwrap(), GateKind::Buffer);
        assert!("mux".parse::<GateKind>().is_err());
    }

    #[test]
    fn layout_is_centered() {
        let layout = pin_layout(GateKind::And, 3);
        assert_eq!(layout.inputs.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(), ["A", "B", "C"]);
        assert_eq!(layout.height, 80.0);
        assert_eq!(layout.inputs[1].y, layout.output.y);
        assert_eq!(layout.inputs[0].y, 20.0);
        assert_eq!(layout.inputs[2].y, 60.0);

        let not = pin_layout(GateKind::Not, 1);
        assert_eq!(not.inputs.len(), 1);
        assert_eq!(not.inputs[0].y, not.output.y);
    }
}
