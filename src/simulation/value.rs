use std::fmt;

/// Level carried by a pin or a wire.
///
/// `HiZ` is an undriven (floating) signal and `Conflict` is what a wire carries when its drivers disagree.
#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug, Default)]
pub enum LogicValue {
    #[default]
    Low,
    High,
    HiZ,
    Conflict,
}

impl LogicValue {
    pub const ALL: [LogicValue; 4] = [LogicValue::Low, LogicValue::High, LogicValue::HiZ, LogicValue::Conflict];

    pub fn is_determinate(self) -> bool {
        matches!(self, LogicValue::Low | LogicValue::High)
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            LogicValue::Low => Some(false),
            LogicValue::High => Some(true),
            LogicValue::HiZ | LogicValue::Conflict => None,
        }
    }

    /// Swaps LOW and HIGH, leaves the other two alone.
    pub fn invert(self) -> LogicValue {
        match self {
            LogicValue::Low => LogicValue::High,
            LogicValue::High => LogicValue::Low,
            other => other,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LogicValue::Low => "low",
            LogicValue::High => "high",
            LogicValue::HiZ => "hi-z",
            LogicValue::Conflict => "conflict",
        }
    }

    pub fn parse(name: &str) -> Option<LogicValue> {
        match &*name.to_ascii_lowercase() {
            "low" | "0" | "false" => Some(LogicValue::Low),
            "high" | "1" | "true" => Some(LogicValue::High),
            "hi-z" | "hiz" | "z" => Some(LogicValue::HiZ),
            "conflict" | "x" => Some(LogicValue::Conflict),
            _ => None,
        }
    }
}

impl From<bool> for LogicValue {
    fn from(b: bool) -> Self {
        if b {
            LogicValue::High
        } else {
            LogicValue::Low
        }
    }
}

impl fmt::Display for LogicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogicValue::Low => "0",
            LogicValue::High => "1",
            LogicValue::HiZ => "Z",
            LogicValue::Conflict => "X",
        })
    }
}
