use thiserror::Error;

use crate::simulation::{GateKey, PinKey, SinkKey, SourceKey, WireKey};

/// Bad edit requested of a [`Circuit`](crate::simulation::Circuit).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CircuitError {
    #[error("gate {0:?} does not exist")]
    NoSuchGate(GateKey),
    #[error("pin {0:?} does not exist")]
    NoSuchPin(PinKey),
    #[error("wire {0:?} does not exist")]
    NoSuchWire(WireKey),
    #[error("source {0:?} does not exist")]
    NoSuchSource(SourceKey),
    #[error("sink {0:?} does not exist")]
    NoSuchSink(SinkKey),
    #[error("pin {0:?} is an input pin and cannot drive a wire")]
    NotADriver(PinKey),
    #[error("pin {0:?} is an output pin and cannot receive a wire")]
    NotADestination(PinKey),
    #[error("input pin {pin:?} is already fed by wire {wire:?}")]
    InputAlreadyWired { pin: PinKey, wire: WireKey },
}

/// Gate shape that cannot be turned into a truth table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidSpec {
    #[error("a truth table needs at least one input")]
    NoInputs,
    #[error("a truth table supports at most {max} inputs, got {got}")]
    TooManyInputs { got: usize, max: usize },
    #[error("a truth table needs exactly one output, got {0}")]
    OutputCount(usize),
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid json: {0}")]
    Json(#[from] json::Error),
    #[error("{0}")]
    Format(String),
    #[error("pin number {0} is used more than once")]
    DuplicatePin(usize),
    #[error("pin number {0} does not name any pin")]
    UnknownPin(usize),
    #[error(transparent)]
    Circuit(#[from] CircuitError),
}

impl From<&str> for ImportError {
    fn from(message: &str) -> Self {
        ImportError::Format(message.to_string())
    }
}
impl From<String> for ImportError {
    fn from(message: String) -> Self {
        ImportError::Format(message)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid json: {0}")]
    Json(#[from] json::Error),
    #[error("config key '{key}' must be {expected}")]
    WrongType { key: &'static str, expected: &'static str },
    #[error("unknown delay mode '{0}'")]
    UnknownMode(String),
}
