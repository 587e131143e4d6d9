use json::JsonValue;

use crate::{
    error::ConfigError,
    simulation::SettleConfig,
    timing::{DelayMode, TimingConfig},
};

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Config {
    pub settle: SettleConfig,
    pub timing: TimingConfig,
}

impl Config {
    pub fn load(filename: &str) -> Result<Config, ConfigError> {
        Config::parse(&std::fs::read_to_string(filename)?)
    }

    /// Reads a config document such as
    /// `{"max_iterations": 10, "timing": {"mode": "smooth", "smooth_mode_delay": 300, "speed": 1.0, "realistic_scale_factor": 50000000}}`.
    /// Missing keys keep their defaults.
    pub fn parse(contents: &str) -> Result<Config, ConfigError> {
        let document = json::parse(contents)?;
        if !document.is_object() {
            return Err(ConfigError::WrongType { key: "<toplevel>", expected: "an object" });
        }

        let mut config = Config::default();
        if optional_number(&document, "max_iterations")?.is_some() {
            config.settle.max_iterations = document["max_iterations"].as_usize().ok_or(ConfigError::WrongType { key: "max_iterations", expected: "a non-negative integer" })?;
        }

        let timing = &document["timing"];
        if !timing.is_null() {
            if !timing.is_object() {
                return Err(ConfigError::WrongType { key: "timing", expected: "an object" });
            }
            if let Some(mode) = optional_string(timing, "mode")? {
                config.timing.mode = DelayMode::parse(mode).ok_or_else(|| ConfigError::UnknownMode(mode.to_string()))?;
            }
            if let Some(delay) = optional_number(timing, "smooth_mode_delay")? {
                config.timing.smooth_mode_delay = delay;
            }
            if let Some(factor) = optional_number(timing, "realistic_scale_factor")? {
                config.timing.realistic_scale_factor = factor;
            }
            if let Some(speed) = optional_number(timing, "speed")? {
                config.timing.set_speed(speed);
            }
        }

        tracing::debug!(?config, "loaded config");
        Ok(config)
    }
}

fn optional_number(object: &JsonValue, key: &'static str) -> Result<Option<f64>, ConfigError> {
    match &object[key] {
        JsonValue::Null => Ok(None),
        value => value.as_f64().map(Some).ok_or(ConfigError::WrongType { key, expected: "a number" }),
    }
}

fn optional_string<'v>(object: &'v JsonValue, key: &'static str) -> Result<Option<&'v str>, ConfigError> {
    match &object[key] {
        JsonValue::Null => Ok(None),
        value => value.as_str().map(Some).ok_or(ConfigError::WrongType { key, expected: "a string" }),
    }
}
