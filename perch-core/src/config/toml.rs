//! Minimal TOML parser for device configuration
//!
//! Handles only the subset the device configuration needs. It does NOT
//! support the full TOML spec and never allocates.
//!
//! Supported:
//! - `[motion]`, `[limits]`, `[stepper]` section headers
//! - `key = value` pairs with integer or boolean values
//! - Comments (`# ...`), including trailing comments
//!
//! Keys that are not present keep their defaults. Unknown sections and
//! keys are rejected so that typos do not silently fall back to defaults.

use super::device::{ConfigError, DeviceConfig};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header (1-based line number)
    InvalidSection(usize),
    /// Line is not a `key = value` pair
    InvalidLine(usize),
    /// Key is not valid for the current section
    UnknownKey(usize),
    /// Value could not be parsed as the key's type
    InvalidValue(usize),
    /// Parsed configuration failed validation
    Invalid(ConfigError),
}

impl From<ConfigError> for ParseError {
    fn from(e: ConfigError) -> Self {
        ParseError::Invalid(e)
    }
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Motion,
    Limits,
    Stepper,
}

impl DeviceConfig {
    /// Parse a TOML configuration, starting from defaults
    pub fn from_toml(input: &str) -> Result<Self, ParseError> {
        let mut config = DeviceConfig::default();
        let mut section = Section::Root;

        for (index, raw) in input.lines().enumerate() {
            let line_no = index + 1;
            let line = strip_comment(raw).trim();

            if line.is_empty() {
                continue;
            }

            if line.starts_with('[') {
                section = parse_section_header(line).ok_or(ParseError::InvalidSection(line_no))?;
                continue;
            }

            let (key, value) = parse_key_value(line).ok_or(ParseError::InvalidLine(line_no))?;
            apply_value(&mut config, section, key, value, line_no)?;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Remove a trailing `#` comment
fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn parse_section_header(line: &str) -> Option<Section> {
    let name = line.strip_prefix('[')?.strip_suffix(']')?.trim();
    match name {
        "motion" => Some(Section::Motion),
        "limits" => Some(Section::Limits),
        "stepper" => Some(Section::Stepper),
        _ => None,
    }
}

fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse an integer value, accepting `_` digit separators
fn parse_int<T: core::str::FromStr>(value: &str, line_no: usize) -> Result<T, ParseError> {
    let mut digits = [0u8; 24];
    let mut len = 0;
    for byte in value.bytes().filter(|b| *b != b'_') {
        if len == digits.len() {
            return Err(ParseError::InvalidValue(line_no));
        }
        digits[len] = byte;
        len += 1;
    }

    core::str::from_utf8(&digits[..len])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(ParseError::InvalidValue(line_no))
}

fn parse_bool(value: &str, line_no: usize) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue(line_no)),
    }
}

fn apply_value(
    config: &mut DeviceConfig,
    section: Section,
    key: &str,
    value: &str,
    line_no: usize,
) -> Result<(), ParseError> {
    match section {
        Section::Motion => {
            let motion = &mut config.motion;
            match key {
                "pulse_half_period_us" => motion.pulse_half_period_us = parse_int(value, line_no)?,
                "direction_setup_us" => motion.direction_setup_us = parse_int(value, line_no)?,
                "step_ceiling" => motion.step_ceiling = parse_int(value, line_no)?,
                "safety_buffer" => motion.safety_buffer = parse_int(value, line_no)?,
                "calibration_settle_ms" => motion.calibration_settle_ms = parse_int(value, line_no)?,
                "enable_settle_ms" => motion.enable_settle_ms = parse_int(value, line_no)?,
                "idle_poll_ms" => motion.idle_poll_ms = parse_int(value, line_no)?,
                _ => return Err(ParseError::UnknownKey(line_no)),
            }
        }
        Section::Limits => {
            let limits = &mut config.limits;
            match key {
                "retracted_active_low" => limits.retracted_active_low = parse_bool(value, line_no)?,
                "deployed_active_low" => limits.deployed_active_low = parse_bool(value, line_no)?,
                "debounce_reads" => limits.debounce_reads = parse_int(value, line_no)?,
                _ => return Err(ParseError::UnknownKey(line_no)),
            }
        }
        Section::Stepper => {
            let stepper = &mut config.stepper;
            match key {
                "enable_inverted" => stepper.enable_inverted = parse_bool(value, line_no)?,
                "direction_inverted" => stepper.direction_inverted = parse_bool(value, line_no)?,
                _ => return Err(ParseError::UnknownKey(line_no)),
            }
        }
        Section::Root => return Err(ParseError::UnknownKey(line_no)),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use proptest::prelude::*;
    use std::format;

    const FULL_CONFIG: &str = r#"
# Bird blinds on the north window
[motion]
pulse_half_period_us = 400   # faster than default
direction_setup_us = 20
step_ceiling = 60_000
safety_buffer = 150
calibration_settle_ms = 250
enable_settle_ms = 50
idle_poll_ms = 20

[limits]
retracted_active_low = true
deployed_active_low = false
debounce_reads = 3

[stepper]
enable_inverted = false
direction_inverted = true
"#;

    #[test]
    fn test_parse_full_config() {
        let config = DeviceConfig::from_toml(FULL_CONFIG).unwrap();

        assert_eq!(config.motion.pulse_half_period_us, 400);
        assert_eq!(config.motion.direction_setup_us, 20);
        assert_eq!(config.motion.step_ceiling, 60_000);
        assert_eq!(config.motion.safety_buffer, 150);
        assert_eq!(config.motion.calibration_settle_ms, 250);
        assert_eq!(config.motion.enable_settle_ms, 50);
        assert_eq!(config.motion.idle_poll_ms, 20);

        assert!(config.limits.retracted_active_low);
        assert!(!config.limits.deployed_active_low);
        assert_eq!(config.limits.debounce_reads, 3);

        assert!(!config.stepper.enable_inverted);
        assert!(config.stepper.direction_inverted);
    }

    #[test]
    fn test_missing_keys_keep_defaults() {
        let config = DeviceConfig::from_toml("[motion]\nsafety_buffer = 300\n").unwrap();
        let defaults = DeviceConfig::default();

        assert_eq!(config.motion.safety_buffer, 300);
        assert_eq!(config.motion.step_ceiling, defaults.motion.step_ceiling);
        assert_eq!(config.limits, defaults.limits);
        assert_eq!(config.stepper, defaults.stepper);
    }

    #[test]
    fn test_empty_input_is_default() {
        assert_eq!(DeviceConfig::from_toml(""), Ok(DeviceConfig::default()));
        assert_eq!(
            DeviceConfig::from_toml("# only a comment\n\n"),
            Ok(DeviceConfig::default())
        );
    }

    #[test]
    fn test_unknown_section_and_key() {
        assert_eq!(
            DeviceConfig::from_toml("[heater]\n"),
            Err(ParseError::InvalidSection(1))
        );
        assert_eq!(
            DeviceConfig::from_toml("[motion]\nspeed = 3\n"),
            Err(ParseError::UnknownKey(2))
        );
        assert_eq!(
            DeviceConfig::from_toml("safety_buffer = 3\n"),
            Err(ParseError::UnknownKey(1))
        );
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            DeviceConfig::from_toml("[motion]\nstep_ceiling = lots\n"),
            Err(ParseError::InvalidValue(2))
        );
        assert_eq!(
            DeviceConfig::from_toml("[limits]\nretracted_active_low = yes\n"),
            Err(ParseError::InvalidValue(2))
        );
        assert_eq!(
            DeviceConfig::from_toml("[motion]\nstep_ceiling\n"),
            Err(ParseError::InvalidLine(2))
        );
    }

    #[test]
    fn test_validation_runs_after_parse() {
        assert_eq!(
            DeviceConfig::from_toml("[motion]\ndirection_setup_us = 2\n"),
            Err(ParseError::Invalid(ConfigError::DirectionSetupTooShort))
        );
        assert_eq!(
            DeviceConfig::from_toml("[motion]\nsafety_buffer = -5\n"),
            Err(ParseError::Invalid(ConfigError::NegativeSafetyBuffer))
        );
    }

    proptest! {
        #[test]
        fn prop_parser_never_panics(input in "\\PC*") {
            let _ = DeviceConfig::from_toml(&input);
        }

        #[test]
        fn prop_safety_buffer_round_trips(buffer in 0i32..100_000) {
            let input = format!("[motion]\nsafety_buffer = {}\n", buffer);
            let config = DeviceConfig::from_toml(&input).unwrap();
            prop_assert_eq!(config.motion.safety_buffer, buffer);
        }
    }
}
