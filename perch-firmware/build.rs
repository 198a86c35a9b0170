//! Build script for perch-firmware
//!
//! - Sets up linker search paths and scripts for memory.x
//! - Validates perch.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Keys accepted in each section, with their expected value kind
const MOTION_KEYS: &[(&str, Kind)] = &[
    ("pulse_half_period_us", Kind::Positive),
    ("direction_setup_us", Kind::AtLeast(10)),
    ("step_ceiling", Kind::Positive),
    ("safety_buffer", Kind::AtLeast(0)),
    ("calibration_settle_ms", Kind::AtLeast(0)),
    ("enable_settle_ms", Kind::AtLeast(0)),
    ("idle_poll_ms", Kind::Positive),
];

const LIMIT_KEYS: &[(&str, Kind)] = &[
    ("retracted_active_low", Kind::Bool),
    ("deployed_active_low", Kind::Bool),
    ("debounce_reads", Kind::Range(1, 255)),
];

const STEPPER_KEYS: &[(&str, Kind)] = &[
    ("enable_inverted", Kind::Bool),
    ("direction_inverted", Kind::Bool),
];

#[derive(Clone, Copy)]
enum Kind {
    Bool,
    Positive,
    AtLeast(i64),
    Range(i64, i64),
}

/// Validate perch.toml configuration at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=perch.toml");

    let config_path = Path::new("perch.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: perch.toml not found!                                    ║\n\
            ║                                                                  ║\n\
            ║  The firmware embeds perch.toml at compile time.                 ║\n\
            ║  Please create one in the perch-firmware directory.              ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read perch.toml                                ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in perch.toml                        ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                {}\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    validate_sections(&config, &mut errors);
    validate_section(&config, "motion", MOTION_KEYS, &mut errors);
    validate_section(&config, "limits", LIMIT_KEYS, &mut errors);
    validate_section(&config, "stepper", STEPPER_KEYS, &mut errors);
    validate_travel(&config, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: perch.toml validation failed                             ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            format_error_lines(&errors.join("\n"))
        );
    }

    println!("cargo:warning=perch.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Only the three known sections may appear, all at top level
fn validate_sections(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(table) = config.as_table() else {
        errors.push("top level must be a table".to_string());
        return;
    };

    for (name, value) in table {
        match name.as_str() {
            "motion" | "limits" | "stepper" => {
                if !value.is_table() {
                    errors.push(format!("[{}] must be a table", name));
                }
            }
            _ => errors.push(format!("unknown section or key '{}'", name)),
        }
    }
}

fn validate_section(
    config: &toml::Value,
    section: &str,
    keys: &[(&str, Kind)],
    errors: &mut Vec<String>,
) {
    let Some(table) = config.get(section).and_then(|v| v.as_table()) else {
        // Missing sections keep their defaults
        return;
    };

    for (key, value) in table {
        let Some((_, kind)) = keys.iter().find(|(name, _)| name == key) else {
            errors.push(format!("[{}] unknown key '{}'", section, key));
            continue;
        };

        let ok = match (kind, value) {
            (Kind::Bool, toml::Value::Boolean(_)) => true,
            (Kind::Positive, toml::Value::Integer(n)) => *n > 0 && *n <= i64::from(u32::MAX),
            (Kind::AtLeast(min), toml::Value::Integer(n)) => {
                *n >= *min && *n <= i64::from(i32::MAX)
            }
            (Kind::Range(min, max), toml::Value::Integer(n)) => *n >= *min && *n <= *max,
            _ => false,
        };

        if !ok {
            let expected = match kind {
                Kind::Bool => "true or false".to_string(),
                Kind::Positive => "a positive integer".to_string(),
                Kind::AtLeast(min) => format!("an integer >= {}", min),
                Kind::Range(min, max) => format!("an integer in {}..={}", min, max),
            };
            errors.push(format!("[{}] {} must be {}, got {}", section, key, expected, value));
        }
    }
}

/// The safety buffer must leave room below the step ceiling
fn validate_travel(config: &toml::Value, errors: &mut Vec<String>) {
    let motion = config.get("motion");
    let get = |key: &str| motion.and_then(|m| m.get(key)).and_then(|v| v.as_integer());

    let ceiling = get("step_ceiling").unwrap_or(50_000);
    let buffer = get("safety_buffer").unwrap_or(200);

    if buffer >= ceiling {
        errors.push(format!(
            "[motion] safety_buffer ({}) must be below step_ceiling ({})",
            buffer, ceiling
        ));
    }
}
