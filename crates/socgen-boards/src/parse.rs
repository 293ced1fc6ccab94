//! TOML parsing, serialization, validation, and discovery for board descriptors.
//!
//! Board descriptors outside the built-in catalogue are stored as
//! `.board.toml` files. This module provides functions to load, validate,
//! serialize, and discover these files.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use socgen_clock::{ClockOrigin, ClockSource, PllModel, PllSpec};
use socgen_soc::{PeripheralKind, SpiFlashModule};

use crate::board::{BoardDescriptor, ClockInput, ClockRecipe, ResetSource};
use crate::boards;
use crate::error::{BoardError, Result};

/// File suffix of board descriptor files.
pub const BOARD_FILE_SUFFIX: &str = ".board.toml";

/// A validation issue found in a board descriptor.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity: "error" or "warning".
    pub severity: &'static str,
    /// Human-readable description.
    pub message: String,
}

/// Load a board from a `.board.toml` file.
pub fn load_board_toml(path: &Path) -> Result<BoardDescriptor> {
    if !path.exists() {
        return Err(BoardError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    parse_board_toml(&content)
}

/// Parse a board from a TOML string.
pub fn parse_board_toml(toml_str: &str) -> Result<BoardDescriptor> {
    let board: BoardDescriptor = toml::from_str(toml_str)?;
    Ok(board)
}

/// Serialize a board to pretty TOML.
pub fn board_to_toml(board: &BoardDescriptor) -> Result<String> {
    let toml_str = toml::to_string_pretty(board)?;
    Ok(toml_str)
}

/// Validate a board descriptor for structural correctness.
///
/// Returns `Ok(())` if valid, or `Err(issues)` with a list of problems.
/// Warnings alone still fail validation so callers can print them.
pub fn validate_board(board: &BoardDescriptor) -> std::result::Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    let mut error = |message: String| {
        issues.push(ValidationIssue {
            severity: "error",
            message,
        })
    };

    // 1. Pins are unique
    let mut seen = BTreeSet::new();
    for pin in &board.pins {
        if !seen.insert((pin.name.as_str(), pin.index)) {
            error(format!("pin '{}' index {} is defined twice", pin.name, pin.index));
        }
    }

    // 2. The clock input exists and has a frequency
    let input_hz = match board.clock.input() {
        ClockInput::Pin(name) => match board.pin(name, 0) {
            None => {
                error(format!("clock input pin '{name}' is not defined"));
                None
            }
            Some(pin) if pin.frequency_hz.unwrap_or(0) == 0 => {
                error(format!("clock input pin '{name}' has no frequency-hz"));
                None
            }
            Some(pin) => pin.frequency_hz,
        },
        ClockInput::Peripheral { name, frequency_hz } => {
            let provided = match name.as_str() {
                "pcie" => board.peripherals.pcie.is_some(),
                _ => false,
            };
            if !provided {
                error(format!("clock input peripheral '{name}' is not available on this board"));
            }
            Some(*frequency_hz)
        }
    };

    // 3. Reset pins exist
    for reset in board.clock.resets() {
        if let ResetSource::Pin(name) = reset {
            if board.pin(name, 0).is_none() {
                error(format!("reset pin '{name}' is not defined"));
            }
        }
    }

    // 4. The default clock configuration is reachable
    if let Some(input_hz) = input_hz {
        match &board.clock {
            ClockRecipe::Passthrough { .. } => {
                if input_hz != board.default_sys_clk_freq {
                    error(format!(
                        "passthrough clock runs at {input_hz} Hz but default-sys-clk-freq is {} Hz",
                        board.default_sys_clk_freq
                    ));
                }
            }
            ClockRecipe::Pll {
                family,
                extra_outputs,
                ..
            } => {
                let origin = ClockOrigin::Pin(ClockSource::new("clkin", input_hz));
                let mut spec = PllSpec::new("pll", origin, input_hz)
                    .output("sys", board.default_sys_clk_freq);
                for extra in extra_outputs {
                    if extra.domain == "sys" {
                        error("extra PLL output cannot be named 'sys'".into());
                    }
                    spec = spec.output(extra.domain.clone(), extra.frequency_hz);
                }
                if let Err(e) = family.solve(&spec) {
                    error(format!("default clock configuration is infeasible: {e}"));
                }
            }
        }
    }

    // 5. SPI flash module is known, and the boot ROM fits inside it
    let flash_size = board.peripherals.spi_flash.as_ref().and_then(|f| {
        let module = SpiFlashModule::lookup(&f.module);
        if module.is_none() {
            error(format!(
                "unknown SPI flash module '{}' (known: {})",
                f.module,
                SpiFlashModule::names().collect::<Vec<_>>().join(", ")
            ));
        }
        module.map(|m| m.size)
    });
    if let Some(rom) = &board.peripherals.boot_rom {
        match flash_size {
            None => error("boot-rom requires spi-flash".into()),
            Some(size) if rom.default_offset.saturating_add(rom.size) > size => error(format!(
                "boot-rom (0x{:x} + 0x{:x}) does not fit in {size} bytes of SPI flash",
                rom.default_offset, rom.size
            )),
            Some(_) => {}
        }
    }

    // 6. Peripheral settings are valid
    if let Some(pcie) = &board.peripherals.pcie {
        if let Err(e) = PeripheralKind::Pcie(pcie.clone()).validate() {
            error(e.to_string());
        }
        let pins = format!("pcie_x{}", pcie.lanes);
        if board.pins_named(&pins).is_empty() {
            error(format!("pcie needs a '{pins}' pin"));
        }
    }
    if let Some(vt) = &board.peripherals.video_terminal {
        if let Err(e) = PeripheralKind::VideoTerminal(vt.clone()).validate() {
            error(e.to_string());
        }
    }
    if board.peripherals.led_chaser && board.pins_named("user_led").is_empty() {
        error("led-chaser is enabled but the board has no 'user_led' pins".into());
    }

    // 7. Variants
    if let Some(default) = &board.default_variant {
        if !board.variants.contains_key(default) {
            error(format!("default-variant '{default}' is not listed in variants"));
        }
    }

    // 8. External clock names the clock input
    if let Some(ext) = &board.external_clock {
        if board.clock.input() != &ClockInput::Pin(ext.clone()) {
            error(format!("external-clock '{ext}' is not the clock input pin"));
        }
    }

    // 9. Flash target needs a programmer that can flash
    if board.flash.is_some() {
        match &board.programmer {
            Some(p) if !p.kind.can_flash() => issues.push(ValidationIssue {
                severity: "warning",
                message: format!("flash target set but programmer '{}' cannot flash", p.kind),
            }),
            None => issues.push(ValidationIssue {
                severity: "warning",
                message: "flash target set but no programmer".into(),
            }),
            _ => {}
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

/// Generate a template `.board.toml` for a new board.
///
/// Seeds from the ego1 descriptor with the given custom name.
pub fn generate_template(name: &str) -> Result<String> {
    let mut board = boards::ego1::descriptor();
    board.name = name.into();
    board.ident = name.into();
    board_to_toml(&board)
}

/// Discover all `.board.toml` files in a directory.
///
/// Returns a list of (board_name, file_path) pairs.
pub fn discover_boards(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(BOARD_FILE_SUFFIX))
            .map(str::to_string);
        if let Some(name) = name {
            found.push((name, path));
        }
    }
    found.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(found)
}
