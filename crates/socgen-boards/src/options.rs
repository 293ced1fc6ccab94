//! Validated build options and the parsers for their command-line forms.

use serde::{Deserialize, Serialize};

use crate::error::{BoardError, Result};

/// Everything the operator can ask of one board build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildOptions {
    /// `sys` frequency; the board default when unset.
    pub sys_clk_freq: Option<u64>,
    pub with_pcie: bool,
    pub with_spi_flash: bool,
    pub with_video_terminal: bool,
    pub with_led_chaser: bool,
    /// Boot ROM offset inside SPI flash.
    pub bios_flash_offset: Option<u64>,
    pub variant: Option<String>,
    /// Frequency of the board's external clock input.
    pub ext_clk_freq: Option<u64>,
    pub cpu_variant: Option<String>,
    pub integrated_rom_size: Option<u64>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            sys_clk_freq: None,
            with_pcie: false,
            with_spi_flash: false,
            with_video_terminal: false,
            with_led_chaser: true,
            bios_flash_offset: None,
            variant: None,
            ext_clk_freq: None,
            cpu_variant: None,
            integrated_rom_size: None,
        }
    }
}

/// Parse a frequency in Hz: `100000000`, `100e6`, `1.5e7`.
pub fn parse_frequency(s: &str) -> Result<u64> {
    let s = s.trim();
    if let Ok(hz) = s.parse::<u64>() {
        if hz == 0 {
            return Err(BoardError::InvalidOption(format!("frequency '{s}' out of range")));
        }
        return Ok(hz);
    }
    let value: f64 = s
        .parse()
        .map_err(|_| BoardError::InvalidOption(format!("'{s}' is not a frequency")))?;
    if !value.is_finite() || value <= 0.0 || value > u64::MAX as f64 {
        return Err(BoardError::InvalidOption(format!("frequency '{s}' out of range")));
    }
    if value.fract() != 0.0 {
        return Err(BoardError::InvalidOption(format!("frequency '{s}' is not a whole number of Hz")));
    }
    Ok(value as u64)
}

/// Parse an address: `0x50000` or `327680`.
pub fn parse_address(s: &str) -> Result<u64> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse(),
    };
    parsed.map_err(|_| BoardError::InvalidOption(format!("'{s}' is not an address")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequencies() {
        assert_eq!(parse_frequency("100e6").unwrap(), 100_000_000);
        assert_eq!(parse_frequency("16000000").unwrap(), 16_000_000);
        assert_eq!(parse_frequency("1.25e8").unwrap(), 125_000_000);
        assert!(parse_frequency("fast").is_err());
        assert!(parse_frequency("-1e6").is_err());
        assert!(parse_frequency("1.5").is_err());
    }

    #[test]
    fn zero_frequency_rejected() {
        for zero in ["0", "0.0", "0e6"] {
            assert!(
                matches!(parse_frequency(zero), Err(BoardError::InvalidOption(_))),
                "{zero}"
            );
        }
    }

    #[test]
    fn addresses() {
        assert_eq!(parse_address("0x50000").unwrap(), 0x50000);
        assert_eq!(parse_address("0X5_0000").unwrap(), 0x50000);
        assert_eq!(parse_address("327680").unwrap(), 0x50000);
        assert!(parse_address("0xzz").is_err());
        assert!(parse_address("").is_err());
    }

    #[test]
    fn led_chaser_on_by_default() {
        let options = BuildOptions::default();
        assert!(options.with_led_chaser);
        assert!(!options.with_pcie);
    }
}
