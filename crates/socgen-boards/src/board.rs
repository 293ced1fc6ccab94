//! Board descriptor model.
//!
//! A board is pure data: its pins, its clock/reset recipe, which peripherals
//! it can carry, and how it is built and programmed. One shared routine
//! ([`assemble_soc`](crate::assemble_soc)) turns a descriptor into a SoC.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use socgen_clock::{PllFamily, Polarity};
use socgen_soc::{PcieSpec, SpiMode, VideoTerminalSpec};

use crate::error::{BoardError, Result};

/// One physical pin (or pin group member) of the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PinDef {
    pub name: String,
    #[serde(default)]
    pub index: usize,
    #[serde(default = "default_polarity")]
    pub polarity: Polarity,
    /// Oscillator frequency, for clock pins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_hz: Option<u64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub differential: bool,
}

fn default_polarity() -> Polarity {
    Polarity::ActiveHigh
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn default_true() -> bool {
    true
}

impl PinDef {
    pub fn new(name: &str, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
            polarity: Polarity::ActiveHigh,
            frequency_hz: None,
            differential: false,
        }
    }

    /// An oscillator input.
    pub fn clock(name: &str, frequency_hz: u64) -> Self {
        Self {
            frequency_hz: Some(frequency_hz),
            ..Self::new(name, 0)
        }
    }

    pub fn active_low(mut self) -> Self {
        self.polarity = Polarity::ActiveLow;
        self
    }

    pub fn differential(mut self) -> Self {
        self.differential = true;
        self
    }

    /// `count` pins `name0..name{count-1}`.
    pub fn group(name: &str, count: usize) -> Vec<Self> {
        (0..count).map(|i| Self::new(name, i)).collect()
    }
}

/// Reference clock of the board's clock recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClockInput {
    /// A board oscillator pin.
    Pin(String),
    /// A clock recovered by a peripheral.
    Peripheral { name: String, frequency_hz: u64 },
}

/// A reset feeding the clock recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResetSource {
    /// A board pin; polarity comes from its [`PinDef`].
    Pin(String),
    /// The SoC controller's soft reset.
    Soft,
    /// The reset exported by a peripheral.
    Peripheral(String),
}

/// An additional PLL output besides `sys`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExtraOutput {
    pub domain: String,
    pub frequency_hz: u64,
    #[serde(default)]
    pub reset_less: bool,
}

/// How `sys` (and any other domain) is derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum ClockRecipe {
    /// `sys` is the input clock itself.
    Passthrough {
        input: ClockInput,
        #[serde(default)]
        resets: Vec<ResetSource>,
    },
    /// `sys` comes from a PLL.
    Pll {
        family: PllFamily,
        input: ClockInput,
        #[serde(default)]
        resets: Vec<ResetSource>,
        #[serde(default)]
        extra_outputs: Vec<ExtraOutput>,
        /// Record a false path from `sys_clk` to the PLL input, for when the
        /// PLL reset is driven from `sys`.
        #[serde(default)]
        false_path: bool,
    },
}

impl ClockRecipe {
    pub fn input(&self) -> &ClockInput {
        match self {
            ClockRecipe::Passthrough { input, .. } | ClockRecipe::Pll { input, .. } => input,
        }
    }

    pub fn resets(&self) -> &[ResetSource] {
        match self {
            ClockRecipe::Passthrough { resets, .. } | ClockRecipe::Pll { resets, .. } => resets,
        }
    }
}

/// SPI flash fitted on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SpiFlashConfig {
    /// Part name from the flash catalogue.
    pub module: String,
    pub mode: SpiMode,
    #[serde(default)]
    pub with_master: bool,
    /// Attach even without `--with-spi-flash`.
    #[serde(default)]
    pub always: bool,
}

/// Boot ROM linked into SPI flash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BootRomConfig {
    pub size: u64,
    pub default_offset: u64,
}

/// Optional peripherals the board can carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PeripheralDefaults {
    #[serde(default = "default_true")]
    pub led_chaser: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spi_flash: Option<SpiFlashConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boot_rom: Option<BootRomConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcie: Option<PcieSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_terminal: Option<VideoTerminalSpec>,
}

impl Default for PeripheralDefaults {
    fn default() -> Self {
        Self {
            led_chaser: true,
            spi_flash: None,
            boot_rom: None,
            pcie: None,
            video_terminal: None,
        }
    }
}

/// Synthesis toolchain family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolchainKind {
    Vivado,
    Efinity,
    Icestorm,
    /// Anlogic Tang Dynasty.
    Td,
}

impl ToolchainKind {
    pub fn name(self) -> &'static str {
        match self {
            ToolchainKind::Vivado => "vivado",
            ToolchainKind::Efinity => "efinity",
            ToolchainKind::Icestorm => "icestorm",
            ToolchainKind::Td => "td",
        }
    }

    /// Extension of the bitstream the toolchain writes.
    pub fn bitstream_ext(self) -> &'static str {
        match self {
            ToolchainKind::Icestorm => ".bin",
            _ => ".bit",
        }
    }
}

impl fmt::Display for ToolchainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Programming tool family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgrammerKind {
    Vivado,
    OpenFpgaLoader,
    Efinity,
    Tinyprog,
}

impl ProgrammerKind {
    pub fn name(self) -> &'static str {
        match self {
            ProgrammerKind::Vivado => "vivado",
            ProgrammerKind::OpenFpgaLoader => "openfpgaloader",
            ProgrammerKind::Efinity => "efinity",
            ProgrammerKind::Tinyprog => "tinyprog",
        }
    }

    /// Whether the tool can write non-volatile storage.
    pub fn can_flash(self) -> bool {
        !matches!(self, ProgrammerKind::Efinity)
    }
}

impl fmt::Display for ProgrammerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Programmer selection for a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProgrammerConfig {
    pub kind: ProgrammerKind,
    /// Board name understood by the tool (openFPGALoader `-b`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<String>,
    /// Configuration flash part (Vivado `cfgmem`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flash_part: Option<String>,
}

/// Non-volatile storage the board can be flashed into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FlashTarget {
    pub offset: u64,
    /// Extension of the image written to flash.
    pub image_ext: String,
}

/// A complete board description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BoardDescriptor {
    /// Board name (e.g., "ego1").
    pub name: String,
    /// Identification string baked into the SoC.
    pub ident: String,
    /// FPGA part.
    pub device: String,
    pub toolchain: ToolchainKind,
    pub default_sys_clk_freq: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_variant: Option<String>,
    /// Integrated ROM size override; 0 disables it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrated_rom_size: Option<u64>,
    /// Pin whose frequency `--ext-clk-freq` may override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_clock: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_variant: Option<String>,
    /// Variant name to FPGA part.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variants: BTreeMap<String, String>,
    pub clock: ClockRecipe,
    #[serde(default)]
    pub peripherals: PeripheralDefaults,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub programmer: Option<ProgrammerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flash: Option<FlashTarget>,
    pub pins: Vec<PinDef>,
}

impl BoardDescriptor {
    pub fn pin(&self, name: &str, index: usize) -> Option<&PinDef> {
        self.pins.iter().find(|p| p.name == name && p.index == index)
    }

    /// All pins named `name`, sorted by index.
    pub fn pins_named(&self, name: &str) -> Vec<&PinDef> {
        let mut pins: Vec<_> = self.pins.iter().filter(|p| p.name == name).collect();
        pins.sort_by_key(|p| p.index);
        pins
    }

    pub fn build_name(&self) -> &str {
        &self.name
    }

    pub fn bitstream_ext(&self) -> &'static str {
        self.toolchain.bitstream_ext()
    }

    /// FPGA part for a variant, falling back to `device`.
    pub fn device_for(&self, variant: Option<&str>) -> Option<&str> {
        match variant.or(self.default_variant.as_deref()) {
            Some(v) => self.variants.get(v).map(String::as_str),
            None => Some(self.device.as_str()),
        }
    }

    /// Like [`BoardDescriptor::device_for`], failing on unknown variants.
    pub fn resolve_device(&self, variant: Option<&str>) -> Result<&str> {
        self.device_for(variant).ok_or_else(|| BoardError::UnknownVariant {
            board: self.name.clone(),
            variant: variant
                .or(self.default_variant.as_deref())
                .unwrap_or_default()
                .to_string(),
            available: self.variants.keys().cloned().collect::<Vec<_>>().join(", "),
        })
    }
}
