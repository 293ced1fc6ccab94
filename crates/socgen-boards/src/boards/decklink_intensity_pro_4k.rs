//! Blackmagic Decklink Intensity Pro 4K (Xilinx Artix-7 XC7A50T).
//!
//! `sys` is derived from the PCIe link clock; the board has no usable
//! oscillator of its own. Building without PCIe therefore cannot resolve `sys`.

use std::collections::BTreeMap;

use socgen_clock::PllFamily;
use socgen_soc::{PcieSpec, PCIE_CLK_HZ};

use crate::board::{
    BoardDescriptor, ClockInput, ClockRecipe, PeripheralDefaults, PinDef, ProgrammerConfig,
    ProgrammerKind, ResetSource, ToolchainKind,
};

pub fn descriptor() -> BoardDescriptor {
    BoardDescriptor {
        name: "decklink_intensity_pro_4k".into(),
        ident: "Blackmagic Decklink Intensity Pro 4K".into(),
        device: "xc7a50tfgg484-2".into(),
        toolchain: ToolchainKind::Vivado,
        default_sys_clk_freq: 125_000_000,
        cpu_variant: None,
        integrated_rom_size: None,
        external_clock: None,
        default_variant: None,
        variants: BTreeMap::new(),
        clock: ClockRecipe::Pll {
            family: PllFamily::S7Pll,
            input: ClockInput::Peripheral {
                name: "pcie".into(),
                frequency_hz: PCIE_CLK_HZ,
            },
            resets: vec![ResetSource::Peripheral("pcie".into())],
            extra_outputs: Vec::new(),
            false_path: true,
        },
        peripherals: PeripheralDefaults {
            led_chaser: false,
            pcie: Some(PcieSpec {
                lanes: 4,
                data_width: 128,
                bar0_size: 0x20000,
                ndmas: 1,
            }),
            ..PeripheralDefaults::default()
        },
        programmer: Some(ProgrammerConfig {
            kind: ProgrammerKind::Vivado,
            board: None,
            flash_part: None,
        }),
        flash: None,
        pins: vec![PinDef::new("pcie_x4", 0)],
    }
}
