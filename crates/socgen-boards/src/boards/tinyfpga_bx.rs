//! TinyFPGA BX (Lattice iCE40 LP8K).
//!
//! The integrated ROM does not fit the iCE40, so the CPU boots from a 32 KiB
//! window inside the SPI flash.

use std::collections::BTreeMap;

use socgen_soc::SpiMode;

use crate::board::{
    BoardDescriptor, BootRomConfig, ClockInput, ClockRecipe, PeripheralDefaults, PinDef,
    ProgrammerConfig, ProgrammerKind, ResetSource, SpiFlashConfig, ToolchainKind,
};

pub fn descriptor() -> BoardDescriptor {
    BoardDescriptor {
        name: "tinyfpga_bx".into(),
        ident: "TinyFPGA BX".into(),
        device: "ice40-lp8k-cm81".into(),
        toolchain: ToolchainKind::Icestorm,
        default_sys_clk_freq: 16_000_000,
        cpu_variant: None,
        integrated_rom_size: Some(0),
        external_clock: None,
        default_variant: None,
        variants: BTreeMap::new(),
        clock: ClockRecipe::Passthrough {
            input: ClockInput::Pin("clk16".into()),
            resets: vec![ResetSource::Soft],
        },
        peripherals: PeripheralDefaults {
            spi_flash: Some(SpiFlashConfig {
                module: "AT25SF081".into(),
                mode: SpiMode::X1,
                with_master: false,
                always: true,
            }),
            boot_rom: Some(BootRomConfig {
                size: 32 * 1024,
                default_offset: 0x50000,
            }),
            ..PeripheralDefaults::default()
        },
        programmer: Some(ProgrammerConfig {
            kind: ProgrammerKind::Tinyprog,
            board: None,
            flash_part: None,
        }),
        flash: None,
        pins: vec![
            PinDef::clock("clk16", 16_000_000),
            PinDef::new("user_led", 0),
            PinDef::new("serial", 0),
            PinDef::new("spiflash", 0),
        ],
    }
}
