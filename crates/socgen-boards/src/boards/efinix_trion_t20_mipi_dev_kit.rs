//! Efinix Trion T20 MIPI development kit.

use std::collections::BTreeMap;

use socgen_clock::PllFamily;
use socgen_soc::SpiMode;

use crate::board::{
    BoardDescriptor, ClockInput, ClockRecipe, PeripheralDefaults, PinDef, ProgrammerConfig,
    ProgrammerKind, ResetSource, SpiFlashConfig, ToolchainKind,
};

pub fn descriptor() -> BoardDescriptor {
    let mut pins = vec![
        PinDef::clock("clk50", 50_000_000),
        PinDef::new("user_btn", 0).active_low(),
        PinDef::new("serial", 0),
        PinDef::new("spiflash", 0),
    ];
    pins.extend(PinDef::group("user_led", 4));

    BoardDescriptor {
        name: "efinix_trion_t20_mipi_dev_kit".into(),
        ident: "Efinix Trion T20 MIPI Dev Kit".into(),
        device: "T20F169C4".into(),
        toolchain: ToolchainKind::Efinity,
        default_sys_clk_freq: 100_000_000,
        cpu_variant: None,
        integrated_rom_size: None,
        external_clock: None,
        default_variant: None,
        variants: BTreeMap::new(),
        clock: ClockRecipe::Pll {
            family: PllFamily::TrionPll,
            input: ClockInput::Pin("clk50".into()),
            resets: vec![ResetSource::Pin("user_btn".into())],
            extra_outputs: Vec::new(),
            false_path: false,
        },
        peripherals: PeripheralDefaults {
            spi_flash: Some(SpiFlashConfig {
                module: "W25Q32JV".into(),
                mode: SpiMode::X1,
                with_master: true,
                always: false,
            }),
            ..PeripheralDefaults::default()
        },
        programmer: Some(ProgrammerConfig {
            kind: ProgrammerKind::Efinity,
            board: None,
            flash_part: None,
        }),
        flash: None,
        pins,
    }
}
