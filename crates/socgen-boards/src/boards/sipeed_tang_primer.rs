//! Sipeed Tang Primer (Anlogic EG4S20).

use std::collections::BTreeMap;

use crate::board::{
    BoardDescriptor, ClockInput, ClockRecipe, FlashTarget, PeripheralDefaults, PinDef,
    ProgrammerConfig, ProgrammerKind, ResetSource, ToolchainKind,
};

pub fn descriptor() -> BoardDescriptor {
    let mut pins = vec![
        PinDef::clock("clk24", 24_000_000),
        PinDef::new("user_btn", 0).active_low(),
        PinDef::new("serial", 0),
    ];
    pins.extend(PinDef::group("user_led", 3));

    BoardDescriptor {
        name: "sipeed_tang_primer".into(),
        ident: "Tang Primer".into(),
        device: "EG4S20BG256".into(),
        toolchain: ToolchainKind::Td,
        default_sys_clk_freq: 24_000_000,
        cpu_variant: Some("minimal".into()),
        integrated_rom_size: None,
        external_clock: None,
        default_variant: None,
        variants: BTreeMap::new(),
        clock: ClockRecipe::Passthrough {
            input: ClockInput::Pin("clk24".into()),
            resets: vec![ResetSource::Pin("user_btn".into())],
        },
        peripherals: PeripheralDefaults::default(),
        programmer: Some(ProgrammerConfig {
            kind: ProgrammerKind::OpenFpgaLoader,
            board: Some("tangprimer".into()),
            flash_part: None,
        }),
        flash: Some(FlashTarget {
            offset: 0,
            image_ext: ".bit".into(),
        }),
        pins,
    }
}
