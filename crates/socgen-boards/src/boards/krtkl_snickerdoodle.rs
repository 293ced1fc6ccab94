//! krtkl snickerdoodle (Xilinx Zynq-7000), programmable-logic only.

use std::collections::BTreeMap;

use socgen_clock::PllFamily;

use crate::board::{
    BoardDescriptor, ClockInput, ClockRecipe, PeripheralDefaults, PinDef, ProgrammerConfig,
    ProgrammerKind, ResetSource, ToolchainKind,
};

pub fn descriptor() -> BoardDescriptor {
    let variants = BTreeMap::from([
        ("z7-10".to_string(), "xc7z010clg400-3".to_string()),
        ("z7-20".to_string(), "xc7z020clg400-3".to_string()),
    ]);
    let mut pins = vec![PinDef::clock("ext_clk", 10_000_000), PinDef::new("serial", 0)];
    pins.extend(PinDef::group("user_led", 3));

    BoardDescriptor {
        name: "krtkl_snickerdoodle".into(),
        ident: "krtkl snickerdoodle".into(),
        device: "xc7z010clg400-3".into(),
        toolchain: ToolchainKind::Vivado,
        default_sys_clk_freq: 100_000_000,
        cpu_variant: None,
        integrated_rom_size: None,
        external_clock: Some("ext_clk".into()),
        default_variant: Some("z7-10".into()),
        variants,
        clock: ClockRecipe::Pll {
            family: PllFamily::S7Mmcm,
            input: ClockInput::Pin("ext_clk".into()),
            resets: vec![ResetSource::Soft],
            extra_outputs: Vec::new(),
            false_path: true,
        },
        peripherals: PeripheralDefaults::default(),
        programmer: Some(ProgrammerConfig {
            kind: ProgrammerKind::Vivado,
            board: None,
            flash_part: None,
        }),
        flash: None,
        pins,
    }
}
