//! Xilinx ZCU106 (Zynq UltraScale+ XCZU7EV).

use std::collections::BTreeMap;

use socgen_clock::PllFamily;

use crate::board::{
    BoardDescriptor, ClockInput, ClockRecipe, PeripheralDefaults, PinDef, ProgrammerConfig,
    ProgrammerKind, ResetSource, ToolchainKind,
};

pub fn descriptor() -> BoardDescriptor {
    let mut pins = vec![
        PinDef::clock("clk125", 125_000_000).differential(),
        PinDef::new("rst", 0),
        PinDef::new("serial", 0),
    ];
    pins.extend(PinDef::group("user_led", 8));

    BoardDescriptor {
        name: "xilinx_zcu106".into(),
        ident: "Xilinx ZCU106".into(),
        device: "xczu7ev-ffvc1156-2-e".into(),
        toolchain: ToolchainKind::Vivado,
        default_sys_clk_freq: 125_000_000,
        cpu_variant: None,
        integrated_rom_size: None,
        external_clock: None,
        default_variant: None,
        variants: BTreeMap::new(),
        clock: ClockRecipe::Pll {
            family: PllFamily::UspMmcm,
            input: ClockInput::Pin("clk125".into()),
            resets: vec![ResetSource::Pin("rst".into()), ResetSource::Soft],
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
