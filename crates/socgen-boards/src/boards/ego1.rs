//! EGO1 (Xilinx Artix-7 XC7A35T).

use std::collections::BTreeMap;

use socgen_clock::PllFamily;
use socgen_soc::VideoTerminalSpec;

use crate::board::{
    BoardDescriptor, ClockInput, ClockRecipe, ExtraOutput, FlashTarget, PeripheralDefaults, PinDef,
    ProgrammerConfig, ProgrammerKind, ResetSource, ToolchainKind,
};

pub fn descriptor() -> BoardDescriptor {
    let mut pins = vec![
        PinDef::clock("clk100", 100_000_000),
        PinDef::new("cpu_reset", 0).active_low(),
        PinDef::new("serial", 0),
        PinDef::new("vga", 0),
    ];
    pins.extend(PinDef::group("user_led", 16));

    BoardDescriptor {
        name: "ego1".into(),
        ident: "EGO1 Board".into(),
        device: "xc7a35tcsg324-1".into(),
        toolchain: ToolchainKind::Vivado,
        default_sys_clk_freq: 100_000_000,
        cpu_variant: None,
        integrated_rom_size: None,
        external_clock: None,
        default_variant: None,
        variants: BTreeMap::new(),
        clock: ClockRecipe::Pll {
            family: PllFamily::S7Pll,
            input: ClockInput::Pin("clk100".into()),
            resets: vec![ResetSource::Pin("cpu_reset".into()), ResetSource::Soft],
            extra_outputs: vec![ExtraOutput {
                domain: "vga".into(),
                frequency_hz: 25_000_000,
                reset_less: true,
            }],
            false_path: false,
        },
        peripherals: PeripheralDefaults {
            video_terminal: Some(VideoTerminalSpec::default()),
            ..PeripheralDefaults::default()
        },
        programmer: Some(ProgrammerConfig {
            kind: ProgrammerKind::Vivado,
            board: None,
            flash_part: Some("s25fl032p-spi-x1_x2_x4".into()),
        }),
        flash: Some(FlashTarget {
            offset: 0,
            image_ext: ".bin".into(),
        }),
        pins,
    }
}
