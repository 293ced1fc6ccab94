//! Turns a board descriptor and build options into a finalized SoC.

use log::{info, warn};
use socgen_clock::{
    ClockOrigin, ClockResetGraph, ClockSource, PllSpec, ResetInput, SignalRef, SYS_DOMAIN,
};
use socgen_soc::{
    CpuSpec, LedChaserSpec, PeripheralKind, Placement, RegionKind, Soc, SocComposer, SpiFlashModule,
    SpiFlashSpec, BOOT_ROM,
};

use crate::board::{BoardDescriptor, ClockInput, ClockRecipe, ResetSource};
use crate::error::{BoardError, Result};
use crate::options::BuildOptions;
use crate::platform::Platform;

/// Instance name of the board PLL.
pub const PLL_NAME: &str = "pll";

/// Compose the SoC for `board`.
///
/// Every composition error is raised here, before any toolchain runs.
pub fn assemble_soc(
    board: &BoardDescriptor,
    platform: &mut dyn Platform,
    options: &BuildOptions,
) -> Result<Soc> {
    let device = board.resolve_device(options.variant.as_deref())?;
    let sys_hz = options.sys_clk_freq.unwrap_or(board.default_sys_clk_freq);
    info!("assembling '{}' ({device}) at {sys_hz} Hz", board.name);

    let crg = build_crg(board, platform, options, sys_hz)?;

    let mut cpu = CpuSpec::vexriscv();
    if let Some(variant) = options.cpu_variant.as_ref().or(board.cpu_variant.as_ref()) {
        cpu.variant = variant.clone();
    }
    if let Some(size) = options.integrated_rom_size.or(board.integrated_rom_size) {
        cpu.integrated_rom_size = size;
    }

    let mut composer = SocComposer::with_cpu(cpu)?
        .with_ident(format!("socgen SoC on {}", board.ident))
        .with_build_name(board.build_name());
    composer.attach_all(peripherals(board, platform, options)?)?;

    let defaults = &board.peripherals;
    match (&defaults.boot_rom, composer.address_space().get("spiflash").is_some()) {
        (Some(rom), true) => {
            let offset = options.bios_flash_offset.unwrap_or(rom.default_offset);
            composer.add_region(
                BOOT_ROM,
                Placement::AliasOf {
                    target: "spiflash".into(),
                    offset,
                },
                rom.size,
                RegionKind::Linker,
            )?;
        }
        (Some(_), false) if options.bios_flash_offset.is_some() => {
            return Err(unsupported(board, "--bios-flash-offset without SPI flash"));
        }
        (None, _) if options.bios_flash_offset.is_some() => {
            return Err(unsupported(board, "--bios-flash-offset"));
        }
        _ => {}
    }

    Ok(composer.finalize(crg)?)
}

fn unsupported(board: &BoardDescriptor, option: &str) -> BoardError {
    BoardError::UnsupportedOption {
        board: board.name.clone(),
        option: option.to_string(),
    }
}

fn build_crg(
    board: &BoardDescriptor,
    platform: &mut dyn Platform,
    options: &BuildOptions,
    sys_hz: u64,
) -> Result<ClockResetGraph> {
    let (origin, input_hz) = match board.clock.input() {
        ClockInput::Pin(name) => {
            let pin = board.pin(name, 0).ok_or_else(|| BoardError::UnknownPin {
                name: name.clone(),
                index: 0,
            })?;
            let nominal = pin.frequency_hz.ok_or_else(|| BoardError::Validation {
                detail: format!("clock pin '{name}' has no frequency"),
            })?;
            let hz = match options.ext_clk_freq {
                Some(hz) if board.external_clock.as_deref() == Some(name.as_str()) => hz,
                Some(_) => return Err(unsupported(board, "--ext-clk-freq")),
                None => nominal,
            };
            platform.request(name, 0)?;
            let mut source = ClockSource::new(name.clone(), hz);
            if pin.differential {
                source = source.differential();
            }
            (ClockOrigin::Pin(source), hz)
        }
        ClockInput::Peripheral { name, frequency_hz } => {
            if options.ext_clk_freq.is_some() {
                return Err(unsupported(board, "--ext-clk-freq"));
            }
            let origin = ClockOrigin::Peripheral {
                peripheral: name.clone(),
                frequency_hz: *frequency_hz,
            };
            (origin, *frequency_hz)
        }
    };

    let mut resets = Vec::new();
    for reset in board.clock.resets() {
        resets.push(match reset {
            ResetSource::Pin(name) => ResetInput::Pin(platform.request(name, 0)?),
            ResetSource::Soft => ResetInput::Soft,
            ResetSource::Peripheral(p) => ResetInput::Peripheral(p.clone()),
        });
    }

    let mut crg = ClockResetGraph::new();
    match &board.clock {
        ClockRecipe::Passthrough { .. } => {
            if sys_hz != input_hz {
                return Err(BoardError::FixedClock {
                    board: board.name.clone(),
                    requested_hz: sys_hz,
                    available_hz: input_hz,
                });
            }
            let sys = crg.declare_domain(SYS_DOMAIN)?;
            crg.wire_from_source(sys, origin, resets)?;
        }
        ClockRecipe::Pll {
            family,
            extra_outputs,
            false_path,
            ..
        } => {
            crg.declare_domain(SYS_DOMAIN)?;
            let mut spec = PllSpec::new(PLL_NAME, origin, input_hz).output(SYS_DOMAIN, sys_hz);
            for extra in extra_outputs {
                spec = if extra.reset_less {
                    crg.declare_reset_less_domain(&extra.domain)?;
                    spec.reset_less_output(extra.domain.clone(), extra.frequency_hz)
                } else {
                    crg.declare_domain(&extra.domain)?;
                    spec.output(extra.domain.clone(), extra.frequency_hz)
                };
            }
            for reset in resets {
                spec = spec.reset(reset);
            }
            let config = crg.wire_from_pll(&spec, family)?;
            info!(
                "{family}: {input_hz} Hz * {} / {} -> VCO {} Hz",
                config.mult, config.div, config.vco_hz
            );
            if *false_path {
                crg.add_timing_exception(
                    SignalRef::DomainClock(SYS_DOMAIN.into()),
                    SignalRef::PllClkIn(PLL_NAME.into()),
                );
            }
        }
    }
    Ok(crg)
}

fn peripherals(
    board: &BoardDescriptor,
    platform: &mut dyn Platform,
    options: &BuildOptions,
) -> Result<Vec<PeripheralKind>> {
    let defaults = &board.peripherals;
    let mut out = Vec::new();

    if options.with_led_chaser && defaults.led_chaser {
        out.push(PeripheralKind::LedChaser(LedChaserSpec::new(
            platform.request_all("user_led")?,
        )));
    }

    match &defaults.spi_flash {
        Some(flash) if flash.always || options.with_spi_flash => {
            let module = SpiFlashModule::lookup(&flash.module).ok_or_else(|| BoardError::Validation {
                detail: format!("unknown SPI flash module '{}'", flash.module),
            })?;
            platform.request_all("spiflash")?;
            out.push(PeripheralKind::SpiFlash(SpiFlashSpec {
                module,
                mode: flash.mode,
                with_master: flash.with_master,
            }));
        }
        None if options.with_spi_flash => return Err(unsupported(board, "--with-spi-flash")),
        _ => {}
    }

    if options.with_pcie {
        let pcie = defaults
            .pcie
            .clone()
            .ok_or_else(|| unsupported(board, "--with-pcie"))?;
        platform.request_all(&format!("pcie_x{}", pcie.lanes))?;
        out.push(PeripheralKind::Pcie(pcie));
    }

    if options.with_video_terminal {
        let vt = defaults
            .video_terminal
            .clone()
            .ok_or_else(|| unsupported(board, "--with-video-terminal"))?;
        platform.request_all("vga")?;
        out.push(PeripheralKind::VideoTerminal(vt));
    }

    if let ClockInput::Peripheral { name, .. } = board.clock.input() {
        if !out.iter().any(|p| p.name() == name) {
            warn!("{}: sys is clocked by '{name}', which is not enabled", board.name);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boards;
    use crate::platform::BoardPlatform;
    use socgen_clock::ClockError;
    use socgen_soc::SocError;

    fn assemble(board: &BoardDescriptor, options: &BuildOptions) -> Result<Soc> {
        let mut platform = BoardPlatform::new(board);
        assemble_soc(board, &mut platform, options)
    }

    #[test]
    fn ego1_default() {
        let soc = assemble(&boards::ego1::descriptor(), &BuildOptions::default()).unwrap();
        assert_eq!(soc.sys_clk_freq(), 100_000_000);
        assert!(soc.has_peripheral("leds"));
        let vga = soc.clock.domain("vga").unwrap();
        assert!(vga.is_reset_less());
        let expr = soc.clock.sys().reset.as_ref().unwrap().synchronizer.input_expr();
        assert_eq!(expr, "~pll.locked | ~cpu_reset0 | crg.rst");
    }

    #[test]
    fn tinyfpga_boot_rom_in_flash() {
        let soc = assemble(&boards::tinyfpga_bx::descriptor(), &BuildOptions::default()).unwrap();
        assert_eq!(soc.reset_vector(), 0x2005_0000);
        assert!(soc.address_space.get("rom").unwrap().is_alias());
        assert_eq!(soc.sys_clk_freq(), 16_000_000);

        let options = BuildOptions {
            bios_flash_offset: Some(0x60000),
            ..BuildOptions::default()
        };
        let soc = assemble(&boards::tinyfpga_bx::descriptor(), &options).unwrap();
        assert_eq!(soc.reset_vector(), 0x2006_0000);
    }

    #[test]
    fn passthrough_cannot_retune() {
        let options = BuildOptions {
            sys_clk_freq: Some(48_000_000),
            ..BuildOptions::default()
        };
        let err = assemble(&boards::tinyfpga_bx::descriptor(), &options).unwrap_err();
        assert!(matches!(err, BoardError::FixedClock { available_hz: 16_000_000, .. }));
    }

    #[test]
    fn decklink_needs_pcie() {
        let board = boards::decklink_intensity_pro_4k::descriptor();
        let err = assemble(&board, &BuildOptions::default()).unwrap_err();
        match err {
            BoardError::Soc(SocError::Clock(ClockError::UnresolvedClockSource { dependency, .. })) => {
                assert_eq!(dependency, "pcie")
            }
            other => panic!("unexpected error: {other}"),
        }

        let options = BuildOptions {
            with_pcie: true,
            ..BuildOptions::default()
        };
        let soc = assemble(&board, &options).unwrap();
        assert_eq!(soc.sys_clk_freq(), 125_000_000);
        assert_eq!(soc.clock.timing_exceptions().len(), 1);
    }

    #[test]
    fn unsupported_options() {
        let options = BuildOptions {
            with_pcie: true,
            ..BuildOptions::default()
        };
        assert!(matches!(
            assemble(&boards::ego1::descriptor(), &options),
            Err(BoardError::UnsupportedOption { .. })
        ));

        let options = BuildOptions {
            bios_flash_offset: Some(0x1000),
            ..BuildOptions::default()
        };
        assert!(matches!(
            assemble(&boards::xilinx_zcu106::descriptor(), &options),
            Err(BoardError::UnsupportedOption { .. })
        ));

        let options = BuildOptions {
            ext_clk_freq: Some(25_000_000),
            ..BuildOptions::default()
        };
        assert!(matches!(
            assemble(&boards::ego1::descriptor(), &options),
            Err(BoardError::UnsupportedOption { .. })
        ));
    }

    #[test]
    fn snickerdoodle_external_clock() {
        let board = boards::krtkl_snickerdoodle::descriptor();
        let options = BuildOptions {
            ext_clk_freq: Some(25_000_000),
            variant: Some("z7-20".into()),
            ..BuildOptions::default()
        };
        let soc = assemble(&board, &options).unwrap();
        let period = &soc.clock.period_constraints()[0];
        assert!((period.period_ns - 40.0).abs() < 1e-9);

        let options = BuildOptions {
            variant: Some("z7-99".into()),
            ..BuildOptions::default()
        };
        assert!(matches!(
            assemble(&board, &options),
            Err(BoardError::UnknownVariant { .. })
        ));
    }

    #[test]
    fn efinix_flash_on_request() {
        let board = boards::efinix_trion_t20_mipi_dev_kit::descriptor();
        let soc = assemble(&board, &BuildOptions::default()).unwrap();
        assert!(!soc.has_peripheral("spiflash"));

        let options = BuildOptions {
            with_spi_flash: true,
            ..BuildOptions::default()
        };
        let soc = assemble(&board, &options).unwrap();
        match soc.peripheral("spiflash") {
            Some(PeripheralKind::SpiFlash(f)) => {
                assert_eq!(f.module.name, "W25Q32JV");
                assert!(f.with_master);
            }
            other => panic!("unexpected peripheral: {other:?}"),
        }
    }

    #[test]
    fn unreachable_pll_target_is_clock_config_error() {
        let options = BuildOptions {
            sys_clk_freq: Some(3_000_000_000),
            ..BuildOptions::default()
        };
        let err = assemble(&boards::ego1::descriptor(), &options).unwrap_err();
        assert!(matches!(err, BoardError::Clock(ClockError::ClockConfig { .. })));
    }

    #[test]
    fn without_led_chaser() {
        let options = BuildOptions {
            with_led_chaser: false,
            ..BuildOptions::default()
        };
        let soc = assemble(&boards::sipeed_tang_primer::descriptor(), &options).unwrap();
        assert!(!soc.has_peripheral("leds"));
        assert_eq!(soc.cpu.variant, "minimal");
    }
}
