//! `socgen build`: compose a board SoC, then build, load or flash it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use socgen_boards::{
    assemble_soc, parse_address, parse_frequency, BoardDescriptor, BoardPlatform, BuildOptions,
    Platform, Programmer,
};
use socgen_build::{
    describe, Actions, BuildArtifactSpec, BuildOrchestrator, BuildReport, CancelToken, CommandToolchain,
};

use crate::commands::resolve_board;
use crate::manifest::SocgenManifest;

fn frequency(s: &str) -> Result<u64, String> {
    parse_frequency(s).map_err(|e| e.to_string())
}

fn address(s: &str) -> Result<u64, String> {
    parse_address(s).map_err(|e| e.to_string())
}

#[derive(Debug, Clone, Default, Args)]
pub struct BuildArgs {
    /// Board name or path to a .board.toml (defaults to [build] default-board)
    #[arg(long)]
    pub board: Option<String>,
    /// Output directory (defaults to <output-dir>/<board>)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Run synthesis
    #[arg(long)]
    pub build: bool,
    /// Load the bitstream into the FPGA
    #[arg(long)]
    pub load: bool,
    /// Write the flash image to non-volatile storage
    #[arg(long)]
    pub flash: bool,
    /// Generate host driver headers (requires --with-pcie)
    #[arg(long)]
    pub driver: bool,
    /// System clock frequency in Hz (e.g. 100e6)
    #[arg(long, value_parser = frequency)]
    pub sys_clk_freq: Option<u64>,
    /// Attach the PCIe core
    #[arg(long)]
    pub with_pcie: bool,
    /// Attach the SPI flash core
    #[arg(long)]
    pub with_spi_flash: bool,
    /// Attach the video terminal
    #[arg(long)]
    pub with_video_terminal: bool,
    /// Leave the LED chaser out
    #[arg(long)]
    pub no_led_chaser: bool,
    /// Boot ROM offset inside SPI flash (hex or decimal)
    #[arg(long, value_parser = address)]
    pub bios_flash_offset: Option<u64>,
    /// Board variant (e.g. z7-20)
    #[arg(long)]
    pub variant: Option<String>,
    /// Frequency of the external clock input in Hz
    #[arg(long, value_parser = frequency)]
    pub ext_clk_freq: Option<u64>,
    /// CPU variant override
    #[arg(long)]
    pub cpu_variant: Option<String>,
    /// Integrated ROM size in bytes (0 disables it)
    #[arg(long, value_parser = address)]
    pub integrated_rom_size: Option<u64>,
    /// Wait this long for a busy output directory
    #[arg(long)]
    pub lock_timeout_secs: Option<u64>,
}

impl BuildArgs {
    pub fn options(&self) -> BuildOptions {
        BuildOptions {
            sys_clk_freq: self.sys_clk_freq,
            with_pcie: self.with_pcie,
            with_spi_flash: self.with_spi_flash,
            with_video_terminal: self.with_video_terminal,
            with_led_chaser: !self.no_led_chaser,
            bios_flash_offset: self.bios_flash_offset,
            variant: self.variant.clone(),
            ext_clk_freq: self.ext_clk_freq,
            cpu_variant: self.cpu_variant.clone(),
            integrated_rom_size: self.integrated_rom_size,
        }
    }

    pub fn actions(&self) -> Actions {
        Actions {
            build: self.build,
            load: self.load,
            flash: self.flash,
            driver: self.driver,
        }
    }
}

/// A composed SoC ready for the orchestrator.
pub struct Prepared {
    pub board: BoardDescriptor,
    pub spec: BuildArtifactSpec,
    pub programmer: Option<Box<dyn Programmer>>,
}

/// Compose the SoC for `board` with `options`.
pub fn prepare(board: BoardDescriptor, options: &BuildOptions, manifest: &SocgenManifest) -> Result<Prepared> {
    let (spec, programmer) = {
        let programmer_override = board
            .programmer
            .as_ref()
            .and_then(|p| manifest.programmer_override(p.kind.name()))
            .cloned();
        let mut platform = BoardPlatform::new(&board)
            .with_variant(options.variant.as_deref())?
            .with_programmer_override(programmer_override);
        let soc = assemble_soc(&board, &mut platform, options)
            .with_context(|| format!("composing SoC for {}", board.name))?;
        let spec = describe(&soc, &board, options.variant.as_deref())?;
        (spec, platform.create_programmer())
    };
    Ok(Prepared {
        board,
        spec,
        programmer,
    })
}

/// Run the orchestrator for prepared inputs.
pub fn invoke(
    prepared: Prepared,
    output_dir: &Path,
    actions: Actions,
    manifest: &SocgenManifest,
    lock_timeout_secs: Option<u64>,
    cancel: &CancelToken,
) -> Result<BuildReport> {
    let toolchain = CommandToolchain::new(prepared.board.toolchain);
    let toolchain = match manifest.toolchain_override(prepared.board.toolchain.name()) {
        Some(o) => toolchain.with_override(o),
        None => toolchain,
    };
    let mut orchestrator = BuildOrchestrator::new(output_dir)
        .with_toolchain(toolchain)
        .with_cancel_token(cancel.clone());
    if let Some(programmer) = prepared.programmer {
        orchestrator = orchestrator.with_programmer(programmer);
    }
    let timeout = lock_timeout_secs
        .map(std::time::Duration::from_secs)
        .or_else(|| manifest.lock_timeout());
    if let Some(timeout) = timeout {
        orchestrator = orchestrator.with_lock_timeout(timeout);
    }
    let report = orchestrator.invoke(&prepared.spec, actions)?;
    Ok(report)
}

pub fn run(project_dir: &Path, manifest: &SocgenManifest, args: &BuildArgs, cancel: &CancelToken) -> Result<()> {
    let name = match args.board.as_deref().or(manifest.default_board()) {
        Some(name) => name,
        None => anyhow::bail!("no board given: pass --board or set [build] default-board in socgen.toml"),
    };
    let board = resolve_board(name, project_dir, manifest)?;
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| manifest.output_root(project_dir).join(board.build_name()));

    let prepared = prepare(board, &args.options(), manifest)?;
    log::info!("{} on {} ({})", prepared.spec.build_name, prepared.spec.device, prepared.spec.toolchain);
    let report = invoke(
        prepared,
        &output_dir,
        args.actions(),
        manifest,
        args.lock_timeout_secs,
        cancel,
    )?;
    print!("{report}");
    Ok(())
}
