//! `socgen board`: board listing, description, validation and templates.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use socgen_boards::{
    assemble_soc, board_to_toml, generate_template, validate_board, BoardDescriptor, BoardPlatform,
    BuildOptions, ClockInput, ClockRecipe, ResetSource, BOARD_FILE_SUFFIX,
};
use socgen_soc::Soc;

use crate::commands::{all_boards, resolve_board, BoardOrigin};
use crate::manifest::SocgenManifest;

/// List builtin and project boards.
pub fn list(project_dir: &Path, manifest: &SocgenManifest) -> Result<()> {
    println!("Boards:");
    println!();
    for (name, origin) in all_boards(project_dir, manifest)? {
        match origin {
            BoardOrigin::Builtin => {
                let board = resolve_board(&name, project_dir, manifest)?;
                println!("  {name:<32} {} ({})", board.device, board.toolchain);
            }
            BoardOrigin::File(path) => println!("  {name:<32} {}", path.display()),
        }
    }
    println!();
    println!("Use 'socgen board describe <name>' for details.");
    Ok(())
}

fn clock_input(input: &ClockInput) -> String {
    match input {
        ClockInput::Pin(pin) => pin.clone(),
        ClockInput::Peripheral { name, frequency_hz } => format!("{name} ({frequency_hz} Hz)"),
    }
}

/// Human-readable board summary.
pub fn summary(board: &BoardDescriptor) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== Board: {} ===\n", board.name));
    out.push_str(&format!("Ident: {}\n", board.ident));
    out.push_str(&format!("Device: {}\n", board.device));
    for (variant, device) in &board.variants {
        let marker = if board.default_variant.as_deref() == Some(variant.as_str()) { " (default)" } else { "" };
        out.push_str(&format!("  variant {variant}: {device}{marker}\n"));
    }
    out.push_str(&format!("Toolchain: {}\n", board.toolchain));
    out.push_str(&format!("Default sys clock: {} Hz\n", board.default_sys_clk_freq));

    out.push_str("\n--- Clock ---\n");
    match &board.clock {
        ClockRecipe::Passthrough { input, .. } => {
            out.push_str(&format!("  passthrough from {}\n", clock_input(input)));
        }
        ClockRecipe::Pll { family, input, extra_outputs, .. } => {
            out.push_str(&format!("  {family} from {}\n", clock_input(input)));
            for extra in extra_outputs {
                let reset = if extra.reset_less { ", reset-less" } else { "" };
                out.push_str(&format!("  {}: {} Hz{reset}\n", extra.domain, extra.frequency_hz));
            }
        }
    }
    let resets: Vec<String> = board
        .clock
        .resets()
        .iter()
        .map(|r| match r {
            ResetSource::Pin(pin) => format!("pin {pin}"),
            ResetSource::Soft => "soft".to_string(),
            ResetSource::Peripheral(name) => format!("{name} reset"),
        })
        .collect();
    if !resets.is_empty() {
        out.push_str(&format!("  resets: {}\n", resets.join(", ")));
    }

    out.push_str("\n--- Peripherals ---\n");
    let p = &board.peripherals;
    out.push_str(&format!("  led chaser: {}\n", if p.led_chaser { "yes" } else { "no" }));
    if let Some(flash) = &p.spi_flash {
        let always = if flash.always { " (always)" } else { "" };
        out.push_str(&format!("  spi flash: {}{always}\n", flash.module));
    }
    if let Some(rom) = &p.boot_rom {
        out.push_str(&format!("  boot rom: 0x{:x} bytes at flash +0x{:x}\n", rom.size, rom.default_offset));
    }
    if let Some(pcie) = &p.pcie {
        out.push_str(&format!("  pcie: x{}, {} bit\n", pcie.lanes, pcie.data_width));
    }
    if let Some(video) = &p.video_terminal {
        out.push_str(&format!("  video terminal: {}\n", video.timings));
    }

    out.push_str("\n--- Programming ---\n");
    match &board.programmer {
        Some(programmer) => out.push_str(&format!("  programmer: {}\n", programmer.kind)),
        None => out.push_str("  programmer: none\n"),
    }
    match &board.flash {
        Some(flash) => out.push_str(&format!(
            "  flash: {}{} at 0x{:x}\n",
            board.build_name(),
            flash.image_ext,
            flash.offset
        )),
        None => out.push_str("  flash: none\n"),
    }
    out.push_str(&format!("  pins: {}\n", board.pins.len()));
    out
}

/// The SoC the board composes with default options.
pub fn default_soc(board: &BoardDescriptor) -> Result<Soc> {
    let options = BuildOptions {
        with_pcie: board.peripherals.pcie.is_some(),
        ..BuildOptions::default()
    };
    let mut platform = BoardPlatform::new(board);
    assemble_soc(board, &mut platform, &options)
        .with_context(|| format!("composing default SoC for {}", board.name))
}

/// Describe a board, as text, TOML, or with its default SoC.
pub fn describe(
    name: &str,
    project_dir: &Path,
    manifest: &SocgenManifest,
    format: Option<&str>,
    soc: bool,
) -> Result<()> {
    let board = resolve_board(name, project_dir, manifest)?;
    match format {
        Some("toml") => print!("{}", board_to_toml(&board)?),
        None | Some("text") => print!("{}", summary(&board)),
        Some(other) => bail!("unknown format '{other}' (expected text or toml)"),
    }
    if soc {
        println!();
        print!("{}", default_soc(&board)?);
    }
    Ok(())
}

/// Validate a board name or `.board.toml` path; warnings alone pass.
pub fn validate(name: &str, project_dir: &Path, manifest: &SocgenManifest) -> Result<()> {
    let board = resolve_board(name, project_dir, manifest)?;
    match validate_board(&board) {
        Ok(()) => {
            println!("{}: OK", board.name);
            Ok(())
        }
        Err(issues) => {
            for issue in &issues {
                println!("  [{}] {}", issue.severity, issue.message);
            }
            let errors = issues.iter().filter(|i| i.severity == "error").count();
            if errors > 0 {
                bail!("{}: {errors} validation error(s)", board.name);
            }
            println!("{}: OK with {} warning(s)", board.name, issues.len());
            Ok(())
        }
    }
}

/// Write a `<name>.board.toml` template into the first board directory.
pub fn template(name: &str, project_dir: &Path, manifest: &SocgenManifest) -> Result<()> {
    let dir = manifest
        .board_dirs(project_dir)
        .into_iter()
        .next()
        .unwrap_or_else(|| project_dir.to_path_buf());
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(format!("{name}{BOARD_FILE_SUFFIX}"));
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    fs::write(&path, generate_template(name)?).with_context(|| format!("writing {}", path.display()))?;
    println!("Created {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use socgen_boards::{builtin_boards, find_builtin};

    #[test]
    fn summary_mentions_pll_and_flash() {
        let board = find_builtin("ego1").unwrap();
        let text = summary(&board);
        assert!(text.starts_with("=== Board: ego1 ==="));
        assert!(text.contains("vga: 25000000 Hz, reset-less"), "{text}");
        assert!(text.contains("flash: ego1.bin at 0x0"));
        assert!(text.contains("resets: pin cpu_reset, soft"), "{text}");
    }

    #[test]
    fn every_builtin_has_default_soc() {
        for board in builtin_boards() {
            let soc = default_soc(&board).unwrap();
            assert_eq!(soc.build_name, board.name);
        }
    }

    #[test]
    fn template_then_validate() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = SocgenManifest::default();
        template("myboard", dir.path(), &manifest).unwrap();
        assert!(dir.path().join("boards/myboard.board.toml").is_file());
        validate("myboard", dir.path(), &manifest).unwrap();
        assert!(template("myboard", dir.path(), &manifest).is_err());
    }

    #[test]
    fn validate_rejects_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut board = find_builtin("tinyfpga_bx").unwrap();
        board.default_variant = Some("missing".into());
        let path = dir.path().join("broken.board.toml");
        fs::write(&path, board_to_toml(&board).unwrap()).unwrap();
        let err = validate(path.to_str().unwrap(), dir.path(), &SocgenManifest::default()).unwrap_err();
        assert!(err.to_string().contains("validation error"));
    }

    #[test]
    fn describe_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        assert!(describe("ego1", dir.path(), &SocgenManifest::default(), Some("yaml"), false).is_err());
    }
}
