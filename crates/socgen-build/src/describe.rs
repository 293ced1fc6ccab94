//! Serializes a finalized SoC into the inputs handed to the toolchain.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use socgen_boards::{BoardDescriptor, FlashTarget, ToolchainKind};
use socgen_soc::Soc;

use crate::collateral;
use crate::error::Result;
use crate::layout::{DRIVER_DIR, GATEWARE_DIR, SOFTWARE_DIR};

/// One generated file, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub contents: String,
}

impl GeneratedFile {
    fn new(dir: &str, name: impl AsRef<str>, contents: String) -> Self {
        Self {
            path: PathBuf::from(dir).join(name.as_ref()),
            contents,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct Description<'a> {
    board: &'a str,
    device: &'a str,
    toolchain: ToolchainKind,
    soc: &'a Soc,
}

/// Everything needed to build, load and flash one SoC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildArtifactSpec {
    pub board: String,
    pub device: String,
    pub toolchain: ToolchainKind,
    pub build_name: String,
    pub bitstream_ext: String,
    pub flash: Option<FlashTarget>,
    pub has_pcie: bool,
    /// SHA-256 of the JSON description, hex encoded.
    pub digest: String,
    /// Toolchain inputs.
    pub gateware: Vec<GeneratedFile>,
    /// Headers and linker regions for firmware.
    pub software: Vec<GeneratedFile>,
    /// Host driver headers; empty without PCIe.
    pub driver: Vec<GeneratedFile>,
}

impl BuildArtifactSpec {
    /// File name of the bitstream the toolchain produces.
    pub fn bitstream_name(&self) -> String {
        format!("{}{}", self.build_name, self.bitstream_ext)
    }

    /// File name of the image written to flash, if the board has flash.
    pub fn flash_image_name(&self) -> Option<String> {
        self.flash
            .as_ref()
            .map(|f| format!("{}{}", self.build_name, f.image_ext))
    }

    /// Short digest for display.
    pub fn short_digest(&self) -> &str {
        &self.digest[..12.min(self.digest.len())]
    }
}

/// Format bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Describe `soc` for `board`; `variant` selects the device.
pub fn describe(soc: &Soc, board: &BoardDescriptor, variant: Option<&str>) -> Result<BuildArtifactSpec> {
    let device = board.resolve_device(variant)?;
    let description = serde_json::to_string_pretty(&Description {
        board: &board.name,
        device,
        toolchain: board.toolchain,
        soc,
    })?;
    let digest = hex_encode(&Sha256::digest(description.as_bytes()));

    let name = &soc.build_name;
    let gateware = vec![
        GeneratedFile::new(GATEWARE_DIR, format!("{name}.json"), description),
        GeneratedFile::new(GATEWARE_DIR, format!("{name}.sdc"), collateral::sdc(soc)),
    ];
    let software = vec![
        GeneratedFile::new(SOFTWARE_DIR, "regions.ld", collateral::regions_ld(soc)),
        GeneratedFile::new(SOFTWARE_DIR, "mem.h", collateral::mem_h(soc)),
        GeneratedFile::new(SOFTWARE_DIR, "soc.h", collateral::soc_h(soc)),
        GeneratedFile::new(SOFTWARE_DIR, "csr.h", collateral::csr_h(soc)),
    ];
    let driver = match collateral::driver_config_h(soc) {
        Some(config) => vec![
            GeneratedFile::new(DRIVER_DIR, "config.h", config),
            GeneratedFile::new(DRIVER_DIR, "csr.h", collateral::csr_h(soc)),
            GeneratedFile::new(DRIVER_DIR, "soc.h", collateral::soc_h(soc)),
        ],
        None => Vec::new(),
    };

    Ok(BuildArtifactSpec {
        board: board.name.clone(),
        device: device.to_string(),
        toolchain: board.toolchain,
        build_name: name.clone(),
        bitstream_ext: board.bitstream_ext().to_string(),
        flash: board.flash.clone(),
        has_pcie: !driver.is_empty(),
        digest,
        gateware,
        software,
        driver,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use socgen_boards::{assemble_soc, find_builtin, BoardPlatform, BuildOptions};

    fn spec(board: &str, options: &BuildOptions) -> BuildArtifactSpec {
        let board = find_builtin(board).unwrap();
        let mut platform = BoardPlatform::new(&board);
        let soc = assemble_soc(&board, &mut platform, options).unwrap();
        describe(&soc, &board, options.variant.as_deref()).unwrap()
    }

    #[test]
    fn deterministic_description() {
        let a = spec("ego1", &BuildOptions::default());
        let b = spec("ego1", &BuildOptions::default());
        assert_eq!(a, b);
        assert_eq!(a.digest.len(), 64);
        assert_eq!(a.bitstream_name(), "ego1.bit");
        assert_eq!(a.flash_image_name().as_deref(), Some("ego1.bin"));
    }

    #[test]
    fn options_change_digest() {
        let a = spec("ego1", &BuildOptions::default());
        let b = spec(
            "ego1",
            &BuildOptions {
                sys_clk_freq: Some(50_000_000),
                ..BuildOptions::default()
            },
        );
        assert_ne!(a.digest, b.digest);
    }

    #[test]
    fn variant_device() {
        let options = BuildOptions {
            variant: Some("z7-20".into()),
            ..BuildOptions::default()
        };
        let spec = spec("krtkl_snickerdoodle", &options);
        assert_eq!(spec.device, "xc7z020clg400-3");
        assert!(spec.driver.is_empty());
        assert!(!spec.has_pcie);
    }

    #[test]
    fn icestorm_writes_bin() {
        let spec = spec("tinyfpga_bx", &BuildOptions::default());
        assert_eq!(spec.bitstream_name(), "tinyfpga_bx.bin");
        assert!(spec.flash_image_name().is_none());
        let paths: Vec<_> = spec.software.iter().map(|f| f.path.clone()).collect();
        assert!(paths.contains(&PathBuf::from("software/regions.ld")));
    }

    #[test]
    fn pcie_driver_files() {
        let options = BuildOptions {
            with_pcie: true,
            ..BuildOptions::default()
        };
        let spec = spec("decklink_intensity_pro_4k", &options);
        assert!(spec.has_pcie);
        assert_eq!(spec.driver.len(), 3);
        assert!(spec.driver[0].path.starts_with("driver"));
    }
}
