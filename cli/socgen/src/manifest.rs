//! `socgen.toml` project configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use socgen_boards::ProgrammerOverride;
use socgen_build::ToolchainOverride;

pub const MANIFEST_FILE: &str = "socgen.toml";

const DEFAULT_OUTPUT_DIR: &str = "build";
const DEFAULT_BOARDS_DIR: &str = "boards";

/// The top-level project configuration. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SocgenManifest {
    #[serde(default)]
    pub build: BuildConfig,
    /// Command overrides keyed by toolchain name (`vivado`, `icestorm`, ...).
    #[serde(default)]
    pub toolchains: HashMap<String, ToolchainOverride>,
    /// Command overrides keyed by programmer name (`openfpgaloader`, ...).
    #[serde(default)]
    pub programmers: HashMap<String, ProgrammerOverride>,
    #[serde(default)]
    pub boards: BoardsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildConfig {
    /// Root for per-board output directories.
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub default_board: Option<String>,
    /// How long a build waits for a busy output directory.
    #[serde(default)]
    pub lock_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BoardsConfig {
    /// Directories searched for `*.board.toml`, relative to the project.
    #[serde(default)]
    pub paths: Vec<String>,
}

impl SocgenManifest {
    /// Search upward from `start_dir` for `socgen.toml`, returning it with
    /// the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: SocgenManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing socgen.toml")
    }

    pub fn output_root(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(self.build.output_dir.as_deref().unwrap_or(DEFAULT_OUTPUT_DIR))
    }

    pub fn default_board(&self) -> Option<&str> {
        self.build.default_board.as_deref()
    }

    pub fn lock_timeout(&self) -> Option<Duration> {
        self.build.lock_timeout_secs.map(Duration::from_secs)
    }

    pub fn board_dirs(&self, project_dir: &Path) -> Vec<PathBuf> {
        if self.boards.paths.is_empty() {
            vec![project_dir.join(DEFAULT_BOARDS_DIR)]
        } else {
            self.boards.paths.iter().map(|p| project_dir.join(p)).collect()
        }
    }

    pub fn toolchain_override(&self, name: &str) -> Option<&ToolchainOverride> {
        self.toolchains.get(name)
    }

    pub fn programmer_override(&self, name: &str) -> Option<&ProgrammerOverride> {
        self.programmers.get(name)
    }
}
