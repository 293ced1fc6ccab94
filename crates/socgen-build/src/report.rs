//! Summary of one orchestrator invocation.

use std::fmt;
use std::path::PathBuf;

use uuid::Uuid;

/// What an invocation did, for display after the command finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub board: String,
    pub build_name: String,
    pub device: String,
    /// Digest of the description the inputs were generated from.
    pub digest: String,
    pub output_dir: PathBuf,
    /// Generated files rewritten this run; unchanged files are not counted.
    pub files_written: usize,
    /// Set when synthesis ran.
    pub build_id: Option<Uuid>,
    pub bitstream: Option<PathBuf>,
    pub loaded: bool,
    /// Storage offset written, if flashed.
    pub flashed_at: Option<u64>,
    pub driver_dir: Option<PathBuf>,
    pub duration_ms: u64,
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Build Report ===")?;
        writeln!(f, "Board: {} ({})", self.board, self.device)?;
        writeln!(f, "Build: {}", self.build_name)?;
        writeln!(f, "Digest: {}", &self.digest[..12.min(self.digest.len())])?;
        writeln!(f, "Output: {}", self.output_dir.display())?;
        writeln!(f, "Files written: {}", self.files_written)?;
        writeln!(f, "Duration: {} ms", self.duration_ms)?;

        writeln!(f)?;
        match (&self.build_id, &self.bitstream) {
            (Some(id), Some(bitstream)) => {
                writeln!(f, "--- Synthesis: DONE ---")?;
                writeln!(f, "  Build id: {id}")?;
                writeln!(f, "  Bitstream: {}", bitstream.display())?;
            }
            _ => writeln!(f, "--- Synthesis: SKIPPED ---")?,
        }
        if self.loaded {
            writeln!(f, "--- Load: DONE ---")?;
        }
        if let Some(offset) = self.flashed_at {
            writeln!(f, "--- Flash: DONE at 0x{offset:x} ---")?;
        }
        if let Some(dir) = &self.driver_dir {
            writeln!(f, "--- Driver: {} ---", dir.display())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_sections() {
        let report = BuildReport {
            board: "tinyfpga_bx".into(),
            build_name: "tinyfpga_bx".into(),
            device: "ice40-lp8k-cm81".into(),
            digest: "0123456789abcdef0123".into(),
            output_dir: PathBuf::from("build/tinyfpga_bx"),
            files_written: 6,
            build_id: None,
            bitstream: None,
            loaded: false,
            flashed_at: Some(0x50000),
            driver_dir: None,
            duration_ms: 3,
        };
        let text = report.to_string();
        assert!(text.starts_with("=== Build Report ==="));
        assert!(text.contains("Digest: 0123456789ab\n"));
        assert!(text.contains("Synthesis: SKIPPED"));
        assert!(text.contains("Flash: DONE at 0x50000"));
        assert!(!text.contains("Load: DONE"));
    }
}
