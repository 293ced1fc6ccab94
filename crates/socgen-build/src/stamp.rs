//! Record of the last successful build in an output directory.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildStamp {
    pub build_id: Uuid,
    /// Digest of the description the bitstream was built from.
    pub digest: String,
    pub bitstream: String,
    pub toolchain: String,
}

impl BuildStamp {
    pub fn new(digest: &str, bitstream: &str, toolchain: &str) -> Self {
        Self {
            build_id: Uuid::new_v4(),
            digest: digest.to_string(),
            bitstream: bitstream.to_string(),
            toolchain: toolchain.to_string(),
        }
    }

    /// Read a stamp; `None` when no build has completed.
    pub fn read(path: &Path) -> Result<Option<Self>> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Remove any stamp at `path`.
    pub fn clear(path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_stamp_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".socgen-stamp.json");
        assert_eq!(BuildStamp::read(&path).unwrap(), None);
        BuildStamp::clear(&path).unwrap();
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".socgen-stamp.json");
        let stamp = BuildStamp::new("abc123", "ego1.bit", "vivado");
        stamp.write(&path).unwrap();
        assert_eq!(BuildStamp::read(&path).unwrap(), Some(stamp));
        BuildStamp::clear(&path).unwrap();
        assert!(!path.exists());
    }
}
