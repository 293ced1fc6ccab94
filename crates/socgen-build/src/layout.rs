//! On-disk artifact layout of one output directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::describe::GeneratedFile;
use crate::error::Result;

pub const GATEWARE_DIR: &str = "gateware";
pub const SOFTWARE_DIR: &str = "software";
pub const DRIVER_DIR: &str = "driver";

const STAMP_FILE: &str = ".socgen-stamp.json";
const LOCK_FILE: &str = ".socgen.lock";

/// Paths under a build output directory.
///
/// ```text
/// <root>/.socgen.lock
/// <root>/gateware/<build_name>.json, .sdc, .log, bitstream, .socgen-stamp.json
/// <root>/software/regions.ld, mem.h, soc.h, csr.h
/// <root>/driver/config.h, csr.h, soc.h
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn gateware_dir(&self) -> PathBuf {
        self.root.join(GATEWARE_DIR)
    }

    pub fn software_dir(&self) -> PathBuf {
        self.root.join(SOFTWARE_DIR)
    }

    pub fn driver_dir(&self) -> PathBuf {
        self.root.join(DRIVER_DIR)
    }

    /// Where the toolchain is expected to leave `file_name`.
    pub fn gateware_file(&self, file_name: &str) -> PathBuf {
        self.gateware_dir().join(file_name)
    }

    pub fn stamp_path(&self) -> PathBuf {
        self.gateware_dir().join(STAMP_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    /// Create the root directory if it does not exist.
    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Write `files` under the root, creating parent directories.
    ///
    /// Files whose contents are already identical are left untouched so
    /// their modification times do not trigger toolchain rebuilds.
    pub fn write_files(&self, files: &[GeneratedFile]) -> Result<usize> {
        let mut written = 0;
        for file in files {
            let path = self.root.join(&file.path);
            if fs::read_to_string(&path).is_ok_and(|existing| existing == file.contents) {
                log::debug!("unchanged {}", path.display());
                continue;
            }
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &file.contents)?;
            log::debug!("wrote {}", path.display());
            written += 1;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths() {
        let layout = ArtifactLayout::new("/tmp/out");
        assert_eq!(layout.gateware_file("ego1.bit"), PathBuf::from("/tmp/out/gateware/ego1.bit"));
        assert_eq!(layout.stamp_path(), PathBuf::from("/tmp/out/gateware/.socgen-stamp.json"));
        assert_eq!(layout.lock_path(), PathBuf::from("/tmp/out/.socgen.lock"));
        assert_eq!(layout.driver_dir(), PathBuf::from("/tmp/out/driver"));
    }

    #[test]
    fn rewrite_skips_identical() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArtifactLayout::new(dir.path());
        let files = vec![GeneratedFile {
            path: PathBuf::from("software/mem.h"),
            contents: "#define X 1\n".into(),
        }];
        assert_eq!(layout.write_files(&files).unwrap(), 1);
        assert_eq!(layout.write_files(&files).unwrap(), 0);
        let text = fs::read_to_string(layout.software_dir().join("mem.h")).unwrap();
        assert_eq!(text, "#define X 1\n");
    }
}
