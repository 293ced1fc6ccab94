//! `socgen clean`: remove build output.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use socgen_build::{ArtifactLayout, BuildError, BuildLock};

use crate::manifest::SocgenManifest;

/// Remove one board's output directory, or the whole output root.
///
/// Every board directory is locked before anything is deleted, so a clean
/// never races a running build.
pub fn run(project_dir: &Path, manifest: &SocgenManifest, board: Option<&str>) -> Result<()> {
    let root = manifest.output_root(project_dir);
    let target = match board {
        Some(name) => root.join(name),
        None => root,
    };
    if !target.exists() {
        println!("Already clean: {} does not exist", target.display());
        return Ok(());
    }

    let board_dirs = match board {
        Some(_) => vec![target.clone()],
        None => subdirs(&target)?,
    };
    let locks = board_dirs
        .iter()
        .map(|dir| lock_board(dir))
        .collect::<Result<Vec<_>>>()?;

    for (dir, lock) in board_dirs.iter().zip(&locks) {
        remove_contents(dir, Some(lock.path()))?;
    }
    drop(locks);
    for dir in &board_dirs {
        remove_empty(dir);
    }
    if board.is_none() {
        remove_contents(&target, None)?;
        remove_empty(&target);
    }
    println!("Removed {}", target.display());
    Ok(())
}

fn subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    Ok(dirs)
}

fn lock_board(dir: &Path) -> Result<BuildLock> {
    BuildLock::try_acquire(ArtifactLayout::new(dir).lock_path()).map_err(|e| match e {
        BuildError::LockContention { holder, .. } => {
            anyhow!("{} is locked by running build {holder}", dir.display())
        }
        other => other.into(),
    })
}

/// Delete everything in `dir` except `keep`.
fn remove_contents(dir: &Path, keep: Option<&Path>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if Some(path.as_path()) == keep {
            continue;
        }
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        }
        .with_context(|| format!("removing {}", path.display()))?;
    }
    Ok(())
}

/// A build that locked `dir` after the clean released it keeps the directory.
fn remove_empty(dir: &Path) {
    if let Err(e) = fs::remove_dir(dir) {
        log::warn!("leaving {}: {e}", dir.display());
    }
}
