//! CLI command implementations.

pub mod board;
pub mod build;
pub mod clean;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use socgen_boards::{builtin_boards, discover_boards, find_builtin, load_board_toml, BoardDescriptor};

use crate::manifest::SocgenManifest;

/// Where a board came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardOrigin {
    Builtin,
    File(PathBuf),
}

/// Project board files, in search-path order.
pub fn project_boards(project_dir: &Path, manifest: &SocgenManifest) -> Result<Vec<(String, PathBuf)>> {
    let mut found = Vec::new();
    for dir in manifest.board_dirs(project_dir) {
        found.extend(
            discover_boards(&dir).with_context(|| format!("scanning {}", dir.display()))?,
        );
    }
    Ok(found)
}

/// Every known board: project files first, then builtins they do not shadow.
pub fn all_boards(project_dir: &Path, manifest: &SocgenManifest) -> Result<Vec<(String, BoardOrigin)>> {
    let mut boards: Vec<_> = project_boards(project_dir, manifest)?
        .into_iter()
        .map(|(name, path)| (name, BoardOrigin::File(path)))
        .collect();
    for board in builtin_boards() {
        if !boards.iter().any(|(name, _)| *name == board.name) {
            boards.push((board.name, BoardOrigin::Builtin));
        }
    }
    Ok(boards)
}

/// Resolve `name` to a board: an existing `.board.toml` path, a project
/// board, or a builtin, in that order.
pub fn resolve_board(name: &str, project_dir: &Path, manifest: &SocgenManifest) -> Result<BoardDescriptor> {
    let as_path = Path::new(name);
    if as_path.is_file() {
        return load_board_toml(as_path).with_context(|| format!("loading {name}"));
    }
    if let Some((_, path)) = project_boards(project_dir, manifest)?
        .into_iter()
        .find(|(n, _)| n == name)
    {
        return load_board_toml(&path).with_context(|| format!("loading {}", path.display()));
    }
    match find_builtin(name) {
        Some(board) => Ok(board),
        None => bail!("unknown board: '{name}'. Use 'socgen board list' to see available boards."),
    }
}
