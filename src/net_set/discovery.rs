use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::NetRole;
use super::error::NetSetError;

/// Resolves the weight file of every role inside a user-supplied net directory.
///
/// Each role lives in a subdirectory named after [`NetRole::dir_name`]
/// (matched case-insensitively) holding exactly one `*.net` file.
pub fn discover(root: &Path) -> Result<Vec<(NetRole, PathBuf)>, NetSetError> {
    if !root.is_dir() {
        return Err(NetSetError::MissingDirectory(root.to_path_buf()));
    }

    let mut subdirs = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| NetSetError::Scan {
            path: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_dir() {
            subdirs.push(entry.into_path());
        }
    }
    subdirs.sort();

    NetRole::ALL
        .into_iter()
        .map(|role| {
            let dir = subdirs
                .iter()
                .find(|dir| {
                    dir.file_name()
                        .is_some_and(|name| name.to_string_lossy().eq_ignore_ascii_case(role.dir_name()))
                })
                .ok_or_else(|| NetSetError::MissingRoleDirectory {
                    root: root.to_path_buf(),
                    role,
                })?;
            Ok((role, single_net_file(dir)?))
        })
        .collect()
}

fn single_net_file(dir: &Path) -> Result<PathBuf, NetSetError> {
    let pattern = format!("{}/*.net", Pattern::escape(&dir.to_string_lossy()));
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };

    let mut files: Vec<PathBuf> = glob::glob_with(&pattern, options)?
        .filter_map(Result::ok)
        .filter(|path| path.is_file())
        .collect();

    match files.len() {
        1 => Ok(files.remove(0)),
        count => Err(NetSetError::NetFileCount {
            dir: dir.to_path_buf(),
            count,
        }),
    }
}
