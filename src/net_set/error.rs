use std::path::PathBuf;
use thiserror::Error;

use super::NetRole;
use crate::nn::NetError;
use crate::sensor::Sensor;

#[derive(Error, Debug)]
pub enum NetSetError {
    #[error("no '{set}' net set is defined for {sensor}")]
    UnknownNetSet { sensor: Sensor, set: &'static str },

    #[error("failed to load {role} net from {}: {source}", .path.display())]
    Load {
        role: NetRole,
        path: PathBuf,
        #[source]
        source: NetError,
    },

    #[error("net directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),

    #[error("net directory {} has no '{role}' subdirectory", .root.display())]
    MissingRoleDirectory { root: PathBuf, role: NetRole },

    #[error("{} must contain exactly one '*.net' file, but contains {count}", .dir.display())]
    NetFileCount { dir: PathBuf, count: usize },

    #[error("failed to scan {}: {source}", .path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("invalid net file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("incomplete net set, missing roles: {0:?}")]
    Incomplete(Vec<NetRole>),

    #[error("net role {0} supplied more than once")]
    DuplicateRole(NetRole),
}
