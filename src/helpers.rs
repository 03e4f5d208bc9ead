// Helper utilities for swap-resizer
// SPDX-License-Identifier: GPL-3.0-or-later

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

pub const KB: u64 = 1024;
pub const MB: u64 = 1024 * KB;

#[derive(Error, Debug)]
pub enum HelperError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Program not found on PATH: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, HelperError>;

/// Bytes to whole megabytes, rounded up
pub fn to_mb(bytes: u64) -> u64 {
    bytes.div_ceil(MB)
}

/// Kilobytes to whole megabytes, rounded up
pub fn kb_to_mb(kb: u64) -> u64 {
    kb.div_ceil(KB)
}

/// Read entire file to string
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<String> {
    Ok(fs::read_to_string(path)?)
}

/// Locate an executable on PATH
pub fn find_program(name: &str) -> Result<PathBuf> {
    match which::which(name) {
        Ok(path) => {
            debug!("Found {} at {}", name, path.display());
            Ok(path)
        }
        Err(_) => Err(HelperError::NotFound(name.to_string())),
    }
}

/// Free space in whole megabytes on the filesystem holding `path`.
/// Falls back to the parent directory when the path itself does not exist yet.
pub fn get_free_space_mb<P: AsRef<Path>>(path: P) -> Option<u64> {
    let path = path.as_ref();
    let check_path = if path.exists() {
        path.to_path_buf()
    } else {
        path.parent()
            .filter(|p| p.exists())
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("/"))
    };

    nix::sys::statvfs::statvfs(&check_path)
        .ok()
        .map(|stat| (stat.blocks_available() as u64 * stat.fragment_size() as u64) / MB)
}

/// Apparent size of a regular file in whole megabytes (0 when missing)
pub fn get_file_size_mb<P: AsRef<Path>>(path: P) -> u64 {
    fs::metadata(path)
        .ok()
        .filter(|m| m.is_file())
        .map(|m| to_mb(m.len()))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_mb_rounds_up() {
        assert_eq!(to_mb(0), 0);
        assert_eq!(to_mb(1), 1);
        assert_eq!(to_mb(MB), 1);
        assert_eq!(to_mb(MB + 1), 2);
        assert_eq!(to_mb(2048 * MB), 2048);
    }

    #[test]
    fn test_kb_to_mb_rounds_up() {
        assert_eq!(kb_to_mb(0), 0);
        assert_eq!(kb_to_mb(1), 1);
        assert_eq!(kb_to_mb(1024), 1);
        assert_eq!(kb_to_mb(2_097_152), 2048);
        assert_eq!(kb_to_mb(1_048_577), 1025);
    }

    #[test]
    fn test_find_program_missing() {
        let result = find_program("swap-resizer-no-such-program");
        assert!(matches!(result, Err(HelperError::NotFound(_))));
    }

    #[test]
    fn test_file_size_mb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swapfile");
        assert_eq!(get_file_size_mb(&path), 0);
        fs::write(&path, vec![0u8; (MB + 10) as usize]).unwrap();
        assert_eq!(get_file_size_mb(&path), 2);
    }

    #[test]
    fn test_free_space_of_missing_path_uses_parent() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not-created-yet");
        assert!(get_free_space_mb(&missing).is_some());
    }
}
