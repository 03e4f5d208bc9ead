// Read-side view of the local machine used by the resize controller
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::{Path, PathBuf};

use crate::config::ResizerConfig;
use crate::helpers::{find_program, get_file_size_mb, get_free_space_mb};
use crate::state::{Capture, SwapState};
use crate::swaps::SwapTable;

pub trait Host {
    /// Fresh memory/swap state, with a warning for each source that could not be read
    fn refresh(&self) -> Capture;

    /// Executable lookup on PATH
    fn find_program(&self, name: &str) -> Option<PathBuf>;

    /// Free space on the filesystem holding `path`, in MB
    fn free_space_mb(&self, path: &Path) -> Option<u64>;

    /// Size of an existing file in MB, 0 when missing
    fn file_size_mb(&self, path: &Path) -> u64;

    /// Whether `path` is an active swap area
    fn is_active_swap(&self, path: &Path) -> bool;
}

/// The machine this process runs on
#[derive(Debug, Clone)]
pub struct LocalHost {
    meminfo_path: PathBuf,
    swaps: SwapTable,
}

impl LocalHost {
    pub fn new(config: &ResizerConfig) -> Self {
        Self {
            meminfo_path: config.meminfo_path.clone(),
            swaps: SwapTable::new(&config.swaps_path),
        }
    }
}

impl Host for LocalHost {
    fn refresh(&self) -> Capture {
        SwapState::capture(&self.meminfo_path, &self.swaps)
    }

    fn find_program(&self, name: &str) -> Option<PathBuf> {
        find_program(name).ok()
    }

    fn free_space_mb(&self, path: &Path) -> Option<u64> {
        get_free_space_mb(path)
    }

    fn file_size_mb(&self, path: &Path) -> u64 {
        get_file_size_mb(path)
    }

    fn is_active_swap(&self, path: &Path) -> bool {
        self.swaps.is_active(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_local_host_uses_configured_paths() {
        let dir = tempfile::tempdir().unwrap();
        let meminfo = dir.path().join("meminfo");
        let swaps = dir.path().join("swaps");
        fs::write(
            &meminfo,
            "MemTotal: 2048 kB\nMemFree: 1024 kB\nSwapTotal: 2048 kB\nSwapFree: 2048 kB\n",
        )
        .unwrap();
        fs::write(
            &swaps,
            "Filename Type Size Used Priority\n/dev/sda2 partition 2048 0 -2\n",
        )
        .unwrap();

        let config = ResizerConfig {
            meminfo_path: meminfo,
            swaps_path: swaps,
            ..ResizerConfig::default()
        };
        let host = LocalHost::new(&config);

        let capture = host.refresh();
        assert!(capture.warnings.is_empty());
        let state = capture.state;
        assert_eq!(state.swap_total_mb(), 2);
        assert_eq!(state.backing.partition_mb, Some(2));
        assert!(host.is_active_swap(Path::new("/dev/sda2")));
        assert!(!host.is_active_swap(Path::new("/swapfile")));
        assert_eq!(host.file_size_mb(&dir.path().join("absent")), 0);
        assert!(host.find_program("sh").is_some());
    }
}
