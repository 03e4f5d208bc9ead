// Refreshed view of memory and swap
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::Path;

use tracing::debug;

use crate::helpers::to_mb;
use crate::meminfo::{self, MemorySnapshot, SwapSnapshot};
use crate::swaps::{SwapBackingBreakdown, SwapTable};

/// Memory, swap and backing breakdown captured together
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwapState {
    pub memory: MemorySnapshot,
    pub swap: SwapSnapshot,
    pub backing: SwapBackingBreakdown,
}

/// A freshly captured state and the sources that could not be read for it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capture {
    pub state: SwapState,
    /// One line per unreadable source. The values it would have supplied are zero or absent.
    pub warnings: Vec<String>,
}

impl SwapState {
    /// Read all counters fresh from the kernel interfaces
    pub fn capture<P: AsRef<Path>>(meminfo_path: P, swaps: &SwapTable) -> Capture {
        let meminfo_path = meminfo_path.as_ref();
        let mut warnings = Vec::new();

        let (memory, swap) = match meminfo::read_snapshots(meminfo_path) {
            Ok(snapshots) => snapshots,
            Err(e) => {
                warnings.push(format!(
                    "Cannot read memory counters from {}: {}",
                    meminfo_path.display(),
                    e
                ));
                (MemorySnapshot::default(), SwapSnapshot::default())
            }
        };

        let backing = match swaps.report(swap.total_bytes) {
            Ok(backing) => backing,
            Err(e) => {
                warnings.push(format!(
                    "Cannot read swap areas from {}: {}",
                    swaps.path().display(),
                    e
                ));
                SwapBackingBreakdown::default()
            }
        };

        for warning in &warnings {
            debug!("{}", warning);
        }
        Capture {
            state: Self {
                memory,
                swap,
                backing,
            },
            warnings,
        }
    }

    /// Whether any swap space is allocated
    pub fn allocated(&self) -> bool {
        self.swap.total_bytes > 0
    }

    /// Current swap size, which is also the default resize target
    pub fn swap_total_mb(&self) -> u64 {
        to_mb(self.swap.total_bytes)
    }
}
