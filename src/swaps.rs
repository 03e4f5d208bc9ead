// Swap area table (/proc/swaps) and partition/file breakdown
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::helpers::{kb_to_mb, read_file, Result};

/// Backing kind of a swap area, from the Type column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapKind {
    Partition,
    File,
    Other(String),
}

impl SwapKind {
    /// Parse the Type column (case-insensitive)
    pub fn parse_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "partition" => SwapKind::Partition,
            "file" => SwapKind::File,
            other => SwapKind::Other(other.to_string()),
        }
    }
}

/// One active swap area
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapArea {
    pub path: PathBuf,
    pub kind: SwapKind,
    pub size_kb: u64,
    pub used_kb: u64,
    pub priority: i32,
}

/// Swap capacity per backing kind, in MB.
/// `None` means no area of that kind exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwapBackingBreakdown {
    pub partition_mb: Option<u64>,
    pub file_mb: Option<u64>,
}

impl SwapBackingBreakdown {
    pub fn from_areas(areas: &[SwapArea]) -> Self {
        let mut partition_kb: u64 = 0;
        let mut file_kb: u64 = 0;

        for area in areas {
            match area.kind {
                SwapKind::Partition => partition_kb = partition_kb.saturating_add(area.size_kb),
                SwapKind::File => file_kb = file_kb.saturating_add(area.size_kb),
                SwapKind::Other(_) => {}
            }
        }

        Self {
            partition_mb: (partition_kb > 0).then(|| kb_to_mb(partition_kb)),
            file_mb: (file_kb > 0).then(|| kb_to_mb(file_kb)),
        }
    }
}

/// Render an optional MB value the way the status view shows it
pub fn format_mb(value: Option<u64>) -> String {
    match value {
        Some(mb) => format!("{} MB", mb),
        None => "N/A".to_string(),
    }
}

/// Parse swap table content.
/// Format: `Filename Type Size Used Priority`, sizes in KiB, one header line.
pub fn parse_swap_areas(content: &str) -> Vec<SwapArea> {
    let mut areas = Vec::new();

    // Skip header: Filename Type Size Used Priority
    for line in content.lines().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            continue;
        }

        let size_kb: u64 = match fields[2].parse() {
            Ok(v) => v,
            Err(_) => {
                debug!("Skipping swap entry with bad size: {}", line);
                continue;
            }
        };

        areas.push(SwapArea {
            path: PathBuf::from(fields[0]),
            kind: SwapKind::parse_str(fields[1]),
            size_kb,
            used_kb: fields.get(3).and_then(|s| s.parse().ok()).unwrap_or(0),
            priority: fields.get(4).and_then(|s| s.parse().ok()).unwrap_or(0),
        });
    }

    areas
}

/// Reader for the kernel swap area table
#[derive(Debug, Clone)]
pub struct SwapTable {
    path: PathBuf,
}

impl SwapTable {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_areas(&self) -> Result<Vec<SwapArea>> {
        Ok(parse_swap_areas(&read_file(&self.path)?))
    }

    /// Active swap areas; empty when the table cannot be read
    pub fn areas(&self) -> Vec<SwapArea> {
        match self.read_areas() {
            Ok(areas) => areas,
            Err(e) => {
                debug!("Cannot read {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    /// Partition/file breakdown. The table is not read at all when there is no swap.
    pub fn report(&self, swap_total_bytes: u64) -> Result<SwapBackingBreakdown> {
        if swap_total_bytes == 0 {
            return Ok(SwapBackingBreakdown::default());
        }
        Ok(SwapBackingBreakdown::from_areas(&self.read_areas()?))
    }

    /// Whether `path` is currently an active swap area
    pub fn is_active(&self, path: &Path) -> bool {
        self.areas().iter().any(|area| area.path == path)
    }
}
