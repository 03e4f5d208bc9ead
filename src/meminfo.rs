// Memory information parser for /proc/meminfo
// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemInfoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Missing field: {0}")]
    MissingField(String),
    #[error("Parse error: {0}")]
    ParseError(String),
}

pub type Result<T> = std::result::Result<T, MemInfoError>;

/// Physical memory at the time of capture
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemorySnapshot {
    pub total_bytes: u64,
    pub used_bytes: u64,
}

impl MemorySnapshot {
    pub fn available_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.used_bytes)
    }
}

/// Swap totals at the time of capture
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwapSnapshot {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
}

/// Read memory stats from a meminfo-formatted reader.
/// Reads only until all requested fields are found, then stops.
/// Fields listed in `optional` are collected when present but never reported missing.
fn parse_mem_stats<R: BufRead>(
    reader: R,
    fields: &[&str],
    optional: &[&str],
) -> Result<HashMap<String, u64>> {
    let mut stats = HashMap::new();
    let mut remaining: HashSet<&str> = fields.iter().chain(optional).copied().collect();

    for line in reader.lines() {
        let line = line?;

        // Parse "Key:   value kB" format
        if let Some(colon_pos) = line.find(':') {
            let key = &line[..colon_pos];

            if remaining.contains(key) {
                let value_part = line[colon_pos + 1..].trim();
                let parts: Vec<&str> = value_part.split_whitespace().collect();

                let value = if parts.len() >= 2 && parts[1] == "kB" {
                    parts[0]
                        .parse::<u64>()
                        .map_err(|e| MemInfoError::ParseError(format!("{}: {}", key, e)))?
                        .checked_mul(1024)
                        .ok_or_else(|| {
                            MemInfoError::ParseError(format!("{}: value too large", key))
                        })?
                } else if !parts.is_empty() {
                    parts[0]
                        .parse::<u64>()
                        .map_err(|e| MemInfoError::ParseError(format!("{}: {}", key, e)))?
                } else {
                    continue;
                };

                stats.insert(key.to_string(), value);
                remaining.remove(key);

                // Early exit if all fields found
                if remaining.is_empty() {
                    break;
                }
            }
        }
    }

    let mut missing: Vec<&str> = fields
        .iter()
        .copied()
        .filter(|f| !stats.contains_key(*f))
        .collect();
    if !missing.is_empty() {
        missing.sort_unstable();
        return Err(MemInfoError::MissingField(missing.join(", ")));
    }

    Ok(stats)
}

/// Capture memory and swap snapshots, failing if the source is unreadable.
///
/// Used RAM is `MemTotal - MemAvailable`. Kernels older than 3.14 lack
/// `MemAvailable`, in which case `MemFree` stands in for it.
pub fn read_snapshots<P: AsRef<Path>>(path: P) -> Result<(MemorySnapshot, SwapSnapshot)> {
    let file = File::open(path)?;
    let stats = parse_mem_stats(
        BufReader::new(file),
        &["MemTotal", "MemFree", "SwapTotal", "SwapFree"],
        &["MemAvailable"],
    )?;

    let mem_total = stats["MemTotal"];
    let mem_available = stats
        .get("MemAvailable")
        .copied()
        .unwrap_or(stats["MemFree"]);
    let swap_total = stats["SwapTotal"];
    let swap_free = stats["SwapFree"];

    let memory = MemorySnapshot {
        total_bytes: mem_total,
        used_bytes: mem_total.saturating_sub(mem_available),
    };
    let swap = SwapSnapshot {
        total_bytes: swap_total,
        used_bytes: swap_total.saturating_sub(swap_free),
        free_bytes: swap_free,
    };
    Ok((memory, swap))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    const SAMPLE: &str = "\
MemTotal:       16384000 kB
MemFree:         2048000 kB
MemAvailable:    8192000 kB
Buffers:          512000 kB
SwapTotal:       2097152 kB
SwapFree:        1048576 kB
HugePages_Total:       0
";

    #[test]
    fn test_parse_mem_stats_converts_kb() {
        let stats =
            parse_mem_stats(Cursor::new(SAMPLE), &["MemTotal", "HugePages_Total"], &[]).unwrap();
        assert_eq!(stats["MemTotal"], 16_384_000 * 1024);
        assert_eq!(stats["HugePages_Total"], 0);
    }

    #[test]
    fn test_parse_mem_stats_missing_field() {
        let err = parse_mem_stats(Cursor::new("MemTotal: 1 kB\n"), &["MemTotal", "SwapFree"], &[])
            .unwrap_err();
        assert!(matches!(err, MemInfoError::MissingField(ref f) if f == "SwapFree"));
    }

    #[test]
    fn test_parse_mem_stats_bad_number() {
        let err = parse_mem_stats(Cursor::new("MemTotal: lots kB\n"), &["MemTotal"], &[])
            .unwrap_err();
        assert!(matches!(err, MemInfoError::ParseError(_)));
    }

    #[test]
    fn test_read_snapshots() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let (memory, swap) = read_snapshots(file.path()).unwrap();
        assert_eq!(memory.total_bytes, 16_384_000 * 1024);
        assert_eq!(memory.used_bytes, (16_384_000 - 8_192_000) * 1024);
        assert_eq!(memory.available_bytes(), 8_192_000 * 1024);
        assert_eq!(swap.total_bytes, 2_097_152 * 1024);
        assert_eq!(swap.used_bytes, 1_048_576 * 1024);
        assert_eq!(swap.free_bytes, 1_048_576 * 1024);
    }

    #[test]
    fn test_read_snapshots_without_memavailable() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "MemTotal: 1000 kB\nMemFree: 400 kB\nSwapTotal: 0 kB\nSwapFree: 0 kB\n"
        )
        .unwrap();

        let (memory, swap) = read_snapshots(file.path()).unwrap();
        assert_eq!(memory.used_bytes, 600 * 1024);
        assert_eq!(swap, SwapSnapshot::default());
    }

    #[test]
    fn test_kb_value_overflow_is_parse_error() {
        let content = format!("MemTotal: {} kB\n", u64::MAX);
        let err = parse_mem_stats(Cursor::new(content), &["MemTotal"], &[]).unwrap_err();
        assert!(matches!(err, MemInfoError::ParseError(ref m) if m.contains("too large")));
    }

    #[test]
    fn test_read_snapshots_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_snapshots(dir.path().join("meminfo")).unwrap_err();
        assert!(matches!(err, MemInfoError::Io(_)));
    }

    #[test]
    fn test_read_live() {
        // Hosts without /proc just return an error
        if let Ok((memory, swap)) = read_snapshots(crate::defaults::MEMINFO_PATH) {
            assert!(memory.used_bytes <= memory.total_bytes);
            assert!(swap.used_bytes <= swap.total_bytes);
        }
    }
}
