// Centralised default values for all configuration keys.
// SPDX-License-Identifier: GPL-3.0-or-later
//
// Every setting is read via `config.get("key").unwrap_or(DEFAULT)`.

// ── Swap file ────────────────────────────────────────────────────────────────

pub const SWAPFILE_PATH: &str = "/swapfile";
/// Upper bound for a requested swap file size (1 TiB)
pub const MAX_SIZE_MB: u64 = 1024 * 1024;

// ── Privilege elevation ──────────────────────────────────────────────────────

pub const PRIVILEGE_HELPER: &str = "pkexec";

// ── Kernel interfaces ────────────────────────────────────────────────────────

pub const MEMINFO_PATH: &str = "/proc/meminfo";
pub const SWAPS_PATH: &str = "/proc/swaps";
