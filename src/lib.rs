// swap-resizer - Memory/swap reporting and swap file resizing for Linux
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod command;
pub mod config;
pub mod defaults;
pub mod helpers;
pub mod host;
pub mod meminfo;
pub mod resize;
pub mod state;
pub mod status;
pub mod swaps;
