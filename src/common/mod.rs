// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

pub mod metrics;
pub mod retry;
pub mod seen_cache;
pub mod time_utils;

