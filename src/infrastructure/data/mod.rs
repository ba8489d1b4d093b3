// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

pub mod contracts;
pub mod db;
pub mod memory;
pub mod records;
pub mod rows;
pub mod schema;
pub mod streams;
