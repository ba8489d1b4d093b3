// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use regex::Regex;
use std::fs;
use std::path::Path;

const CANDIDATES: &[&str] = &["config.toml", "config.example.toml", ".env.example"];

/// Fail CI if a committed config carries a keeper signing key.
#[test]
fn no_committed_keeper_keys_in_configs() {
    let re = Regex::new(r"(?i)keeper_private_key\s*[=:]\s*['\x22]?(0x)?[a-f0-9]{64}").unwrap();
    for file in CANDIDATES {
        if !Path::new(file).exists() {
            continue;
        }
        let body = fs::read_to_string(file).expect("read config");
        for (idx, line) in body.lines().enumerate() {
            if line.trim_start().starts_with('#') {
                continue;
            }
            if re.is_match(line) {
                panic!("Signing key in {} at line {}", file, idx + 1);
            }
        }
    }
}

#[test]
fn example_config_loads_without_secrets() {
    let path = "config.example.toml";
    if !Path::new(path).exists() {
        return;
    }
    let body = fs::read_to_string(path).expect("read example config");
    let hex_key = Regex::new(r"0x[a-fA-F0-9]{64}").unwrap();
    assert!(
        !hex_key.is_match(&body),
        "{path} must not carry 32-byte hex values"
    );
}
