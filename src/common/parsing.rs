// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use alloy::primitives::U256;

pub fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Token amount written as decimal (`1_000`) or 0x-prefixed hex.
pub fn parse_amount(raw: &str) -> Option<U256> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != '_').collect();
    if cleaned.is_empty() {
        return None;
    }
    if cleaned.starts_with("0x") || cleaned.starts_with("0X") {
        U256::from_str_radix(strip_0x(&cleaned), 16).ok()
    } else {
        U256::from_str_radix(&cleaned, 10).ok()
    }
}
