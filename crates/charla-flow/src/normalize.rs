// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Input normalization.
//!
//! Every inbound text is trimmed, uppercased, stripped of Spanish
//! diacritics, and whitespace-collapsed before the engine looks at it,
//! so "  menú " and "MENU" are the same command.

/// Command that resets the flow to the main menu from any stage.
pub const RESET_COMMAND: &str = "MENU";

/// Normalize raw user input for option matching.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_space = true;
    for c in raw.trim().chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
            continue;
        }
        last_was_space = false;
        for up in c.to_uppercase() {
            out.push(strip_diacritic(up));
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

fn strip_diacritic(c: char) -> char {
    match c {
        'Á' | 'À' | 'Ä' | 'Â' => 'A',
        'É' | 'È' | 'Ë' | 'Ê' => 'E',
        'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
        'Ó' | 'Ò' | 'Ö' | 'Ô' => 'O',
        'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
        'Ñ' => 'N',
        other => other,
    }
}

/// Whether normalized input is the reset-to-menu command.
pub fn is_reset(normalized: &str) -> bool {
    normalized == RESET_COMMAND
}

/// Parse normalized input as a bounded menu digit. Options across all
/// stages fit in 1..=14; anything else is treated as free text.
pub fn parse_option(normalized: &str) -> Option<u8> {
    let n: u8 = normalized.parse().ok()?;
    (1..=14).contains(&n).then_some(n)
}
