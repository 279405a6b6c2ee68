//! Emoji extraction and stripping.
//!
//! Each character of a review is classified against the Unicode emoji table
//! shipped with the `emojis` crate. Regional-indicator pairs are looked up as a
//! single flag emoji; every other code point is looked up on its own.

use serde::Serialize;

const ZERO_WIDTH_JOINER: char = '\u{200D}';
const VARIATION_SELECTOR_16: char = '\u{FE0F}';

/// Emoji found in a piece of text together with the text stripped of them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmojiInfo {
    pub emojis: Vec<String>,
    pub count: usize,
    pub descriptions: Vec<String>,
    pub clean_text: String,
}

/// Extract emoji from `text`.
///
/// Missing text yields an empty result rather than an error.
pub fn extract(text: Option<&str>) -> EmojiInfo {
    let Some(text) = text else {
        return EmojiInfo::default();
    };

    let mut found = Vec::new();
    let mut descriptions = Vec::new();
    let mut clean = String::with_capacity(text.len());
    let mut previous_removed = false;

    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];

        if is_regional_indicator(c) && i + 1 < chars.len() && is_regional_indicator(chars[i + 1]) {
            let pair: String = [c, chars[i + 1]].iter().collect();
            if let Some(emoji) = emojis::get(&pair) {
                found.push(pair);
                descriptions.push(describe(country_name(emoji.name())));
                previous_removed = true;
                i += 2;
                continue;
            }
        }

        let mut buf = [0u8; 4];
        if let Some(emoji) = emojis::get(c.encode_utf8(&mut buf)) {
            found.push(c.to_string());
            descriptions.push(describe(emoji.name()));
            previous_removed = true;
        } else if previous_removed && (c == ZERO_WIDTH_JOINER || c == VARIATION_SELECTOR_16) {
            // glue of a sequence whose parts were removed
        } else {
            clean.push(c);
            previous_removed = false;
        }
        i += 1;
    }

    EmojiInfo {
        count: found.len(),
        emojis: found,
        descriptions,
        clean_text: clean.trim().to_string(),
    }
}

fn is_regional_indicator(c: char) -> bool {
    ('\u{1F1E6}'..='\u{1F1FF}').contains(&c)
}

/// Flags are described by country alone, "flag: Ethiopia" -> "Ethiopia"
fn country_name(name: &str) -> &str {
    name.strip_prefix("flag:").map(str::trim_start).unwrap_or(name)
}

/// Turn a CLDR name into the `:snake_name:` form, e.g. "thumbs up" -> ":thumbs_up:"
fn describe(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push(':');
    let mut last_underscore = false;
    for c in name.chars() {
        if c.is_whitespace() || c == ':' {
            if !last_underscore {
                out.push('_');
                last_underscore = true;
            }
        } else if c == ',' || c == '\u{201C}' || c == '\u{201D}' || c == '"' {
            continue;
        } else {
            out.push(c);
            last_underscore = false;
        }
    }
    out.push(':');
    out
}
