//! Reversible masking of formatting tokens before text is sent to the
//! translation service.
//!
//! Recognized grammar: legacy color/format codes (`§` plus one code
//! character), printf-style tokens (`%s`, `%d`, `%1$s`) and brace-delimited
//! identifiers (`{name}`). Each match becomes a sequential opaque marker
//! that survives the round trip through an external translator; `unmask`
//! tolerates whitespace the translator may inject inside a marker.

use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(§[0-9A-Fa-fK-Ok-oRr]|%\d*\$?[sd]|\{[A-Za-z0-9_]+\})").expect("valid token regex")
});

// Markers mangled by the translator: "__ FMT0 __" -> "__FMT0__"
static MARKER_NORMALIZE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"__\s*FMT(\d+)\s*__").expect("valid marker regex"));

/// A string with its formatting tokens replaced by opaque markers, plus the
/// mapping needed to put them back.
#[derive(Debug, Clone)]
pub struct ProtectedText {
    masked: String,
    placeholders: Vec<(String, String)>,
}

pub struct Protector;

impl Protector {
    /// Replace every recognized token with a unique `__FMTn__` marker.
    pub fn mask(text: &str) -> ProtectedText {
        let mut placeholders = Vec::new();
        let masked = TOKEN_REGEX
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let marker = format!("__FMT{}__", placeholders.len());
                placeholders.push((marker.clone(), caps[0].to_string()));
                marker
            })
            .into_owned();

        ProtectedText {
            masked,
            placeholders,
        }
    }
}

impl ProtectedText {
    pub fn masked_text(&self) -> &str {
        &self.masked
    }

    /// Exact reverse substitution over a (possibly translated) masked string.
    pub fn unmask(&self, translated: &str) -> String {
        if self.placeholders.is_empty() {
            return translated.to_string();
        }

        let mut output = MARKER_NORMALIZE_REGEX
            .replace_all(translated, "__FMT${1}__")
            .into_owned();
        for (marker, value) in &self.placeholders {
            output = output.replace(marker.as_str(), value);
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_unmask_roundtrip() {
        let cases = [
            "Hello %s!",
            "§aGreen§r and %1$s of {count} items",
            "%d%% charged",
            "{player} found {item_name}",
            "plain text without tokens",
            "",
        ];
        for case in cases {
            let protected = Protector::mask(case);
            assert_eq!(protected.unmask(protected.masked_text()), case);
        }
    }

    #[test]
    fn masks_hide_token_text() {
        let protected = Protector::mask("Give %s to {player}");
        assert!(!protected.masked_text().contains("%s"));
        assert!(!protected.masked_text().contains("{player}"));
        assert_eq!(protected.masked_text(), "Give __FMT0__ to __FMT1__");
    }

    #[test]
    fn unmask_tolerates_injected_whitespace() {
        let protected = Protector::mask("Found %s at {place}");
        let mangled = protected
            .masked_text()
            .replace("__FMT0__", "__ FMT0 __")
            .replace("__FMT1__", "__FMT1 __");
        assert_eq!(protected.unmask(&mangled), "Found %s at {place}");
    }

    #[test]
    fn unmask_survives_reordering() {
        let protected = Protector::mask("%s gave {item}");
        let reordered = "__FMT1__ wurde von __FMT0__ gegeben";
        assert_eq!(protected.unmask(reordered), "{item} wurde von %s gegeben");
    }

    #[test]
    fn color_codes_are_single_tokens() {
        let protected = Protector::mask("§6Golden §ltext§r");
        assert_eq!(protected.masked_text(), "__FMT0__Golden __FMT1__text__FMT2__");
    }
}
