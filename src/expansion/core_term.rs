use regex::Regex;

lazy_static::lazy_static! {
    /// Escape classes such as `\s` or `\b`.
    static ref ESCAPE_CLASS: Regex = Regex::new(r"\\[wsdbWSDB]").unwrap();
    /// Remaining regex metacharacters.
    static ref METACHARS: Regex = Regex::new(r"[\\^$.|?*+()\[\]{}]").unwrap();
    /// Runs of letters. Digits and underscores split tokens.
    static ref TOKEN: Regex = Regex::new(r"\p{Alphabetic}+").unwrap();
}

/// Minimum token length, in characters, for a token to be an anchor.
const MIN_TERM_CHARS: usize = 3;

/// Pick the anchor term of a pattern: strip regex syntax, split into
/// alphabetic runs, drop runs of two characters or fewer and return the
/// longest remaining one.
/// Ties go to the earliest token.
pub fn extract_core_term(pattern: &str) -> Option<String> {
    let without_classes = ESCAPE_CLASS.replace_all(pattern, " ");
    let plain = METACHARS.replace_all(&without_classes, " ");

    let mut best: Option<&str> = None;
    let mut best_len = 0;
    for token in TOKEN.find_iter(&plain).map(|m| m.as_str()) {
        let len = token.chars().count();
        if len >= MIN_TERM_CHARS && len > best_len {
            best = Some(token);
            best_len = len;
        }
    }
    best.map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_token_wins() {
        assert_eq!(extract_core_term("presupuesto asignado").as_deref(), Some("presupuesto"));
    }

    #[test]
    fn test_regex_syntax_is_ignored() {
        assert_eq!(
            extract_core_term(r"\bmeta\s+(anual|cuatrienal)\b").as_deref(),
            Some("cuatrienal")
        );
        assert_eq!(extract_core_term(r"plan\s*de\s*desarrollo").as_deref(), Some("desarrollo"));
    }

    #[test]
    fn test_short_tokens_discarded() {
        assert_eq!(extract_core_term("de la en"), None);
        assert_eq!(extract_core_term(r"\d+\.\d+"), None);
        assert_eq!(extract_core_term(""), None);
    }

    #[test]
    fn test_numbers_never_anchor() {
        assert_eq!(extract_core_term("meta 20242027 anual").as_deref(), Some("anual"));
        assert_eq!(extract_core_term("PDM_2024 vigencia").as_deref(), Some("vigencia"));
        assert_eq!(extract_core_term("123456"), None);
    }

    #[test]
    fn test_tie_goes_to_first() {
        assert_eq!(extract_core_term("salud vivir").as_deref(), Some("salud"));
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        // "población" is 9 characters, "indicador" is 9 as well.
        assert_eq!(extract_core_term("población indicador").as_deref(), Some("población"));
    }
}
