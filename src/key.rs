/// Case-folds the ASCII letters of a key. Every other character, including
/// non-ASCII letters, digits and punctuation, is kept as is.
///
/// ```
/// assert_eq!(jsonbase_lib::key::normalize_key("My-Key_2"), "my-key_2");
/// assert_eq!(jsonbase_lib::key::normalize_key("ÄBC"), "Äbc");
/// ```
pub fn normalize_key(key: &str) -> String {
    key.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_letters_only() {
        assert_eq!(normalize_key("MyKey"), "mykey");
        assert_eq!(normalize_key("MYKEY"), "mykey");
        assert_eq!(normalize_key("user.Score[0]"), "user.score[0]");
        assert_eq!(normalize_key("  Spaced Out  "), "  spaced out  ");
    }

    #[test]
    fn test_idempotent() {
        let once = normalize_key("Theme-DARK 42");
        assert_eq!(normalize_key(&once), once);
    }

    #[test]
    fn test_non_ascii_untouched() {
        assert_eq!(normalize_key("ŽALIAS"), "Žalias");
        assert_eq!(normalize_key(""), "");
    }
}
