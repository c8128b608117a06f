//! SQL utility functions

/// Escape SQL LIKE metacharacters (%, _, \) in user input
///
/// The escaped text is meant for a bound parameter paired with
/// `ESCAPE '\'`; it is never spliced into statement text.
///
/// # Example
///
/// ```
/// use deklarant_server::utils::sql::escape_like_pattern;
///
/// let user_input = "100% cotton_wool";
/// let pattern = format!("%{}%", escape_like_pattern(user_input));
/// assert_eq!(pattern, "%100\\% cotton\\_wool%");
/// ```
pub fn escape_like_pattern(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Check a table reference: `name` or `schema.name`, ASCII identifiers only
pub fn is_valid_table_name(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() <= 2 && parts.iter().all(|p| is_valid_identifier(p))
}

fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Render a string as a single-quoted SQL literal
///
/// Only for operator-supplied values such as file paths in table functions,
/// where DuckDB does not accept bound parameters.
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_pattern_no_special_chars() {
        assert_eq!(escape_like_pattern("8471"), "8471");
    }

    #[test]
    fn test_escape_like_pattern_percent() {
        assert_eq!(escape_like_pattern("100%"), "100\\%");
    }

    #[test]
    fn test_escape_like_pattern_underscore() {
        assert_eq!(escape_like_pattern("foo_bar"), "foo\\_bar");
    }

    #[test]
    fn test_escape_like_pattern_backslash() {
        assert_eq!(escape_like_pattern("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_escape_like_pattern_keeps_quotes() {
        // Quotes are harmless inside a bound parameter
        assert_eq!(escape_like_pattern("O'Brien"), "O'Brien");
    }

    #[test]
    fn test_is_valid_table_name() {
        assert!(is_valid_table_name("declarations"));
        assert!(is_valid_table_name("customs.declarations_2024"));
        assert!(is_valid_table_name("_staging"));

        assert!(!is_valid_table_name(""));
        assert!(!is_valid_table_name("1declarations"));
        assert!(!is_valid_table_name("a.b.c"));
        assert!(!is_valid_table_name("declarations;"));
        assert!(!is_valid_table_name("decl arations"));
        assert!(!is_valid_table_name("\"quoted\""));
        assert!(!is_valid_table_name("декларації"));
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("/data/x.csv"), "'/data/x.csv'");
        assert_eq!(quote_literal("/data/o'brien.csv"), "'/data/o''brien.csv'");
    }
}
