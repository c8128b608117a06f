//! Read-only check for generated SQL

use std::sync::OnceLock;

use regex::Regex;

const FORBIDDEN_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "ATTACH", "DETACH", "COPY",
    "EXPORT", "IMPORT", "PRAGMA", "INSTALL", "LOAD", "SET", "RESET", "CALL", "TRUNCATE",
    "GRANT", "REVOKE", "VACUUM", "CHECKPOINT", "USE",
];

fn string_literal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"'(?:[^']|'')*'").expect("Invalid regex"))
}

fn keyword_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(
            r"(?i)\b(?:{})\b|\bread_[a-z_]+\s*\(|\bglob\s*\(",
            FORBIDDEN_KEYWORDS.join("|")
        );
        Regex::new(&pattern).expect("Invalid regex")
    })
}

/// Accept exactly one SELECT statement; returns it without a trailing `;`
pub fn guard_sql(sql: &str) -> Result<String, String> {
    let trimmed = sql.trim().trim_end_matches(';').trim_end();
    if trimmed.is_empty() {
        return Err("empty statement".to_string());
    }

    // Keywords inside string literals are search terms, not statements
    let code = string_literal_re().replace_all(trimmed, "''");

    if code.contains(';') {
        return Err("more than one statement".to_string());
    }
    if code.contains("--") || code.contains("/*") {
        return Err("comments are not allowed".to_string());
    }

    let first_word = code
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    if first_word != "SELECT" {
        return Err(format!("expected SELECT, got {first_word}"));
    }

    if let Some(m) = keyword_re().find(&code) {
        return Err(format!("forbidden keyword: {}", m.as_str().trim_end_matches('(').trim()));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_select() {
        let sql = "SELECT opis_tovaru FROM declarations \
                   WHERE regexp_matches(opis_tovaru, '(?i)update; drop') LIMIT 100;";
        assert_eq!(
            guard_sql(sql).unwrap(),
            sql.trim_end_matches(';').to_string()
        );
    }

    #[test]
    fn test_rejects_mutations() {
        assert!(guard_sql("DELETE FROM declarations").is_err());
        assert!(guard_sql("select 1; drop table declarations").is_err());
        assert!(guard_sql("SELECT * FROM declarations WHERE 1=1 -- x").is_err());
        assert!(guard_sql("WITH x AS (SELECT 1) SELECT * FROM x").is_err());
    }

    #[test]
    fn test_rejects_file_access() {
        let err = guard_sql("SELECT * FROM read_csv_auto('/etc/passwd')").unwrap_err();
        assert!(err.contains("read_csv_auto"));
        assert!(guard_sql("SELECT * FROM glob('/home/*')").is_err());
        assert!(guard_sql("SELECT 1 FROM declarations; ATTACH 'x.db'").is_err());
    }

    #[test]
    fn test_rejects_empty() {
        assert!(guard_sql("  ;  ").is_err());
    }
}
