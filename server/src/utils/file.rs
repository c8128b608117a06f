//! Path helpers for user-supplied locations

use std::path::PathBuf;

/// Resolve a data directory or warehouse path given in config, env or CLI
///
/// A leading `~` stands for the home directory. Relative paths are anchored
/// at the current working directory; absolute ones pass through.
pub fn expand_path(raw: &str) -> PathBuf {
    let raw = raw.trim();

    let path = match raw.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with(['/', '\\']) => match dirs::home_dir() {
            Some(home) => home.join(rest.trim_start_matches(['/', '\\'])),
            None => PathBuf::from(raw),
        },
        _ => PathBuf::from(raw),
    };

    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::{APP_DOT_FOLDER, CONFIG_FILE_NAME, DUCKDB_DB_FILENAME};

    fn home() -> PathBuf {
        dirs::home_dir().expect("home directory")
    }

    fn cwd() -> PathBuf {
        std::env::current_dir().expect("working directory")
    }

    #[test]
    fn test_config_file_under_home() {
        let raw = format!("~/{}/{}", APP_DOT_FOLDER, CONFIG_FILE_NAME);
        assert_eq!(
            expand_path(&raw),
            home().join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME)
        );
    }

    #[test]
    fn test_bare_tilde_is_home() {
        assert_eq!(expand_path("~"), home());
    }

    #[test]
    fn test_tilde_inside_name_is_not_home() {
        assert_eq!(expand_path("~deklarant"), cwd().join("~deklarant"));
    }

    #[test]
    fn test_relative_warehouse_anchored_at_cwd() {
        assert_eq!(expand_path(DUCKDB_DB_FILENAME), cwd().join(DUCKDB_DB_FILENAME));
        assert_eq!(
            expand_path("./data/warehouse.duckdb"),
            cwd().join("./data/warehouse.duckdb")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_absolute_data_dir_unchanged() {
        assert_eq!(
            expand_path("/var/lib/deklarant"),
            PathBuf::from("/var/lib/deklarant")
        );
    }

    #[test]
    fn test_env_value_whitespace_trimmed() {
        assert_eq!(expand_path("  ~/.deklarant \n"), home().join(".deklarant"));
        assert_eq!(expand_path("   "), cwd());
    }
}
