//! Optional env-file loading for generation-pass credentials.
//!
//! Reads `KEY=VALUE` lines into the process environment at startup. Values
//! already present in the environment win; the file only fills gaps.

use std::path::Path;

/// Load environment variables from a local env file.
///
/// Lines are `KEY=VALUE`; blank lines and `#` comments are skipped; values
/// may be wrapped in single or double quotes. A missing file is not an
/// error; the caller may simply not have one. Returns the number of
/// variables actually set.
pub fn load_env_file(path: &Path) -> std::io::Result<usize> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no env file");
            return Ok(0);
        }
        Err(err) => return Err(err),
    };

    let mut set = 0;
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = unquote(value.trim());
        if key.is_empty() || std::env::var_os(key).is_some() {
            continue;
        }
        std::env::set_var(key, value);
        set += 1;
    }
    tracing::debug!(path = %path.display(), set, "env file loaded");
    Ok(set)
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"abc\""), "abc");
        assert_eq!(unquote("'abc'"), "abc");
        assert_eq!(unquote("abc"), "abc");
        assert_eq!(unquote("\""), "\"");
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let set = load_env_file(&dir.path().join("absent.env")).unwrap();
        assert_eq!(set, 0);
    }

    #[test]
    fn test_load_sets_only_unset_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.env");
        std::fs::write(
            &path,
            "# comment\nPW_TEST_ENV_FRESH=from-file\nPW_TEST_ENV_TAKEN='quoted'\n\nnot a pair\n",
        )
        .unwrap();

        std::env::set_var("PW_TEST_ENV_TAKEN", "from-process");
        let set = load_env_file(&path).unwrap();

        assert_eq!(set, 1);
        assert_eq!(std::env::var("PW_TEST_ENV_FRESH").unwrap(), "from-file");
        assert_eq!(std::env::var("PW_TEST_ENV_TAKEN").unwrap(), "from-process");

        std::env::remove_var("PW_TEST_ENV_FRESH");
        std::env::remove_var("PW_TEST_ENV_TAKEN");
    }
}
