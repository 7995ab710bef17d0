//! Environment variable lookup with `.env` fallback.
//!
//! Lookups check the process environment first, then a `.env` file in the
//! current directory. The `.env` file is read once into a map and never
//! written back into the process environment.

use std::collections::HashMap;
use std::env;
use std::sync::OnceLock;

/// Parse `.env` content into key/value pairs.
///
/// Blank lines and `#` comments are skipped, surrounding quotes are stripped,
/// and an inline `# comment` is dropped when the value is unquoted. The first
/// occurrence of a key wins.
pub fn parse_dotenv(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some(eq_pos) = line.find('=') else {
            continue;
        };
        let key = line[..eq_pos].trim();
        let mut value = line[eq_pos + 1..].trim();
        if let Some(hash_pos) = value.find('#') {
            let before_hash = value[..hash_pos].trim_end();
            if !before_hash.contains('"') && !before_hash.contains('\'') {
                value = before_hash;
            }
        }
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            value = &value[1..value.len() - 1];
        }
        if !key.is_empty() {
            vars.entry(key.to_string())
                .or_insert_with(|| value.to_string());
        }
    }
    vars
}

/// The `.env` map of the current directory, loaded on first use.
pub fn load_dotenv() -> &'static HashMap<String, String> {
    static DOTENV: OnceLock<HashMap<String, String>> = OnceLock::new();
    DOTENV.get_or_init(|| {
        let path = env::current_dir()
            .map(|d| d.join(".env"))
            .unwrap_or_else(|_| std::path::PathBuf::from(".env"));
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let vars = parse_dotenv(&content);
                tracing::debug!(path = %path.display(), count = vars.len(), "loaded .env");
                vars
            }
            Err(_) => HashMap::new(),
        }
    })
}

fn lookup(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .or_else(|| load_dotenv().get(key).cloned())
}

fn lookup_chain(primary: &str, aliases: &[&str]) -> Option<String> {
    lookup(primary).or_else(|| aliases.iter().find_map(|a| lookup(a)))
}

/// Read the primary key or the first set alias, falling back to `default`.
/// Empty values count as unset.
pub fn env_or<F>(primary: &str, aliases: &[&str], default: F) -> String
where
    F: FnOnce() -> String,
{
    env_optional(primary, aliases).unwrap_or_else(default)
}

/// Read the primary key or the first set alias (trimmed; empty is `None`).
pub fn env_optional(primary: &str, aliases: &[&str]) -> Option<String> {
    lookup_chain(primary, aliases).and_then(|s| {
        let s = s.trim().to_string();
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    })
}

/// Boolean lookup: `0/false/no/off` are false, any other value is true.
pub fn env_bool(primary: &str, aliases: &[&str], default: bool) -> bool {
    match lookup_chain(primary, aliases) {
        Some(s) => parse_bool(&s),
        None => default,
    }
}

pub(crate) fn parse_bool(s: &str) -> bool {
    !matches!(
        s.trim().to_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
