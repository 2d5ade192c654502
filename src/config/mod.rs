//! # Configuration Management
//!
//! Layered configuration for the RCP1 protocol.
//!
//! Configuration is an ordered string-to-string map built in two sequential
//! phases: a static `key=value` file is loaded first, then a script resource
//! (see [`script`]) is executed and its returned table merged on top,
//! overwriting same-named keys. A second, fixed script pass
//! ([`INIT_SCRIPT`]) is merged later, during protocol initialization.
//!
//! ## Configuration Sources
//! - `key=value` text files via `load_file()` (`#`/`!` comments, escapes,
//!   line continuations)
//! - Script resources via a pluggable [`script::ScriptConfigSource`]
//!
//! ## Recognized Keys
//! - `rcp1.port` — listener and destination port (default 8080)
//! - `rcp1.lua_config` — path of the first script pass (default
//!   `lua/rcp1_config.lua`)

pub mod script;

use crate::error::{ProtocolError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Key naming the listener / destination port.
pub const KEY_PORT: &str = "rcp1.port";

/// Key naming the script resource loaded during `configure()`.
pub const KEY_LUA_CONFIG: &str = "rcp1.lua_config";

/// Port used when `rcp1.port` is absent.
pub const DEFAULT_PORT: u16 = 8080;

/// Config file used when the caller supplies no path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/zamarine/rcp1/config.ini";

/// Script resource used when `rcp1.lua_config` is absent.
pub const DEFAULT_CONFIG_SCRIPT: &str = "lua/rcp1_config.lua";

/// Script resource always loaded during `initialize()`.
pub const INIT_SCRIPT: &str = "lua/rcp1_init.lua";

/// Ordered key-value configuration map with last-write-wins merge semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigStore {
    entries: BTreeMap<String, String>,
}

impl ConfigStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Look up a key, falling back to `default` when absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Insert or overwrite a single key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Merge entries into the store; each entry overwrites any existing key
    /// of the same name.
    pub fn merge<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.entries.extend(entries);
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve `rcp1.port`, defaulting to 8080 when the key is absent.
    ///
    /// A present but unparsable value is a configuration error, not a
    /// silent fallback.
    pub fn port(&self) -> Result<u16> {
        match self.get(KEY_PORT) {
            None => Ok(DEFAULT_PORT),
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                ProtocolError::Config(format!("invalid {KEY_PORT} value '{raw}': {e}"))
            }),
        }
    }

    /// Resolve the first script pass path (`rcp1.lua_config`).
    pub fn script_path(&self) -> &str {
        self.get_or(KEY_LUA_CONFIG, DEFAULT_CONFIG_SCRIPT)
    }

    /// Load a `key=value` text file into the store, overwriting existing keys.
    ///
    /// A missing or unreadable file is a configuration error.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            ProtocolError::Config(format!(
                "failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        self.merge(parse_properties(&contents));
        Ok(())
    }
}

/// Parse `key=value` text into ordered entries.
///
/// Follows the conventions of the classic properties format: `#` and `!`
/// comment lines, blank lines skipped, `=` or `:` separators (first
/// unescaped occurrence wins), leading whitespace trimmed from keys and
/// values, `\` at end of line continues onto the next, and the escapes
/// `\n`, `\t`, `\r`, `\\`, `\uXXXX`. An unknown escape yields the escaped
/// character itself. A line with no separator becomes a key with an empty
/// value.
pub fn parse_properties(input: &str) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    let mut logical = String::new();

    for raw in input.lines() {
        let line = raw.trim_end_matches('\r');
        let line = line.trim_start();

        if logical.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!'))
        {
            continue;
        }

        if ends_with_continuation(line) {
            logical.push_str(&line[..line.len() - 1]);
            continue;
        }

        logical.push_str(line);
        entries.push(split_entry(&logical));
        logical.clear();
    }

    // A trailing continuation with no following line is treated as complete.
    if !logical.is_empty() {
        entries.push(split_entry(&logical));
    }

    entries
}

/// True when the line ends with an odd number of backslashes.
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Split a logical line at its first unescaped `=` or `:`.
fn split_entry(line: &str) -> (String, String) {
    let mut escaped = false;
    for (idx, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '=' | ':' => {
                let key = line[..idx].trim_end();
                let value = line[idx + 1..].trim_start();
                return (unescape(key), unescape(value));
            }
            _ => {}
        }
    }
    (unescape(line.trim_end()), String::new())
}

/// Resolve backslash escapes in a key or value.
fn unescape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('u') => {
                let code: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&code, 16).ok().and_then(char::from_u32) {
                    Some(c) => out.push(c),
                    None => {
                        out.push('u');
                        out.push_str(&code);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_pairs() {
        let entries = parse_properties("rcp1.port=9090\nrcp1.lua_config=lua/custom.lua\n");
        assert_eq!(
            entries,
            vec![
                ("rcp1.port".into(), "9090".into()),
                ("rcp1.lua_config".into(), "lua/custom.lua".into()),
            ]
        );
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let entries = parse_properties("# comment\n! also a comment\n\n  \nkey=value\n");
        assert_eq!(entries, vec![("key".into(), "value".into())]);
    }

    #[test]
    fn trims_whitespace_around_separator() {
        let entries = parse_properties("  key  =  value with spaces  \n");
        assert_eq!(entries, vec![("key".into(), "value with spaces  ".into())]);
    }

    #[test]
    fn supports_colon_separator() {
        let entries = parse_properties("key: value\n");
        assert_eq!(entries, vec![("key".into(), "value".into())]);
    }

    #[test]
    fn escaped_separator_stays_in_key() {
        let entries = parse_properties("a\\=b=c\n");
        assert_eq!(entries, vec![("a=b".into(), "c".into())]);
    }

    #[test]
    fn line_continuation_joins_lines() {
        let entries = parse_properties("key=first \\\n    second\n");
        assert_eq!(entries, vec![("key".into(), "first second".into())]);
    }

    #[test]
    fn double_backslash_is_not_a_continuation() {
        let entries = parse_properties("key=value\\\\\nother=1\n");
        assert_eq!(
            entries,
            vec![
                ("key".into(), "value\\".into()),
                ("other".into(), "1".into()),
            ]
        );
    }

    #[test]
    fn resolves_escapes() {
        let entries = parse_properties("key=line1\\nline2\\tend\n");
        assert_eq!(entries, vec![("key".into(), "line1\nline2\tend".into())]);
    }

    #[test]
    fn resolves_unicode_escape() {
        let entries = parse_properties("key=\\u0041\\u0042\n");
        assert_eq!(entries, vec![("key".into(), "AB".into())]);
    }

    #[test]
    fn key_without_separator_gets_empty_value() {
        let entries = parse_properties("standalone\n");
        assert_eq!(entries, vec![("standalone".into(), String::new())]);
    }

    #[test]
    fn merge_is_last_write_wins() {
        let mut store = ConfigStore::new();
        store.set("k", "file");
        store.merge(vec![("k".to_string(), "script".to_string())]);
        assert_eq!(store.get("k"), Some("script"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn port_defaults_when_absent() {
        let store = ConfigStore::new();
        assert_eq!(store.port().unwrap(), DEFAULT_PORT);
    }

    #[test]
    fn port_parses_configured_value() {
        let mut store = ConfigStore::new();
        store.set(KEY_PORT, "9090");
        assert_eq!(store.port().unwrap(), 9090);
    }

    #[test]
    fn port_rejects_garbage() {
        let mut store = ConfigStore::new();
        store.set(KEY_PORT, "not-a-port");
        assert!(matches!(store.port(), Err(ProtocolError::Config(_))));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let mut store = ConfigStore::new();
        let err = store.load_file("/nonexistent/rcp1/config.ini").unwrap_err();
        assert!(matches!(err, ProtocolError::Config(_)));
    }
}
