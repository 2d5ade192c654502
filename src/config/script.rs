//! Script-driven configuration overrides.
//!
//! The dynamic half of the config merge pipeline: a [`ScriptConfigSource`]
//! executes a path-addressed script resource and returns a flat table of
//! string keys and values to merge over the statically loaded configuration.
//! The scripting engine is a swappable capability behind this narrow
//! contract, not a compiled-in runtime.

use crate::error::{ProtocolError, Result};
use mlua::{Lua, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A pluggable configuration-override source.
///
/// Implementations execute the script resource at `path` and report one of
/// three outcomes:
/// - `Ok(Some(map))` — the script yielded a table; every entry has been
///   stringified.
/// - `Ok(None)` — the script yielded a non-table result. Callers treat this
///   as a no-op merge.
/// - `Err(_)` — the script could not be read or failed during execution.
pub trait ScriptConfigSource: Send + Sync {
    /// Execute the script resource at `path` and return its table, if any.
    fn load(&self, path: &Path) -> Result<Option<BTreeMap<String, String>>>;
}

/// The default [`ScriptConfigSource`]: an embedded Lua interpreter.
///
/// A fresh Lua state is created per load, so the source itself stays
/// `Send + Sync` and no interpreter state leaks between the configure and
/// initialize passes. Relative script paths are resolved against
/// `base_path`, which defaults to the process working directory.
#[derive(Debug, Clone, Default)]
pub struct LuaConfigSource {
    /// Base path for resolving relative script resources.
    base_path: Option<PathBuf>,
}

impl LuaConfigSource {
    /// Create a source that resolves script paths against the working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source that resolves relative script paths against `base`.
    pub fn with_base_path(base: impl Into<PathBuf>) -> Self {
        Self {
            base_path: Some(base.into()),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match (&self.base_path, path.is_relative()) {
            (Some(base), true) => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl ScriptConfigSource for LuaConfigSource {
    fn load(&self, path: &Path) -> Result<Option<BTreeMap<String, String>>> {
        let full_path = self.resolve(path);
        let source = fs::read_to_string(&full_path).map_err(|e| {
            ProtocolError::Config(format!(
                "failed to read Lua configuration {}: {e}",
                full_path.display()
            ))
        })?;

        let lua = Lua::new();
        let value = lua
            .load(&source)
            .set_name(full_path.display().to_string())
            .eval::<Value>()
            .map_err(|e| {
                ProtocolError::Config(format!(
                    "failed to execute Lua configuration {}: {e}",
                    full_path.display()
                ))
            })?;

        let Value::Table(table) = value else {
            // A non-table result is tolerated as an empty override pass.
            debug!(path = %full_path.display(), "Lua configuration returned no table, skipping");
            return Ok(None);
        };

        let mut entries = BTreeMap::new();
        for pair in table.pairs::<Value, Value>() {
            let (key, value) = pair.map_err(|e| {
                ProtocolError::Config(format!(
                    "failed to iterate Lua configuration table {}: {e}",
                    full_path.display()
                ))
            })?;

            match (stringify(&lua, key), stringify(&lua, value)) {
                (Some(key), Some(value)) => {
                    entries.insert(key, value);
                }
                _ => {
                    warn!(
                        path = %full_path.display(),
                        "skipping Lua configuration entry that is not string-coercible"
                    );
                }
            }
        }

        debug!(
            path = %full_path.display(),
            entries = entries.len(),
            "loaded Lua configuration table"
        );
        Ok(Some(entries))
    }
}

/// Coerce a Lua value to its string form, Lua `tostring`-style for scalars.
///
/// Tables, functions, and other reference types return `None`.
fn stringify(lua: &Lua, value: Value) -> Option<String> {
    match value {
        Value::Boolean(b) => Some(b.to_string()),
        other => lua
            .coerce_string(other)
            .ok()
            .flatten()
            .map(|s| s.to_string_lossy().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn table_result_is_stringified() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(
            dir.path(),
            "config.lua",
            r#"return { ["rcp1.port"] = 9090, ["rcp1.greeting"] = "hi", flag = true }"#,
        );

        let table = LuaConfigSource::new().load(&path).unwrap().unwrap();
        assert_eq!(table.get("rcp1.port").map(String::as_str), Some("9090"));
        assert_eq!(table.get("rcp1.greeting").map(String::as_str), Some("hi"));
        assert_eq!(table.get("flag").map(String::as_str), Some("true"));
    }

    #[test]
    fn non_table_result_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(dir.path(), "config.lua", "return 42");

        assert!(LuaConfigSource::new().load(&path).unwrap().is_none());
    }

    #[test]
    fn script_error_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(dir.path(), "config.lua", "error('boom')");

        let err = LuaConfigSource::new().load(&path).unwrap_err();
        assert!(matches!(err, ProtocolError::Config(_)));
    }

    #[test]
    fn missing_script_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = LuaConfigSource::new()
            .load(&dir.path().join("absent.lua"))
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Config(_)));
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("lua")).unwrap();
        write_script(dir.path(), "lua/config.lua", r#"return { k = "v" }"#);

        let source = LuaConfigSource::with_base_path(dir.path());
        let table = source.load(Path::new("lua/config.lua")).unwrap().unwrap();
        assert_eq!(table.get("k").map(String::as_str), Some("v"));
    }
}
