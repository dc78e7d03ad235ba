//! Known-export symbol table for import resolution.
//!
//! The generation service reports which imports its code needs, but free-text
//! import lists are unreliable, so the injector instead analyzes identifier
//! usage in generated code against this table. An entry maps a conventional
//! local name to its canonical origin (defining module plus exported name).

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

/// An exported identifier together with its defining module.
///
/// The stable identity used for import deduplication: two imports are the
/// same symbol iff both module and name match.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalSymbol {
    /// Defining module path, e.g. `std::collections`.
    pub module: String,
    /// Exported name within that module, e.g. `HashMap`.
    pub name: String,
}

impl CanonicalSymbol {
    /// Create a symbol from module path and exported name.
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }

    /// Parse a full path like `std::collections::HashMap`.
    ///
    /// The final segment is the exported name, everything before it the
    /// module. Fails on paths with fewer than two segments.
    pub fn parse(path: &str) -> Result<Self, SymbolTableError> {
        match path.rsplit_once("::") {
            Some((module, name)) if !module.is_empty() && !name.is_empty() => {
                Ok(Self::new(module, name))
            }
            _ => Err(SymbolTableError::MalformedPath(path.to_string())),
        }
    }

    /// Full `module::name` path.
    pub fn full_path(&self) -> String {
        format!("{}::{}", self.module, self.name)
    }
}

/// Mapping from conventional local name to canonical origin.
///
/// Ships with defaults for common `std` exports; user tables loaded from TOML
/// extend (and may override) the defaults.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: BTreeMap<String, CanonicalSymbol>,
}

/// TOML shape of a user symbol table file.
#[derive(Debug, Deserialize)]
struct SymbolTableFile {
    #[serde(default)]
    symbols: BTreeMap<String, String>,
}

impl SymbolTable {
    /// An empty table.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Table pre-populated with common `std` exports.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (module, name) in [
            ("std::collections", "BTreeMap"),
            ("std::collections", "BTreeSet"),
            ("std::collections", "HashMap"),
            ("std::collections", "HashSet"),
            ("std::collections", "VecDeque"),
            ("std::borrow", "Cow"),
            ("std::cell", "Cell"),
            ("std::cell", "RefCell"),
            ("std::path", "Path"),
            ("std::path", "PathBuf"),
            ("std::rc", "Rc"),
            ("std::sync", "Arc"),
            ("std::sync", "Mutex"),
            ("std::sync", "RwLock"),
            ("std::time", "Duration"),
            ("std::time", "Instant"),
        ] {
            table.insert(name, CanonicalSymbol::new(module, name));
        }
        table
    }

    /// Insert or replace an entry under the given conventional name.
    pub fn insert(&mut self, local_name: impl Into<String>, symbol: CanonicalSymbol) {
        self.entries.insert(local_name.into(), symbol);
    }

    /// Resolve a conventional name to its canonical origin.
    pub fn resolve(&self, name: &str) -> Option<&CanonicalSymbol> {
        self.entries.get(name)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Extend this table from TOML text with a `[symbols]` section of
    /// `Name = "full::path::Name"` entries. File entries win over existing
    /// ones.
    pub fn extend_from_toml_str(&mut self, text: &str) -> Result<(), SymbolTableError> {
        let file: SymbolTableFile = toml::from_str(text)?;
        for (local_name, path) in file.symbols {
            let symbol = CanonicalSymbol::parse(&path)?;
            self.entries.insert(local_name, symbol);
        }
        Ok(())
    }

    /// Builtin table extended with entries from a TOML file.
    pub fn load(path: &Path) -> Result<Self, SymbolTableError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| SymbolTableError::Io(path.display().to_string(), source))?;
        let mut table = Self::builtin();
        table.extend_from_toml_str(&text)?;
        Ok(table)
    }
}

/// Errors loading a symbol table.
#[derive(Debug, thiserror::Error)]
pub enum SymbolTableError {
    /// Symbol path did not contain a module and a name.
    #[error("malformed symbol path `{0}`: expected `module::Name`")]
    MalformedPath(String),

    /// TOML syntax or shape error.
    #[error("invalid symbol table: {0}")]
    Toml(#[from] toml::de::Error),

    /// Could not read the table file.
    #[error("failed to read symbol table `{0}`: {1}")]
    Io(String, #[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_path() {
        let symbol = CanonicalSymbol::parse("std::collections::HashMap").unwrap();
        assert_eq!(symbol.module, "std::collections");
        assert_eq!(symbol.name, "HashMap");
        assert_eq!(symbol.full_path(), "std::collections::HashMap");
    }

    #[test]
    fn test_parse_rejects_bare_name() {
        assert!(CanonicalSymbol::parse("HashMap").is_err());
        assert!(CanonicalSymbol::parse("::HashMap").is_err());
    }

    #[test]
    fn test_builtin_resolves_common_names() {
        let table = SymbolTable::builtin();
        let symbol = table.resolve("HashMap").unwrap();
        assert_eq!(symbol.module, "std::collections");
        assert!(table.resolve("NoSuchSymbol").is_none());
    }

    #[test]
    fn test_toml_entries_override_builtin() {
        let mut table = SymbolTable::builtin();
        table
            .extend_from_toml_str(
                r#"
[symbols]
HashMap = "hashbrown::HashMap"
Deserialize = "serde::Deserialize"
"#,
            )
            .unwrap();
        assert_eq!(table.resolve("HashMap").unwrap().module, "hashbrown");
        assert_eq!(table.resolve("Deserialize").unwrap().module, "serde");
    }

    #[test]
    fn test_toml_rejects_bare_path() {
        let mut table = SymbolTable::empty();
        let result = table.extend_from_toml_str("[symbols]\nFoo = \"Foo\"\n");
        assert!(result.is_err());
    }
}
