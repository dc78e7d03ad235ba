//! Host import table and import-collision resolution.

use std::collections::{BTreeMap, BTreeSet};

use pw_core::{CanonicalSymbol, SymbolTable};

/// Bindings visible at the host file's top level.
///
/// Derived by scanning the file's existing `use` items and item
/// declarations before any rewriting happens.
#[derive(Debug, Default)]
pub struct HostBindings {
    /// Local binding name → canonical origin, from top-level imports.
    /// Glob imports cannot be tabulated and are skipped.
    imports: BTreeMap<String, CanonicalSymbol>,
    /// Names of items declared at the top level (fns, types, consts, ...).
    items: BTreeSet<String>,
}

impl HostBindings {
    /// Scan a file's top-level items.
    pub fn collect(file: &syn::File) -> Self {
        let mut host = Self::default();
        for item in &file.items {
            match item {
                syn::Item::Use(item_use) => {
                    let mut prefix = Vec::new();
                    host.collect_use_tree(&item_use.tree, &mut prefix);
                }
                other => {
                    if let Some(ident) = item_name(other) {
                        host.items.insert(ident);
                    }
                }
            }
        }
        host
    }

    fn collect_use_tree(&mut self, tree: &syn::UseTree, prefix: &mut Vec<String>) {
        match tree {
            syn::UseTree::Path(path) => {
                prefix.push(path.ident.to_string());
                self.collect_use_tree(&path.tree, prefix);
                prefix.pop();
            }
            syn::UseTree::Name(name) => {
                if !prefix.is_empty() {
                    let symbol = CanonicalSymbol::new(prefix.join("::"), name.ident.to_string());
                    self.imports.insert(name.ident.to_string(), symbol);
                }
            }
            syn::UseTree::Rename(rename) => {
                if !prefix.is_empty() {
                    let symbol = CanonicalSymbol::new(prefix.join("::"), rename.ident.to_string());
                    self.imports.insert(rename.rename.to_string(), symbol);
                }
            }
            syn::UseTree::Group(group) => {
                for tree in &group.items {
                    self.collect_use_tree(tree, prefix);
                }
            }
            syn::UseTree::Glob(_) => {}
        }
    }

    /// The local name the host already binds to this exact canonical symbol.
    pub fn local_for(&self, symbol: &CanonicalSymbol) -> Option<&str> {
        self.imports
            .iter()
            .find(|(_, bound)| *bound == symbol)
            .map(|(local, _)| local.as_str())
    }

    /// The canonical origin bound to a local name, if imported.
    pub fn import_origin(&self, local: &str) -> Option<&CanonicalSymbol> {
        self.imports.get(local)
    }

    /// Whether a name is taken at the top level (import or item).
    pub fn is_taken(&self, name: &str) -> bool {
        self.imports.contains_key(name) || self.items.contains(name)
    }

    /// Top-level item names (not imports).
    pub fn item_names(&self) -> &BTreeSet<String> {
        &self.items
    }
}

fn item_name(item: &syn::Item) -> Option<String> {
    let ident = match item {
        syn::Item::Const(i) => &i.ident,
        syn::Item::Enum(i) => &i.ident,
        syn::Item::Fn(i) => &i.sig.ident,
        syn::Item::Mod(i) => &i.ident,
        syn::Item::Static(i) => &i.ident,
        syn::Item::Struct(i) => &i.ident,
        syn::Item::Trait(i) => &i.ident,
        syn::Item::TraitAlias(i) => &i.ident,
        syn::Item::Type(i) => &i.ident,
        syn::Item::Union(i) => &i.ident,
        _ => return None,
    };
    Some(ident.to_string())
}

/// Allocates local names for required symbols across one file rewrite.
///
/// Deterministic given identical inputs: symbols are resolved in sorted
/// order by the callers, aliases are the first free `name_1`, `name_2`, …
/// suffix, and every decision depends only on the host bindings, the symbol
/// table, and earlier allocations in the same run.
pub struct ImportResolver<'a> {
    host: &'a HostBindings,
    table: &'a SymbolTable,
    /// Conventional name → final local name, for symbols resolved this run.
    allocated: BTreeMap<String, String>,
    /// New imports to add: canonical symbol plus chosen local name, in
    /// allocation order.
    additions: Vec<(CanonicalSymbol, String)>,
}

impl<'a> ImportResolver<'a> {
    /// Create a resolver over the host's bindings and the known-symbol table.
    pub fn new(host: &'a HostBindings, table: &'a SymbolTable) -> Self {
        Self {
            host,
            table,
            allocated: BTreeMap::new(),
            additions: Vec::new(),
        }
    }

    /// Resolve one required symbol by its conventional name.
    ///
    /// Returns the local name generated references must use, or `None` when
    /// the name is not in the known-symbol table (left untouched: prelude
    /// names, macros, locals the analysis could not see).
    pub fn resolve(&mut self, name: &str) -> Option<String> {
        let symbol = self.table.resolve(name)?.clone();

        if let Some(local) = self.allocated.get(name) {
            return Some(local.clone());
        }

        // The host already imports the exact canonical symbol: reuse its
        // local name, add nothing.
        if let Some(local) = self.host.local_for(&symbol) {
            let local = local.to_string();
            self.allocated.insert(name.to_string(), local.clone());
            return Some(local);
        }

        let local = if self.name_is_free(name) {
            name.to_string()
        } else {
            self.fresh_alias(name)
        };
        self.additions.push((symbol, local.clone()));
        self.allocated.insert(name.to_string(), local.clone());
        Some(local)
    }

    fn name_is_free(&self, name: &str) -> bool {
        !self.host.is_taken(name) && !self.allocated.values().any(|local| local == name)
    }

    fn fresh_alias(&self, name: &str) -> String {
        for suffix in 1u32.. {
            let candidate = format!("{}_{}", name, suffix);
            if self.name_is_free(&candidate) {
                return candidate;
            }
        }
        unreachable!("alias space exhausted")
    }

    /// New `use` items to append to the host file, in allocation order.
    pub fn additions(&self) -> &[(CanonicalSymbol, String)] {
        &self.additions
    }

    /// Build the `use` item for one addition.
    ///
    /// Fails only when the symbol table carries a module path that is not a
    /// valid Rust path; the caller logs and skips such entries.
    pub fn use_item(symbol: &CanonicalSymbol, local: &str) -> Result<syn::ItemUse, syn::Error> {
        let text = if local == symbol.name {
            format!("use {};", symbol.full_path())
        } else {
            format!("use {} as {};", symbol.full_path(), local)
        };
        syn::parse_str(&text)
    }
}

/// Insert new `use` items after the last existing top-level `use`, or at the
/// top of the file when there is none.
pub fn append_use_items(file: &mut syn::File, items: Vec<syn::ItemUse>) {
    if items.is_empty() {
        return;
    }
    let position = file
        .items
        .iter()
        .rposition(|item| matches!(item, syn::Item::Use(_)))
        .map(|index| index + 1)
        .unwrap_or(0);
    for (offset, item) in items.into_iter().enumerate() {
        file.items.insert(position + offset, syn::Item::Use(item));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings(source: &str) -> HostBindings {
        HostBindings::collect(&syn::parse_file(source).unwrap())
    }

    #[test]
    fn test_collects_plain_grouped_and_renamed_imports() {
        let host = bindings(
            r#"
use std::collections::{HashMap, HashSet as Set};
use std::sync::Arc;
use std::io::*;

fn existing() {}
struct Widget;
"#,
        );
        assert_eq!(
            host.import_origin("HashMap").unwrap().full_path(),
            "std::collections::HashMap"
        );
        assert_eq!(
            host.import_origin("Set").unwrap().full_path(),
            "std::collections::HashSet"
        );
        assert_eq!(host.import_origin("Arc").unwrap().module, "std::sync");
        assert!(host.is_taken("existing"));
        assert!(host.is_taken("Widget"));
        // Globs are not tabulated.
        assert!(host.import_origin("Read").is_none());
    }

    #[test]
    fn test_resolver_reuses_existing_import() {
        let host = bindings("use std::collections::HashMap;\n");
        let table = SymbolTable::builtin();
        let mut resolver = ImportResolver::new(&host, &table);

        assert_eq!(resolver.resolve("HashMap").unwrap(), "HashMap");
        assert!(resolver.additions().is_empty());
    }

    #[test]
    fn test_resolver_reuses_existing_alias() {
        let host = bindings("use std::collections::HashMap as Map;\n");
        let table = SymbolTable::builtin();
        let mut resolver = ImportResolver::new(&host, &table);

        assert_eq!(resolver.resolve("HashMap").unwrap(), "Map");
        assert!(resolver.additions().is_empty());
    }

    #[test]
    fn test_resolver_imports_free_name_directly() {
        let host = bindings("fn unrelated() {}\n");
        let table = SymbolTable::builtin();
        let mut resolver = ImportResolver::new(&host, &table);

        assert_eq!(resolver.resolve("HashMap").unwrap(), "HashMap");
        assert_eq!(resolver.additions().len(), 1);
        let (symbol, local) = &resolver.additions()[0];
        assert_eq!(symbol.full_path(), "std::collections::HashMap");
        assert_eq!(local, "HashMap");
    }

    #[test]
    fn test_resolver_aliases_taken_name() {
        // The host binds an unrelated symbol to the conventional name.
        let host = bindings("use fast_hash::FastMap as HashMap;\n");
        let table = SymbolTable::builtin();
        let mut resolver = ImportResolver::new(&host, &table);

        assert_eq!(resolver.resolve("HashMap").unwrap(), "HashMap_1");
        let (symbol, local) = &resolver.additions()[0];
        assert_eq!(symbol.full_path(), "std::collections::HashMap");
        assert_eq!(local, "HashMap_1");
    }

    #[test]
    fn test_resolver_is_idempotent_per_name() {
        let host = bindings("fn unrelated() {}\n");
        let table = SymbolTable::builtin();
        let mut resolver = ImportResolver::new(&host, &table);

        let first = resolver.resolve("Arc").unwrap();
        let second = resolver.resolve("Arc").unwrap();
        assert_eq!(first, second);
        assert_eq!(resolver.additions().len(), 1);
    }

    #[test]
    fn test_resolver_ignores_unknown_names() {
        let host = bindings("fn unrelated() {}\n");
        let table = SymbolTable::builtin();
        let mut resolver = ImportResolver::new(&host, &table);
        assert!(resolver.resolve("TotallyUnknown").is_none());
    }

    #[test]
    fn test_use_item_rendering() {
        let symbol = CanonicalSymbol::new("std::collections", "HashMap");
        let plain = ImportResolver::use_item(&symbol, "HashMap").unwrap();
        let rendered = quote::quote!(#plain).to_string();
        assert_eq!(rendered, "use std :: collections :: HashMap ;");

        let aliased = ImportResolver::use_item(&symbol, "HashMap_1").unwrap();
        let rendered = quote::quote!(#aliased).to_string();
        assert_eq!(rendered, "use std :: collections :: HashMap as HashMap_1 ;");
    }

    #[test]
    fn test_append_after_last_use() {
        let mut file: syn::File = syn::parse_file(
            "use std::sync::Arc;\n\nfn main() {}\n",
        )
        .unwrap();
        let item = ImportResolver::use_item(
            &CanonicalSymbol::new("std::collections", "HashMap"),
            "HashMap",
        )
        .unwrap();
        append_use_items(&mut file, vec![item]);

        assert!(matches!(file.items[0], syn::Item::Use(_)));
        assert!(matches!(file.items[1], syn::Item::Use(_)));
        assert!(matches!(file.items[2], syn::Item::Fn(_)));
    }
}
