//! Identifier rewriting inside generated blocks.

use std::collections::BTreeMap;

use syn::visit_mut::{self, VisitMut};

/// Renames path-root identifiers according to a map.
///
/// Only path roots are touched: `HashMap::new()` with a `HashMap → Map`
/// entry becomes `Map::new()`, while `entry.or_default()` style member
/// access is never a path root and stays untouched. Names in the map are
/// guaranteed unbound inside the block by the analysis, so no binding
/// occurrence can be renamed by accident. Fully qualified paths
/// (`::std::...`) are left alone.
pub struct RenameRoots {
    map: BTreeMap<String, String>,
}

impl RenameRoots {
    /// Build a renamer; entries mapping a name to itself are dropped.
    pub fn new(map: BTreeMap<String, String>) -> Self {
        let map = map
            .into_iter()
            .filter(|(from, to)| from != to)
            .collect();
        Self { map }
    }

    /// Whether any rename would take place.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Apply the renames to a block.
    pub fn apply(&mut self, block: &mut syn::Block) {
        if !self.is_empty() {
            self.visit_block_mut(block);
        }
    }
}

impl VisitMut for RenameRoots {
    fn visit_path_mut(&mut self, node: &mut syn::Path) {
        if node.leading_colon.is_none() {
            if let Some(first) = node.segments.first_mut() {
                if let Some(new_name) = self.map.get(&first.ident.to_string()) {
                    first.ident = syn::Ident::new(new_name, first.ident.span());
                }
            }
        }
        // Recurse for paths nested in generic arguments.
        visit_mut::visit_path_mut(self, node);
    }
}
