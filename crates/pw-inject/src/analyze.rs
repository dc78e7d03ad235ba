//! Static analysis of generated code blocks.
//!
//! The generation service's self-reported import list is discarded, so the
//! injector determines required external symbols itself: every path-root
//! identifier the block references that is not bound inside the block, not a
//! parameter of the host function, and not a top-level item of the host file
//! is a candidate, and candidates that resolve in the known symbol table are
//! the required set. The analysis is conservative: a name bound *anywhere*
//! in the block counts as bound, and names used only inside macro token
//! streams are invisible and therefore never imported.

use std::collections::BTreeSet;

use syn::visit::{self, Visit};

/// Names bound by the block itself: `let`/`for`/closure/match patterns and
/// the names of items declared inside the block.
pub fn bound_names(block: &syn::Block) -> BTreeSet<String> {
    let mut collector = BoundNames::default();
    collector.visit_block(block);
    collector.names
}

/// Root identifiers of the paths the block references.
pub fn referenced_roots(block: &syn::Block) -> BTreeSet<String> {
    let mut collector = ReferencedRoots::default();
    collector.visit_block(block);
    collector.roots
}

/// Parameter names of a host function signature, including nothing for a
/// `self` receiver (`self` is a keyword, never a collision candidate).
pub fn param_names(sig: &syn::Signature) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for input in &sig.inputs {
        if let syn::FnArg::Typed(pat_type) = input {
            let mut collector = BoundNames::default();
            collector.visit_pat(&pat_type.pat);
            names.extend(collector.names);
        }
    }
    names
}

#[derive(Default)]
struct BoundNames {
    names: BTreeSet<String>,
}

impl<'ast> Visit<'ast> for BoundNames {
    fn visit_pat_ident(&mut self, node: &'ast syn::PatIdent) {
        self.names.insert(node.ident.to_string());
        visit::visit_pat_ident(self, node);
    }

    fn visit_item(&mut self, node: &'ast syn::Item) {
        match node {
            syn::Item::Const(i) => {
                self.names.insert(i.ident.to_string());
            }
            syn::Item::Enum(i) => {
                self.names.insert(i.ident.to_string());
            }
            syn::Item::Fn(i) => {
                self.names.insert(i.sig.ident.to_string());
            }
            syn::Item::Static(i) => {
                self.names.insert(i.ident.to_string());
            }
            syn::Item::Struct(i) => {
                self.names.insert(i.ident.to_string());
            }
            syn::Item::Type(i) => {
                self.names.insert(i.ident.to_string());
            }
            syn::Item::Use(i) => {
                let mut seen_path = false;
                collect_use_locals(&i.tree, &mut self.names, &mut seen_path);
            }
            _ => {}
        }
        visit::visit_item(self, node);
    }
}

fn collect_use_locals(tree: &syn::UseTree, names: &mut BTreeSet<String>, seen_path: &mut bool) {
    match tree {
        syn::UseTree::Path(path) => {
            *seen_path = true;
            collect_use_locals(&path.tree, names, seen_path);
        }
        syn::UseTree::Name(name) => {
            if *seen_path {
                names.insert(name.ident.to_string());
            }
        }
        syn::UseTree::Rename(rename) => {
            names.insert(rename.rename.to_string());
        }
        syn::UseTree::Group(group) => {
            for tree in &group.items {
                collect_use_locals(tree, names, seen_path);
            }
        }
        syn::UseTree::Glob(_) => {}
    }
}

#[derive(Default)]
struct ReferencedRoots {
    roots: BTreeSet<String>,
}

impl<'ast> Visit<'ast> for ReferencedRoots {
    fn visit_path(&mut self, node: &'ast syn::Path) {
        if node.leading_colon.is_none() {
            if let Some(first) = node.segments.first() {
                self.roots.insert(first.ident.to_string());
            }
        }
        visit::visit_path(self, node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(body: &str) -> syn::Block {
        syn::parse_str(&format!("{{ {} }}", body)).unwrap()
    }

    #[test]
    fn test_bound_names_from_patterns() {
        let names = bound_names(&block(
            r#"
let clicked = false;
let (a, b) = (1, 2);
for item in 0..3 { let _ = item; }
let closure = |arg: u32| arg + 1;
"#,
        ));
        for expected in ["clicked", "a", "b", "item", "closure", "arg"] {
            assert!(names.contains(expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_bound_names_from_nested_items() {
        let names = bound_names(&block(
            r#"
fn helper() {}
const LIMIT: u32 = 4;
struct Local;
use std::collections::HashMap;
use std::collections::HashSet as Set;
"#,
        ));
        for expected in ["helper", "LIMIT", "Local", "HashMap", "Set"] {
            assert!(names.contains(expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_referenced_roots_from_exprs_and_types() {
        let roots = referenced_roots(&block(
            r#"
let map: HashMap<String, u32> = HashMap::new();
let shared = Arc::new(map);
drop(shared);
"#,
        ));
        for expected in ["HashMap", "Arc", "String", "drop"] {
            assert!(roots.contains(expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_referenced_roots_skip_fully_qualified() {
        let roots = referenced_roots(&block("let x = ::std::mem::take(&mut 0u32);"));
        assert!(!roots.contains("std"));
    }

    #[test]
    fn test_macro_interiors_are_invisible() {
        let roots = referenced_roots(&block(r#"println!("{:?}", HashMap::<u32, u32>::new());"#));
        assert!(!roots.contains("HashMap"));
    }

    #[test]
    fn test_param_names() {
        let method: syn::ImplItemFn =
            syn::parse_str("fn handler(&self, count: u32, (x, y): (u8, u8)) {}").unwrap();
        let names = param_names(&method.sig);
        assert_eq!(
            names.into_iter().collect::<Vec<_>>(),
            vec!["count", "x", "y"]
        );
    }
}
