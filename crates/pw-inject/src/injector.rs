//! The compile-time rewrite: plan, resolve imports, splice.
//!
//! Injection runs in two phases over one parse of the host file. The first
//! phase is immutable: it re-derives directives with the scanner's
//! algorithm, looks them up in the cache, re-parses cached code into body
//! blocks, and resolves import collisions, all while original byte spans
//! are still valid. The second phase is a mutable visitor that splices the
//! planned bodies into their functions, children before parents, so
//! replacement tokens are never traversed and a directive function nested
//! inside another directive function is handled the way the tree dictates
//! (the outer replacement wins).

use std::collections::BTreeMap;

use proc_macro2::Span;
use syn::spanned::Spanned;
use syn::visit::{self, Visit};
use syn::visit_mut::{self, VisitMut};

use pw_cache::Cache;
use pw_core::SymbolTable;
use pw_scan::{directive_at, header_span, prologue_prompt, PromptScan};

use crate::analyze::{bound_names, param_names, referenced_roots};
use crate::config::InjectorConfig;
use crate::imports::{append_use_items, HostBindings, ImportResolver};
use crate::rewrite::RenameRoots;

/// Result of injecting one file.
#[derive(Debug)]
pub struct InjectOutcome {
    /// The rewritten tree.
    pub file: syn::File,
    /// Function bodies replaced with generated code.
    pub replaced: usize,
    /// Directives with no cache entry; their bodies were left unmodified.
    pub missing: usize,
    /// Cache hits whose code failed to re-parse, downgraded to misses.
    pub reparse_failures: usize,
    /// Prompts with an empty remainder, given a diagnostic body.
    pub incomplete_prompts: usize,
    /// New `use` items appended.
    pub imports_added: usize,
}

/// Injection failure. A parse failure means the file has zero directives;
/// callers log it and pass the source through unmodified.
#[derive(Debug, thiserror::Error)]
pub enum InjectError {
    /// The host source could not be parsed.
    #[error("source failed to parse: {0}")]
    Parse(#[from] syn::Error),
}

/// Rewrite one file against a cache snapshot.
///
/// A pure function of `(source, cache, symbols)`: no I/O, no suspension
/// points, byte-identical output for identical inputs. Re-running over an
/// already-rewritten file reproduces it, since replaced bodies carry no
/// directive prologue anymore and the second run plans nothing.
pub fn inject_source(
    source: &str,
    cache: &Cache,
    symbols: &SymbolTable,
    _config: &InjectorConfig,
) -> Result<InjectOutcome, InjectError> {
    let mut file = syn::parse_file(source)?;
    let host = HostBindings::collect(&file);

    let mut planner = Planner {
        source,
        cache,
        host: &host,
        resolver: ImportResolver::new(&host, symbols),
        plans: BTreeMap::new(),
        missing: 0,
        reparse_failures: 0,
    };
    planner.visit_file(&file);

    let Planner {
        resolver,
        plans,
        missing,
        reparse_failures,
        ..
    } = planner;

    let mut use_items = Vec::new();
    for (symbol, local) in resolver.additions() {
        match ImportResolver::use_item(symbol, local) {
            Ok(item) => use_items.push(item),
            Err(err) => {
                tracing::warn!(symbol = %symbol.full_path(), %err, "skipping unbuildable import");
            }
        }
    }
    let imports_added = use_items.len();

    let mut applier = Applier {
        plans,
        replaced: 0,
        incomplete_prompts: 0,
    };
    applier.visit_file_mut(&mut file);
    if !applier.plans.is_empty() {
        tracing::warn!(leftover = applier.plans.len(), "planned bodies found no function");
    }

    append_use_items(&mut file, use_items);

    Ok(InjectOutcome {
        file,
        replaced: applier.replaced,
        missing,
        reparse_failures,
        incomplete_prompts: applier.incomplete_prompts,
        imports_added,
    })
}

/// Print a rewritten tree.
pub fn render(file: &syn::File) -> String {
    prettyplease::unparse(file)
}

/// Parse cached generated code as the content of a body block.
fn parse_body(code: &str) -> Result<syn::Block, syn::Error> {
    syn::parse_str(&format!("{{\n{}\n}}", code))
}

/// Diagnostic body for a directive whose prompt text is empty.
fn incomplete_prompt_body() -> syn::Block {
    syn::parse_quote!({
        panic!("incomplete prompt: directive text is empty");
    })
}

enum Plan {
    Generated(syn::Block),
    IncompletePrompt,
}

struct Planner<'a> {
    source: &'a str,
    cache: &'a Cache,
    host: &'a HostBindings,
    resolver: ImportResolver<'a>,
    /// Keyed by the function's header-span byte start, unique per node.
    plans: BTreeMap<usize, Plan>,
    missing: usize,
    reparse_failures: usize,
}

impl Planner<'_> {
    fn plan(&mut self, header: Span, sig: &syn::Signature, block: &syn::Block) {
        match prologue_prompt(block) {
            PromptScan::None => {}
            PromptScan::Empty => {
                self.plans
                    .insert(header.byte_range().start, Plan::IncompletePrompt);
            }
            PromptScan::Found(_) => {
                let Some(directive) = directive_at(self.source, header, block) else {
                    return;
                };
                let Some(result) = self.cache.lookup(&directive.cache_key(), &directive.prompt)
                else {
                    tracing::debug!(prompt = %directive.prompt, "cache miss, body left unmodified");
                    self.missing += 1;
                    return;
                };
                let mut body = match parse_body(&result.code) {
                    Ok(body) => body,
                    Err(err) => {
                        tracing::warn!(
                            prompt = %directive.prompt,
                            %err,
                            "cached code failed to re-parse, treating as miss"
                        );
                        self.reparse_failures += 1;
                        return;
                    }
                };
                self.resolve_imports(sig, &mut body);
                self.plans.insert(directive.span.start, Plan::Generated(body));
            }
        }
    }

    /// Resolve the body's required symbols and rewrite its references to the
    /// local names the host file ends up binding.
    fn resolve_imports(&mut self, sig: &syn::Signature, body: &mut syn::Block) {
        let bound = bound_names(body);
        let params = param_names(sig);
        let mut renames = BTreeMap::new();
        for name in referenced_roots(body) {
            if bound.contains(&name)
                || params.contains(&name)
                || self.host.item_names().contains(&name)
            {
                continue;
            }
            if let Some(local) = self.resolver.resolve(&name) {
                renames.insert(name, local);
            }
        }
        RenameRoots::new(renames).apply(body);
    }
}

impl<'ast> Visit<'ast> for Planner<'_> {
    fn visit_item_fn(&mut self, node: &'ast syn::ItemFn) {
        self.plan(header_span(&node.vis, &node.sig), &node.sig, &node.block);
        visit::visit_item_fn(self, node);
    }

    fn visit_impl_item_fn(&mut self, node: &'ast syn::ImplItemFn) {
        self.plan(header_span(&node.vis, &node.sig), &node.sig, &node.block);
        visit::visit_impl_item_fn(self, node);
    }

    fn visit_trait_item_fn(&mut self, node: &'ast syn::TraitItemFn) {
        if let Some(block) = &node.default {
            self.plan(node.sig.span(), &node.sig, block);
        }
        visit::visit_trait_item_fn(self, node);
    }
}

struct Applier {
    plans: BTreeMap<usize, Plan>,
    replaced: usize,
    incomplete_prompts: usize,
}

impl Applier {
    fn apply(&mut self, key: usize) -> Option<syn::Block> {
        match self.plans.remove(&key)? {
            Plan::Generated(block) => {
                self.replaced += 1;
                Some(block)
            }
            Plan::IncompletePrompt => {
                self.incomplete_prompts += 1;
                Some(incomplete_prompt_body())
            }
        }
    }
}

impl VisitMut for Applier {
    fn visit_item_fn_mut(&mut self, node: &mut syn::ItemFn) {
        // Children first: a nested directive function is spliced before its
        // parent's replacement discards it, and fresh tokens (whose spans
        // are meaningless byte ranges) are never traversed.
        visit_mut::visit_item_fn_mut(self, node);
        let key = header_span(&node.vis, &node.sig).byte_range().start;
        if let Some(block) = self.apply(key) {
            *node.block = block;
        }
    }

    fn visit_impl_item_fn_mut(&mut self, node: &mut syn::ImplItemFn) {
        visit_mut::visit_impl_item_fn_mut(self, node);
        let key = header_span(&node.vis, &node.sig).byte_range().start;
        if let Some(block) = self.apply(key) {
            node.block = block;
        }
    }

    fn visit_trait_item_fn_mut(&mut self, node: &mut syn::TraitItemFn) {
        visit_mut::visit_trait_item_fn_mut(self, node);
        if node.default.is_some() {
            let key = node.sig.span().byte_range().start;
            if let Some(block) = self.apply(key) {
                node.default = Some(block);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pw_core::GenerationResult;
    use pw_scan::scan_source;

    fn cache_for(source: &str, code: &str) -> Cache {
        let directives = scan_source(source).unwrap();
        let mut cache = Cache::new();
        cache.merge(
            directives
                .into_iter()
                .map(|d| (d, GenerationResult::from_code(code)))
                .collect(),
        );
        cache
    }

    fn inject(source: &str, cache: &Cache) -> InjectOutcome {
        inject_source(
            source,
            cache,
            &SymbolTable::builtin(),
            &InjectorConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_hit_replaces_body_and_keeps_signature() {
        let source = "pub fn cool_button(clicks: u32) -> u32 {\n    \"use prompt: count clicks\";\n}\n";
        let cache = cache_for(source, "clicks + 1");
        let outcome = inject(source, &cache);

        assert_eq!(outcome.replaced, 1);
        let rendered = render(&outcome.file);
        assert!(rendered.contains("pub fn cool_button(clicks: u32) -> u32"));
        assert!(rendered.contains("clicks + 1"));
        assert!(!rendered.contains("use prompt:"));
    }

    #[test]
    fn test_miss_leaves_body_unmodified() {
        let source = "fn cool_button() {\n    \"use prompt: a button\";\n}\n";
        let outcome = inject(source, &Cache::new());

        assert_eq!(outcome.replaced, 0);
        assert_eq!(outcome.missing, 1);
        assert!(render(&outcome.file).contains("use prompt: a button"));
    }

    #[test]
    fn test_reparse_failure_is_a_miss() {
        let source = "fn cool_button() {\n    \"use prompt: a button\";\n}\n";
        let cache = cache_for(source, "let broken = {;");
        let outcome = inject(source, &cache);

        assert_eq!(outcome.replaced, 0);
        assert_eq!(outcome.reparse_failures, 1);
        assert!(render(&outcome.file).contains("use prompt: a button"));
    }

    #[test]
    fn test_incomplete_prompt_gets_diagnostic_body() {
        let source = "fn broken_button() {\n    \"use prompt:  \";\n}\n";
        let outcome = inject(source, &Cache::new());

        assert_eq!(outcome.incomplete_prompts, 1);
        let rendered = render(&outcome.file);
        assert!(rendered.contains("incomplete prompt"));
        assert!(!rendered.contains("use prompt:"));
    }

    #[test]
    fn test_parse_failure_is_an_error() {
        let result = inject_source(
            "fn broken( {",
            &Cache::new(),
            &SymbolTable::builtin(),
            &InjectorConfig::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_required_symbol_gets_imported() {
        let source = "fn tally() -> u32 {\n    \"use prompt: tally things\";\n}\n";
        let cache = cache_for(
            source,
            "let mut counts: HashMap<u32, u32> = HashMap::new();\ncounts.insert(1, 1);\ncounts.len() as u32",
        );
        let outcome = inject(source, &cache);

        assert_eq!(outcome.imports_added, 1);
        let rendered = render(&outcome.file);
        assert!(rendered.contains("use std::collections::HashMap;"));
    }

    #[test]
    fn test_locally_bound_names_are_not_imported() {
        let source = "fn tally() {\n    \"use prompt: tally things\";\n}\n";
        let cache = cache_for(source, "let HashMap = 1;\nlet _ = HashMap;");
        let outcome = inject(source, &cache);
        assert_eq!(outcome.imports_added, 0);
    }

    #[test]
    fn test_injection_is_idempotent() {
        let source = "use std::sync::Arc;\n\nfn cool_button() {\n    \"use prompt: share state\";\n}\n";
        let cache = cache_for(source, "let shared = Arc::new(1u32);\ndrop(shared);");

        let first = inject(source, &cache);
        let first_text = render(&first.file);

        let second = inject(&first_text, &cache);
        let second_text = render(&second.file);

        assert_eq!(first_text, second_text);
        assert_eq!(second.replaced, 0);
        assert_eq!(second.imports_added, 0);
    }

    #[test]
    fn test_nested_directive_outer_replacement_wins() {
        let source = r#"
fn outer() {
    "use prompt: outer widget";
    fn inner() {
        "use prompt: inner widget";
    }
}
"#;
        let directives = scan_source(source).unwrap();
        let mut cache = Cache::new();
        cache.merge(vec![(
            directives[0].clone(),
            GenerationResult::from_code("let _outer = 1;"),
        )]);
        cache.merge(vec![(
            directives[1].clone(),
            GenerationResult::from_code("let _inner = 2;"),
        )]);

        let outcome = inject(source, &cache);
        let rendered = render(&outcome.file);
        assert!(rendered.contains("_outer"));
        assert!(!rendered.contains("_inner"));
    }
}
