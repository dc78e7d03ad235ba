//! Directive collection over a parsed source file.

use proc_macro2::Span;
use syn::spanned::Spanned;
use syn::visit::{self, Visit};

use pw_core::{Directive, FnSpan};

use crate::prologue::{prologue_prompt, PromptScan};

/// Scanner failure. A parse failure fails the whole file: callers must treat
/// it as "no directives", never as a partial result.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The source could not be parsed into a syntax tree.
    #[error("source failed to parse: {0}")]
    Parse(#[from] syn::Error),
}

/// Parse `source` and collect its directives in traversal order.
pub fn scan_source(source: &str) -> Result<Vec<Directive>, ScanError> {
    let file = syn::parse_file(source)?;
    Ok(scan_file(source, &file))
}

/// Collect directives from an already-parsed file.
///
/// The injector uses this form: it holds the tree it is about to rewrite and
/// must derive the directive set with the identical algorithm the generation
/// pass used.
pub fn scan_file(source: &str, file: &syn::File) -> Vec<Directive> {
    let mut collector = DirectiveCollector {
        source,
        directives: Vec::new(),
    };
    collector.visit_file(file);
    tracing::debug!(count = collector.directives.len(), "scan complete");
    collector.directives
}

/// Derive the directive for a single function node, if its prologue
/// qualifies.
///
/// Both passes go through this exact derivation, so they agree on directive
/// identity with zero shared state. `header` anchors the start of the
/// signature stub; the stub runs to the body's opening brace, right-trimmed,
/// with an empty body token appended.
pub fn directive_at(source: &str, header: Span, block: &syn::Block) -> Option<Directive> {
    let PromptScan::Found(prompt) = prologue_prompt(block) else {
        return None;
    };
    let start = header.byte_range().start;
    let end = block.span().byte_range().start;
    if end > source.len() || start >= end {
        // Spans disagree with the source text; nothing sane to emit.
        tracing::warn!(start, end, "dropping directive with invalid span");
        return None;
    }
    let stub_header = source[start..end].trim_end();
    Some(Directive {
        span: FnSpan::new(start, end),
        prompt,
        signature_stub: format!("{}{{}}", stub_header),
    })
}

/// Header start for a function: the visibility qualifier when present,
/// otherwise the signature itself. `Visibility::Inherited` carries no
/// tokens, so its span cannot anchor anything.
pub fn header_span(vis: &syn::Visibility, sig: &syn::Signature) -> Span {
    match vis {
        syn::Visibility::Inherited => sig.span(),
        _ => vis.span(),
    }
}

struct DirectiveCollector<'src> {
    source: &'src str,
    directives: Vec<Directive>,
}

impl DirectiveCollector<'_> {
    fn collect(&mut self, header: Span, block: &syn::Block) {
        if let Some(directive) = directive_at(self.source, header, block) {
            self.directives.push(directive);
        }
    }
}

impl<'ast> Visit<'ast> for DirectiveCollector<'_> {
    fn visit_item_fn(&mut self, node: &'ast syn::ItemFn) {
        self.collect(header_span(&node.vis, &node.sig), &node.block);
        // Recurse: directive functions nested inside other functions are
        // each collected independently.
        visit::visit_item_fn(self, node);
    }

    fn visit_impl_item_fn(&mut self, node: &'ast syn::ImplItemFn) {
        self.collect(header_span(&node.vis, &node.sig), &node.block);
        visit::visit_impl_item_fn(self, node);
    }

    fn visit_trait_item_fn(&mut self, node: &'ast syn::TraitItemFn) {
        if let Some(block) = &node.default {
            self.collect(node.sig.span(), block);
        }
        visit::visit_trait_item_fn(self, node);
    }
}
