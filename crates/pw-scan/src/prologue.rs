//! Prologue inspection shared by the scanner and the injector.
//!
//! The prologue is the leading run of expression statements whose expression
//! is a plain string literal; the first statement of any other shape ends it.
//! Within the prologue, the first string carrying the `use prompt:` prefix
//! decides the outcome for the whole function; later strings are ignored.

use pw_core::PROMPT_PREFIX;

/// Outcome of inspecting a function body's prologue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptScan {
    /// No prologue string carries the prefix.
    None,
    /// A prefix string exists but its trimmed remainder is empty. The
    /// scanner emits no directive for this; the injector turns it into a
    /// diagnostic body.
    Empty,
    /// Trimmed, non-empty directive text.
    Found(String),
}

/// Inspect the leading statements of a block for a directive string.
pub fn prologue_prompt(block: &syn::Block) -> PromptScan {
    for stmt in &block.stmts {
        let Some(text) = stmt_string_literal(stmt) else {
            // First non-string-literal statement ends the prologue.
            break;
        };
        let Some(rest) = text.strip_prefix(PROMPT_PREFIX) else {
            continue;
        };
        let prompt = rest.trim();
        if prompt.is_empty() {
            return PromptScan::Empty;
        }
        return PromptScan::Found(prompt.to_string());
    }
    PromptScan::None
}

/// The string value if `stmt` is an expression statement over a plain
/// string literal.
fn stmt_string_literal(stmt: &syn::Stmt) -> Option<String> {
    let syn::Stmt::Expr(expr, _) = stmt else {
        return None;
    };
    match expr {
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(lit),
            ..
        }) => Some(lit.value()),
        _ => None,
    }
}
