//! Generation protocol: fixed request template and strict response schema.
//!
//! The request constrains output to exactly the directive's function
//! signature and carries the prompt plus the full source as context. The
//! response must be a JSON object with exactly two string fields, `code` and
//! `imports`; anything else (extra fields, missing fields, unparseable
//! text, an abnormal completion) is a failure, and a failure surfaces no
//! result at all.

use serde::Deserialize;

use pw_core::{Directive, GenerationResult};

use crate::client::{ClaudeClient, Message};

/// Fixed system instructions for every generation request.
const SYSTEM_INSTRUCTIONS: &str = r#"You implement Rust function bodies from natural-language descriptions.

You are given a function signature, a description of what the function
should do, and the full source file for context.

Rules:
- Implement exactly the given signature. Do not rename it, change its
  parameters, or add new functions.
- Produce only the statements of the function body, without the surrounding
  braces or the header.
- The body must parse as Rust.

Respond with a single JSON object with exactly these two string fields and
nothing else:

{"code": "<function body content>", "imports": "<use statements the body relies on, or empty>"}

No prose, no markdown outside the JSON object."#;

/// A fully rendered generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// System instructions (fixed template).
    pub system: String,
    /// User-turn content: prompt, signature stub, full source.
    pub content: String,
}

impl GenerationRequest {
    /// Render the request for one directive against its source file.
    pub fn render(source: &str, directive: &Directive) -> Self {
        let content = format!(
            r#"Implement this function.

## SIGNATURE

```rust
{stub}
```

## DESCRIPTION

{prompt}

## FULL SOURCE FILE (context)

```rust
{source}
```"#,
            stub = directive.signature_stub,
            prompt = directive.prompt,
            source = source,
        );
        Self {
            system: SYSTEM_INSTRUCTIONS.to_string(),
            content,
        }
    }
}

/// Strict wire schema: exactly `code` and `imports`, both strings, nothing
/// more. The `imports` field is informational only and discarded after
/// validation: determining actually-required imports from free text is
/// unreliable, so all import resolution is deferred to the injector.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SubstitutionPayload {
    code: String,
    #[allow(dead_code)]
    imports: String,
}

/// Parse a response body against the strict schema.
///
/// Tolerates the payload being wrapped in a single markdown code fence
/// (transport noise), but nothing looser than that.
fn parse_payload(text: &str) -> Option<SubstitutionPayload> {
    let candidate = unwrap_fence(text);
    serde_json::from_str(candidate).ok()
}

/// Strip one surrounding ``` or ```json fence, if present.
fn unwrap_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\r', '\n']);
    match rest.rfind("```") {
        Some(end) => rest[..end].trim(),
        None => trimmed,
    }
}

/// Request synthesized code for one directive.
///
/// Returns `None` on any failure: transport error, abnormal completion,
/// schema violation. No partial or garbage result is ever surfaced, and the
/// caller must not write anything to the cache for a `None`.
pub async fn generate(
    client: &ClaudeClient,
    source: &str,
    directive: &Directive,
) -> Option<GenerationResult> {
    let request = GenerationRequest::render(source, directive);
    let messages = vec![Message::user(request.content)];

    let completion = match client.complete_with_system(messages, Some(request.system)).await {
        Ok(completion) => completion,
        Err(err) => {
            tracing::warn!(prompt = %directive.prompt, %err, "generation request failed");
            return None;
        }
    };

    if !completion.is_normal() {
        tracing::warn!(
            prompt = %directive.prompt,
            stop_reason = ?completion.stop_reason,
            "abnormal completion"
        );
        return None;
    }

    let Some(payload) = parse_payload(&completion.text) else {
        tracing::warn!(prompt = %directive.prompt, "response violated substitution schema");
        return None;
    };

    Some(GenerationResult::from_code(payload.code))
}
