//! HTTP semantics helpers.
//!
//! A document tool fronts many endpoints, so its MCP `ToolAnnotations` are the conservative
//! aggregate of its endpoints' RFC 9110 method semantics.

use crate::endpoint::HttpMethod;
use rmcp::model::ToolAnnotations;

/// Generate MCP tool annotations for a tool that can issue any of `methods`.
///
/// - `openWorldHint` is always `true` (the tool talks to an external system).
/// - read-only and idempotent only when every method is safe (GET/HEAD/OPTIONS).
/// - destructive when any method is PUT/PATCH/DELETE.
#[must_use]
pub fn annotations_for_methods(methods: impl IntoIterator<Item = HttpMethod>) -> ToolAnnotations {
    let mut any = false;
    let mut all_safe = true;
    let mut destructive = false;
    for method in methods {
        any = true;
        match method {
            HttpMethod::Get | HttpMethod::Head | HttpMethod::Options => {}
            HttpMethod::Post => all_safe = false,
            HttpMethod::Put | HttpMethod::Patch | HttpMethod::Delete => {
                all_safe = false;
                destructive = true;
            }
        }
    }

    if !any {
        return ToolAnnotations {
            title: None,
            read_only_hint: None,
            destructive_hint: None,
            idempotent_hint: None,
            open_world_hint: Some(true),
        };
    }

    ToolAnnotations {
        title: None,
        read_only_hint: Some(all_safe),
        destructive_hint: Some(destructive),
        // POST and PATCH make the aggregate non-idempotent; do not guess beyond safe methods.
        idempotent_hint: Some(all_safe),
        open_world_hint: Some(true),
    }
}
