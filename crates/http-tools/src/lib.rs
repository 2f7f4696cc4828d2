//! Endpoint model, template expansion and request synthesis.
//!
//! This crate is shared by every document loader (`collection-tools`, `openapi-tools`) and by the
//! adapter. It has no knowledge of MCP sessions or of where documents come from.

pub mod endpoint;
pub mod naming;
pub mod runtime;
pub mod safety;
pub mod semantics;
pub mod synth;
pub mod template;
