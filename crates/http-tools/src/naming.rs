//! Identifier slugs and collision-free name allocation.

use std::collections::{HashMap, HashSet};

use crate::endpoint::HttpMethod;

pub const MAX_SLUG_LEN: usize = 100;

/// Normalize name fragments into a `[a-z0-9_]` identifier of at most [`MAX_SLUG_LEN`] bytes.
///
/// Fragments are joined with `__`, lower-cased, and every run of other characters becomes a
/// single `_`. Leading and trailing underscores are stripped.
#[must_use]
pub fn slug<S: AsRef<str>>(parts: &[S]) -> String {
    let joined = parts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("__")
        .to_lowercase();

    let mut out = String::with_capacity(joined.len().min(MAX_SLUG_LEN));
    let mut pending_sep = false;
    for c in joined.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c);
        } else {
            pending_sep = true;
        }
    }

    truncate_slug(&mut out, MAX_SLUG_LEN);
    out
}

fn truncate_slug(s: &mut String, max: usize) {
    // Slugs are ASCII so byte truncation is safe.
    if s.len() > max {
        s.truncate(max);
    }
    while s.ends_with('_') {
        s.pop();
    }
}

/// Hands out unique identifiers within one normalization pass.
#[derive(Debug, Default)]
pub struct IdentifierAllocator {
    taken: HashSet<String>,
    counters: HashMap<String, usize>,
}

impl IdentifierAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `name` as used so it is never handed out. Returns `false` if it already was.
    pub fn reserve(&mut self, name: &str) -> bool {
        self.taken.insert(name.to_string())
    }

    /// Allocate an endpoint identifier from its name path and method.
    ///
    /// Candidates, first free wins:
    /// 1. `leaf_method`
    /// 2. `leaf`
    /// 3. `parent_path_leaf_method` (ancestors joined with a space)
    ///
    /// When all are taken, `_2`, `_3`, ... is appended to the first candidate. Declaration order
    /// decides ties: the first of two same-named endpoints keeps the shorter form.
    pub fn allocate_endpoint<S: AsRef<str>>(
        &mut self,
        name_path: &[S],
        method: HttpMethod,
    ) -> String {
        let (leaf, ancestors) = match name_path.split_last() {
            Some((leaf, ancestors)) => (leaf.as_ref(), ancestors),
            None => ("", &[] as &[S]),
        };
        let parent = ancestors
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(" ");
        let method = method.as_str();

        let candidates = [
            slug(&[leaf, method]),
            slug(&[leaf]),
            slug(&[parent.as_str(), leaf, method]),
        ];

        for candidate in candidates.iter().filter(|c| !c.is_empty()) {
            if self.taken.insert(candidate.clone()) {
                return candidate.clone();
            }
        }

        let base = candidates
            .into_iter()
            .find(|c| !c.is_empty())
            .unwrap_or_else(|| "endpoint".to_string());
        self.allocate_suffixed(&base)
    }

    /// Allocate `base` itself if free, otherwise the first free `base_N` (N from 2).
    pub fn allocate(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }
        self.allocate_suffixed(base)
    }

    fn allocate_suffixed(&mut self, base: &str) -> String {
        let counter = self.counters.entry(base.to_string()).or_insert(1);
        loop {
            *counter += 1;
            let suffix = format!("_{counter}");
            let mut stem = base.to_string();
            truncate_slug(&mut stem, MAX_SLUG_LEN.saturating_sub(suffix.len()));
            let candidate = format!("{stem}{suffix}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}
