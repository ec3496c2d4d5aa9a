//! Token expansion implementation
//!
//! One `Pass` holds the state scoped to a single top-level resolution call:
//! the numbered-choice memo and (for full passes) the by-name map of chosen
//! values. Expansion is recursive: a chosen value may itself contain tokens,
//! bounded by `MAX_RECURSION_DEPTH` and a per-chain visited-set guard
//! against self-reference.
use async_recursion::async_recursion;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::store::{ValueEntry, ValueSetStore};
use crate::token::{self, Token, TokenMatch};

use super::{MAX_RECURSION_DEPTH, MAX_REPEAT_COUNT};

/// State owned by one resolution call. Never shared across calls.
pub(super) struct Pass<'a, R: Rng> {
    store: &'a ValueSetStore,
    rng: &'a mut R,
    /// `(number, set name)` -> chosen value, for `[N:name]` consistency.
    numbered_choices: HashMap<u64, HashMap<String, String>>,
    /// `None` for `resolve_specific`, which must not record choices.
    resolved_by_name: Option<HashMap<String, Vec<String>>>,
}

impl<'a, R: Rng + Send> Pass<'a, R> {
    pub(super) fn new(store: &'a ValueSetStore, rng: &'a mut R, record: bool) -> Self {
        Pass {
            store,
            rng,
            numbered_choices: HashMap::new(),
            resolved_by_name: record.then(HashMap::new),
        }
    }

    pub(super) fn into_resolved_by_name(self) -> HashMap<String, Vec<String>> {
        self.resolved_by_name.unwrap_or_default()
    }

    /// Record a freshly drawn value. Cached numbered re-uses are not
    /// recorded, so a value appears once no matter how many tokens shared
    /// the same `(number, set)` memo.
    fn record(&mut self, name: &str, value: &str) {
        if let Some(map) = self.resolved_by_name.as_mut() {
            map.entry(name.to_string())
                .or_default()
                .push(value.to_string());
        }
    }

    fn choose_value(&mut self, entries: &[ValueEntry]) -> Option<String> {
        entries.choose(&mut *self.rng).map(|e| e.value.clone())
    }

    /// Expand every token in `text`, then keep re-expanding while the text
    /// keeps changing, up to the depth ceiling.
    #[async_recursion]
    pub(super) async fn resolve_recursive(
        &mut self,
        text: &str,
        depth: usize,
        visited: &mut HashSet<String>,
    ) -> String {
        if depth > MAX_RECURSION_DEPTH {
            warn!(
                depth,
                "max recursion depth reached, returning text unresolved"
            );
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        let mut changed = false;
        while let Some(m) = token::find_next_token(text, last) {
            out.push_str(&text[last..m.start]);
            let resolved = self.resolve_single(&m, depth, visited).await;
            if resolved != m.text {
                changed = true;
            }
            out.push_str(&resolved);
            last = m.end;
        }
        out.push_str(&text[last..]);

        if changed && out != text {
            self.resolve_recursive(&out, depth + 1, visited).await
        } else {
            out
        }
    }

    /// Expand one matched token into its replacement text.
    #[async_recursion]
    pub(super) async fn resolve_single(
        &mut self,
        m: &TokenMatch,
        depth: usize,
        visited: &mut HashSet<String>,
    ) -> String {
        if depth > MAX_RECURSION_DEPTH {
            warn!(depth, token = %m.text, "max recursion depth reached for token");
            return m.text.clone();
        }

        let (base_name, resolved) = match &m.token {
            Token::Braced { name } => {
                let value = self.expand_braced(name, &m.text).await;
                (name.clone(), value)
            }
            Token::Bracketed {
                number,
                expr,
                alternatives,
                count,
            } => {
                // The alternation chooses the set name before any other
                // modifier applies.
                let base = if expr.contains('|') {
                    match alternatives.choose(&mut *self.rng) {
                        Some(name) => {
                            debug!(expr = %expr, chosen = %name, "alternation resolved");
                            name.clone()
                        }
                        None => {
                            warn!(expr = %expr, "alternation has no usable names");
                            expr.clone()
                        }
                    }
                } else {
                    expr.clone()
                };
                let value = self.expand_bracketed(&base, *number, *count).await;
                (base, value)
            }
        };

        // A chosen value may itself contain tokens. Guard against a value
        // re-expanding into its own set name within this chain.
        if token::contains_token(&resolved) {
            if visited.contains(&base_name) {
                warn!(set = %base_name, "self-recursion detected, stopping this branch");
                return resolved;
            }
            visited.insert(base_name.clone());
            let expanded = self.resolve_recursive(&resolved, depth + 1, visited).await;
            visited.remove(&base_name);
            return expanded;
        }

        resolved
    }

    async fn expand_braced(&mut self, name: &str, literal: &str) -> String {
        let entries = self.store.load(name).await;
        match self.choose_value(&entries) {
            Some(value) => {
                self.record(name, &value);
                value
            }
            None => literal.to_string(),
        }
    }

    async fn expand_bracketed(&mut self, name: &str, number: Option<u64>, count: u64) -> String {
        let count = if count > MAX_REPEAT_COUNT {
            warn!(count, "count suffix exceeds the repeat ceiling, clamping");
            MAX_REPEAT_COUNT
        } else {
            count
        };
        let mut parts = Vec::with_capacity(count as usize);
        for _ in 0..count {
            if let Some(cached) = number.and_then(|n| self.cached_choice(n, name)) {
                debug!(set = name, number, "using memoized numbered choice");
                parts.push(cached);
                continue;
            }

            let entries = self.store.load(name).await;
            match self.choose_value(&entries) {
                Some(value) => {
                    if let Some(n) = number {
                        self.numbered_choices
                            .entry(n)
                            .or_default()
                            .insert(name.to_string(), value.clone());
                    }
                    self.record(name, &value);
                    parts.push(value);
                }
                None => parts.push(format!("[{}]", name)),
            }
        }
        parts.join(" ")
    }

    fn cached_choice(&self, number: u64, name: &str) -> Option<String> {
        self.numbered_choices
            .get(&number)
            .and_then(|by_name| by_name.get(name))
            .cloned()
    }
}
