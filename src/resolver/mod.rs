/// Resolver module - expands wildcard tokens in free text
// Implementation modules
mod expand_impl;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, warn};

use crate::store::ValueSetStore;
use crate::token;

use expand_impl::Pass;

/// Ceiling on expansion passes and nested expansion depth.
///
/// Reaching it is not an error; resolution stops and returns the text as-is.
pub const MAX_RECURSION_DEPTH: usize = 10;

/// Ceiling on count-suffix repetitions for a single token.
///
/// A suffix beyond it is clamped so a stray huge count cannot stall
/// resolution or exhaust memory.
pub const MAX_REPEAT_COUNT: u64 = 1000;

/// The outcome of one full resolution pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resolution {
    /// The input with every resolvable token expanded.
    pub resolved_text: String,
    /// The input text, unchanged.
    pub original_text: String,
    /// Every chosen value, in resolution order, for every set name touched
    /// during the pass. Consumed by filename templating and scoring.
    pub resolved_by_name: HashMap<String, Vec<String>>,
}

/// Expands wildcard tokens against a shared value-set store.
///
/// Resolution never fails: unknown sets, empty sets, and depth limits all
/// degrade to leaving the literal token text visible in the output.
pub struct WildcardResolver {
    store: Arc<ValueSetStore>,
}

impl WildcardResolver {
    pub fn new(store: Arc<ValueSetStore>) -> Self {
        WildcardResolver { store }
    }

    /// Resolve every token in `text` using entropy-seeded randomness.
    pub async fn resolve(&self, text: &str) -> Resolution {
        let mut rng = StdRng::from_entropy();
        self.resolve_with_rng(text, &mut rng).await
    }

    /// Resolve every token in `text`, drawing randomness from `rng`.
    ///
    /// Tokens sharing a numeric prefix and set name resolve to the same
    /// value within this call; the memo is discarded when the call returns.
    pub async fn resolve_with_rng<R: Rng + Send>(&self, text: &str, rng: &mut R) -> Resolution {
        if text.is_empty() {
            return Resolution::default();
        }

        let mut pass = Pass::new(&self.store, rng, true);
        let mut visited = HashSet::new();
        let resolved_text = pass.resolve_recursive(text, 0, &mut visited).await;

        Resolution {
            resolved_text,
            original_text: text.to_string(),
            resolved_by_name: pass.into_resolved_by_name(),
        }
    }

    /// Resolve only the `index`-th token (1-based) in `text`.
    ///
    /// Returns `None` when `index` is zero or exceeds the number of tokens
    /// present. The expansion uses its own pass state and never touches a
    /// by-name map, so it cannot interfere with a concurrent [`resolve`].
    ///
    /// Note that this performs an independent random draw: it is not
    /// guaranteed to agree with the value a full [`resolve`] pass chose for
    /// the same occurrence. Callers that need the two to match must resolve
    /// once and reuse the result.
    ///
    /// [`resolve`]: WildcardResolver::resolve
    pub async fn resolve_specific(&self, text: &str, index: usize) -> Option<String> {
        let mut rng = StdRng::from_entropy();
        self.resolve_specific_with_rng(text, index, &mut rng).await
    }

    /// Seeded variant of [`resolve_specific`](WildcardResolver::resolve_specific).
    pub async fn resolve_specific_with_rng<R: Rng + Send>(
        &self,
        text: &str,
        index: usize,
        rng: &mut R,
    ) -> Option<String> {
        if index == 0 {
            error!("wildcard ordinal must be 1 or greater");
            return None;
        }
        if text.is_empty() {
            return None;
        }
        let Some(m) = token::find_nth_token(text, index) else {
            warn!(index, "requested wildcard ordinal exceeds tokens present");
            return None;
        };

        let mut pass = Pass::new(&self.store, rng, false);
        let mut visited = HashSet::new();
        Some(pass.resolve_single(&m, 0, &mut visited).await)
    }
}
