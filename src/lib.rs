/// Wildcard Engine - resolution and scoring for bracketed prompt wildcards
///
/// This library expands `{name}` and `[...]` tokens embedded in free text
/// into values drawn from named, file-backed value-sets, and feeds
/// generation outcomes back into per-value scores.
///
/// Bracketed tokens support three combinable modifiers: a numeric prefix
/// (`[1:artists]`, memoized per number within one resolution), an
/// alternation (`[a|b]`, one set name chosen at random), and a count suffix
/// (`[colors:3]`, repetitions joined by spaces). Missing or empty sets are
/// never an error; the literal token stays visible in the output.
///
/// # Example
///
/// ```
/// # tokio_test::block_on(async {
/// use wildcard_engine::{resolve_with_seed, storage::MemoryStorage, ValueSetStore};
/// use std::sync::Arc;
///
/// let storage = MemoryStorage::new();
/// storage.add("artists", r#"[{"value": "Monet"}]"#);
/// let store = Arc::new(ValueSetStore::new(Arc::new(storage)));
///
/// let resolution = resolve_with_seed(store, "painted by [artists]", 42).await;
/// assert_eq!(resolution.resolved_text, "painted by Monet");
/// # });
/// ```
pub mod resolver;
pub mod scoring;
pub mod storage;
pub mod store;
pub mod token;

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

/// Re-export main types for convenience
pub use resolver::{Resolution, WildcardResolver, MAX_RECURSION_DEPTH, MAX_REPEAT_COUNT};
pub use scoring::{Outcome, ScoreUpdater, UnknownOutcome};
pub use storage::{FolderStorage, MemoryStorage, StorageError, WildcardStorage};
pub use store::{ValueEntry, ValueSet, ValueSetStore};
pub use token::{find_next_token, find_nth_token, Token, TokenMatch};

/// Resolve all tokens in `text` against `store` with a seeded RNG.
///
/// This is a convenience function for deterministic output; it is
/// equivalent to constructing a [`WildcardResolver`] and calling
/// [`resolve_with_rng`](WildcardResolver::resolve_with_rng) with
/// `StdRng::seed_from_u64(seed)`.
pub async fn resolve_with_seed(store: Arc<ValueSetStore>, text: &str, seed: u64) -> Resolution {
    let mut rng = StdRng::seed_from_u64(seed);
    WildcardResolver::new(store)
        .resolve_with_rng(text, &mut rng)
        .await
}
