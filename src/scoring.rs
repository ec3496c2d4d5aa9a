/// Score updater - feeds generation outcomes back into value-set counters
///
/// After a generation completes (or is blocked), the orchestration layer
/// reports which value was chosen for each originally-typed token. The
/// updater increments the matching entry's counter, recomputes its average,
/// and persists every touched set. Mutation happens under each set's mutex
/// so concurrent updates cannot drop increments.
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::store::ValueSetStore;
use crate::token;

/// The outcome of one generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Blocked,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Blocked => "blocked",
        }
    }
}

/// Error for an outcome tag this engine does not know.
///
/// Callers receiving tags from an external source should treat this as a
/// no-op for that report rather than a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOutcome(pub String);

impl std::fmt::Display for UnknownOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unknown outcome tag: {}", self.0)
    }
}

impl std::error::Error for UnknownOutcome {}

impl FromStr for Outcome {
    type Err = UnknownOutcome;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Outcome::Success),
            "blocked" => Ok(Outcome::Blocked),
            other => Err(UnknownOutcome(other.to_string())),
        }
    }
}

/// Applies outcome signals to the entries that produced them.
pub struct ScoreUpdater {
    store: Arc<ValueSetStore>,
}

impl ScoreUpdater {
    pub fn new(store: Arc<ValueSetStore>) -> Self {
        ScoreUpdater { store }
    }

    /// Update counters for every `(token text, chosen value)` pair and
    /// persist the touched sets.
    ///
    /// Pairs whose token text does not parse, whose set is empty or
    /// unknown, or whose chosen value no longer exists in the set are
    /// skipped with a warning. Returns `true` only if every touched set
    /// was saved; one failed save does not prevent attempting the others.
    pub async fn update_scores(
        &self,
        chosen_by_token: &HashMap<String, String>,
        outcome: Outcome,
    ) -> bool {
        if chosen_by_token.is_empty() {
            debug!("no chosen wildcards provided for score update");
            return true;
        }

        info!(outcome = outcome.as_str(), "updating wildcard scores");

        let mut dirty: HashSet<String> = HashSet::new();
        for (token_text, chosen_value) in chosen_by_token {
            let Some(parsed) = token::parse_token(token_text) else {
                warn!(token = %token_text, "could not parse set name from token text");
                continue;
            };
            let name = parsed.base_name().to_string();

            let handle = self.store.handle(&name).await;
            let mut set = handle.lock().await;
            if set.is_empty() {
                warn!(set = %name, value = %chosen_value, "no data for set, cannot update score");
                continue;
            }

            let Some(entry) = set.entries.iter_mut().find(|e| e.value == *chosen_value) else {
                warn!(set = %name, value = %chosen_value, "chosen value no longer present in set");
                continue;
            };
            match outcome {
                Outcome::Success => entry.success += 1,
                Outcome::Blocked => entry.blocked += 1,
            }
            entry.recompute_average();
            debug!(
                set = %name,
                value = %chosen_value,
                success = entry.success,
                blocked = entry.blocked,
                "score updated"
            );
            dirty.insert(name);
        }

        if dirty.is_empty() {
            debug!("no value-sets needed saving after score update");
            return true;
        }

        let mut all_saved = true;
        for name in &dirty {
            let handle = self.store.handle(name).await;
            let set = handle.lock().await;
            if !self.store.persist_locked(name, &set).await {
                all_saved = false;
            }
        }
        all_saved
    }
}
