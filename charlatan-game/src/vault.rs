//! Vault access and the once-per-round vault commit.

use std::collections::HashMap;

use crate::constants::QUARANTINE_ROUNDS;
use crate::state::{CategoryDna, PartnerSet, PlayerVault};

/// Canonical vault key for a display name: trimmed and lower-cased.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Fetch a player's vault, creating the default record on first sight.
pub fn vault_mut<'a>(
    stats: &'a mut HashMap<String, PlayerVault>,
    key: &str,
) -> &'a mut PlayerVault {
    stats.entry(key.to_string()).or_default()
}

/// Read-only vault lookup; fresh players get the default snapshot.
#[must_use]
pub fn vault_snapshot(stats: &HashMap<String, PlayerVault>, key: &str) -> PlayerVault {
    stats.get(key).cloned().unwrap_or_default()
}

/// What happened to one player this round, as far as their vault cares.
#[derive(Debug, Clone)]
pub struct RoundOutcome<'a> {
    pub was_impostor: bool,
    /// Quarantine the player (break-protocol or chaos selection).
    pub quarantine: bool,
    pub category: &'a str,
    pub timestamp_ms: i64,
    /// Normalized keys of fellow impostors, excluding the player themself.
    pub partners: PartnerSet,
}

/// Apply one round's outcome to a vault. Called exactly once per player per
/// round; this is the only place vault metrics mutate.
pub fn apply_round_outcome(vault: &mut PlayerVault, outcome: &RoundOutcome<'_>) {
    vault.metrics.total_sessions += 1;

    // Quarantine only decrements here, once per round.
    if vault.metrics.quarantine_rounds > 0 {
        vault.metrics.quarantine_rounds -= 1;
    }

    if outcome.was_impostor {
        vault.metrics.civil_streak = 0;
        if outcome.quarantine {
            vault.metrics.quarantine_rounds = QUARANTINE_ROUNDS;
        }
    } else if vault.metrics.quarantine_rounds == 0 {
        vault.metrics.civil_streak += 1;
    }

    let prior_sessions = f64::from(vault.metrics.total_sessions - 1);
    let impostor_count = vault.metrics.impostor_ratio * prior_sessions
        + if outcome.was_impostor { 1.0 } else { 0.0 };
    vault.metrics.impostor_ratio = impostor_count / f64::from(vault.metrics.total_sessions);

    let dna = vault
        .category_dna
        .entry(outcome.category.to_string())
        .or_insert_with(CategoryDna::default);
    if outcome.was_impostor {
        dna.times_as_impostor += 1;
        dna.last_time_as_impostor = outcome.timestamp_ms;
    }

    vault.sequence.push_role(outcome.was_impostor);
    if outcome.was_impostor {
        vault.sequence.last_impostor_partners = outcome.partners.clone();
    }
}
