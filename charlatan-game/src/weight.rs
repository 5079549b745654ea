//! Selection-weight formula: karma, recency suppression, category affinity
//! and self-calibrating noise.
//!
//! Each factor is its own function so the pieces test in isolation; the
//! orchestrator composes them in two passes (noiseless estimate, then the
//! real draw).

use rand::Rng;

use crate::constants::{
    CATEGORY_AFFINITY_PENALTY, KARMA_BASE, MIN_IMPOSTOR_RATIO, NEWBIE_BASE_WEIGHT, NOISE_SPAN,
    QUARANTINE_FLOOR_WEIGHT, RECENCY_STEP_LAST, RECENCY_STEP_THREE_AGO, RECENCY_STEP_TWO_AGO,
};
use crate::state::PlayerVault;

/// Inputs shared by every weight evaluation in a round.
#[derive(Debug, Clone, Copy)]
pub struct WeightContext<'a> {
    pub category: &'a str,
    pub round: u32,
    /// 1.0 normally; ramps 0.25 -> 1.0 while recovering from a break
    /// protocol, damping the civil-streak term.
    pub cooling_factor: f64,
}

/// Karma term: long civil streaks and a low lifetime impostor ratio push the
/// weight up. The streak is attenuated by the cooling factor so a freshly
/// released player is not instantly re-favored.
#[must_use]
pub fn karma_factor(vault: &PlayerVault, cooling_factor: f64) -> f64 {
    let ratio = vault.metrics.impostor_ratio.max(MIN_IMPOSTOR_RATIO);
    let effective_streak = f64::from(vault.metrics.civil_streak) * cooling_factor;
    KARMA_BASE * (effective_streak + 2.0).ln() / ratio
}

/// Recency suppression: a step function over the last four roles. Only the
/// most recent impostor round counts; earlier ones are ignored once a more
/// recent hit applies.
#[must_use]
pub fn recency_factor(vault: &PlayerVault) -> f64 {
    let seq = &vault.sequence;
    if seq.was_impostor_n_rounds_ago(0) {
        RECENCY_STEP_LAST
    } else if seq.was_impostor_n_rounds_ago(1) {
        RECENCY_STEP_TWO_AGO
    } else if seq.was_impostor_n_rounds_ago(2) {
        RECENCY_STEP_THREE_AGO
    } else {
        1.0
    }
}

/// Category affinity: being caught before in the active category costs a
/// flat 20%.
#[must_use]
pub fn affinity_factor(vault: &PlayerVault, category: &str) -> f64 {
    match vault.category_dna.get(category) {
        Some(dna) if dna.times_as_impostor > 0 => CATEGORY_AFFINITY_PENALTY,
        _ => 1.0,
    }
}

/// Noiseless selection weight. Quarantined players pin to a near-zero floor
/// (not exactly zero, so downstream ratio arithmetic stays defined); fresh
/// vaults use the flat newbie baseline.
#[must_use]
pub fn base_weight(vault: &PlayerVault, ctx: &WeightContext<'_>) -> f64 {
    if vault.is_quarantined() {
        return QUARANTINE_FLOOR_WEIGHT;
    }
    if vault.is_fresh() {
        return NEWBIE_BASE_WEIGHT;
    }
    karma_factor(vault, ctx.cooling_factor) * recency_factor(vault) * affinity_factor(vault, ctx.category)
}

/// Full selection weight: the noiseless product plus uniform noise sized
/// against the roster's estimated average weight, so the jitter stays
/// proportionally meaningful at any scale. Quarantined and fresh vaults get
/// no noise; their weights are fixed points of the distribution.
#[must_use]
pub fn selection_weight<R: Rng>(
    vault: &PlayerVault,
    ctx: &WeightContext<'_>,
    avg_weight_estimate: f64,
    rng: &mut R,
) -> f64 {
    let base = base_weight(vault, ctx);
    if vault.is_quarantined() || vault.is_fresh() {
        return base;
    }
    let noise = rng.r#gen::<f64>() * (avg_weight_estimate * NOISE_SPAN);
    base + noise
}

/// Mean noiseless weight across a roster's vaults; the orchestrator's first
/// pass, fed back into [`selection_weight`] as the noise scale.
#[must_use]
pub fn average_weight_estimate(vaults: &[&PlayerVault], ctx: &WeightContext<'_>) -> f64 {
    if vaults.is_empty() {
        return 0.0;
    }
    let total: f64 = vaults.iter().map(|vault| base_weight(vault, ctx)).sum();
    total / vaults.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn ctx() -> WeightContext<'static> {
        WeightContext {
            category: "Food",
            round: 5,
            cooling_factor: 1.0,
        }
    }

    fn veteran_vault(streak: u32, ratio: f64) -> PlayerVault {
        let mut vault = PlayerVault::default();
        vault.metrics.total_sessions = 10;
        vault.metrics.civil_streak = streak;
        vault.metrics.impostor_ratio = ratio;
        vault
    }

    #[test]
    fn fresh_vaults_share_the_newbie_baseline() {
        let vault = PlayerVault::default();
        assert!((base_weight(&vault, &ctx()) - NEWBIE_BASE_WEIGHT).abs() < f64::EPSILON);
    }

    #[test]
    fn quarantine_pins_to_the_floor() {
        let mut vault = veteran_vault(12, 0.1);
        vault.metrics.quarantine_rounds = 2;
        assert!((base_weight(&vault, &ctx()) - QUARANTINE_FLOOR_WEIGHT).abs() < f64::EPSILON);

        let mut rng = ChaCha20Rng::from_seed([3u8; 32]);
        let noisy = selection_weight(&vault, &ctx(), 500.0, &mut rng);
        assert!((noisy - QUARANTINE_FLOOR_WEIGHT).abs() < f64::EPSILON);
    }

    #[test]
    fn karma_rises_with_streak_and_falls_with_ratio() {
        let patient = veteran_vault(10, 0.1);
        let regular = veteran_vault(2, 0.1);
        assert!(karma_factor(&patient, 1.0) > karma_factor(&regular, 1.0));

        let lucky = veteran_vault(5, 0.05);
        let unlucky = veteran_vault(5, 0.5);
        assert!(karma_factor(&lucky, 1.0) > karma_factor(&unlucky, 1.0));
    }

    #[test]
    fn cooling_attenuates_the_streak_term() {
        let vault = veteran_vault(12, 0.2);
        assert!(karma_factor(&vault, 0.25) < karma_factor(&vault, 1.0));
        // With zero streak, cooling is a no-op.
        let fresh_streak = veteran_vault(0, 0.2);
        assert!((karma_factor(&fresh_streak, 0.25) - karma_factor(&fresh_streak, 1.0)).abs() < 1e-12);
    }

    #[test]
    fn recency_steps_match_the_ladder() {
        let mut vault = veteran_vault(3, 0.2);
        vault.sequence.role_sequence = [true, false, false, false].into_iter().collect();
        assert!((recency_factor(&vault) - RECENCY_STEP_LAST).abs() < f64::EPSILON);

        vault.sequence.role_sequence = [false, true, false, false].into_iter().collect();
        assert!((recency_factor(&vault) - RECENCY_STEP_TWO_AGO).abs() < f64::EPSILON);

        vault.sequence.role_sequence = [false, false, true, false].into_iter().collect();
        assert!((recency_factor(&vault) - RECENCY_STEP_THREE_AGO).abs() < f64::EPSILON);

        vault.sequence.role_sequence = [false, false, false, true].into_iter().collect();
        assert!((recency_factor(&vault) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn last_round_impostor_weighs_less_than_clean_twin() {
        let mut caught = veteran_vault(0, 0.3);
        caught.sequence.role_sequence = [true, false, false, false].into_iter().collect();
        let mut clean = veteran_vault(0, 0.3);
        clean.sequence.role_sequence = [false, false, false, false].into_iter().collect();

        assert!(base_weight(&caught, &ctx()) < base_weight(&clean, &ctx()));
    }

    #[test]
    fn affinity_penalizes_repeat_categories_only() {
        let mut vault = veteran_vault(4, 0.2);
        vault
            .category_dna
            .entry("Food".to_string())
            .or_default()
            .times_as_impostor = 2;
        assert!((affinity_factor(&vault, "Food") - CATEGORY_AFFINITY_PENALTY).abs() < f64::EPSILON);
        assert!((affinity_factor(&vault, "Movies") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn noise_is_bounded_by_the_average_estimate() {
        let vault = veteran_vault(4, 0.2);
        let context = ctx();
        let base = base_weight(&vault, &context);
        let avg = 200.0;
        let mut rng = ChaCha20Rng::from_seed([9u8; 32]);
        for _ in 0..200 {
            let w = selection_weight(&vault, &context, avg, &mut rng);
            assert!(w >= base);
            assert!(w < base + avg * NOISE_SPAN);
        }
    }
}
