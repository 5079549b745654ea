//! "Who talks first" picker, fairness-weighted against recent openers.

use rand::Rng;

use crate::cascade::choose_weighted;
use crate::constants::{
    CURATOR_EXCLUSION_CHANCE, VOCALIS_BASE_WEIGHT, VOCALIS_FRESH_FACTOR, VOCALIS_JITTER_MIN,
    VOCALIS_JITTER_SPAN, VOCALIS_LAST_OPENER_FACTOR, VOCALIS_NAME_ENTROPY_MOD,
    VOCALIS_SECOND_OPENER_FACTOR, VOCALIS_THIRD_OPENER_FACTOR,
};
use crate::state::{Player, SessionHistory};

/// Deterministic per-name offset so equal-history players still diverge
/// slightly, in a way that is stable across rounds.
fn name_entropy(name: &str) -> u32 {
    name.chars().map(|c| c as u32).sum::<u32>() % VOCALIS_NAME_ENTROPY_MOD
}

fn recency_scale(history: &SessionHistory, player_id: &str) -> f64 {
    match history.opener_recency(player_id) {
        Some(0) => VOCALIS_LAST_OPENER_FACTOR,
        Some(1) => VOCALIS_SECOND_OPENER_FACTOR,
        Some(2) => VOCALIS_THIRD_OPENER_FACTOR,
        Some(_) => 1.0,
        None => VOCALIS_FRESH_FACTOR,
    }
}

/// Pick the discussion opener.
///
/// Party mode is deterministic-with-tiebreak: the longest name wins, ties
/// broken uniformly. Otherwise recent openers are steeply downweighted and
/// a designated curator is excluded 90% of the time (a 10% residual keeps
/// the exclusion from becoming a tell). Returns `None` on an empty roster.
#[must_use]
pub fn pick_starter<R: Rng>(
    roster: &[Player],
    history: &SessionHistory,
    party_mode: bool,
    excluded_id: Option<&str>,
    rng: &mut R,
) -> Option<Player> {
    if roster.is_empty() {
        return None;
    }

    if party_mode {
        let longest = roster.iter().map(|p| p.name.chars().count()).max()?;
        let finalists: Vec<&Player> = roster
            .iter()
            .filter(|p| p.name.chars().count() == longest)
            .collect();
        return Some(finalists[rng.gen_range(0..finalists.len())].clone());
    }

    let mut candidates: Vec<&Player> = roster.iter().collect();
    if let Some(excluded) = excluded_id
        && roster.len() > 2
        && rng.r#gen::<f64>() < CURATOR_EXCLUSION_CHANCE
    {
        candidates.retain(|p| p.id != excluded);
    }

    let weights: Vec<f64> = candidates
        .iter()
        .map(|p| {
            let mut weight = VOCALIS_BASE_WEIGHT * recency_scale(history, &p.id);
            weight += f64::from(name_entropy(&p.name));
            weight * (VOCALIS_JITTER_MIN + rng.r#gen::<f64>() * VOCALIS_JITTER_SPAN)
        })
        .collect();

    let winner = choose_weighted(&weights, rng)?;
    Some(candidates[winner].clone())
}
