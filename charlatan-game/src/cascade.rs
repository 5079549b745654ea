//! Without-replacement impostor draws with squad-conflict avoidance.

use rand::Rng;

use crate::constants::{QUARANTINE_FLOOR_WEIGHT, SYNERGY_CONFLICT_PENALTY};
use crate::state::PartnerSet;

/// One weighted entrant in the impostor draw.
#[derive(Debug, Clone)]
pub struct CascadeCandidate {
    /// Position in the (shuffled) roster this round.
    pub roster_index: usize,
    /// Normalized vault key.
    pub key: String,
    pub weight: f64,
    pub quarantined: bool,
    /// Squad-mates from this player's last impostor round.
    pub partners: PartnerSet,
}

/// Cumulative-weight ticket draw over a weight slice. Returns the winning
/// index; a ticket left unconsumed by floating-point rounding (or an
/// all-zero pool) degrades to the last candidate.
#[must_use]
pub fn choose_weighted<R: Rng>(weights: &[f64], rng: &mut R) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }
    let total: f64 = weights.iter().sum();
    let ticket = rng.r#gen::<f64>() * total;
    let mut cumulative = 0.0;
    for (idx, weight) in weights.iter().enumerate() {
        cumulative += weight;
        if ticket < cumulative {
            return Some(idx);
        }
    }
    Some(weights.len() - 1)
}

/// Draw up to `impostor_count` candidates without replacement.
///
/// From the second draw on, a candidate whose last impostor squad overlaps
/// the already-chosen set is penalized to 10% weight. Quarantined candidates
/// are skipped while any eligible candidate remains; an all-quarantined pool
/// (the aftermath of an all-impostors chaos round) degrades to a floor-weight
/// lottery. Returns chosen candidates in draw order; fewer than requested if
/// the pool runs dry.
#[must_use]
pub fn select_impostors<R: Rng>(
    candidates: &[CascadeCandidate],
    impostor_count: usize,
    rng: &mut R,
) -> Vec<usize> {
    let mut chosen: Vec<usize> = Vec::with_capacity(impostor_count);
    let mut chosen_keys: Vec<&str> = Vec::with_capacity(impostor_count);

    for draw in 0..impostor_count {
        let available: Vec<usize> = (0..candidates.len())
            .filter(|idx| !chosen.contains(idx))
            .collect();
        if available.is_empty() {
            break;
        }

        let eligible: Vec<usize> = available
            .iter()
            .copied()
            .filter(|&idx| !candidates[idx].quarantined)
            .collect();
        let pool = if eligible.is_empty() { available } else { eligible };

        let weights: Vec<f64> = pool
            .iter()
            .map(|&idx| {
                let candidate = &candidates[idx];
                let mut weight = candidate.weight;
                if draw > 0 && has_squad_conflict(candidate, &chosen_keys) {
                    weight *= SYNERGY_CONFLICT_PENALTY;
                }
                weight
            })
            .collect();

        let Some(winner) = choose_weighted(&weights, rng) else {
            break;
        };
        let idx = pool[winner];
        chosen.push(idx);
        chosen_keys.push(candidates[idx].key.as_str());
    }

    chosen
}

fn has_squad_conflict(candidate: &CascadeCandidate, chosen_keys: &[&str]) -> bool {
    chosen_keys
        .iter()
        .any(|key| candidate.partners.iter().any(|partner| partner == key))
}

/// Floor-weight helper for callers assembling candidate lists.
#[must_use]
pub fn quarantine_floor() -> f64 {
    QUARANTINE_FLOOR_WEIGHT
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use smallvec::smallvec;

    fn candidate(idx: usize, key: &str, weight: f64) -> CascadeCandidate {
        CascadeCandidate {
            roster_index: idx,
            key: key.to_string(),
            weight,
            quarantined: false,
            partners: PartnerSet::new(),
        }
    }

    #[test]
    fn returns_requested_count_without_duplicates() {
        let pool: Vec<_> = (0..6)
            .map(|i| candidate(i, &format!("k{i}"), 100.0))
            .collect();
        let mut rng = ChaCha20Rng::from_seed([4u8; 32]);
        let chosen = select_impostors(&pool, 3, &mut rng);
        assert_eq!(chosen.len(), 3);
        let mut sorted = chosen.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 3);
    }

    #[test]
    fn pool_exhaustion_returns_fewer() {
        let pool = vec![candidate(0, "a", 10.0), candidate(1, "b", 10.0)];
        let mut rng = ChaCha20Rng::from_seed([5u8; 32]);
        let chosen = select_impostors(&pool, 5, &mut rng);
        assert_eq!(chosen.len(), 2);
    }

    #[test]
    fn heavy_weight_dominates_the_draw() {
        let pool = vec![candidate(0, "a", 1.0), candidate(1, "b", 10_000.0)];
        let mut rng = ChaCha20Rng::from_seed([6u8; 32]);
        let mut b_wins = 0;
        for _ in 0..100 {
            if select_impostors(&pool, 1, &mut rng) == vec![1] {
                b_wins += 1;
            }
        }
        assert!(b_wins > 90, "expected near-total dominance, got {b_wins}");
    }

    #[test]
    fn recent_partners_are_avoided_when_alternatives_exist() {
        // "b" partnered with "a" last time; "c" did not. With equal base
        // weights, the second slot should almost always go to "c".
        let mut partnered = candidate(1, "b", 100.0);
        partnered.partners = smallvec!["a".to_string()];
        let pool = vec![candidate(0, "a", 1_000_000.0), partnered, candidate(2, "c", 100.0)];

        let mut rng = ChaCha20Rng::from_seed([8u8; 32]);
        let mut conflict_picks = 0;
        for _ in 0..200 {
            let chosen = select_impostors(&pool, 2, &mut rng);
            assert_eq!(chosen[0], 0, "a's weight should win the first draw");
            if chosen[1] == 1 {
                conflict_picks += 1;
            }
        }
        // 10% penalty leaves roughly 1-in-11 odds for the conflicted pick.
        assert!(conflict_picks < 40, "synergy penalty ignored: {conflict_picks}");
    }

    #[test]
    fn quarantined_candidates_skipped_while_alternatives_exist() {
        let mut locked = candidate(0, "a", quarantine_floor());
        locked.quarantined = true;
        let pool = vec![locked, candidate(1, "b", 0.5), candidate(2, "c", 0.5)];
        let mut rng = ChaCha20Rng::from_seed([10u8; 32]);
        for _ in 0..500 {
            let chosen = select_impostors(&pool, 2, &mut rng);
            assert!(!chosen.contains(&0), "quarantined candidate drawn");
        }
    }

    #[test]
    fn all_quarantined_pool_degrades_to_lottery() {
        let pool: Vec<_> = (0..4)
            .map(|i| {
                let mut c = candidate(i, &format!("k{i}"), quarantine_floor());
                c.quarantined = true;
                c
            })
            .collect();
        let mut rng = ChaCha20Rng::from_seed([11u8; 32]);
        let chosen = select_impostors(&pool, 2, &mut rng);
        assert_eq!(chosen.len(), 2);
    }

    #[test]
    fn zero_total_weight_degrades_to_last_candidate() {
        let weights = [0.0, 0.0, 0.0];
        let mut rng = ChaCha20Rng::from_seed([12u8; 32]);
        assert_eq!(choose_weighted(&weights, &mut rng), Some(2));
        assert_eq!(choose_weighted::<ChaCha20Rng>(&[], &mut rng), None);
    }
}
