//! Pattern detection over recent impostor picks, and the forced-anomaly
//! ("break protocol") machinery that fires when the table could start
//! predicting the engine.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::constants::{
    BOREDOM_DRIFT_ROUND, BOREDOM_DRIFT_STEP, BREAK_PROTOCOL_THRESHOLD, COOLING_STEP,
    MIRROR_ROLL_CEILING, PANDORA_ROLL_CEILING, PARANOIA_MAX, PARANOIA_MIN_HISTORY,
    PARANOIA_MIN_MAPPED, PARANOIA_WINDOW, SEQUENTIAL_ALERT_SCORE, SUBCLAN_CRITICAL_SCORE,
    SUBCLAN_WARNING_SCORE,
};
use crate::state::{Player, ProtocolTag, SessionHistory};

/// One of the three forced interventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakProtocol {
    /// Escalate into a full chaos round (troll mode only).
    Pandora,
    /// Invert selection: force the lowest-weight candidate to the top.
    Mirror,
    /// Flatten every weight; one round of pure lottery.
    Blind,
}

impl BreakProtocol {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pandora => "pandora",
            Self::Mirror => "mirror",
            Self::Blind => "blind",
        }
    }

    #[must_use]
    pub const fn tag(self) -> ProtocolTag {
        match self {
            Self::Pandora => ProtocolTag::Pandora,
            Self::Mirror => ProtocolTag::Mirror,
            Self::Blind => ProtocolTag::Blind,
        }
    }
}

impl fmt::Display for BreakProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Suspicion score 0..=100 over the recent impostor identities.
///
/// Looks at the last five impostor ids mapped onto current roster positions:
/// adjacent-seat runs and repeat identities both raise the score, and long
/// sessions drift upward on their own so an intervention eventually fires
/// even without a concrete anomaly.
#[must_use]
pub fn paranoia_score(history: &SessionHistory, roster: &[Player], round: u32) -> u8 {
    if history.past_impostor_ids.len() < PARANOIA_MIN_HISTORY {
        return 0;
    }

    let position_of: HashMap<&str, usize> = roster
        .iter()
        .enumerate()
        .map(|(idx, p)| (p.id.as_str(), idx))
        .collect();

    let window: Vec<&String> = history
        .past_impostor_ids
        .iter()
        .take(PARANOIA_WINDOW)
        .collect();
    let positions: Vec<usize> = window
        .iter()
        .filter_map(|id| position_of.get(id.as_str()).copied())
        .collect();

    if positions.len() < PARANOIA_MIN_MAPPED {
        return 0;
    }

    let mut score: u32 = 0;

    // Seat-order cycling: adjacent picks one seat apart (with wraparound).
    let wrap_gap = roster.len().saturating_sub(1);
    let sequential_hits = positions
        .windows(2)
        .filter(|pair| {
            let gap = pair[0].abs_diff(pair[1]);
            gap == 1 || (wrap_gap > 1 && gap == wrap_gap)
        })
        .count();
    if sequential_hits >= 2 {
        score += SEQUENTIAL_ALERT_SCORE;
    }
    if sequential_hits >= 3 {
        score += SEQUENTIAL_ALERT_SCORE;
    }

    // Sub-clan: the same identity showing up repeatedly in the window.
    let mut frequency: HashMap<&str, u32> = HashMap::new();
    for id in &window {
        *frequency.entry(id.as_str()).or_insert(0) += 1;
    }
    let max_freq = frequency.values().copied().max().unwrap_or(0);
    if max_freq >= 3 {
        score += SUBCLAN_CRITICAL_SCORE;
    } else if max_freq == 2 {
        score += SUBCLAN_WARNING_SCORE;
    }

    // Boredom drift for long sessions.
    if round > BOREDOM_DRIFT_ROUND {
        score += (round % 5) * BOREDOM_DRIFT_STEP;
    }

    score.min(PARANOIA_MAX) as u8
}

/// Decide whether a break protocol fires this round. Suppressed during
/// cooling and during an already-chaotic round; otherwise rolls pandora
/// (troll mode only) / mirror / blind.
#[must_use]
pub fn decide_break_protocol<R: Rng>(
    paranoia_level: u8,
    cooling_down_rounds: u32,
    troll_mode: bool,
    chaos_already_rolling: bool,
    rng: &mut R,
) -> Option<BreakProtocol> {
    if chaos_already_rolling || cooling_down_rounds > 0 || paranoia_level <= BREAK_PROTOCOL_THRESHOLD
    {
        return None;
    }
    let roll = rng.r#gen::<f64>() * 100.0;
    if troll_mode && roll < PANDORA_ROLL_CEILING {
        Some(BreakProtocol::Pandora)
    } else if roll < MIRROR_ROLL_CEILING {
        Some(BreakProtocol::Mirror)
    } else {
        Some(BreakProtocol::Blind)
    }
}

/// Karma attenuation while recovering from a break protocol:
/// 3 -> 0.25, 2 -> 0.50, 1 -> 0.75, 0 -> 1.0.
#[must_use]
pub fn cooling_factor(cooling_down_rounds: u32) -> f64 {
    if cooling_down_rounds == 0 {
        1.0
    } else {
        1.0 - f64::from(cooling_down_rounds) * COOLING_STEP
    }
}
