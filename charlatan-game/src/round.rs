//! Round orchestration: the paranoia check, chaos and normal round
//! execution, the vault commit and the history hand-off.
//!
//! `resolve_round` is a pure function of `(lexicon, config, history, rng)`.
//! It either returns a complete [`RoundResult`] carrying the next
//! [`SessionHistory`], or fails fast with no mutation anywhere.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cascade::{self, CascadeCandidate};
use crate::constants::{
    ARCHITECT_BASE_PROB, ARCHITECT_LATE_SESSION_FLOOR, ARCHITECT_LATE_SESSION_ROUND,
    ARCHITECT_MIN_GAP_ROUNDS, ARCHITECT_NIGHT_HOUR_END, ARCHITECT_RECENT_GAP_MAX,
    ARCHITECT_RECENT_PROB, ARCHITECT_STALE_GAP, ARCHITECT_STALE_PROB, ARCHITECT_STREAK_BONUS,
    ARCHITECT_STREAK_GATE, BLIND_FLAT_WEIGHT, COOLING_ROUNDS, DEBUG_ENV_VAR, DECOY_HINT_SUFFIX,
    HINT_PREFIX, IMPOSTOR_SENTINEL, MIRROR_FORCE_WEIGHT, TROLL_ALL_IMPOSTORS_CEILING,
    TROLL_COOLDOWN_ROUNDS, TROLL_LONE_CIVIL_CEILING, TROLL_ROUND_CHANCE,
};
use crate::data::{Lexicon, WordPair};
use crate::lexicon::{self, LexiconSelection};
use crate::paranoia::{self, BreakProtocol};
use crate::state::{
    PartnerSet, Player, ProtocolTag, Role, RoundConfig, SessionHistory, TrollScenario,
};
use crate::vault::{self, RoundOutcome};
use crate::vocalis;
use crate::weight::{self, WeightContext};

#[cfg(debug_assertions)]
fn debug_log_enabled() -> bool {
    matches!(std::env::var(DEBUG_ENV_VAR), Ok(val) if val != "0")
}

#[cfg(not(debug_assertions))]
const fn debug_log_enabled() -> bool {
    false
}

/// Malformed round input. No history is touched when any of these fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RoundError {
    #[error("roster is empty")]
    EmptyRoster,
    #[error("impostor count must be at least 1")]
    ZeroImpostors,
    #[error("word catalog has no usable categories")]
    EmptyLexicon,
}

/// One player's reveal card for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleCard {
    pub player_id: String,
    pub name: String,
    pub role: Role,
    /// What this player's card shows: the civil word, the impostor
    /// sentinel, or a hint line.
    pub shown_word: String,
    /// The real civil word, for the results screen.
    pub real_word: String,
    pub category: String,
    /// Selection-weight telemetry for the debug console.
    pub weight: f64,
    /// Percent chance this player had of being drawn impostor.
    pub selection_chance: f64,
    pub is_curator: bool,
}

/// Everything the caller needs to run one round of the game.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundResult {
    /// Cards in roster order.
    pub cards: Vec<RoleCard>,
    pub troll_scenario: Option<TrollScenario>,
    pub architect_triggered: bool,
    /// Designated curator's player id when the architect trigger fired.
    pub curator_id: Option<String>,
    /// Discussion opener.
    pub starter: Player,
    /// The fully-committed next history. Persist this wholesale.
    pub history: SessionHistory,
}

/// Resolve one round.
///
/// # Errors
///
/// Fails fast on an empty roster, a zero impostor count, or an empty word
/// catalog; the input history is untouched in every error path.
pub fn resolve_round<R: Rng>(
    lexicon: &Lexicon,
    config: &RoundConfig,
    history: &SessionHistory,
    rng: &mut R,
) -> Result<RoundResult, RoundError> {
    if config.players.is_empty() {
        return Err(RoundError::EmptyRoster);
    }
    if config.impostor_count == 0 {
        return Err(RoundError::ZeroImpostors);
    }
    if lexicon.is_empty() {
        return Err(RoundError::EmptyLexicon);
    }

    let round = history.round_counter + 1;

    // Chaos can arrive three ways: a forced override, the troll-mode roll
    // outside its cooldown, or an escalated pandora protocol below.
    let mut forced_scenario = config.overrides.force_troll;
    let mut chaos = forced_scenario.is_some();
    if !chaos
        && config.modes.troll
        && i64::from(round) - history.last_troll_round > TROLL_COOLDOWN_ROUNDS
        && rng.r#gen::<f64>() < TROLL_ROUND_CHANCE
    {
        chaos = true;
    }

    let paranoia_level = paranoia::paranoia_score(history, &config.players, round);
    let cooling_rounds = history.cooling_down_rounds;
    let protocol = paranoia::decide_break_protocol(
        paranoia_level,
        cooling_rounds,
        config.modes.troll,
        chaos,
        rng,
    );
    if protocol == Some(BreakProtocol::Pandora) {
        chaos = true;
    }

    if debug_log_enabled() {
        println!(
            "Round {round} | paranoia:{paranoia_level} cooling:{cooling_rounds} protocol:{} chaos:{chaos}",
            protocol.map_or("none", BreakProtocol::as_str),
        );
    }

    if chaos {
        if forced_scenario.is_none() {
            forced_scenario = Some(roll_scenario(rng));
        }
        let scenario = forced_scenario.unwrap_or(TrollScenario::AllImpostors);
        let tag = match protocol {
            Some(p) => p.tag(),
            None => ProtocolTag::Chaos,
        };
        chaos_round(lexicon, config, history, round, scenario, tag, rng)
    } else {
        normal_round(lexicon, config, history, round, paranoia_level, protocol, rng)
    }
}

fn roll_scenario<R: Rng>(rng: &mut R) -> TrollScenario {
    let roll = rng.r#gen::<f64>() * 100.0;
    if roll < TROLL_ALL_IMPOSTORS_CEILING {
        TrollScenario::AllImpostors
    } else if roll < TROLL_LONE_CIVIL_CEILING {
        TrollScenario::LoneCivil
    } else {
        TrollScenario::FalseAlarm
    }
}

/// Categories the round may draw from: the valid selected subset, or the
/// whole catalog when the filter is empty or useless.
fn available_categories<'a>(lexicon: &'a Lexicon, selected: &[String]) -> Vec<&'a str> {
    let all: Vec<&str> = lexicon
        .categories
        .iter()
        .filter(|c| !c.words.is_empty())
        .map(|c| c.name.as_str())
        .collect();
    let valid: Vec<&str> = all
        .iter()
        .copied()
        .filter(|name| selected.iter().any(|s| s == name))
        .collect();
    if valid.is_empty() { all } else { valid }
}

fn chaos_round<R: Rng>(
    lexicon: &Lexicon,
    config: &RoundConfig,
    history: &SessionHistory,
    round: u32,
    scenario: TrollScenario,
    tag: ProtocolTag,
    rng: &mut R,
) -> Result<RoundResult, RoundError> {
    let players = &config.players;
    let pool = available_categories(lexicon, &config.selected_categories);
    if pool.is_empty() {
        return Err(RoundError::EmptyLexicon);
    }
    let category_name = pool[rng.gen_range(0..pool.len())];
    let category = lexicon
        .category(category_name)
        .ok_or(RoundError::EmptyLexicon)?;
    let pair = category.words[rng.gen_range(0..category.words.len())].clone();

    // One impostor card carries a decoy hint from a foreign category, so
    // even comparing notes afterwards leaves the table unsure.
    let decoy_index = rng.gen_range(0..players.len());

    let impostor_flags: Vec<bool> = match scenario {
        TrollScenario::AllImpostors => vec![true; players.len()],
        TrollScenario::LoneCivil => {
            let civil_index = rng.gen_range(0..players.len());
            (0..players.len()).map(|i| i != civil_index).collect()
        }
        TrollScenario::FalseAlarm => vec![false; players.len()],
    };

    let cards: Vec<RoleCard> = players
        .iter()
        .enumerate()
        .map(|(idx, player)| {
            let is_impostor = impostor_flags[idx];
            let shown_word = if is_impostor {
                babylon_hint(
                    lexicon,
                    category_name,
                    &pair,
                    idx == decoy_index,
                    config.modes.hint,
                    rng,
                )
            } else {
                pair.civil.clone()
            };
            RoleCard {
                player_id: player.id.clone(),
                name: player.name.clone(),
                role: if is_impostor { Role::Impostor } else { Role::Civil },
                shown_word,
                real_word: pair.civil.clone(),
                category: category_name.to_string(),
                weight: 0.0,
                selection_chance: if is_impostor { 100.0 } else { 0.0 },
                is_curator: false,
            }
        })
        .collect();

    let starter = vocalis::pick_starter(players, history, config.modes.party, None, rng)
        .ok_or(RoundError::EmptyRoster)?;

    let mut next = history.clone();
    next.round_counter = round;
    next.last_troll_round = i64::from(round);
    next.record_starter(&starter.id);

    let impostor_keys: Vec<String> = players
        .iter()
        .zip(&impostor_flags)
        .filter(|(_, imp)| **imp)
        .map(|(p, _)| p.key())
        .collect();
    for (player, is_impostor) in players.iter().zip(&impostor_flags) {
        let key = player.key();
        if *is_impostor {
            next.record_impostor(&player.id);
        }
        let partners: PartnerSet = impostor_keys
            .iter()
            .filter(|k| **k != key)
            .cloned()
            .collect();
        let outcome = RoundOutcome {
            was_impostor: *is_impostor,
            quarantine: *is_impostor,
            category: category_name,
            timestamp_ms: config.timestamp_ms,
            partners,
        };
        vault::apply_round_outcome(vault::vault_mut(&mut next.player_stats, &key), &outcome);
    }

    // A chaos pair was never revealed as a normal word; the lexicon
    // anti-repeat history stays as it was.
    next.paranoia_level = 0;
    next.cooling_down_rounds = COOLING_ROUNDS;
    next.last_break_protocol = Some(tag);

    Ok(RoundResult {
        cards,
        troll_scenario: Some(scenario),
        architect_triggered: false,
        curator_id: None,
        starter,
        history: next,
    })
}

/// Impostor hint line for a chaos round. Under hint mode, most impostors get
/// either the bare category or a hint from a sibling pair; the decoy card
/// gets a hint lifted from a different category entirely.
fn babylon_hint<R: Rng>(
    lexicon: &Lexicon,
    category_name: &str,
    pair: &WordPair,
    is_decoy: bool,
    hint_mode: bool,
    rng: &mut R,
) -> String {
    if !hint_mode {
        return IMPOSTOR_SENTINEL.to_string();
    }
    if is_decoy {
        let foreign: Vec<&crate::data::Category> = lexicon
            .categories
            .iter()
            .filter(|c| c.name != category_name && !c.words.is_empty())
            .collect();
        if let Some(noise_cat) = foreign.get(rng.gen_range(0..foreign.len().max(1))) {
            let noise_pair = &noise_cat.words[0];
            let hint = lexicon::smart_hint(noise_pair, rng);
            return format!("{HINT_PREFIX}{hint}{DECOY_HINT_SUFFIX}");
        }
    }
    if rng.r#gen::<f64>() < 0.5 {
        format!("{HINT_PREFIX}{category_name}")
    } else {
        let sibling = lexicon
            .category(category_name)
            .map_or_else(|| pair.clone(), |c| c.words[rng.gen_range(0..c.words.len())].clone());
        format!("{HINT_PREFIX}{}", lexicon::smart_hint(&sibling, rng))
    }
}

fn normal_round<R: Rng>(
    lexicon: &Lexicon,
    config: &RoundConfig,
    history: &SessionHistory,
    round: u32,
    paranoia_level: u8,
    protocol: Option<BreakProtocol>,
    rng: &mut R,
) -> Result<RoundResult, RoundError> {
    let players = &config.players;
    let selection = lexicon::pick_word(lexicon, &config.selected_categories, history, rng)
        .ok_or(RoundError::EmptyLexicon)?;
    let cooling_factor = paranoia::cooling_factor(history.cooling_down_rounds);
    let ctx = WeightContext {
        category: &selection.category,
        round,
        cooling_factor,
    };

    // Shuffle before the draw so roster position carries no signal.
    let mut shuffled: Vec<&Player> = players.iter().collect();
    shuffled.shuffle(rng);

    let vaults: Vec<_> = shuffled
        .iter()
        .map(|p| vault::vault_snapshot(&history.player_stats, &p.key()))
        .collect();

    // Two passes: a noiseless estimate calibrates the noise span of the
    // real evaluation.
    let vault_refs: Vec<&_> = vaults.iter().collect();
    let avg_estimate = weight::average_weight_estimate(&vault_refs, &ctx);

    let mut weights: Vec<f64> = match protocol {
        Some(BreakProtocol::Blind) => vec![BLIND_FLAT_WEIGHT; shuffled.len()],
        _ => vaults
            .iter()
            .map(|vault| weight::selection_weight(vault, &ctx, avg_estimate, rng))
            .collect(),
    };

    if protocol == Some(BreakProtocol::Mirror) {
        // Invert the table: the least-favored candidate is forced to the top.
        if let Some(lowest) = weights
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx)
        {
            weights[lowest] = MIRROR_FORCE_WEIGHT;
        }
    }

    let candidates: Vec<CascadeCandidate> = shuffled
        .iter()
        .enumerate()
        .map(|(idx, player)| CascadeCandidate {
            roster_index: idx,
            key: player.key(),
            weight: weights[idx],
            // Break protocols override eligibility: blind is a full lottery
            // and mirror must be able to force its pick.
            quarantined: protocol.is_none() && vaults[idx].is_quarantined(),
            partners: vaults[idx].sequence.last_impostor_partners.clone(),
        })
        .collect();

    let effective_count = config.impostor_count.min(players.len().saturating_sub(1));
    let chosen = cascade::select_impostors(&candidates, effective_count, rng);
    let chosen_keys: Vec<String> = chosen.iter().map(|&idx| candidates[idx].key.clone()).collect();

    if debug_log_enabled() {
        println!(
            "Round {round} | word:{} category:{} impostors:{}",
            selection.pair.civil,
            selection.category,
            chosen_keys.len()
        );
    }

    let mut next = history.clone();
    next.round_counter = round;

    for player in players {
        let key = player.key();
        let is_impostor = chosen_keys.contains(&key);
        if is_impostor {
            next.record_impostor(&player.id);
        }
        let partners: PartnerSet = if is_impostor {
            chosen_keys.iter().filter(|k| **k != key).cloned().collect()
        } else {
            PartnerSet::new()
        };
        let outcome = RoundOutcome {
            was_impostor: is_impostor,
            quarantine: protocol.is_some() && is_impostor,
            category: &selection.category,
            timestamp_ms: config.timestamp_ms,
            partners,
        };
        vault::apply_round_outcome(vault::vault_mut(&mut next.player_stats, &key), &outcome);
    }

    next.record_word(&selection.pair.civil, &selection.category);

    // Architect evaluation runs on the post-commit streak of the first
    // roster player, and only when that player stayed civil.
    let mut curator_id: Option<String> = None;
    if let Some(first) = players.first() {
        let first_key = first.key();
        if !chosen_keys.contains(&first_key) {
            let triggered = if config.overrides.force_architect {
                true
            } else if config.modes.architect {
                let streak = next
                    .player_stats
                    .get(&first_key)
                    .map_or(0, |v| v.metrics.civil_streak);
                architect_trigger(history, streak, round, config.local_hour, rng)
            } else {
                false
            };
            if triggered {
                curator_id = Some(first.id.clone());
                next.last_architect_round = i64::from(round);
            }
        }
    }

    let starter = vocalis::pick_starter(
        players,
        history,
        config.modes.party,
        curator_id.as_deref(),
        rng,
    )
    .ok_or(RoundError::EmptyRoster)?;
    next.record_starter(&starter.id);

    next.paranoia_level = if protocol.is_some() { 0 } else { paranoia_level };
    next.cooling_down_rounds = if protocol.is_some() {
        COOLING_ROUNDS
    } else {
        history.cooling_down_rounds.saturating_sub(1)
    };
    next.last_break_protocol = protocol.map(BreakProtocol::tag);

    let grand_total: f64 = weights.iter().sum();
    let cards: Vec<RoleCard> = players
        .iter()
        .map(|player| {
            let key = player.key();
            let is_impostor = chosen_keys.contains(&key);
            let raw_weight = shuffled
                .iter()
                .position(|p| p.id == player.id)
                .map_or(0.0, |idx| weights[idx]);
            let shown_word = if is_impostor {
                if config.modes.hint {
                    format!("{HINT_PREFIX}{}", lexicon::smart_hint(&selection.pair, rng))
                } else {
                    IMPOSTOR_SENTINEL.to_string()
                }
            } else {
                selection.pair.civil.clone()
            };
            RoleCard {
                player_id: player.id.clone(),
                name: player.name.clone(),
                role: if is_impostor { Role::Impostor } else { Role::Civil },
                shown_word,
                real_word: selection.pair.civil.clone(),
                category: selection.category.clone(),
                weight: raw_weight,
                selection_chance: if grand_total > 0.0 {
                    raw_weight / grand_total * 100.0
                } else {
                    0.0
                },
                is_curator: curator_id.as_deref() == Some(player.id.as_str()),
            }
        })
        .collect();

    Ok(RoundResult {
        cards,
        troll_scenario: None,
        architect_triggered: curator_id.is_some(),
        curator_id,
        starter,
        history: next,
    })
}

/// Entropic trigger for curated ("architect") rounds.
fn architect_trigger<R: Rng>(
    history: &SessionHistory,
    first_civil_streak: u32,
    round: u32,
    local_hour: u32,
    rng: &mut R,
) -> bool {
    let rounds_since = i64::from(round) - history.last_architect_round;
    if rounds_since <= ARCHITECT_MIN_GAP_ROUNDS {
        return false;
    }

    let mut prob = ARCHITECT_BASE_PROB;
    if rounds_since <= ARCHITECT_RECENT_GAP_MAX {
        prob = ARCHITECT_RECENT_PROB;
    } else if rounds_since > ARCHITECT_STALE_GAP {
        prob = ARCHITECT_STALE_PROB;
    }
    if round > ARCHITECT_LATE_SESSION_ROUND {
        prob = prob.max(ARCHITECT_LATE_SESSION_FLOOR);
    }
    if first_civil_streak > ARCHITECT_STREAK_GATE {
        prob += ARCHITECT_STREAK_BONUS;
    }
    if local_hour < ARCHITECT_NIGHT_HOUR_END {
        prob *= 2.0;
    }

    rng.r#gen::<f64>() < prob
}

/// Replace a curated round's auto-picked word with the curator's choice.
/// Rewrites every card for the new pair and records the curated word in the
/// anti-repeat history.
pub fn apply_curated_selection<R: Rng>(
    result: &mut RoundResult,
    selection: &LexiconSelection,
    hint_mode: bool,
    rng: &mut R,
) {
    for card in &mut result.cards {
        card.real_word = selection.pair.civil.clone();
        card.category = selection.category.clone();
        card.shown_word = if card.role.is_impostor() {
            if hint_mode {
                format!("{HINT_PREFIX}{}", lexicon::smart_hint(&selection.pair, rng))
            } else {
                IMPOSTOR_SENTINEL.to_string()
            }
        } else {
            selection.pair.civil.clone()
        };
    }
    result
        .history
        .record_word(&selection.pair.civil, &selection.category);
}
