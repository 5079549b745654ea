//! Persistent data model: players, vaults and the session history blob.
//!
//! Everything here serializes with field-level defaults so a corrupt or
//! partially-written history blob degrades to sane values instead of failing
//! the load.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{HashMap, VecDeque};
use std::fmt;

use crate::constants::{
    DEFAULT_LAST_ARCHITECT_ROUND, DEFAULT_LAST_TROLL_ROUND, LAST_CATEGORIES_CAP, LAST_STARTERS_CAP,
    LAST_WORDS_CAP, PAST_IMPOSTORS_CAP, ROLE_SEQUENCE_CAP,
};
use crate::vault::normalize_name;

/// Keys of a player's impostor squad-mates in their last impostor round.
pub type PartnerSet = SmallVec<[String; 4]>;

/// A roster entry. `id` is an opaque token owned by the caller; game logic
/// keys vaults by the normalized name so the save bank follows the person,
/// not the device session. Two players must not share a normalized name
/// within one roster (vault attribution is undefined if they do).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
}

impl Player {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Vault key for this player.
    #[must_use]
    pub fn key(&self) -> String {
        normalize_name(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Civil,
    Impostor,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Civil => "civil",
            Self::Impostor => "impostor",
        }
    }

    #[must_use]
    pub const fn is_impostor(self) -> bool {
        matches!(self, Self::Impostor)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scripted chaos-round scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrollScenario {
    /// Everyone is an impostor; nobody holds the real word.
    AllImpostors,
    /// Exactly one civil, everyone else is an impostor.
    LoneCivil,
    /// Zero impostors; the table hunts a ghost.
    FalseAlarm,
}

impl TrollScenario {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AllImpostors => "all_impostors",
            Self::LoneCivil => "lone_civil",
            Self::FalseAlarm => "false_alarm",
        }
    }
}

impl fmt::Display for TrollScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What forced the last anomaly round, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolTag {
    Pandora,
    Mirror,
    Blind,
    /// A chaos round that fired without a break protocol (troll roll or
    /// forced override).
    Chaos,
}

/// Per-category impostor exposure for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDna {
    #[serde(default)]
    pub times_as_impostor: u32,
    /// Caller-supplied unix timestamp (ms) of the last impostor round in
    /// this category.
    #[serde(default)]
    pub last_time_as_impostor: i64,
    #[serde(default = "default_affinity")]
    pub affinity_score: f64,
}

impl Default for CategoryDna {
    fn default() -> Self {
        Self {
            times_as_impostor: 0,
            last_time_as_impostor: 0,
            affinity_score: default_affinity(),
        }
    }
}

fn default_affinity() -> f64 {
    1.0
}

/// Rolling per-player fairness metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VaultMetrics {
    #[serde(default)]
    pub total_sessions: u32,
    /// Running fraction of sessions played as impostor, in `[0, 1]`.
    #[serde(default)]
    pub impostor_ratio: f64,
    /// Consecutive non-impostor rounds; reset on becoming impostor.
    #[serde(default)]
    pub civil_streak: u32,
    /// Rounds remaining in which this player sits out normal selection.
    #[serde(default)]
    pub quarantine_rounds: u32,
}

/// Ordered role memory for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SequenceAnalytics {
    /// `true` = impostor, most-recent first, capped at 20 entries.
    #[serde(default)]
    pub role_sequence: VecDeque<bool>,
    #[serde(default)]
    pub last_impostor_partners: PartnerSet,
}

impl SequenceAnalytics {
    /// Record this round's role at the front, dropping the oldest entry
    /// past the cap.
    pub fn push_role(&mut self, was_impostor: bool) {
        push_front_bounded(&mut self.role_sequence, was_impostor, ROLE_SEQUENCE_CAP);
    }

    #[must_use]
    pub fn was_impostor_n_rounds_ago(&self, n: usize) -> bool {
        self.role_sequence.get(n).copied().unwrap_or(false)
    }
}

/// One player's persistent behavioral record. Survives across sessions and
/// drives every selection weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlayerVault {
    #[serde(default)]
    pub metrics: VaultMetrics,
    #[serde(default)]
    pub category_dna: HashMap<String, CategoryDna>,
    #[serde(default)]
    pub sequence: SequenceAnalytics,
}

impl PlayerVault {
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.metrics.total_sessions == 0
    }

    #[must_use]
    pub fn is_quarantined(&self) -> bool {
        self.metrics.quarantine_rounds > 0
    }
}

/// Session-wide selection history, persisted wholesale between rounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHistory {
    #[serde(default)]
    pub round_counter: u32,
    /// Civil words used recently, most-recent first, cap 15.
    #[serde(default)]
    pub last_words: VecDeque<String>,
    /// Categories used recently, most-recent first, cap 3.
    #[serde(default)]
    pub last_categories: VecDeque<String>,
    #[serde(default)]
    pub global_word_usage: HashMap<String, u32>,
    #[serde(default)]
    pub player_stats: HashMap<String, PlayerVault>,
    #[serde(default = "default_last_troll_round")]
    pub last_troll_round: i64,
    #[serde(default = "default_last_architect_round")]
    pub last_architect_round: i64,
    /// Recent discussion openers (player ids), most-recent first, cap 10.
    #[serde(default)]
    pub last_starting_players: VecDeque<String>,
    /// Recent impostor player ids, most-recent first, cap 20.
    #[serde(default)]
    pub past_impostor_ids: VecDeque<String>,
    #[serde(default)]
    pub paranoia_level: u8,
    #[serde(default)]
    pub cooling_down_rounds: u32,
    #[serde(default)]
    pub last_break_protocol: Option<ProtocolTag>,
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self {
            round_counter: 0,
            last_words: VecDeque::new(),
            last_categories: VecDeque::new(),
            global_word_usage: HashMap::new(),
            player_stats: HashMap::new(),
            last_troll_round: DEFAULT_LAST_TROLL_ROUND,
            last_architect_round: DEFAULT_LAST_ARCHITECT_ROUND,
            last_starting_players: VecDeque::new(),
            past_impostor_ids: VecDeque::new(),
            paranoia_level: 0,
            cooling_down_rounds: 0,
            last_break_protocol: None,
        }
    }
}

fn default_last_troll_round() -> i64 {
    DEFAULT_LAST_TROLL_ROUND
}

fn default_last_architect_round() -> i64 {
    DEFAULT_LAST_ARCHITECT_ROUND
}

impl SessionHistory {
    /// Parse a persisted blob, recovering field-by-field on corruption.
    #[must_use]
    pub fn from_json_lossy(json: &str) -> Self {
        serde_json::from_str(json).unwrap_or_default()
    }

    /// Record a revealed civil word and its category for anti-repetition.
    pub fn record_word(&mut self, word: &str, category: &str) {
        push_front_bounded(&mut self.last_words, word.to_string(), LAST_WORDS_CAP);
        push_front_bounded(
            &mut self.last_categories,
            category.to_string(),
            LAST_CATEGORIES_CAP,
        );
        *self.global_word_usage.entry(word.to_string()).or_insert(0) += 1;
    }

    /// Record this round's discussion opener.
    pub fn record_starter(&mut self, player_id: &str) {
        push_front_bounded(
            &mut self.last_starting_players,
            player_id.to_string(),
            LAST_STARTERS_CAP,
        );
    }

    /// Record an impostor identity for the paranoia window.
    pub fn record_impostor(&mut self, player_id: &str) {
        push_front_bounded(
            &mut self.past_impostor_ids,
            player_id.to_string(),
            PAST_IMPOSTORS_CAP,
        );
    }

    /// How recently (0-based) a player id opened discussion, if within the
    /// tracked window.
    #[must_use]
    pub fn opener_recency(&self, player_id: &str) -> Option<usize> {
        self.last_starting_players
            .iter()
            .position(|id| id == player_id)
    }
}

/// Boolean game-mode toggles, owned by the caller's settings screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ModeFlags {
    #[serde(default)]
    pub hint: bool,
    #[serde(default)]
    pub troll: bool,
    #[serde(default)]
    pub architect: bool,
    #[serde(default)]
    pub party: bool,
}

/// Debug/test overrides for forcing rare paths deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoundOverrides {
    pub force_troll: Option<TrollScenario>,
    pub force_architect: bool,
}

/// Everything a single round needs from the caller. Not persisted.
#[derive(Debug, Clone)]
pub struct RoundConfig {
    pub players: Vec<Player>,
    pub impostor_count: usize,
    pub modes: ModeFlags,
    /// Category filter from the setup screen; empty means "all".
    pub selected_categories: Vec<String>,
    /// Caller's wall-clock hour (0..24), used by the architect night window.
    pub local_hour: u32,
    /// Caller's unix timestamp in milliseconds, stamped into category DNA.
    pub timestamp_ms: i64,
    pub overrides: RoundOverrides,
}

impl RoundConfig {
    #[must_use]
    pub fn new(players: Vec<Player>, impostor_count: usize) -> Self {
        Self {
            players,
            impostor_count,
            modes: ModeFlags::default(),
            selected_categories: Vec::new(),
            local_hour: 12,
            timestamp_ms: 0,
            overrides: RoundOverrides::default(),
        }
    }

    #[must_use]
    pub fn with_modes(mut self, modes: ModeFlags) -> Self {
        self.modes = modes;
        self
    }

    #[must_use]
    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.selected_categories = categories;
        self
    }
}

fn push_front_bounded<T>(queue: &mut VecDeque<T>, value: T, cap: usize) {
    queue.push_front(value);
    queue.truncate(cap);
}
