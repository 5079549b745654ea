//! Centralized balance and tuning constants for the Charlatan selection engine.
//!
//! These values define the deterministic math for role assignment. Keeping
//! them together ensures fairness tuning can only change via code reviewed in
//! version control, rather than through external assets.

// Debug logging ------------------------------------------------------------
pub(crate) const DEBUG_ENV_VAR: &str = "CHARLATAN_DEBUG_LOGS";

// History caps -------------------------------------------------------------
pub(crate) const ROLE_SEQUENCE_CAP: usize = 20;
pub(crate) const LAST_WORDS_CAP: usize = 15;
pub(crate) const LAST_CATEGORIES_CAP: usize = 3;
pub(crate) const LAST_STARTERS_CAP: usize = 10;
pub(crate) const PAST_IMPOSTORS_CAP: usize = 20;

// History sentinels --------------------------------------------------------
pub(crate) const DEFAULT_LAST_TROLL_ROUND: i64 = -10;
pub(crate) const DEFAULT_LAST_ARCHITECT_ROUND: i64 = -999;

// Weight engine ------------------------------------------------------------
pub(crate) const KARMA_BASE: f64 = 100.0;
pub(crate) const MIN_IMPOSTOR_RATIO: f64 = 0.01;
pub(crate) const QUARANTINE_FLOOR_WEIGHT: f64 = 0.01;
pub(crate) const NEWBIE_BASE_WEIGHT: f64 = 100.0;
pub(crate) const RECENCY_STEP_LAST: f64 = 0.05;
pub(crate) const RECENCY_STEP_TWO_AGO: f64 = 0.30;
pub(crate) const RECENCY_STEP_THREE_AGO: f64 = 0.60;
pub(crate) const CATEGORY_AFFINITY_PENALTY: f64 = 0.8;
pub(crate) const NOISE_SPAN: f64 = 0.3;

// Paranoia engine ----------------------------------------------------------
pub(crate) const PARANOIA_MIN_HISTORY: usize = 4;
pub(crate) const PARANOIA_WINDOW: usize = 5;
pub(crate) const PARANOIA_MIN_MAPPED: usize = 3;
pub(crate) const SEQUENTIAL_ALERT_SCORE: u32 = 50;
pub(crate) const SUBCLAN_CRITICAL_SCORE: u32 = 60;
pub(crate) const SUBCLAN_WARNING_SCORE: u32 = 20;
pub(crate) const BOREDOM_DRIFT_ROUND: u32 = 8;
pub(crate) const BOREDOM_DRIFT_STEP: u32 = 5;
pub(crate) const PARANOIA_MAX: u32 = 100;
pub(crate) const BREAK_PROTOCOL_THRESHOLD: u8 = 70;
pub(crate) const PANDORA_ROLL_CEILING: f64 = 50.0;
pub(crate) const MIRROR_ROLL_CEILING: f64 = 80.0;
pub(crate) const COOLING_ROUNDS: u32 = 3;
pub(crate) const COOLING_STEP: f64 = 0.25;
pub(crate) const QUARANTINE_ROUNDS: u32 = 3;
pub(crate) const MIRROR_FORCE_WEIGHT: f64 = 999_999.0;
pub(crate) const BLIND_FLAT_WEIGHT: f64 = 100.0;

// Cascade selector ---------------------------------------------------------
pub(crate) const SYNERGY_CONFLICT_PENALTY: f64 = 0.1;

// Lexicon engine -----------------------------------------------------------
pub(crate) const CURATOR_DUPLICATE_RETRIES: u32 = 10;
pub(crate) const FALLBACK_HINT: &str = "No hint available";

// Vocalis engine -----------------------------------------------------------
pub(crate) const VOCALIS_BASE_WEIGHT: f64 = 100.0;
pub(crate) const VOCALIS_LAST_OPENER_FACTOR: f64 = 0.001;
pub(crate) const VOCALIS_SECOND_OPENER_FACTOR: f64 = 0.05;
pub(crate) const VOCALIS_THIRD_OPENER_FACTOR: f64 = 0.25;
pub(crate) const VOCALIS_FRESH_FACTOR: f64 = 3.0;
pub(crate) const VOCALIS_NAME_ENTROPY_MOD: u32 = 20;
pub(crate) const VOCALIS_JITTER_MIN: f64 = 0.8;
pub(crate) const VOCALIS_JITTER_SPAN: f64 = 0.4;
pub(crate) const CURATOR_EXCLUSION_CHANCE: f64 = 0.9;

// Round orchestration ------------------------------------------------------
pub(crate) const TROLL_ROUND_CHANCE: f64 = 0.10;
pub(crate) const TROLL_COOLDOWN_ROUNDS: i64 = 5;
pub(crate) const TROLL_ALL_IMPOSTORS_CEILING: f64 = 70.0;
pub(crate) const TROLL_LONE_CIVIL_CEILING: f64 = 90.0;
pub(crate) const IMPOSTOR_SENTINEL: &str = "YOU ARE THE IMPOSTOR";
pub(crate) const HINT_PREFIX: &str = "HINT: ";
pub(crate) const DECOY_HINT_SUFFIX: &str = " (DECOY)";

// Architect trigger --------------------------------------------------------
pub(crate) const ARCHITECT_BASE_PROB: f64 = 0.15;
pub(crate) const ARCHITECT_RECENT_PROB: f64 = 0.05;
pub(crate) const ARCHITECT_STALE_PROB: f64 = 0.25;
pub(crate) const ARCHITECT_LATE_SESSION_FLOOR: f64 = 0.20;
pub(crate) const ARCHITECT_LATE_SESSION_ROUND: u32 = 10;
pub(crate) const ARCHITECT_STREAK_BONUS: f64 = 0.10;
pub(crate) const ARCHITECT_STREAK_GATE: u32 = 8;
pub(crate) const ARCHITECT_NIGHT_HOUR_END: u32 = 3;
pub(crate) const ARCHITECT_MIN_GAP_ROUNDS: i64 = 1;
pub(crate) const ARCHITECT_RECENT_GAP_MAX: i64 = 5;
pub(crate) const ARCHITECT_STALE_GAP: i64 = 10;
