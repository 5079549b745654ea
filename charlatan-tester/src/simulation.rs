//! Deterministic multi-round simulation over the selection engine.

use charlatan_game::{
    Lexicon, ModeFlags, Player, ProtocolTag, RoundConfig, RoundResult, SessionHistory,
    TrollScenario, resolve_round,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Configuration for a simulation session.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub seed: u64,
    pub rounds: u32,
    pub impostor_count: usize,
    pub modes: ModeFlags,
    pub selected_categories: Vec<String>,
    pub local_hour: u32,
    pub timestamp_ms: i64,
}

/// Snapshot of one resolved round.
#[derive(Debug, Clone)]
pub struct RoundRecord {
    pub round: u32,
    pub impostor_ids: Vec<String>,
    pub starter_id: String,
    pub category: String,
    pub word: String,
    pub troll_scenario: Option<TrollScenario>,
    pub protocol: Option<ProtocolTag>,
    pub architect_triggered: bool,
}

/// Core deterministic harness: drives `resolve_round` and checks the
/// engine's published invariants as it goes.
pub struct SimulationSession {
    lexicon: Lexicon,
    players: Vec<Player>,
    config: SimulationConfig,
    history: SessionHistory,
    rng: ChaCha20Rng,
    violations: Vec<String>,
}

impl SimulationSession {
    #[must_use]
    pub fn new(lexicon: Lexicon, players: Vec<Player>, config: SimulationConfig) -> Self {
        let rng = ChaCha20Rng::seed_from_u64(config.seed);
        Self {
            lexicon,
            players,
            config,
            history: SessionHistory::default(),
            rng,
            violations: Vec::new(),
        }
    }

    #[must_use]
    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    #[must_use]
    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    #[must_use]
    pub fn into_history(self) -> SessionHistory {
        self.history
    }

    /// Resolve the next round and record it.
    ///
    /// # Errors
    ///
    /// Propagates the engine's fail-fast validation errors.
    pub fn advance(&mut self) -> anyhow::Result<RoundRecord> {
        let quarantined: Vec<String> = self
            .players
            .iter()
            .filter(|p| {
                self.history
                    .player_stats
                    .get(&p.key())
                    .is_some_and(|v| v.metrics.quarantine_rounds > 0)
            })
            .map(|p| p.id.clone())
            .collect();

        let round_config = RoundConfig {
            players: self.players.clone(),
            impostor_count: self.config.impostor_count,
            modes: self.config.modes,
            selected_categories: self.config.selected_categories.clone(),
            local_hour: self.config.local_hour,
            timestamp_ms: self.config.timestamp_ms,
            overrides: charlatan_game::RoundOverrides::default(),
        };

        let result = resolve_round(&self.lexicon, &round_config, &self.history, &mut self.rng)?;
        self.check_invariants(&result, &quarantined);

        let record = RoundRecord {
            round: result.history.round_counter,
            impostor_ids: result
                .cards
                .iter()
                .filter(|c| c.role.is_impostor())
                .map(|c| c.player_id.clone())
                .collect(),
            starter_id: result.starter.id.clone(),
            category: result
                .cards
                .first()
                .map(|c| c.category.clone())
                .unwrap_or_default(),
            word: result
                .cards
                .first()
                .map(|c| c.real_word.clone())
                .unwrap_or_default(),
            troll_scenario: result.troll_scenario,
            protocol: result.history.last_break_protocol,
            architect_triggered: result.architect_triggered,
        };

        log::debug!(
            "round {} | impostors {:?} | starter {} | protocol {:?}",
            record.round,
            record.impostor_ids,
            record.starter_id,
            record.protocol
        );

        self.history = result.history;
        Ok(record)
    }

    fn check_invariants(&mut self, result: &RoundResult, quarantined: &[String]) {
        let round = result.history.round_counter;
        let impostors: Vec<&str> = result
            .cards
            .iter()
            .filter(|c| c.role.is_impostor())
            .map(|c| c.player_id.as_str())
            .collect();

        if result.troll_scenario.is_none() {
            if impostors.len() > self.config.impostor_count {
                self.violations
                    .push(format!("round {round}: {} impostors drawn", impostors.len()));
            }
            if impostors.len() >= self.players.len() && self.players.len() > 1 {
                self.violations
                    .push(format!("round {round}: no civil left on the table"));
            }
            // Quarantined players must sit out the standard draw while
            // eligible candidates remain; only an exhausted pool may spill
            // into the quarantine bench.
            if result.history.last_break_protocol.is_none() {
                let eligible = self.players.len().saturating_sub(quarantined.len());
                let allowed_spill = impostors.len().saturating_sub(eligible);
                let drawn_quarantined = impostors
                    .iter()
                    .filter(|id| quarantined.iter().any(|q| q == **id))
                    .count();
                if drawn_quarantined > allowed_spill {
                    self.violations
                        .push(format!("round {round}: quarantined player drawn"));
                }
            }
        }

        let h = &result.history;
        if h.last_words.len() > 15
            || h.last_categories.len() > 3
            || h.last_starting_players.len() > 10
            || h.past_impostor_ids.len() > 20
            || h.player_stats
                .values()
                .any(|v| v.sequence.role_sequence.len() > 20)
        {
            self.violations
                .push(format!("round {round}: bounded sequence exceeded its cap"));
        }
    }
}
