//! Charlatan Selection Engine
//!
//! Platform-agnostic core logic for the Charlatan social-deduction party
//! game: adaptive role weighting, pattern-detection countermeasures,
//! multi-impostor cascade draws, word anti-repetition and the discussion
//! opener pick. This crate provides all game mechanics without UI or
//! platform-specific dependencies; rendering and the storage medium behind
//! the history blob live with the caller.

pub mod cascade;
pub mod constants;
pub mod data;
pub mod lexicon;
pub mod paranoia;
pub mod round;
pub mod state;
pub mod vault;
pub mod vocalis;
pub mod weight;

// Re-export commonly used types
pub use cascade::{CascadeCandidate, choose_weighted, select_impostors};
pub use data::{Category, Lexicon, WordPair};
pub use lexicon::{LexiconSelection, curator_options, pick_word, smart_hint};
pub use paranoia::{BreakProtocol, cooling_factor, decide_break_protocol, paranoia_score};
pub use round::{RoleCard, RoundError, RoundResult, apply_curated_selection, resolve_round};
pub use state::{
    ModeFlags, PartnerSet, Player, PlayerVault, ProtocolTag, Role, RoundConfig, RoundOverrides,
    SessionHistory, TrollScenario,
};
pub use vault::normalize_name;
pub use vocalis::pick_starter;
pub use weight::{WeightContext, base_weight, selection_weight};

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Trait for abstracting word-catalog loading.
/// Platform-specific implementations should provide this.
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the word catalog from the platform-specific source.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    fn load_lexicon(&self) -> Result<Lexicon, Self::Error>;
}

/// Trait for abstracting history persistence.
/// Platform-specific implementations should provide this.
pub trait VaultStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save the session history blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be saved.
    fn save_history(&self, slot: &str, history: &SessionHistory) -> Result<(), Self::Error>;

    /// Load the session history blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be loaded.
    fn load_history(&self, slot: &str) -> Result<Option<SessionHistory>, Self::Error>;

    /// Delete a saved history blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    fn delete_history(&self, slot: &str) -> Result<(), Self::Error>;
}

/// Main engine facade tying the catalog, the selection core and the
/// persistence collaborator together.
pub struct PartyEngine<L, S>
where
    L: DataLoader,
    S: VaultStorage,
{
    data_loader: L,
    storage: S,
}

impl<L, S> PartyEngine<L, S>
where
    L: DataLoader,
    S: VaultStorage,
{
    /// Create a new engine with the provided catalog loader and storage.
    pub const fn new(data_loader: L, storage: S) -> Self {
        Self {
            data_loader,
            storage,
        }
    }

    /// Seedable generator for deterministic sessions and replays.
    #[must_use]
    pub fn rng_for_seed(seed: u64) -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(seed)
    }

    /// Load a saved history, substituting the documented defaults when the
    /// slot is absent or the blob does not parse.
    ///
    /// # Errors
    ///
    /// Returns an error only when the storage itself fails; corrupt content
    /// degrades to `SessionHistory::default()`.
    pub fn load_history(&self, slot: &str) -> Result<SessionHistory, anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        let loaded = self.storage.load_history(slot).map_err(Into::into)?;
        Ok(loaded.unwrap_or_default())
    }

    /// Resolve one round and persist the committed history.
    ///
    /// # Errors
    ///
    /// Returns the engine's fail-fast validation errors or the storage
    /// error; nothing is persisted unless the round fully resolved.
    pub fn play_round<R: rand::Rng>(
        &self,
        slot: &str,
        config: &RoundConfig,
        history: &SessionHistory,
        rng: &mut R,
    ) -> Result<RoundResult, anyhow::Error>
    where
        L::Error: Into<anyhow::Error>,
        S::Error: Into<anyhow::Error>,
    {
        let lexicon = self.data_loader.load_lexicon().map_err(Into::into)?;
        let result = resolve_round(&lexicon, config, history, rng)?;
        self.storage
            .save_history(slot, &result.history)
            .map_err(Into::into)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::rc::Rc;

    #[derive(Clone, Copy, Default)]
    struct FixtureLoader;

    impl DataLoader for FixtureLoader {
        type Error = Infallible;

        fn load_lexicon(&self) -> Result<Lexicon, Self::Error> {
            Ok(Lexicon::load_from_static())
        }
    }

    #[derive(Clone, Default)]
    struct MemoryStorage {
        saves: Rc<RefCell<HashMap<String, SessionHistory>>>,
    }

    impl VaultStorage for MemoryStorage {
        type Error = Infallible;

        fn save_history(&self, slot: &str, history: &SessionHistory) -> Result<(), Self::Error> {
            self.saves
                .borrow_mut()
                .insert(slot.to_string(), history.clone());
            Ok(())
        }

        fn load_history(&self, slot: &str) -> Result<Option<SessionHistory>, Self::Error> {
            Ok(self.saves.borrow().get(slot).cloned())
        }

        fn delete_history(&self, slot: &str) -> Result<(), Self::Error> {
            self.saves.borrow_mut().remove(slot);
            Ok(())
        }
    }

    fn roster() -> Vec<Player> {
        vec![
            Player::new("1", "Ana"),
            Player::new("2", "Bruno"),
            Player::new("3", "Carla"),
            Player::new("4", "Diego"),
        ]
    }

    #[test]
    fn engine_plays_and_roundtrips_history() {
        let engine = PartyEngine::new(FixtureLoader, MemoryStorage::default());
        let mut rng = PartyEngine::<FixtureLoader, MemoryStorage>::rng_for_seed(0xABCD);

        let fresh = engine.load_history("table-one").unwrap();
        assert_eq!(fresh.round_counter, 0);
        assert_eq!(fresh.last_troll_round, -10);
        assert_eq!(fresh.last_architect_round, -999);

        let config = RoundConfig::new(roster(), 1);
        let result = engine
            .play_round("table-one", &config, &fresh, &mut rng)
            .unwrap();
        assert_eq!(result.history.round_counter, 1);

        let reloaded = engine.load_history("table-one").unwrap();
        assert_eq!(reloaded, result.history);
        assert_eq!(engine.load_history("missing-slot").unwrap().round_counter, 0);
    }

    #[test]
    fn save_load_is_idempotent() {
        let storage = MemoryStorage::default();
        let mut history = SessionHistory::default();
        history.round_counter = 9;
        history.record_word("Pizza", "Food");
        storage.save_history("slot", &history).unwrap();

        let loaded = storage.load_history("slot").unwrap().unwrap();
        assert_eq!(loaded, history);
        storage.save_history("slot", &loaded).unwrap();
        assert_eq!(storage.load_history("slot").unwrap().unwrap(), history);

        storage.delete_history("slot").unwrap();
        assert!(storage.load_history("slot").unwrap().is_none());
    }

    #[test]
    fn failed_round_persists_nothing() {
        let engine = PartyEngine::new(FixtureLoader, MemoryStorage::default());
        let mut rng = PartyEngine::<FixtureLoader, MemoryStorage>::rng_for_seed(7);
        let history = SessionHistory::default();
        let bad_config = RoundConfig::new(roster(), 0);
        assert!(
            engine
                .play_round("slot", &bad_config, &history, &mut rng)
                .is_err()
        );
        assert_eq!(engine.load_history("slot").unwrap(), SessionHistory::default());
    }
}
