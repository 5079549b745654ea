use charlatan_game::{
    Lexicon, ModeFlags, Player, ProtocolTag, RoundConfig, SessionHistory, cooling_factor,
    resolve_round,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::collections::HashSet;

fn roster(n: usize) -> Vec<Player> {
    (0..n)
        .map(|i| Player::new(format!("p{i}"), format!("Player{i}")))
        .collect()
}

fn baited_history() -> SessionHistory {
    // One identity three times in the window plus adjacent-seat runs:
    // paranoia pegs at 100 and a protocol must fire on the next clean round.
    let mut history = SessionHistory::default();
    for id in ["p1", "p0", "p1", "p0", "p1"].iter().rev() {
        history.record_impostor(id);
    }
    history
}

#[test]
fn thousand_rounds_hold_the_core_invariants() {
    let lexicon = Lexicon::load_from_static();
    let players = roster(5);
    let impostor_count = 2;
    let mut history = baited_history();
    let mut rng = ChaCha20Rng::from_seed([21u8; 32]);
    let mut protocols_fired = 0u32;

    for round in 1..=1000u32 {
        let quarantined_ids: HashSet<String> = players
            .iter()
            .filter(|p| {
                history
                    .player_stats
                    .get(&p.key())
                    .is_some_and(|v| v.metrics.quarantine_rounds > 0)
            })
            .map(|p| p.id.clone())
            .collect();

        let config = RoundConfig::new(players.clone(), impostor_count);
        let result = resolve_round(&lexicon, &config, &history, &mut rng).unwrap();

        let impostors: Vec<&str> = result
            .cards
            .iter()
            .filter(|c| c.role.is_impostor())
            .map(|c| c.player_id.as_str())
            .collect();

        // Impostor count bounds.
        assert!(impostors.len() <= impostor_count, "round {round}");
        assert!(impostors.len() <= players.len() - 1, "round {round}");

        // Quarantined players sit out normal selection. Troll mode is off,
        // so every round here is a normal round.
        for id in &impostors {
            assert!(
                !quarantined_ids.contains(*id),
                "round {round}: quarantined player {id} drawn as impostor"
            );
        }

        // Bounded sequences never exceed their caps.
        let h = &result.history;
        assert!(h.last_words.len() <= 15);
        assert!(h.last_categories.len() <= 3);
        assert!(h.last_starting_players.len() <= 10);
        assert!(h.past_impostor_ids.len() <= 20);
        for vault in h.player_stats.values() {
            assert!(vault.sequence.role_sequence.len() <= 20);
        }

        if h.last_break_protocol.is_some() && h.last_break_protocol != Some(ProtocolTag::Chaos) {
            protocols_fired += 1;
        }
        assert_eq!(h.round_counter, round);
        history = result.history;
    }

    assert!(protocols_fired > 0, "bait never tripped a protocol");
}

#[test]
fn break_protocol_cooldown_ramps_and_suppresses() {
    let lexicon = Lexicon::load_from_static();
    let players = roster(4);
    let mut history = baited_history();
    let mut rng = ChaCha20Rng::from_seed([22u8; 32]);

    // The bait guarantees paranoia 100 with zero cooling: the first round
    // must fire a protocol (pandora is off the table without troll mode).
    let config = RoundConfig::new(players.clone(), 1);
    let result = resolve_round(&lexicon, &config, &history, &mut rng).unwrap();
    let protocol = result.history.last_break_protocol;
    assert!(
        matches!(protocol, Some(ProtocolTag::Mirror) | Some(ProtocolTag::Blind)),
        "expected a break protocol, got {protocol:?}"
    );
    assert_eq!(result.history.cooling_down_rounds, 3);
    assert_eq!(result.history.paranoia_level, 0);
    history = result.history;

    // Three cooling rounds: the karma attenuation ramps 0.25 -> 0.50 ->
    // 0.75 and no new protocol may fire even though the impostor window
    // still looks suspicious.
    let mut observed = Vec::new();
    for _ in 0..3 {
        observed.push(cooling_factor(history.cooling_down_rounds));
        let config = RoundConfig::new(players.clone(), 1);
        let result = resolve_round(&lexicon, &config, &history, &mut rng).unwrap();
        assert_eq!(result.history.last_break_protocol, None);
        history = result.history;
    }
    assert_eq!(observed, vec![0.25, 0.50, 0.75]);
    assert_eq!(history.cooling_down_rounds, 0);
    assert!((cooling_factor(history.cooling_down_rounds) - 1.0).abs() < f64::EPSILON);
}

#[test]
fn chaos_aftermath_degrades_to_a_floor_lottery() {
    use charlatan_game::{RoundOverrides, TrollScenario};

    let lexicon = Lexicon::load_from_static();
    let players = roster(4);
    let mut rng = ChaCha20Rng::from_seed([23u8; 32]);

    let mut config = RoundConfig::new(players.clone(), 1);
    config.overrides = RoundOverrides {
        force_troll: Some(TrollScenario::AllImpostors),
        force_architect: false,
    };
    let result = resolve_round(&lexicon, &config, &SessionHistory::default(), &mut rng).unwrap();
    let mut history = result.history;
    for vault in history.player_stats.values() {
        assert_eq!(vault.metrics.quarantine_rounds, 3);
    }

    // With the whole table quarantined, rounds still resolve: the draw
    // falls back to the floor-weight lottery rather than erroring.
    for _ in 0..3 {
        let config = RoundConfig::new(players.clone(), 1);
        let result = resolve_round(&lexicon, &config, &history, &mut rng).unwrap();
        let impostors = result.cards.iter().filter(|c| c.role.is_impostor()).count();
        assert_eq!(impostors, 1);
        history = result.history;
    }
    // Sentences served.
    for vault in history.player_stats.values() {
        assert_eq!(vault.metrics.quarantine_rounds, 0);
    }
}

#[test]
fn karma_evens_out_over_a_long_session() {
    let lexicon = Lexicon::load_from_static();
    let players = roster(5);
    let mut history = SessionHistory::default();
    let mut rng = ChaCha20Rng::from_seed([24u8; 32]);
    let mut impostor_rounds: Vec<u32> = vec![0; players.len()];

    for _ in 0..600 {
        let config = RoundConfig::new(players.clone(), 1);
        let result = resolve_round(&lexicon, &config, &history, &mut rng).unwrap();
        for (idx, player) in players.iter().enumerate() {
            let card = result
                .cards
                .iter()
                .find(|c| c.player_id == player.id)
                .unwrap();
            if card.role.is_impostor() {
                impostor_rounds[idx] += 1;
            }
        }
        history = result.history;
    }

    // 600 single-impostor rounds over 5 players: 120 each under perfect
    // fairness. The karma engine should keep everyone within a generous
    // band of that.
    for (idx, count) in impostor_rounds.iter().enumerate() {
        assert!(
            (60..=180).contains(count),
            "player {idx} drawn {count} times in 600 rounds"
        );
    }
}

#[test]
fn back_to_back_impostor_rounds_stay_rare() {
    let lexicon = Lexicon::load_from_static();
    let players = roster(5);
    let mut history = SessionHistory::default();
    let mut rng = ChaCha20Rng::from_seed([25u8; 32]);
    let mut previous: Option<String> = None;
    let mut repeats = 0u32;
    let mut rounds = 0u32;

    for _ in 0..500 {
        let config = RoundConfig::new(players.clone(), 1);
        let result = resolve_round(&lexicon, &config, &history, &mut rng).unwrap();
        let impostor = result
            .cards
            .iter()
            .find(|c| c.role.is_impostor())
            .map(|c| c.player_id.clone());
        // Mirror rounds invert selection on purpose; measure only the
        // standard weighting path.
        if result.history.last_break_protocol.is_none() {
            if let (Some(prev), Some(current)) = (&previous, &impostor) {
                rounds += 1;
                if prev == current {
                    repeats += 1;
                }
            }
        }
        previous = impostor;
        history = result.history;
    }

    // The x0.05 recency step squeezes repeats far below the uniform 20%.
    assert!(rounds > 100, "too few comparable rounds: {rounds}");
    assert!(
        f64::from(repeats) / f64::from(rounds) < 0.08,
        "{repeats} repeats in {rounds} comparable rounds"
    );
}

#[test]
fn opener_duty_rotates() {
    let lexicon = Lexicon::load_from_static();
    let players = roster(4);
    let mut history = SessionHistory::default();
    let mut rng = ChaCha20Rng::from_seed([26u8; 32]);
    let mut openers: Vec<u32> = vec![0; players.len()];

    for _ in 0..400 {
        let config = RoundConfig::new(players.clone(), 1);
        let result = resolve_round(&lexicon, &config, &history, &mut rng).unwrap();
        let idx = players
            .iter()
            .position(|p| p.id == result.starter.id)
            .unwrap();
        openers[idx] += 1;
        history = result.history;
    }

    for (idx, count) in openers.iter().enumerate() {
        assert!(
            (40..=180).contains(count),
            "player {idx} opened {count} of 400 rounds"
        );
    }
}

#[test]
fn mode_flags_thread_through_to_party_opener() {
    let lexicon = Lexicon::load_from_static();
    let players = vec![
        Player::new("a", "Jo"),
        Player::new("b", "Maximiliano"),
        Player::new("c", "Kim"),
    ];
    let mut rng = ChaCha20Rng::from_seed([27u8; 32]);
    let config = RoundConfig::new(players, 1).with_modes(ModeFlags {
        party: true,
        ..ModeFlags::default()
    });
    for _ in 0..10 {
        let result = resolve_round(&lexicon, &config, &SessionHistory::default(), &mut rng).unwrap();
        assert_eq!(result.starter.id, "b", "party mode crowns the longest name");
    }
}
