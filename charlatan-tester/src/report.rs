//! Aggregation and rendering of simulation results.

use std::collections::HashMap;

use charlatan_game::{Player, ProtocolTag, SessionHistory};
use colored::Colorize;
use serde::Serialize;

use crate::simulation::RoundRecord;

#[derive(Debug, Clone, Serialize)]
pub struct PlayerReport {
    pub name: String,
    pub sessions: u32,
    pub impostor_rounds: u32,
    pub impostor_share_pct: f64,
    pub lifetime_ratio: f64,
    pub longest_civil_streak: u32,
    pub opener_rounds: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub rounds: u32,
    pub seed: u64,
    pub players: Vec<PlayerReport>,
    pub chaos_rounds: u32,
    pub architect_rounds: u32,
    pub protocol_counts: HashMap<String, u32>,
    pub category_counts: HashMap<String, u32>,
    pub violations: Vec<String>,
}

impl SessionReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

#[must_use]
pub fn aggregate(
    seed: u64,
    players: &[Player],
    records: &[RoundRecord],
    history: &SessionHistory,
    violations: &[String],
) -> SessionReport {
    let mut impostor_rounds: HashMap<&str, u32> = HashMap::new();
    let mut opener_rounds: HashMap<&str, u32> = HashMap::new();
    let mut longest_streaks: HashMap<&str, u32> = HashMap::new();
    let mut protocol_counts: HashMap<String, u32> = HashMap::new();
    let mut category_counts: HashMap<String, u32> = HashMap::new();
    let mut chaos_rounds = 0;
    let mut architect_rounds = 0;

    // Longest streak is reconstructed from each vault's role sequence.
    for player in players {
        let vault = history.player_stats.get(&player.key());
        let longest = vault.map_or(0, |v| {
            let mut best = 0u32;
            let mut run = 0u32;
            for was_impostor in v.sequence.role_sequence.iter().rev() {
                if *was_impostor {
                    run = 0;
                } else {
                    run += 1;
                    best = best.max(run);
                }
            }
            best
        });
        longest_streaks.insert(player.id.as_str(), longest);
    }

    for record in records {
        for id in &record.impostor_ids {
            *impostor_rounds.entry(id.as_str()).or_insert(0) += 1;
        }
        *opener_rounds.entry(record.starter_id.as_str()).or_insert(0) += 1;
        *category_counts.entry(record.category.clone()).or_insert(0) += 1;
        if record.troll_scenario.is_some() {
            chaos_rounds += 1;
        }
        if record.architect_triggered {
            architect_rounds += 1;
        }
        if let Some(tag) = record.protocol {
            let label = match tag {
                ProtocolTag::Pandora => "pandora",
                ProtocolTag::Mirror => "mirror",
                ProtocolTag::Blind => "blind",
                ProtocolTag::Chaos => "chaos",
            };
            *protocol_counts.entry(label.to_string()).or_insert(0) += 1;
        }
    }

    let rounds = records.len() as u32;
    let players = players
        .iter()
        .map(|player| {
            let vault = history.player_stats.get(&player.key());
            let impostor = impostor_rounds.get(player.id.as_str()).copied().unwrap_or(0);
            PlayerReport {
                name: player.name.clone(),
                sessions: vault.map_or(0, |v| v.metrics.total_sessions),
                impostor_rounds: impostor,
                impostor_share_pct: if rounds == 0 {
                    0.0
                } else {
                    f64::from(impostor) / f64::from(rounds) * 100.0
                },
                lifetime_ratio: vault.map_or(0.0, |v| v.metrics.impostor_ratio),
                longest_civil_streak: longest_streaks
                    .get(player.id.as_str())
                    .copied()
                    .unwrap_or(0),
                opener_rounds: opener_rounds.get(player.id.as_str()).copied().unwrap_or(0),
            }
        })
        .collect();

    SessionReport {
        rounds,
        seed,
        players,
        chaos_rounds,
        architect_rounds,
        protocol_counts,
        category_counts,
        violations: violations.to_vec(),
    }
}

pub fn render(report: &SessionReport) {
    println!(
        "{}",
        format!(
            "=== Charlatan fairness report | {} rounds | seed {:#x} ===",
            report.rounds, report.seed
        )
        .bold()
    );

    println!("\n{}", "Per-player distribution".underline());
    for p in &report.players {
        println!(
            "  {:<16} impostor {:>4}x ({:>5.1}%)  ratio {:.3}  best streak {:>3}  opened {:>4}x",
            p.name, p.impostor_rounds, p.impostor_share_pct, p.lifetime_ratio,
            p.longest_civil_streak, p.opener_rounds
        );
    }

    println!("\n{}", "Interventions".underline());
    println!("  chaos rounds:     {}", report.chaos_rounds);
    println!("  architect rounds: {}", report.architect_rounds);
    let mut protocols: Vec<_> = report.protocol_counts.iter().collect();
    protocols.sort();
    for (name, count) in protocols {
        println!("  protocol {name:<8} {count}");
    }

    println!("\n{}", "Category spread".underline());
    let mut categories: Vec<_> = report.category_counts.iter().collect();
    categories.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (name, count) in categories {
        println!("  {name:<16} {count}");
    }

    println!();
    if report.passed() {
        println!("{}", "PASS: all engine invariants held".green().bold());
    } else {
        println!(
            "{}",
            format!("FAIL: {} invariant violations", report.violations.len())
                .red()
                .bold()
        );
        for violation in &report.violations {
            println!("  {}", violation.red());
        }
    }
}
