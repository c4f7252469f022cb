//! Batch simulation: run an encounter many times and aggregate the wins.
//!
//! Every run builds a fresh combatant arena from the same configuration,
//! so runs share no mutable state and the only nondeterminism is the
//! random stream.

use crate::combatant::CombatantConfig;
use crate::encounter::{Encounter, EncounterError, SimulationResult};
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate statistics over a batch of simulations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub total_simulations: u32,
    pub party_wins: u32,
    pub party_win_percentage: f64,
    pub average_rounds: f64,
    /// How often each combatant survived, by name.
    pub survivor_counts: BTreeMap<String, u32>,
}

impl Summary {
    fn from_results(results: &[SimulationResult]) -> Self {
        let total = results.len() as u32;
        let party_wins = results.iter().filter(|r| r.party_won).count() as u32;
        let total_rounds: u64 = results.iter().map(|r| r.total_rounds as u64).sum();
        let mut survivor_counts = BTreeMap::new();
        for result in results {
            for name in result
                .surviving_party
                .iter()
                .chain(&result.surviving_monsters)
            {
                *survivor_counts.entry(name.clone()).or_insert(0) += 1;
            }
        }
        Summary {
            total_simulations: total,
            party_wins,
            party_win_percentage: if total > 0 {
                party_wins as f64 * 100.0 / total as f64
            } else {
                0.0
            },
            average_rounds: if total > 0 {
                total_rounds as f64 / total as f64
            } else {
                0.0
            },
            survivor_counts,
        }
    }
}

/// A batch of results plus their summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationBatch {
    pub results: Vec<SimulationResult>,
    pub summary: Summary,
}

/// Run a single encounter with the thread-local generator.
pub fn run_combat(
    party: &[CombatantConfig],
    monsters: &[CombatantConfig],
    simulation_id: u32,
) -> Result<SimulationResult, EncounterError> {
    run_combat_with_rng(party, monsters, simulation_id, &mut rand::thread_rng())
}

/// Run a single encounter with an injected generator (for reproducible
/// tests and replay).
pub fn run_combat_with_rng<R: Rng>(
    party: &[CombatantConfig],
    monsters: &[CombatantConfig],
    simulation_id: u32,
    rng: &mut R,
) -> Result<SimulationResult, EncounterError> {
    Ok(Encounter::new(party, monsters, simulation_id)?.run(rng))
}

/// Run `num_simulations` independent encounters and summarize them.
pub fn run_simulations(
    party: &[CombatantConfig],
    monsters: &[CombatantConfig],
    num_simulations: u32,
) -> Result<SimulationBatch, EncounterError> {
    run_simulations_with_rng(party, monsters, num_simulations, &mut rand::thread_rng())
}

/// Seedable variant of [`run_simulations`].
pub fn run_simulations_with_rng<R: Rng>(
    party: &[CombatantConfig],
    monsters: &[CombatantConfig],
    num_simulations: u32,
    rng: &mut R,
) -> Result<SimulationBatch, EncounterError> {
    let mut results = Vec::with_capacity(num_simulations as usize);
    for id in 0..num_simulations {
        results.push(run_combat_with_rng(party, monsters, id, rng)?);
    }
    let summary = Summary::from_results(&results);
    debug!(
        "{} simulations: party won {:.1}% over {:.1} rounds on average",
        summary.total_simulations, summary.party_win_percentage, summary.average_rounds
    );
    Ok(SimulationBatch { results, summary })
}
