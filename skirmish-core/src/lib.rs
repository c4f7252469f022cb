//! Monte Carlo combat encounter simulator.
//!
//! This crate runs many independent tabletop-style combat encounters
//! between a configured party and a monster group and aggregates the win
//! statistics. The engine is synchronous and single-threaded within one
//! encounter; batches repeat it with a freshly reset combatant arena per
//! run, so the only nondeterminism is the random stream — every rolling
//! entry point accepts an injected `Rng` for reproducible replay.
//!
//! # Quick Start
//!
//! ```
//! use skirmish_core::{run_simulations_with_rng, CombatantConfig, CharacterClass, DiceNotation};
//! use rand::SeedableRng;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let party = vec![
//!     CombatantConfig::new("Aldric", 28, 16, 5, DiceNotation::parse("1d8+3")?)
//!         .player()
//!         .with_class(CharacterClass::Fighter, 3),
//! ];
//! let monsters = vec![CombatantConfig::new("Orc", 15, 13, 5, DiceNotation::parse("1d12+3")?)];
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let batch = run_simulations_with_rng(&party, &monsters, 100, &mut rng)?;
//! println!("party wins {:.1}%", batch.summary.party_win_percentage);
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod class_ai;
pub mod class_data;
pub mod combat_log;
pub mod combatant;
pub mod conditions;
pub mod damage;
pub mod dice;
pub mod encounter;
pub mod monster;
pub mod position;
pub mod resources;
pub mod runner;
pub mod spells;
pub mod targeting;

// Primary public API
pub use combat_log::{CombatEvent, LogEntry};
pub use combatant::{
    Ability, AbilityModifiers, AttackKind, CharacterClass, Combatant, CombatantConfig,
    ConfigError, Side,
};
pub use conditions::{ActiveCondition, ApplyOutcome, ConditionKind, ConditionSet};
pub use damage::DamageKind;
pub use dice::{Advantage, DiceError, DiceNotation};
pub use encounter::{Encounter, EncounterError, SimulationResult, MAX_ROUNDS};
pub use monster::{
    FrightfulPresence, LegendaryAction, MonsterTraits, RechargeAbility, SubAttack,
};
pub use position::Position;
pub use resources::{RageState, ResourceKind, ResourcePool, ResourceSet, RestKind};
pub use runner::{
    run_combat, run_combat_with_rng, run_simulations, run_simulations_with_rng, SimulationBatch,
    Summary,
};
