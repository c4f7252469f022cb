//! Structured, append-only combat log.
//!
//! Entries are recorded in true execution order, so a log is sufficient to
//! reconstruct an encounter.

use crate::conditions::ConditionKind;
use crate::damage::DamageKind;
use serde::{Deserialize, Serialize};

/// Why a condition went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionEndReason {
    Expired,
    Saved,
    ConcentrationBroken,
}

/// One logged event with the round it happened in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub round: u32,
    #[serde(flatten)]
    pub event: CombatEvent,
}

/// Tagged event variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CombatEvent {
    CombatStart,
    Initiative {
        name: String,
        roll: u32,
        total: i32,
    },
    RoundStart,
    Attack {
        attacker: String,
        target: String,
        natural: u32,
        total: i32,
        hit: bool,
        critical: bool,
        damage: i32,
    },
    /// Auto-hit against a downed target: death save failures instead of
    /// damage.
    CoupDeGrace {
        attacker: String,
        target: String,
        failures_added: u8,
    },
    SpellCast {
        caster: String,
        spell: String,
        slot: u8,
        targets: Vec<String>,
    },
    SpellDamage {
        caster: String,
        spell: String,
        target: String,
        damage: i32,
        kind: DamageKind,
        saved: bool,
    },
    Heal {
        healer: String,
        target: String,
        amount: i32,
    },
    SavingThrow {
        name: String,
        dc: i32,
        total: i32,
        success: bool,
        source: String,
    },
    LegendaryResistance {
        name: String,
        charges_remaining: u8,
    },
    DeathSave {
        name: String,
        roll: u32,
        successes: u8,
        failures: u8,
    },
    ConditionApplied {
        target: String,
        condition: ConditionKind,
        source: String,
    },
    ConditionEnded {
        target: String,
        condition: ConditionKind,
        reason: ConditionEndReason,
    },
    ConcentrationBroken {
        caster: String,
        spell: String,
    },
    Recharge {
        monster: String,
        ability: String,
        roll: u32,
        recharged: bool,
    },
    AbilityUsed {
        name: String,
        ability: String,
    },
    LegendaryAction {
        monster: String,
        #[serde(rename = "action_name")]
        action: String,
        cost: u8,
    },
    FrightfulPresence {
        monster: String,
    },
    RageStarted {
        name: String,
    },
    RageEnded {
        name: String,
    },
    ResourceSpent {
        name: String,
        resource: String,
        amount: u32,
    },
    Downed {
        name: String,
    },
    Died {
        name: String,
    },
    Stabilized {
        name: String,
    },
    Revived {
        name: String,
    },
    CombatEnd {
        party_won: bool,
        reason: String,
    },
}
