//! Combatant configuration and per-run mutable state.
//!
//! A `CombatantConfig` is immutable and describes what a combatant *is*;
//! external collaborators (fixtures, UI forms, statblock importers) only
//! ever produce these records. A `Combatant` is the mutable arena object
//! built from a config at the start of each independent run and discarded
//! at the end of it — only the name and final status survive into results.

use crate::class_data;
use crate::conditions::{ConditionKind, ConditionSet};
use crate::damage::DamageKind;
use crate::dice::DiceNotation;
use crate::monster::MonsterTraits;
use crate::position::{self, Position};
use crate::resources::{RageState, ResourceSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Error type for invalid combatant configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("combatant {0}: max_hp must be positive")]
    BadMaxHp(String),
    #[error("combatant {0}: num_attacks must be at least 1")]
    BadAttackCount(String),
    #[error("combatant {0}: level must be in 1..=20")]
    BadLevel(String),
    #[error("combatant {name}: recharge threshold {value} must be in 2..=6")]
    BadRechargeThreshold { name: String, value: u8 },
    #[error("combatant {0}: legendary action cost must be at least 1")]
    BadLegendaryCost(String),
    #[error("combatant {0}: area legendary actions need a save DC")]
    MissingLegendarySaveDc(String),
}

/// The six abilities, used for saving throws and casting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    pub fn name(&self) -> &'static str {
        match self {
            Ability::Strength => "Strength",
            Ability::Dexterity => "Dexterity",
            Ability::Constitution => "Constitution",
            Ability::Intelligence => "Intelligence",
            Ability::Wisdom => "Wisdom",
            Ability::Charisma => "Charisma",
        }
    }
}

/// Ability modifiers (not scores). Configuration carries the modifiers
/// directly; nothing in the engine needs the underlying score.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AbilityModifiers {
    #[serde(default)]
    pub strength: i8,
    #[serde(default)]
    pub dexterity: i8,
    #[serde(default)]
    pub constitution: i8,
    #[serde(default)]
    pub intelligence: i8,
    #[serde(default)]
    pub wisdom: i8,
    #[serde(default)]
    pub charisma: i8,
}

impl AbilityModifiers {
    pub fn modifier(&self, ability: Ability) -> i32 {
        let m = match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        };
        m as i32
    }
}

/// Whether an attack is delivered in melee or at range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackKind {
    #[default]
    Melee,
    Ranged,
}

/// Character classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterClass {
    Barbarian,
    Bard,
    Cleric,
    Druid,
    Fighter,
    Monk,
    Paladin,
    Ranger,
    Rogue,
    Sorcerer,
    Warlock,
    Wizard,
}

/// Which side of the encounter a combatant fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Party,
    Monsters,
}

impl Side {
    pub fn opponent(&self) -> Side {
        match self {
            Side::Party => Side::Monsters,
            Side::Monsters => Side::Party,
        }
    }
}

/// Unique identifier for a combatant within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatantId(pub Uuid);

impl CombatantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CombatantId {
    fn default() -> Self {
        Self::new()
    }
}

fn default_num_attacks() -> u32 {
    1
}

fn default_level() -> u8 {
    1
}

fn default_damage_kind() -> DamageKind {
    DamageKind::Slashing
}

/// Immutable combatant configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatantConfig {
    pub name: String,
    pub max_hp: i32,
    pub armor_class: i32,
    #[serde(default)]
    pub attack_bonus: i32,
    pub damage_dice: DiceNotation,
    #[serde(default = "default_damage_kind")]
    pub damage_kind: DamageKind,
    #[serde(default)]
    pub attack_kind: AttackKind,
    #[serde(default = "default_num_attacks")]
    pub num_attacks: u32,
    #[serde(default)]
    pub initiative_bonus: i32,
    /// Explicit front/back placement. Inferred from the rest of the config
    /// when absent.
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub is_player: bool,
    #[serde(default)]
    pub class: Option<CharacterClass>,
    #[serde(default = "default_level")]
    pub level: u8,
    #[serde(default)]
    pub abilities: AbilityModifiers,
    /// Non-caster healing (a healer NPC's healing touch).
    #[serde(default)]
    pub healing_dice: Option<DiceNotation>,
    #[serde(default)]
    pub spells: Vec<String>,
    #[serde(default)]
    pub cantrips: Vec<String>,
    /// Spell slot totals by level (index 0 is level 1).
    #[serde(default)]
    pub spell_slots: [u8; 9],
    #[serde(default)]
    pub resistances: Vec<DamageKind>,
    #[serde(default)]
    pub immunities: Vec<DamageKind>,
    #[serde(default)]
    pub condition_immunities: Vec<ConditionKind>,
    /// Smart monsters use threat-scored targeting instead of focus fire.
    #[serde(default)]
    pub tactical: bool,
    #[serde(default)]
    pub monster: MonsterTraits,
}

impl CombatantConfig {
    pub fn new(
        name: impl Into<String>,
        max_hp: i32,
        armor_class: i32,
        attack_bonus: i32,
        damage_dice: DiceNotation,
    ) -> Self {
        Self {
            name: name.into(),
            max_hp,
            armor_class,
            attack_bonus,
            damage_dice,
            damage_kind: default_damage_kind(),
            attack_kind: AttackKind::Melee,
            num_attacks: 1,
            initiative_bonus: 0,
            position: None,
            is_player: false,
            class: None,
            level: 1,
            abilities: AbilityModifiers::default(),
            healing_dice: None,
            spells: Vec::new(),
            cantrips: Vec::new(),
            spell_slots: [0; 9],
            resistances: Vec::new(),
            immunities: Vec::new(),
            condition_immunities: Vec::new(),
            tactical: false,
            monster: MonsterTraits::default(),
        }
    }

    pub fn player(mut self) -> Self {
        self.is_player = true;
        self
    }

    pub fn with_class(mut self, class: CharacterClass, level: u8) -> Self {
        self.class = Some(class);
        self.level = level;
        self
    }

    pub fn with_abilities(mut self, abilities: AbilityModifiers) -> Self {
        self.abilities = abilities;
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_attacks(mut self, num_attacks: u32) -> Self {
        self.num_attacks = num_attacks;
        self
    }

    pub fn with_attack_kind(mut self, kind: AttackKind) -> Self {
        self.attack_kind = kind;
        self
    }

    pub fn with_damage_kind(mut self, kind: DamageKind) -> Self {
        self.damage_kind = kind;
        self
    }

    pub fn with_initiative_bonus(mut self, bonus: i32) -> Self {
        self.initiative_bonus = bonus;
        self
    }

    pub fn with_healing(mut self, dice: DiceNotation) -> Self {
        self.healing_dice = Some(dice);
        self
    }

    pub fn with_spells(mut self, spells: Vec<String>, cantrips: Vec<String>) -> Self {
        self.spells = spells;
        self.cantrips = cantrips;
        self
    }

    pub fn with_spell_slots(mut self, slots: [u8; 9]) -> Self {
        self.spell_slots = slots;
        self
    }

    pub fn with_monster_traits(mut self, monster: MonsterTraits) -> Self {
        self.monster = monster;
        self
    }

    pub fn tactical(mut self) -> Self {
        self.tactical = true;
        self
    }

    /// Validate the configuration. Bad data here is fatal: it means the
    /// external collaborator handed us a broken record.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_hp <= 0 {
            return Err(ConfigError::BadMaxHp(self.name.clone()));
        }
        if self.num_attacks == 0 {
            return Err(ConfigError::BadAttackCount(self.name.clone()));
        }
        if !(1..=20).contains(&self.level) {
            return Err(ConfigError::BadLevel(self.name.clone()));
        }
        for ability in &self.monster.recharge_abilities {
            if !(2..=6).contains(&ability.recharge_min) {
                return Err(ConfigError::BadRechargeThreshold {
                    name: self.name.clone(),
                    value: ability.recharge_min,
                });
            }
        }
        if self.monster.legendary_actions.iter().any(|a| a.cost == 0) {
            return Err(ConfigError::BadLegendaryCost(self.name.clone()));
        }
        if self
            .monster
            .legendary_actions
            .iter()
            .any(|a| a.area && a.save_dc.is_none())
        {
            return Err(ConfigError::MissingLegendarySaveDc(self.name.clone()));
        }
        Ok(())
    }
}

/// Per-level spell slot tracking.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpellSlots {
    slots: [SlotInfo; 9],
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SlotInfo {
    pub total: u8,
    pub used: u8,
}

impl SlotInfo {
    pub fn available(&self) -> u8 {
        self.total.saturating_sub(self.used)
    }
}

impl SpellSlots {
    pub fn from_totals(totals: [u8; 9]) -> Self {
        let mut slots = [SlotInfo::default(); 9];
        for (slot, &total) in slots.iter_mut().zip(totals.iter()) {
            slot.total = total;
        }
        Self { slots }
    }

    pub fn available(&self, level: u8) -> u8 {
        if (1..=9).contains(&level) {
            self.slots[level as usize - 1].available()
        } else {
            0
        }
    }

    pub fn use_slot(&mut self, level: u8) -> bool {
        if (1..=9).contains(&level) {
            let slot = &mut self.slots[level as usize - 1];
            if slot.available() > 0 {
                slot.used += 1;
                return true;
            }
        }
        false
    }

    pub fn total_remaining(&self) -> u32 {
        self.slots.iter().map(|s| s.available() as u32).sum()
    }

    /// Lowest slot level with availability, at or above `min_level`.
    pub fn lowest_available(&self, min_level: u8) -> Option<u8> {
        (min_level.max(1)..=9).find(|&lvl| self.available(lvl) > 0)
    }

    /// Highest slot level with availability, at or below `max_level`.
    pub fn highest_available(&self, max_level: u8) -> Option<u8> {
        (1..=max_level.min(9)).rev().find(|&lvl| self.available(lvl) > 0)
    }

    pub fn recover_all(&mut self) {
        for slot in &mut self.slots {
            slot.used = 0;
        }
    }
}

/// What happened to a combatant when its HP hit zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// A player drops unconscious and starts rolling death saves.
    Downed,
    /// A monster dies outright.
    Died,
}

/// The mutable arena object for one run.
#[derive(Debug, Clone)]
pub struct Combatant {
    pub id: CombatantId,
    pub side: Side,
    pub position: Position,
    pub config: CombatantConfig,

    pub current_hp: i32,
    pub is_unconscious: bool,
    pub is_dead: bool,
    pub is_stabilized: bool,
    pub death_save_successes: u8,
    pub death_save_failures: u8,

    pub conditions: ConditionSet,
    pub resources: ResourceSet,
    pub rage: RageState,
    pub slots: SpellSlots,
    /// Name of the spell currently concentrated on.
    pub concentration: Option<String>,

    pub has_reaction: bool,
    pub sneak_attack_used: bool,
    /// Granted Bardic Inspiration die (sides), consumed on the next attack.
    pub inspiration: Option<u32>,

    pub frightful_immune: bool,
    pub frightful_used: bool,
    pub recharge_ready: Vec<bool>,
    pub legendary_actions_remaining: u8,
    pub legendary_resistances_remaining: u8,
}

impl Combatant {
    /// Build a fresh combatant for one run: full HP, cleared conditions,
    /// reinitialized resources.
    pub fn new(config: &CombatantConfig, side: Side) -> Self {
        let mut resources = ResourceSet::new();
        if let Some(class) = config.class {
            for (kind, pool) in
                class_data::base_resources(class, config.level, config.abilities.charisma)
            {
                resources.insert(kind, pool);
            }
        }
        Self {
            id: CombatantId::new(),
            side,
            position: position::infer_position(config),
            current_hp: config.max_hp,
            is_unconscious: false,
            is_dead: false,
            is_stabilized: false,
            death_save_successes: 0,
            death_save_failures: 0,
            conditions: ConditionSet::new(),
            resources,
            rage: RageState::default(),
            slots: SpellSlots::from_totals(config.spell_slots),
            concentration: None,
            has_reaction: true,
            sneak_attack_used: false,
            inspiration: None,
            frightful_immune: false,
            frightful_used: false,
            recharge_ready: vec![true; config.monster.recharge_abilities.len()],
            legendary_actions_remaining: config.monster.legendary_action_budget,
            legendary_resistances_remaining: config.monster.legendary_resistances,
            config: config.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn is_player(&self) -> bool {
        self.config.is_player
    }

    /// Not dead. Unconscious-but-alive combatants still hold their side in
    /// the fight, so combat continues while they have death saves to roll.
    pub fn is_alive(&self) -> bool {
        !self.is_dead
    }

    /// Conscious and able to be up and fighting.
    pub fn is_active(&self) -> bool {
        !self.is_dead && !self.is_unconscious
    }

    pub fn ability_mod(&self, ability: Ability) -> i32 {
        self.config.abilities.modifier(ability)
    }

    /// Saving throw bonus (the raw ability modifier).
    pub fn save_bonus(&self, ability: Ability) -> i32 {
        self.ability_mod(ability)
    }

    pub fn proficiency_bonus(&self) -> i32 {
        class_data::proficiency_bonus(self.config.level)
    }

    pub fn spell_save_dc(&self) -> i32 {
        let ability_mod = self
            .config
            .class
            .and_then(class_data::casting_ability)
            .map(|a| self.ability_mod(a))
            .unwrap_or(0);
        8 + self.proficiency_bonus() + ability_mod
    }

    pub fn spell_attack_bonus(&self) -> i32 {
        let ability_mod = self
            .config
            .class
            .and_then(class_data::casting_ability)
            .map(|a| self.ability_mod(a))
            .unwrap_or(0);
        self.proficiency_bonus() + ability_mod
    }

    pub fn casting_mod(&self) -> i32 {
        self.config
            .class
            .and_then(class_data::casting_ability)
            .map(|a| self.ability_mod(a))
            .unwrap_or(0)
    }

    pub fn is_concentrating(&self) -> bool {
        self.concentration.is_some()
    }

    /// Lose hit points (already mitigated). Returns what happened if the
    /// combatant dropped to zero.
    pub fn apply_hp_loss(&mut self, amount: i32) -> Option<DropOutcome> {
        if amount <= 0 || self.is_dead {
            return None;
        }
        self.current_hp = (self.current_hp - amount).max(0);
        if self.current_hp > 0 {
            return None;
        }
        if self.config.is_player {
            // Going down resets both death save counters.
            self.is_unconscious = true;
            self.is_stabilized = false;
            self.death_save_successes = 0;
            self.death_save_failures = 0;
            self.rage.end();
            Some(DropOutcome::Downed)
        } else {
            self.is_dead = true;
            self.is_unconscious = false;
            Some(DropOutcome::Died)
        }
    }

    /// Regain hit points, clamped to the maximum. Reviving an unconscious
    /// combatant clears the death save bookkeeping.
    pub fn heal(&mut self, amount: i32) -> i32 {
        if self.is_dead || amount <= 0 {
            return 0;
        }
        let old = self.current_hp;
        self.current_hp = (self.current_hp + amount).min(self.config.max_hp);
        if self.is_unconscious {
            self.is_unconscious = false;
            self.is_stabilized = false;
            self.death_save_successes = 0;
            self.death_save_failures = 0;
        }
        self.current_hp - old
    }

    /// Record death save failures. Returns `true` when the third failure
    /// kills the combatant.
    pub fn add_death_save_failures(&mut self, count: u8) -> bool {
        self.death_save_failures = (self.death_save_failures + count).min(3);
        if self.death_save_failures >= 3 {
            self.is_dead = true;
            self.is_unconscious = false;
            true
        } else {
            false
        }
    }

    /// Record a death save success. Returns `true` when the third success
    /// stabilizes the combatant.
    pub fn add_death_save_success(&mut self) -> bool {
        self.death_save_successes = (self.death_save_successes + 1).min(3);
        if self.death_save_successes >= 3 {
            self.is_stabilized = true;
            true
        } else {
            false
        }
    }

    /// A natural 20 on a death save: back up at 1 HP.
    pub fn revive_at_one_hp(&mut self) {
        self.current_hp = 1;
        self.is_unconscious = false;
        self.is_stabilized = false;
        self.death_save_successes = 0;
        self.death_save_failures = 0;
    }

    /// Per-turn bookkeeping at the start of this combatant's turn.
    pub fn begin_turn(&mut self) {
        self.sneak_attack_used = false;
    }

    /// Per-round bookkeeping at the top of the round.
    pub fn begin_round(&mut self) {
        self.has_reaction = true;
        self.legendary_actions_remaining = self.config.monster.legendary_action_budget;
    }

    /// A short rest between encounters: short-rest pools refill, rage ends.
    pub fn short_rest(&mut self) {
        self.resources.short_rest();
        self.rage.end();
    }

    /// A long rest: every pool and spell slot refills, rage ends.
    pub fn long_rest(&mut self) {
        self.resources.long_rest();
        self.slots.recover_all();
        self.rage.end();
    }
}

impl fmt::Display for Combatant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}/{} hp)",
            self.config.name, self.current_hp, self.config.max_hp
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::DiceNotation;

    fn dice(s: &str) -> DiceNotation {
        DiceNotation::parse(s).unwrap()
    }

    fn fighter() -> CombatantConfig {
        CombatantConfig::new("Aldric", 24, 16, 5, dice("1d8+3"))
            .player()
            .with_class(CharacterClass::Fighter, 3)
    }

    fn orc() -> CombatantConfig {
        CombatantConfig::new("Orc", 15, 13, 5, dice("1d12+3"))
    }

    #[test]
    fn test_validate_rejects_bad_configs() {
        let mut cfg = fighter();
        cfg.max_hp = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = fighter();
        cfg.num_attacks = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = fighter();
        cfg.level = 21;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_player_drops_unconscious_with_reset_counters() {
        let mut c = Combatant::new(&fighter(), Side::Party);
        c.death_save_failures = 2;
        let outcome = c.apply_hp_loss(30);
        assert_eq!(outcome, Some(DropOutcome::Downed));
        assert_eq!(c.current_hp, 0);
        assert!(c.is_unconscious);
        assert!(!c.is_dead);
        assert_eq!(c.death_save_successes, 0);
        assert_eq!(c.death_save_failures, 0);
    }

    #[test]
    fn test_monster_dies_at_zero() {
        let mut c = Combatant::new(&orc(), Side::Monsters);
        let outcome = c.apply_hp_loss(20);
        assert_eq!(outcome, Some(DropOutcome::Died));
        assert!(c.is_dead);
        assert!(!c.is_unconscious);
    }

    #[test]
    fn test_heal_clamps_and_revives() {
        let mut c = Combatant::new(&fighter(), Side::Party);
        c.apply_hp_loss(30);
        c.death_save_failures = 2;
        let healed = c.heal(10);
        assert_eq!(healed, 10);
        assert!(!c.is_unconscious);
        assert_eq!(c.death_save_failures, 0);

        let healed = c.heal(100);
        assert_eq!(c.current_hp, 24);
        assert_eq!(healed, 14);
    }

    #[test]
    fn test_death_save_counters() {
        let mut c = Combatant::new(&fighter(), Side::Party);
        c.apply_hp_loss(30);
        assert!(!c.add_death_save_failures(2));
        assert!(c.add_death_save_failures(1));
        assert!(c.is_dead);

        let mut c = Combatant::new(&fighter(), Side::Party);
        c.apply_hp_loss(30);
        assert!(!c.add_death_save_success());
        assert!(!c.add_death_save_success());
        assert!(c.add_death_save_success());
        assert!(c.is_stabilized);
    }

    #[test]
    fn test_natural_twenty_revival() {
        let mut c = Combatant::new(&fighter(), Side::Party);
        c.apply_hp_loss(30);
        c.death_save_successes = 1;
        c.death_save_failures = 2;
        c.revive_at_one_hp();
        assert_eq!(c.current_hp, 1);
        assert!(!c.is_unconscious);
        assert_eq!(c.death_save_successes, 0);
        assert_eq!(c.death_save_failures, 0);
    }

    #[test]
    fn test_class_resources_initialized() {
        let c = Combatant::new(&fighter(), Side::Party);
        assert_eq!(c.resources.available(crate::resources::ResourceKind::ActionSurge), 1);
        assert_eq!(c.resources.available(crate::resources::ResourceKind::SecondWind), 1);
    }

    #[test]
    fn test_rest_cycles() {
        use crate::resources::ResourceKind;
        let cfg = CombatantConfig::new("Kor", 30, 14, 5, dice("1d12+3"))
            .player()
            .with_class(CharacterClass::Barbarian, 3)
            .with_spell_slots([2, 0, 0, 0, 0, 0, 0, 0, 0]);
        let mut c = Combatant::new(&cfg, Side::Party);
        c.rage.enter(&mut c.resources);
        c.slots.use_slot(1);

        c.short_rest();
        assert!(!c.rage.is_active());
        // Rage charges only come back on a long rest.
        assert_eq!(c.resources.available(ResourceKind::Rage), 2);
        assert_eq!(c.slots.available(1), 1);

        c.long_rest();
        assert_eq!(c.resources.available(ResourceKind::Rage), 3);
        assert_eq!(c.slots.available(1), 2);
    }

    #[test]
    fn test_spell_slots() {
        let mut slots = SpellSlots::from_totals([4, 3, 2, 0, 0, 0, 0, 0, 0]);
        assert_eq!(slots.total_remaining(), 9);
        assert!(slots.use_slot(3));
        assert_eq!(slots.available(3), 1);
        assert_eq!(slots.lowest_available(2), Some(2));
        assert_eq!(slots.highest_available(4), Some(3));
        assert!(!slots.use_slot(5));
        slots.recover_all();
        assert_eq!(slots.total_remaining(), 9);
    }
}
