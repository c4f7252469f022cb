//! Monster special abilities: multiattack routines, recharge abilities,
//! legendary actions, legendary resistance, and frightful presence.

use crate::combatant::{Ability, AttackKind};
use crate::conditions::ConditionKind;
use crate::damage::DamageKind;
use crate::dice::DiceNotation;
use crate::position::AoeShape;
use rand::Rng;
use serde::{Deserialize, Serialize};

fn default_damage_kind() -> DamageKind {
    DamageKind::Slashing
}

fn default_save_ability() -> Ability {
    Ability::Dexterity
}

fn default_shape() -> AoeShape {
    AoeShape::Cone
}

/// One named strike in a multiattack routine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubAttack {
    pub name: String,
    pub attack_bonus: i32,
    pub damage_dice: DiceNotation,
    #[serde(default = "default_damage_kind")]
    pub damage_kind: DamageKind,
    #[serde(default)]
    pub attack_kind: AttackKind,
}

/// An ability gated by a probabilistic per-turn recharge (a breath weapon).
///
/// Targets in the area make a save for half damage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RechargeAbility {
    pub name: String,
    /// The d6-equivalent threshold: "recharge 5–6" is 5.
    pub recharge_min: u8,
    pub damage_dice: DiceNotation,
    #[serde(default = "default_damage_kind")]
    pub damage_kind: DamageKind,
    pub save_dc: i32,
    #[serde(default = "default_save_ability")]
    pub save_ability: Ability,
    #[serde(default = "default_shape")]
    pub shape: AoeShape,
}

/// A legendary action purchasable from the shared per-round budget.
///
/// Area actions resolve as a save for half against the enemy front line;
/// single-target actions resolve as a normal attack roll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegendaryAction {
    pub name: String,
    pub cost: u8,
    pub damage_dice: DiceNotation,
    #[serde(default = "default_damage_kind")]
    pub damage_kind: DamageKind,
    #[serde(default)]
    pub attack_bonus: i32,
    #[serde(default)]
    pub save_dc: Option<i32>,
    #[serde(default)]
    pub area: bool,
}

/// An aura that frightens enemies at the start of the fight.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FrightfulPresence {
    pub dc: i32,
    /// Rounds the fear lasts when the save fails.
    pub duration: u32,
}

/// The monster-specific block of a combatant configuration. Empty for
/// ordinary combatants.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonsterTraits {
    #[serde(default)]
    pub multiattack: Vec<SubAttack>,
    #[serde(default)]
    pub recharge_abilities: Vec<RechargeAbility>,
    #[serde(default)]
    pub legendary_actions: Vec<LegendaryAction>,
    #[serde(default)]
    pub legendary_action_budget: u8,
    #[serde(default)]
    pub legendary_resistances: u8,
    #[serde(default)]
    pub frightful_presence: Option<FrightfulPresence>,
}

/// Map a d20 roll onto the d6 recharge scale.
pub fn recharge_equivalent(d20_roll: u32) -> u8 {
    (d20_roll as f64 / 3.34).ceil() as u8
}

/// Roll a recharge check. Returns the natural d20 roll and whether the
/// ability came back.
pub fn roll_recharge<R: Rng>(recharge_min: u8, rng: &mut R) -> (u32, bool) {
    let roll = crate::dice::roll_die(20, rng);
    (roll, recharge_equivalent(roll) >= recharge_min)
}

/// Pick a legendary action affordable within the remaining budget.
///
/// With two or more living enemies an area action is preferred; otherwise
/// the highest-cost affordable single-target action is taken.
pub fn choose_legendary_action(
    actions: &[LegendaryAction],
    budget: u8,
    living_enemies: usize,
) -> Option<usize> {
    let affordable = |a: &&(usize, &LegendaryAction)| a.1.cost <= budget;
    let indexed: Vec<(usize, &LegendaryAction)> = actions.iter().enumerate().collect();

    if living_enemies >= 2 {
        if let Some((i, _)) = indexed
            .iter()
            .filter(affordable)
            .filter(|(_, a)| a.area)
            .max_by_key(|(_, a)| a.cost)
        {
            return Some(*i);
        }
        return indexed
            .iter()
            .filter(affordable)
            .max_by_key(|(_, a)| a.cost)
            .map(|(i, _)| *i);
    }
    indexed
        .iter()
        .filter(affordable)
        .filter(|(_, a)| !a.area)
        .max_by_key(|(_, a)| a.cost)
        .map(|(i, _)| *i)
}

/// What a failing save was about to do to the monster.
#[derive(Debug, Clone, Copy)]
pub enum SavePurpose {
    Condition(ConditionKind),
    Damage { amount: i32, max_hp: i32 },
}

fn is_dangerous(kind: ConditionKind) -> bool {
    matches!(
        kind,
        ConditionKind::Paralyzed
            | ConditionKind::Stunned
            | ConditionKind::Petrified
            | ConditionKind::Incapacitated
    )
}

fn is_annoying(kind: ConditionKind) -> bool {
    matches!(
        kind,
        ConditionKind::Frightened
            | ConditionKind::Charmed
            | ConditionKind::Restrained
            | ConditionKind::Blinded
    )
}

/// Whether a boss burns a legendary resistance charge on a failed save.
///
/// Action-denying conditions are always worth a charge. Merely annoying
/// conditions, or damage worth a quarter of the monster's health, only
/// justify one while charges are plentiful.
pub fn should_use_legendary_resistance(charges: u8, purpose: SavePurpose) -> bool {
    if charges == 0 {
        return false;
    }
    match purpose {
        SavePurpose::Condition(kind) if is_dangerous(kind) => true,
        SavePurpose::Condition(kind) if is_annoying(kind) => charges >= 2,
        SavePurpose::Condition(_) => false,
        SavePurpose::Damage { amount, max_hp } => charges >= 2 && amount * 4 >= max_hp,
    }
}
