//! Class feature execution and AI-selection heuristics.
//!
//! Decisions are table-driven: every class exposes the same
//! `(combatant, context) -> Option<ClassAction>` signature, and the
//! orchestrator dispatches through `strategy_for` instead of special-casing
//! classes inline. Damage riders (rage bonus, sneak attack, smite) hook
//! into attack resolution separately.

use crate::class_data;
use crate::combatant::{AttackKind, CharacterClass, Combatant};
use crate::dice::DiceNotation;
use crate::resources::ResourceKind;

/// What the orchestrator tells a strategy about the turn.
#[derive(Debug, Clone, Copy)]
pub struct TurnContext {
    pub living_enemies: usize,
    /// Best ally to hand a Bardic Inspiration die to, if any.
    pub inspire_candidate: Option<usize>,
}

/// A class feature the combatant wants to use this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassAction {
    /// Barbarian: spend a rage charge before wading in.
    EnterRage,
    /// Fighter: a second full attack routine this turn.
    ActionSurge,
    /// Fighter: bonus-action self heal.
    SecondWind,
    /// Monk: spend 1 ki for an extra attack after the routine.
    FlurryOfBlows,
    /// Bard: grant an inspiration die to an ally.
    Inspire { ally: usize },
}

/// Uniform per-class decision signature.
pub type StrategyFn = fn(&Combatant, &TurnContext) -> Option<ClassAction>;

/// The strategy table. Classes without turn-level decisions have no entry;
/// their features are riders or spells.
pub fn strategy_for(class: CharacterClass) -> Option<StrategyFn> {
    match class {
        CharacterClass::Barbarian => Some(barbarian_strategy),
        CharacterClass::Fighter => Some(fighter_strategy),
        CharacterClass::Monk => Some(monk_strategy),
        CharacterClass::Bard => Some(bard_strategy),
        _ => None,
    }
}

/// Ask the combatant's class strategy what to do this turn.
pub fn decide(combatant: &Combatant, ctx: &TurnContext) -> Option<ClassAction> {
    let class = combatant.config.class?;
    strategy_for(class).and_then(|strategy| strategy(combatant, ctx))
}

fn barbarian_strategy(combatant: &Combatant, ctx: &TurnContext) -> Option<ClassAction> {
    if ctx.living_enemies == 0 || combatant.rage.is_active() {
        return None;
    }
    (combatant.resources.available(ResourceKind::Rage) > 0).then_some(ClassAction::EnterRage)
}

fn fighter_strategy(combatant: &Combatant, ctx: &TurnContext) -> Option<ClassAction> {
    // Patch up before pressing the advantage.
    if combatant.current_hp * 2 < combatant.config.max_hp
        && combatant.resources.available(ResourceKind::SecondWind) > 0
    {
        return Some(ClassAction::SecondWind);
    }
    if ctx.living_enemies > 0 && combatant.resources.available(ResourceKind::ActionSurge) > 0 {
        return Some(ClassAction::ActionSurge);
    }
    None
}

fn monk_strategy(combatant: &Combatant, ctx: &TurnContext) -> Option<ClassAction> {
    if ctx.living_enemies == 0 {
        return None;
    }
    (combatant.resources.available(ResourceKind::Ki) > 0).then_some(ClassAction::FlurryOfBlows)
}

fn bard_strategy(combatant: &Combatant, ctx: &TurnContext) -> Option<ClassAction> {
    let ally = ctx.inspire_candidate?;
    (combatant.resources.available(ResourceKind::BardicInspiration) > 0)
        .then_some(ClassAction::Inspire { ally })
}

/// Facts about a resolved hit that riders may condition on.
#[derive(Debug, Clone, Copy)]
pub struct RiderContext {
    pub critical: bool,
    pub had_advantage: bool,
    /// An active ally shares the front line with the attacker.
    pub ally_engaged: bool,
    pub target_max_hp: i32,
    pub attack_kind: AttackKind,
}

/// Extra damage bolted onto a hit by a class feature.
#[derive(Debug, Clone)]
pub struct Rider {
    pub label: &'static str,
    pub dice: Option<DiceNotation>,
    pub flat: i32,
}

/// Collect the damage riders for a hit that just landed. Mutates the
/// attacker: smite burns a slot, sneak attack marks itself used this turn.
pub fn damage_riders(attacker: &mut Combatant, ctx: &RiderContext) -> Vec<Rider> {
    let mut riders = Vec::new();
    let Some(class) = attacker.config.class else {
        return riders;
    };

    match class {
        CharacterClass::Barbarian => {
            if attacker.rage.is_active() && ctx.attack_kind == AttackKind::Melee {
                riders.push(Rider {
                    label: "rage",
                    dice: None,
                    flat: class_data::rage_damage_bonus(attacker.config.level),
                });
            }
        }
        CharacterClass::Rogue => {
            if !attacker.sneak_attack_used && (ctx.had_advantage || ctx.ally_engaged) {
                attacker.sneak_attack_used = true;
                riders.push(Rider {
                    label: "sneak attack",
                    dice: Some(DiceNotation {
                        count: class_data::sneak_attack_dice(attacker.config.level),
                        sides: 6,
                        modifier: 0,
                    }),
                    flat: 0,
                });
            }
        }
        CharacterClass::Paladin => {
            // Smite on a crit (the dice double), or to break a big target.
            if ctx.attack_kind == AttackKind::Melee && (ctx.critical || ctx.target_max_hp >= 50) {
                if let Some(slot) = attacker.slots.highest_available(4) {
                    if attacker.slots.use_slot(slot) {
                        riders.push(Rider {
                            label: "divine smite",
                            dice: Some(DiceNotation {
                                count: 1 + slot as u32,
                                sides: 8,
                                modifier: 0,
                            }),
                            flat: 0,
                        });
                    }
                }
            }
        }
        _ => {}
    }
    riders
}

/// Rogues of level 5+ halve one attack's damage per round with their
/// reaction. Returns `true` (consuming the reaction) when it fires.
pub fn reaction_halves_damage(defender: &mut Combatant) -> bool {
    if defender.config.class == Some(CharacterClass::Rogue)
        && defender.config.level >= 5
        && defender.has_reaction
        && defender.is_active()
    {
        defender.has_reaction = false;
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::{CombatantConfig, Side};

    fn dice(count: u32, sides: u32, modifier: i32) -> DiceNotation {
        DiceNotation {
            count,
            sides,
            modifier,
        }
    }

    fn ctx() -> TurnContext {
        TurnContext {
            living_enemies: 2,
            inspire_candidate: None,
        }
    }

    fn with_class(class: CharacterClass, level: u8) -> Combatant {
        let cfg = CombatantConfig::new("c", 30, 14, 5, dice(1, 8, 3))
            .player()
            .with_class(class, level);
        Combatant::new(&cfg, Side::Party)
    }

    #[test]
    fn test_barbarian_rages_once() {
        let mut barb = with_class(CharacterClass::Barbarian, 3);
        assert_eq!(decide(&barb, &ctx()), Some(ClassAction::EnterRage));
        assert!(barb.rage.enter(&mut barb.resources));
        assert_eq!(decide(&barb, &ctx()), None);
    }

    #[test]
    fn test_fighter_prefers_second_wind_when_bloodied() {
        let mut fighter = with_class(CharacterClass::Fighter, 5);
        assert_eq!(decide(&fighter, &ctx()), Some(ClassAction::ActionSurge));
        fighter.current_hp = 10;
        assert_eq!(decide(&fighter, &ctx()), Some(ClassAction::SecondWind));
    }

    #[test]
    fn test_monk_flurries_while_ki_lasts() {
        let mut monk = with_class(CharacterClass::Monk, 4);
        assert_eq!(decide(&monk, &ctx()), Some(ClassAction::FlurryOfBlows));
        for _ in 0..4 {
            monk.resources.consume(ResourceKind::Ki, 1);
        }
        assert_eq!(decide(&monk, &ctx()), None);
    }

    #[test]
    fn test_bard_needs_a_candidate() {
        let bard = with_class(CharacterClass::Bard, 3);
        assert_eq!(decide(&bard, &ctx()), None);
        let mut with_ally = ctx();
        with_ally.inspire_candidate = Some(2);
        assert_eq!(decide(&bard, &with_ally), Some(ClassAction::Inspire { ally: 2 }));
    }

    #[test]
    fn test_sneak_attack_once_per_turn() {
        let mut rogue = with_class(CharacterClass::Rogue, 5);
        let rider_ctx = RiderContext {
            critical: false,
            had_advantage: true,
            ally_engaged: false,
            target_max_hp: 20,
            attack_kind: AttackKind::Melee,
        };
        let riders = damage_riders(&mut rogue, &rider_ctx);
        assert_eq!(riders.len(), 1);
        assert_eq!(riders[0].dice.unwrap().count, 3);
        // Second qualifying hit the same turn gets nothing.
        assert!(damage_riders(&mut rogue, &rider_ctx).is_empty());
        rogue.begin_turn();
        assert_eq!(damage_riders(&mut rogue, &rider_ctx).len(), 1);
    }

    #[test]
    fn test_sneak_attack_needs_an_edge() {
        let mut rogue = with_class(CharacterClass::Rogue, 5);
        let rider_ctx = RiderContext {
            critical: false,
            had_advantage: false,
            ally_engaged: false,
            target_max_hp: 20,
            attack_kind: AttackKind::Melee,
        };
        assert!(damage_riders(&mut rogue, &rider_ctx).is_empty());
    }

    #[test]
    fn test_smite_burns_the_biggest_usable_slot() {
        let mut paladin = with_class(CharacterClass::Paladin, 5);
        paladin.slots = crate::combatant::SpellSlots::from_totals([4, 2, 0, 0, 0, 0, 0, 0, 0]);
        let rider_ctx = RiderContext {
            critical: true,
            had_advantage: false,
            ally_engaged: false,
            target_max_hp: 20,
            attack_kind: AttackKind::Melee,
        };
        let riders = damage_riders(&mut paladin, &rider_ctx);
        assert_eq!(riders.len(), 1);
        // Slot 2: 3d8.
        assert_eq!(riders[0].dice.unwrap().count, 3);
        assert_eq!(paladin.slots.available(2), 1);
    }

    #[test]
    fn test_rage_rider_is_melee_only() {
        let mut barb = with_class(CharacterClass::Barbarian, 9);
        barb.rage.enter(&mut barb.resources);
        let melee = RiderContext {
            critical: false,
            had_advantage: false,
            ally_engaged: false,
            target_max_hp: 20,
            attack_kind: AttackKind::Melee,
        };
        let riders = damage_riders(&mut barb, &melee);
        assert_eq!(riders[0].flat, 3);
        let ranged = RiderContext {
            attack_kind: AttackKind::Ranged,
            ..melee
        };
        assert!(damage_riders(&mut barb, &ranged).is_empty());
    }

    #[test]
    fn test_uncanny_dodge_gating() {
        let mut rogue = with_class(CharacterClass::Rogue, 5);
        assert!(reaction_halves_damage(&mut rogue));
        assert!(!reaction_halves_damage(&mut rogue));
        let mut low_rogue = with_class(CharacterClass::Rogue, 3);
        assert!(!reaction_halves_damage(&mut low_rogue));
    }
}
