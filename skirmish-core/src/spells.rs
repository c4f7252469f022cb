//! Spell database, slot/upcast rules, and caster AI.
//!
//! Unknown spell names are "capability absent": lookups return `None` and
//! the AI simply skips them, because probing combatants for optional
//! capabilities is routine.

use crate::combatant::{Ability, Combatant};
use crate::conditions::ConditionKind;
use crate::damage::DamageKind;
use crate::dice::DiceNotation;
use crate::position::{self, AoeShape};
use crate::targeting;
use rand::Rng;
use std::collections::HashMap;
use std::sync::LazyLock;

/// What a successful save does to the spell's damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveEffect {
    Half,
    Negates,
}

/// Saving throw attached to a spell.
#[derive(Debug, Clone, Copy)]
pub struct SpellSave {
    pub ability: Ability,
    pub effect: SaveEffect,
}

/// How a spell scales when cast from a higher slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upcast {
    None,
    /// Extra damage dice per slot level above the base.
    ExtraDicePerSlot(u32),
    /// Extra projectiles per slot level above the base.
    ExtraProjectilesPerSlot(u32),
    /// Extra targets per slot level above the base.
    ExtraTargetsPerSlot(u32),
}

/// Condition a control spell applies on a failed save.
#[derive(Debug, Clone, Copy)]
pub struct ConditionEffect {
    pub kind: ConditionKind,
    /// `None` ties the condition to the caster's concentration.
    pub duration: Option<u32>,
    /// Whether the target re-saves at the end of each of its turns.
    pub save_ends: bool,
}

/// Complete spell definition.
#[derive(Debug, Clone)]
pub struct SpellData {
    pub name: &'static str,
    /// 0 for cantrips.
    pub level: u8,
    pub damage_dice: Option<DiceNotation>,
    pub damage_kind: Option<DamageKind>,
    pub healing_dice: Option<DiceNotation>,
    pub save: Option<SpellSave>,
    /// Resolved with a spell attack roll against AC.
    pub attack_roll: bool,
    /// Never misses (magic missile).
    pub auto_hit: bool,
    /// Projectile count for auto-hit spells.
    pub projectiles: u32,
    pub area: Option<AoeShape>,
    pub concentration: bool,
    pub applies: Option<ConditionEffect>,
    pub upcast: Upcast,
    /// Base target count for control spells.
    pub base_targets: u32,
}

impl SpellData {
    pub fn is_cantrip(&self) -> bool {
        self.level == 0
    }

    pub fn is_control(&self) -> bool {
        self.applies.is_some() && self.damage_dice.is_none()
    }
}

const fn dice(count: u32, sides: u32, modifier: i32) -> DiceNotation {
    DiceNotation {
        count,
        sides,
        modifier,
    }
}

const fn base_spell(name: &'static str, level: u8) -> SpellData {
    SpellData {
        name,
        level,
        damage_dice: None,
        damage_kind: None,
        healing_dice: None,
        save: None,
        attack_roll: false,
        auto_hit: false,
        projectiles: 1,
        area: None,
        concentration: false,
        applies: None,
        upcast: Upcast::None,
        base_targets: 1,
    }
}

/// Global spell database.
static SPELL_DATABASE: LazyLock<HashMap<&'static str, SpellData>> = LazyLock::new(build_spell_database);

/// Look up a spell by name (case-insensitive).
pub fn get_spell(name: &str) -> Option<&'static SpellData> {
    SPELL_DATABASE.get(name.to_lowercase().as_str())
}

fn build_spell_database() -> HashMap<&'static str, SpellData> {
    let mut db = HashMap::new();

    // Cantrips
    db.insert(
        "fire bolt",
        SpellData {
            damage_dice: Some(dice(1, 10, 0)),
            damage_kind: Some(DamageKind::Fire),
            attack_roll: true,
            ..base_spell("Fire Bolt", 0)
        },
    );
    db.insert(
        "ray of frost",
        SpellData {
            damage_dice: Some(dice(1, 8, 0)),
            damage_kind: Some(DamageKind::Cold),
            attack_roll: true,
            ..base_spell("Ray of Frost", 0)
        },
    );
    db.insert(
        "sacred flame",
        SpellData {
            damage_dice: Some(dice(1, 8, 0)),
            damage_kind: Some(DamageKind::Radiant),
            save: Some(SpellSave {
                ability: Ability::Dexterity,
                effect: SaveEffect::Negates,
            }),
            ..base_spell("Sacred Flame", 0)
        },
    );

    // Level 1
    db.insert(
        "magic missile",
        SpellData {
            damage_dice: Some(dice(1, 4, 1)),
            damage_kind: Some(DamageKind::Force),
            auto_hit: true,
            projectiles: 3,
            upcast: Upcast::ExtraProjectilesPerSlot(1),
            ..base_spell("Magic Missile", 1)
        },
    );
    db.insert(
        "cure wounds",
        SpellData {
            healing_dice: Some(dice(1, 8, 0)),
            upcast: Upcast::ExtraDicePerSlot(1),
            ..base_spell("Cure Wounds", 1)
        },
    );
    db.insert(
        "healing word",
        SpellData {
            healing_dice: Some(dice(1, 4, 0)),
            upcast: Upcast::ExtraDicePerSlot(1),
            ..base_spell("Healing Word", 1)
        },
    );
    db.insert(
        "burning hands",
        SpellData {
            damage_dice: Some(dice(3, 6, 0)),
            damage_kind: Some(DamageKind::Fire),
            save: Some(SpellSave {
                ability: Ability::Dexterity,
                effect: SaveEffect::Half,
            }),
            area: Some(AoeShape::Cone),
            upcast: Upcast::ExtraDicePerSlot(1),
            ..base_spell("Burning Hands", 1)
        },
    );

    // Level 2
    db.insert(
        "hold person",
        SpellData {
            save: Some(SpellSave {
                ability: Ability::Wisdom,
                effect: SaveEffect::Negates,
            }),
            concentration: true,
            applies: Some(ConditionEffect {
                kind: ConditionKind::Paralyzed,
                duration: None,
                save_ends: true,
            }),
            upcast: Upcast::ExtraTargetsPerSlot(1),
            ..base_spell("Hold Person", 2)
        },
    );

    // Level 3
    db.insert(
        "fireball",
        SpellData {
            damage_dice: Some(dice(8, 6, 0)),
            damage_kind: Some(DamageKind::Fire),
            save: Some(SpellSave {
                ability: Ability::Dexterity,
                effect: SaveEffect::Half,
            }),
            area: Some(AoeShape::Sphere),
            upcast: Upcast::ExtraDicePerSlot(1),
            ..base_spell("Fireball", 3)
        },
    );
    db.insert(
        "lightning bolt",
        SpellData {
            damage_dice: Some(dice(8, 6, 0)),
            damage_kind: Some(DamageKind::Lightning),
            save: Some(SpellSave {
                ability: Ability::Dexterity,
                effect: SaveEffect::Half,
            }),
            area: Some(AoeShape::Line),
            upcast: Upcast::ExtraDicePerSlot(1),
            ..base_spell("Lightning Bolt", 3)
        },
    );

    db
}

/// Cantrip damage dice multiply at caster levels 5, 11, and 17.
pub fn cantrip_multiplier(caster_level: u8) -> u32 {
    match caster_level {
        1..=4 => 1,
        5..=10 => 2,
        11..=16 => 3,
        _ => 4,
    }
}

/// Damage dice for a cast at the given caster level and slot.
pub fn effective_damage_dice(
    spell: &SpellData,
    caster_level: u8,
    slot: u8,
) -> Option<DiceNotation> {
    let base = spell.damage_dice?;
    if spell.is_cantrip() {
        return Some(base.with_count_multiplier(cantrip_multiplier(caster_level)));
    }
    match spell.upcast {
        Upcast::ExtraDicePerSlot(extra) => {
            let levels = slot.saturating_sub(spell.level) as u32;
            Some(base.with_extra_dice(extra * levels))
        }
        _ => Some(base),
    }
}

/// Healing dice for a cast at the given slot.
pub fn effective_healing_dice(spell: &SpellData, slot: u8) -> Option<DiceNotation> {
    let base = spell.healing_dice?;
    match spell.upcast {
        Upcast::ExtraDicePerSlot(extra) => {
            let levels = slot.saturating_sub(spell.level) as u32;
            Some(base.with_extra_dice(extra * levels))
        }
        _ => Some(base),
    }
}

/// Projectile count for a cast at the given slot.
pub fn effective_projectiles(spell: &SpellData, slot: u8) -> u32 {
    match spell.upcast {
        Upcast::ExtraProjectilesPerSlot(extra) => {
            spell.projectiles + extra * slot.saturating_sub(spell.level) as u32
        }
        _ => spell.projectiles,
    }
}

/// Target count for a control cast at the given slot.
pub fn effective_targets(spell: &SpellData, slot: u8) -> u32 {
    match spell.upcast {
        Upcast::ExtraTargetsPerSlot(extra) => {
            spell.base_targets + extra * slot.saturating_sub(spell.level) as u32
        }
        _ => spell.base_targets,
    }
}

/// Concentration save DC after taking damage.
pub fn concentration_dc(damage: i32) -> i32 {
    (damage / 2).max(10)
}

/// A concrete casting decision.
#[derive(Debug, Clone)]
pub enum SpellPlan {
    Heal {
        spell: &'static SpellData,
        slot: u8,
        target: usize,
    },
    Area {
        spell: &'static SpellData,
        slot: u8,
        targets: Vec<usize>,
    },
    Control {
        spell: &'static SpellData,
        slot: u8,
        targets: Vec<usize>,
    },
    Damage {
        spell: &'static SpellData,
        slot: u8,
        target: usize,
    },
    Cantrip {
        spell: &'static SpellData,
        target: usize,
    },
}

/// Caster AI. Priority: revive an unconscious ally, then a worthwhile
/// multi-target AOE, then control on the biggest enemy, then guaranteed
/// single-target damage, then a cantrip.
pub fn choose_spell<R: Rng>(
    caster: &Combatant,
    allies: &[(usize, &Combatant)],
    enemies: &[(usize, &Combatant)],
    rng: &mut R,
) -> Option<SpellPlan> {
    let known: Vec<&'static SpellData> = caster
        .config
        .spells
        .iter()
        .filter_map(|name| get_spell(name))
        .collect();

    // 1. Yo-yo healing beats everything.
    if let Some(target) = targeting::select_heal_target(allies) {
        for &spell in &known {
            if spell.healing_dice.is_none() {
                continue;
            }
            if let Some(slot) = caster.slots.lowest_available(spell.level) {
                return Some(SpellPlan::Heal {
                    spell,
                    slot,
                    target,
                });
            }
        }
    }

    // 2. A net-positive multi-target AOE.
    for &spell in &known {
        let Some(shape) = spell.area else { continue };
        let Some(slot) = caster.slots.lowest_available(spell.level) else {
            continue;
        };
        let avg = effective_damage_dice(spell, caster.config.level, slot)
            .map(|d| d.average())
            .unwrap_or(0.0);
        let targets = match shape {
            AoeShape::Sphere => {
                position::select_sphere_targets_with_friendly_fire(enemies, allies, avg)
            }
            AoeShape::Cone => {
                let hit = position::select_cone_targets(enemies);
                (hit.len() >= 2).then_some(hit)
            }
            AoeShape::Line => position::select_line_targets(enemies, rng),
        };
        if let Some(targets) = targets {
            return Some(SpellPlan::Area {
                spell,
                slot,
                targets,
            });
        }
    }

    // 3. Control the highest-HP enemy that isn't already locked down.
    for &spell in &known {
        if !spell.is_control() {
            continue;
        }
        let Some(effect) = spell.applies else { continue };
        let Some(slot) = caster.slots.lowest_available(spell.level) else {
            continue;
        };
        let mut candidates: Vec<_> = enemies
            .iter()
            .filter(|(_, c)| !c.conditions.has(effect.kind))
            .copied()
            .collect();
        if candidates.is_empty() {
            continue;
        }
        candidates.sort_by_key(|(_, c)| std::cmp::Reverse(c.current_hp));
        let count = effective_targets(spell, slot) as usize;
        let targets: Vec<usize> = candidates.iter().take(count).map(|(i, _)| *i).collect();
        return Some(SpellPlan::Control {
            spell,
            slot,
            targets,
        });
    }

    // 4. Guaranteed single-target damage.
    for &spell in &known {
        if !spell.auto_hit {
            continue;
        }
        let Some(slot) = caster.slots.lowest_available(spell.level) else {
            continue;
        };
        if let Some(target) = targeting::select_target(enemies) {
            return Some(SpellPlan::Damage {
                spell,
                slot,
                target,
            });
        }
    }

    // 5. Cantrip fallback.
    for name in &caster.config.cantrips {
        let Some(spell) = get_spell(name) else { continue };
        if spell.damage_dice.is_none() {
            continue;
        }
        if let Some(target) = targeting::select_target(enemies) {
            return Some(SpellPlan::Cantrip { spell, target });
        }
    }

    None
}
