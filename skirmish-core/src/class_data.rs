//! Static class feature tables.
//!
//! Pure data consumed by both resource initialization and the class AI, so
//! neither module needs to reach into the other.

use crate::combatant::{Ability, CharacterClass};
use crate::resources::{ResourceKind, ResourcePool, RestKind};

/// Resource pools granted by a class at a given level.
///
/// Bardic Inspiration scales off Charisma, so the bard's modifier is
/// threaded through.
pub fn base_resources(
    class: CharacterClass,
    level: u8,
    charisma_mod: i8,
) -> Vec<(ResourceKind, ResourcePool)> {
    match class {
        CharacterClass::Barbarian => vec![(
            ResourceKind::Rage,
            ResourcePool::new(rages_per_day(level), RestKind::Long),
        )],
        CharacterClass::Fighter => vec![
            (
                ResourceKind::ActionSurge,
                ResourcePool::new(1, RestKind::Short),
            ),
            (
                ResourceKind::SecondWind,
                ResourcePool::new(1, RestKind::Short),
            ),
        ],
        CharacterClass::Monk => {
            if level >= 2 {
                vec![(
                    ResourceKind::Ki,
                    ResourcePool::new(level as u32, RestKind::Short),
                )]
            } else {
                Vec::new()
            }
        }
        CharacterClass::Bard => {
            // Font of Inspiration (level 5+) moves recovery to short rests.
            let rest = if level >= 5 {
                RestKind::Short
            } else {
                RestKind::Long
            };
            vec![(
                ResourceKind::BardicInspiration,
                ResourcePool::new(charisma_mod.max(1) as u32, rest),
            )]
        }
        CharacterClass::Paladin => vec![(
            ResourceKind::LayOnHands,
            ResourcePool::new(5 * level as u32, RestKind::Long),
        )],
        _ => Vec::new(),
    }
}

fn rages_per_day(level: u8) -> u32 {
    match level {
        1..=2 => 2,
        3..=5 => 3,
        6..=11 => 4,
        12..=16 => 5,
        _ => 6,
    }
}

/// Flat melee damage bonus while raging.
pub fn rage_damage_bonus(level: u8) -> i32 {
    match level {
        1..=8 => 2,
        9..=15 => 3,
        _ => 4,
    }
}

/// Sneak attack dice (d6s) at a given rogue level.
pub fn sneak_attack_dice(level: u8) -> u32 {
    (level as u32 + 1) / 2
}

/// Bardic Inspiration die size at a given bard level.
pub fn inspiration_die(level: u8) -> u32 {
    match level {
        1..=4 => 6,
        5..=9 => 8,
        10..=14 => 10,
        _ => 12,
    }
}

/// Proficiency bonus by level.
pub fn proficiency_bonus(level: u8) -> i32 {
    2 + (level.saturating_sub(1) as i32) / 4
}

/// Which ability a class casts with, if it casts at all.
pub fn casting_ability(class: CharacterClass) -> Option<Ability> {
    match class {
        CharacterClass::Bard | CharacterClass::Paladin | CharacterClass::Sorcerer
        | CharacterClass::Warlock => Some(Ability::Charisma),
        CharacterClass::Cleric | CharacterClass::Druid | CharacterClass::Ranger => {
            Some(Ability::Wisdom)
        }
        CharacterClass::Wizard => Some(Ability::Intelligence),
        CharacterClass::Barbarian
        | CharacterClass::Fighter
        | CharacterClass::Monk
        | CharacterClass::Rogue => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_barbarian_rage_pool_scales() {
        let pools = base_resources(CharacterClass::Barbarian, 1, 0);
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].1.max, 2);
        let pools = base_resources(CharacterClass::Barbarian, 12, 0);
        assert_eq!(pools[0].1.max, 5);
    }

    #[test]
    fn test_bard_inspiration_scales_off_charisma() {
        let pools = base_resources(CharacterClass::Bard, 3, 4);
        assert_eq!(pools[0].1.max, 4);
        assert!(matches!(pools[0].1.rest, RestKind::Long));
        // Minimum one use even with a dumped stat.
        let pools = base_resources(CharacterClass::Bard, 1, -1);
        assert_eq!(pools[0].1.max, 1);
        // Font of Inspiration at level 5.
        let pools = base_resources(CharacterClass::Bard, 5, 2);
        assert!(matches!(pools[0].1.rest, RestKind::Short));
    }

    #[test]
    fn test_monk_ki_starts_at_two() {
        assert!(base_resources(CharacterClass::Monk, 1, 0).is_empty());
        let pools = base_resources(CharacterClass::Monk, 6, 0);
        assert_eq!(pools[0].1.max, 6);
    }

    #[test]
    fn test_sneak_attack_progression() {
        assert_eq!(sneak_attack_dice(1), 1);
        assert_eq!(sneak_attack_dice(5), 3);
        assert_eq!(sneak_attack_dice(20), 10);
    }

    #[test]
    fn test_rage_damage_bonus() {
        assert_eq!(rage_damage_bonus(1), 2);
        assert_eq!(rage_damage_bonus(9), 3);
        assert_eq!(rage_damage_bonus(16), 4);
    }

    #[test]
    fn test_proficiency_bonus() {
        assert_eq!(proficiency_bonus(1), 2);
        assert_eq!(proficiency_bonus(5), 3);
        assert_eq!(proficiency_bonus(17), 6);
    }
}
