//! Abstract battlefield positioning and AOE target selection.
//!
//! The battlefield is reduced to two spatial buckets per encounter: a
//! shared front line where melee happens, and a back line for each side's
//! ranged combatants and casters. AOE shapes select whole buckets (or
//! slices of them) instead of tracking real geometry.

use crate::combatant::{AttackKind, Combatant, CombatantConfig};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Front or back line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Front,
    Back,
}

/// Where a combatant stands when the config doesn't say.
///
/// Explicit position always wins. Ranged attackers hang back. A caster with
/// no melee presence (knows spells or cantrips, heals nobody by touch, and
/// swings poorly) also hangs back. Everyone else holds the front.
pub fn infer_position(config: &CombatantConfig) -> Position {
    if let Some(position) = config.position {
        return position;
    }
    if config.attack_kind == AttackKind::Ranged {
        return Position::Back;
    }
    let is_caster = !config.spells.is_empty() || !config.cantrips.is_empty();
    if is_caster && config.healing_dice.is_none() && config.attack_bonus < 4 {
        return Position::Back;
    }
    Position::Front
}

/// Area-of-effect shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AoeShape {
    Sphere,
    Cone,
    Line,
}

fn bucket<'a>(
    members: &[(usize, &'a Combatant)],
    position: Position,
) -> Vec<(usize, &'a Combatant)> {
    members
        .iter()
        .filter(|(_, c)| c.position == position)
        .copied()
        .collect()
}

/// Sphere placement without friendly-fire evaluation: drop it on the enemy
/// bucket with more members. Not worthwhile under two targets.
pub fn select_sphere_targets(enemies: &[(usize, &Combatant)]) -> Option<Vec<usize>> {
    let front = bucket(enemies, Position::Front);
    let back = bucket(enemies, Position::Back);
    let chosen = if front.len() >= back.len() { front } else { back };
    if chosen.len() >= 2 {
        Some(chosen.into_iter().map(|(i, _)| i).collect())
    } else {
        None
    }
}

/// Sphere placement with friendly fire. The front line is shared, so a
/// sphere dropped there catches allies standing in the melee; the enemy
/// back line is spatially separate from ours and catches none.
///
/// Per-bucket net value is Σmin(enemy hp, avg damage) minus twice
/// Σmin(ally hp, avg damage). Casting requires a bucket with positive net
/// value and at least two enemies; the higher-value bucket wins.
pub fn select_sphere_targets_with_friendly_fire(
    enemies: &[(usize, &Combatant)],
    allies: &[(usize, &Combatant)],
    avg_damage: f64,
) -> Option<Vec<usize>> {
    let mut best: Option<(f64, Vec<usize>)> = None;
    for position in [Position::Front, Position::Back] {
        let enemy_bucket = bucket(enemies, position);
        if enemy_bucket.len() < 2 {
            continue;
        }
        let ally_bucket = match position {
            Position::Front => bucket(allies, Position::Front),
            Position::Back => Vec::new(),
        };
        let enemy_value: f64 = enemy_bucket
            .iter()
            .map(|(_, c)| (c.current_hp as f64).min(avg_damage))
            .sum();
        let ally_penalty: f64 = ally_bucket
            .iter()
            .map(|(_, c)| (c.current_hp as f64).min(avg_damage))
            .sum();
        let net = enemy_value - 2.0 * ally_penalty;
        if net <= 0.0 {
            continue;
        }
        let indices: Vec<usize> = enemy_bucket
            .iter()
            .map(|(i, _)| *i)
            .chain(ally_bucket.iter().map(|(i, _)| *i))
            .collect();
        if best.as_ref().map(|(v, _)| net > *v).unwrap_or(true) {
            best = Some((net, indices));
        }
    }
    best.map(|(_, indices)| indices)
}

/// A cone sweeps the entire enemy front line. With nobody up front it clips
/// exactly one back-line target.
pub fn select_cone_targets(enemies: &[(usize, &Combatant)]) -> Vec<usize> {
    let front = bucket(enemies, Position::Front);
    if !front.is_empty() {
        return front.into_iter().map(|(i, _)| i).collect();
    }
    bucket(enemies, Position::Back)
        .first()
        .map(|(i, _)| vec![*i])
        .unwrap_or_default()
}

/// A line punches through the formation, hitting one random target from
/// each non-empty enemy bucket. Not worthwhile under two total targets.
pub fn select_line_targets<R: Rng>(
    enemies: &[(usize, &Combatant)],
    rng: &mut R,
) -> Option<Vec<usize>> {
    let mut targets = Vec::new();
    for position in [Position::Front, Position::Back] {
        let members = bucket(enemies, position);
        if !members.is_empty() {
            let pick = members[rng.gen_range(0..members.len())].0;
            targets.push(pick);
        }
    }
    if targets.len() >= 2 {
        Some(targets)
    } else {
        None
    }
}
