//! Target selection policies.

use crate::combatant::{AttackKind, Combatant};
use crate::position::Position;
use crate::spells;

/// Focus fire: the living enemy with the lowest current HP.
pub fn select_target(enemies: &[(usize, &Combatant)]) -> Option<usize> {
    enemies
        .iter()
        .min_by_key(|(_, c)| c.current_hp)
        .map(|(i, _)| *i)
}

/// Whether a combatant can restore anyone's hit points.
pub fn has_healing(combatant: &Combatant) -> bool {
    if combatant.config.healing_dice.is_some() {
        return true;
    }
    combatant
        .config
        .spells
        .iter()
        .any(|name| spells::get_spell(name).map(|s| s.healing_dice.is_some()).unwrap_or(false))
}

/// Threat score for tactical targeting. Concentrating casters, healers,
/// and soft backline targets float to the top.
pub fn threat_score(combatant: &Combatant) -> i32 {
    let mut score = 0;
    if combatant.is_concentrating() {
        score += 100;
    }
    score += 10 * combatant.slots.total_remaining() as i32;
    if !combatant.config.cantrips.is_empty() {
        score += 20;
    }
    if has_healing(combatant) {
        score += 50;
    }
    score += (50 - combatant.current_hp).max(0);
    if combatant.position == Position::Back {
        score += 15;
    }
    score
}

/// Tactical targeting for smart monsters: the highest threat score wins.
///
/// Melee attackers are held to the front line while it stands; once it
/// collapses (or when the attacker fights at range) every living enemy is
/// in reach.
pub fn select_tactical_target(
    attacker: &Combatant,
    enemies: &[(usize, &Combatant)],
) -> Option<usize> {
    let reaches_back = attacker.config.attack_kind == AttackKind::Ranged;
    let front: Vec<_> = enemies
        .iter()
        .filter(|(_, c)| c.position == Position::Front)
        .copied()
        .collect();
    let candidates = if reaches_back || front.is_empty() {
        enemies
    } else {
        &front
    };
    candidates
        .iter()
        .max_by_key(|(_, c)| threat_score(c))
        .map(|(i, _)| *i)
}

/// Yo-yo healing: only unconscious-but-alive allies are eligible, never a
/// merely wounded conscious one. Ties go to whoever is closest to dying.
pub fn select_heal_target(allies: &[(usize, &Combatant)]) -> Option<usize> {
    allies
        .iter()
        .filter(|(_, c)| c.is_unconscious && !c.is_dead)
        .max_by_key(|(_, c)| c.death_save_failures)
        .map(|(i, _)| *i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::{CombatantConfig, Side};
    use crate::dice::DiceNotation;
    use crate::position::Position;

    fn dice(s: &str) -> DiceNotation {
        DiceNotation::parse(s).unwrap()
    }

    fn combatant(name: &str, hp: i32) -> Combatant {
        let cfg = CombatantConfig::new(name, hp.max(1), 12, 4, dice("1d6+2"))
            .with_position(Position::Front);
        let mut c = Combatant::new(&cfg, Side::Party);
        c.current_hp = hp;
        c
    }

    #[test]
    fn test_focus_fire_picks_lowest_hp() {
        let a = combatant("a", 20);
        let b = combatant("b", 5);
        let c = combatant("c", 12);
        let enemies = vec![(0, &a), (1, &b), (2, &c)];
        assert_eq!(select_target(&enemies), Some(1));
    }

    #[test]
    fn test_tactical_prefers_concentrating_caster() {
        let bruiser = combatant("bruiser", 40);
        let mut caster = combatant("caster", 40);
        caster.concentration = Some("hold person".to_string());
        let attacker = combatant("attacker", 30);
        let enemies = vec![(0, &bruiser), (1, &caster)];
        assert_eq!(select_tactical_target(&attacker, &enemies), Some(1));
    }

    #[test]
    fn test_tactical_melee_held_to_front_line() {
        let front = combatant("front", 40);
        let mut back = combatant("back", 40);
        back.position = Position::Back;
        back.concentration = Some("bless".to_string());
        let attacker = combatant("attacker", 30);
        let enemies = vec![(0, &front), (1, &back)];
        // The juicy target hides behind the front line.
        assert_eq!(select_tactical_target(&attacker, &enemies), Some(0));

        // A ranged attacker reaches it.
        let mut archer_cfg = CombatantConfig::new("archer", 20, 13, 5, dice("1d8+3"));
        archer_cfg.attack_kind = AttackKind::Ranged;
        let archer = Combatant::new(&archer_cfg, Side::Monsters);
        assert_eq!(select_tactical_target(&archer, &enemies), Some(1));
    }

    #[test]
    fn test_heal_target_never_conscious() {
        let wounded = combatant("wounded", 1);
        let healthy = combatant("healthy", 20);
        let allies = vec![(0, &wounded), (1, &healthy)];
        assert_eq!(select_heal_target(&allies), None);
    }

    #[test]
    fn test_heal_target_prefers_most_failures() {
        let mut down_a = combatant("a", 0);
        down_a.is_unconscious = true;
        down_a.death_save_failures = 1;
        let mut down_b = combatant("b", 0);
        down_b.is_unconscious = true;
        down_b.death_save_failures = 2;
        let allies = vec![(0, &down_a), (1, &down_b)];
        assert_eq!(select_heal_target(&allies), Some(1));
    }
}
