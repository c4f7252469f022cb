//! Resolution of individual actions: attacks, heals, saves, and spell
//! casts against concrete targets.
//!
//! Functions here operate on the encounter's combatant arena by index so
//! the orchestrator stays a thin state machine.

use crate::class_ai::{self, RiderContext};
use crate::combat_log::{CombatEvent, ConditionEndReason, LogEntry};
use crate::combatant::{Ability, AttackKind, Combatant, DropOutcome};
use crate::conditions::{ActiveCondition, ApplyOutcome};
use crate::damage::{self, DamageKind};
use crate::dice::{self, Advantage, DiceNotation};
use crate::monster::SavePurpose;
use crate::spells::{self, SpellPlan};
use rand::Rng;

/// A single attack to resolve: a weapon swing, an unarmed strike, or one
/// piece of a monster's multiattack routine.
#[derive(Debug, Clone)]
pub struct AttackProfile {
    pub attack_bonus: i32,
    pub damage: DiceNotation,
    pub damage_kind: DamageKind,
    pub kind: AttackKind,
}

impl AttackProfile {
    pub fn for_combatant(combatant: &Combatant) -> Self {
        Self {
            attack_bonus: combatant.config.attack_bonus,
            damage: combatant.config.damage_dice,
            damage_kind: combatant.config.damage_kind,
            kind: combatant.config.attack_kind,
        }
    }
}

/// What a resolved attack did.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttackOutcome {
    pub hit: bool,
    pub critical: bool,
    pub damage: i32,
    pub target_died: bool,
}

pub(crate) fn push(log: &mut Vec<LogEntry>, round: u32, event: CombatEvent) {
    log.push(LogEntry { round, event });
}

fn pair_mut(combatants: &mut [Combatant], a: usize, b: usize) -> (&mut Combatant, &mut Combatant) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = combatants.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = combatants.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

/// Resolve one attack from `attacker_idx` against `target_idx`.
///
/// Natural 1 always misses; natural 20 always hits and crits. Hitting an
/// unconscious target never rolls: it lands automatically and inflicts two
/// death save failures instead of damage.
pub fn attack<R: Rng>(
    combatants: &mut [Combatant],
    attacker_idx: usize,
    target_idx: usize,
    profile: &AttackProfile,
    ally_engaged: bool,
    round: u32,
    log: &mut Vec<LogEntry>,
    rng: &mut R,
) -> AttackOutcome {
    if combatants[target_idx].is_unconscious && !combatants[target_idx].is_dead {
        return coup_de_grace(combatants, attacker_idx, target_idx, round, log);
    }

    let (attacker, target) = pair_mut(combatants, attacker_idx, target_idx);

    let advantage =
        crate::conditions::combined_modifier(&attacker.conditions, &target.conditions, profile.kind);
    let natural = dice::roll_d20(advantage, rng);

    // A granted inspiration die is spent on this roll whether or not it
    // turns out to matter.
    let mut inspiration_bonus = 0;
    if let Some(sides) = attacker.inspiration.take() {
        inspiration_bonus = dice::roll_die(sides, rng) as i32;
        push(
            log,
            round,
            CombatEvent::AbilityUsed {
                name: attacker.name().to_string(),
                ability: "Bardic Inspiration".to_string(),
            },
        );
    }

    let total = natural as i32 + profile.attack_bonus + inspiration_bonus;
    let hit = natural != 1 && (natural == 20 || total >= target.config.armor_class);
    let auto_crit = hit && profile.kind == AttackKind::Melee && target.conditions.auto_crit();
    let critical = natural == 20 || auto_crit;

    let mut outcome = AttackOutcome {
        hit,
        critical,
        ..AttackOutcome::default()
    };

    let mut broken_tag: Option<(String, String)> = None;
    if hit {
        let rider_ctx = RiderContext {
            critical,
            had_advantage: advantage == Advantage::Advantage,
            ally_engaged,
            target_max_hp: target.config.max_hp,
            attack_kind: profile.kind,
        };
        let mut raw = profile.damage.roll_damage(critical, rng);
        for rider in class_ai::damage_riders(attacker, &rider_ctx) {
            if rider.label == "divine smite" {
                push(
                    log,
                    round,
                    CombatEvent::AbilityUsed {
                        name: attacker.name().to_string(),
                        ability: "Divine Smite".to_string(),
                    },
                );
            }
            if let Some(rider_dice) = rider.dice {
                raw += rider_dice.roll_damage(critical, rng);
            }
            raw += rider.flat;
        }

        let mut mitigated = damage::mitigate(
            raw,
            profile.damage_kind,
            &target.config.resistances,
            &target.config.immunities,
            target.rage.is_active(),
        );
        if class_ai::reaction_halves_damage(target) {
            push(
                log,
                round,
                CombatEvent::AbilityUsed {
                    name: target.name().to_string(),
                    ability: "Uncanny Dodge".to_string(),
                },
            );
            mitigated /= 2;
        }

        outcome.damage = mitigated;
        push(
            log,
            round,
            CombatEvent::Attack {
                attacker: attacker.name().to_string(),
                target: target.name().to_string(),
                natural,
                total,
                hit: true,
                critical,
                damage: mitigated,
            },
        );
        broken_tag = apply_damage_effects(target, mitigated, round, log, rng, &mut outcome);
    } else {
        push(
            log,
            round,
            CombatEvent::Attack {
                attacker: attacker.name().to_string(),
                target: target.name().to_string(),
                natural,
                total,
                hit: false,
                critical: false,
                damage: 0,
            },
        );
    }

    if let Some((caster, spell)) = broken_tag {
        sweep_concentration(combatants, &caster, &spell, round, log);
    }
    outcome
}

fn coup_de_grace(
    combatants: &mut [Combatant],
    attacker_idx: usize,
    target_idx: usize,
    round: u32,
    log: &mut Vec<LogEntry>,
) -> AttackOutcome {
    let attacker_name = combatants[attacker_idx].name().to_string();
    let target = &mut combatants[target_idx];
    push(
        log,
        round,
        CombatEvent::CoupDeGrace {
            attacker: attacker_name,
            target: target.name().to_string(),
            failures_added: 2,
        },
    );
    let died = target.add_death_save_failures(2);
    if died {
        push(
            log,
            round,
            CombatEvent::Died {
                name: target.name().to_string(),
            },
        );
    }
    AttackOutcome {
        hit: true,
        critical: false,
        damage: 0,
        target_died: died,
    }
}

/// HP loss plus the follow-on state transitions: dropping, dying, and the
/// concentration check. Returns the concentration tag to sweep when the
/// target's concentration broke.
fn apply_damage_effects<R: Rng>(
    target: &mut Combatant,
    amount: i32,
    round: u32,
    log: &mut Vec<LogEntry>,
    rng: &mut R,
    outcome: &mut AttackOutcome,
) -> Option<(String, String)> {
    if amount <= 0 {
        return None;
    }
    match target.apply_hp_loss(amount) {
        Some(DropOutcome::Downed) => {
            push(
                log,
                round,
                CombatEvent::Downed {
                    name: target.name().to_string(),
                },
            );
            take_concentration(target, round, log)
        }
        Some(DropOutcome::Died) => {
            outcome.target_died = true;
            push(
                log,
                round,
                CombatEvent::Died {
                    name: target.name().to_string(),
                },
            );
            take_concentration(target, round, log)
        }
        None => concentration_check(target, amount, round, log, rng),
    }
}

/// Damage while concentrating forces a Constitution save at
/// DC max(10, damage / 2).
fn concentration_check<R: Rng>(
    target: &mut Combatant,
    damage_taken: i32,
    round: u32,
    log: &mut Vec<LogEntry>,
    rng: &mut R,
) -> Option<(String, String)> {
    target.concentration.as_ref()?;
    let dc = spells::concentration_dc(damage_taken);
    let total = dice::roll_d20(Advantage::Normal, rng) as i32 + target.save_bonus(Ability::Constitution);
    let success = total >= dc;
    push(
        log,
        round,
        CombatEvent::SavingThrow {
            name: target.name().to_string(),
            dc,
            total,
            success,
            source: "concentration".to_string(),
        },
    );
    if success {
        None
    } else {
        take_concentration(target, round, log)
    }
}

/// Drop the target's concentration, logging it. Returns the
/// (caster, spell) pair whose sustained conditions must be swept.
fn take_concentration(
    target: &mut Combatant,
    round: u32,
    log: &mut Vec<LogEntry>,
) -> Option<(String, String)> {
    let spell = target.concentration.take()?;
    push(
        log,
        round,
        CombatEvent::ConcentrationBroken {
            caster: target.name().to_string(),
            spell: spell.clone(),
        },
    );
    Some((target.name().to_string(), spell))
}

/// Remove every condition sustained by the given caster's spell from all
/// combatants.
pub fn sweep_concentration(
    combatants: &mut [Combatant],
    caster: &str,
    spell: &str,
    round: u32,
    log: &mut Vec<LogEntry>,
) {
    let tag = format!("{caster}:{spell}");
    for combatant in combatants.iter_mut() {
        let name = combatant.name().to_string();
        for kind in combatant.conditions.remove_from_source(&tag) {
            push(
                log,
                round,
                CombatEvent::ConditionEnded {
                    target: name.clone(),
                    condition: kind,
                    reason: ConditionEndReason::ConcentrationBroken,
                },
            );
        }
    }
}

/// Roll a saving throw, letting a boss burn a legendary resistance charge
/// to turn a meaningful failure into a success.
pub fn resolve_save<R: Rng>(
    combatants: &mut [Combatant],
    idx: usize,
    ability: Ability,
    dc: i32,
    purpose: SavePurpose,
    source: &str,
    round: u32,
    log: &mut Vec<LogEntry>,
    rng: &mut R,
) -> bool {
    let combatant = &mut combatants[idx];
    let total = dice::roll_d20(Advantage::Normal, rng) as i32 + combatant.save_bonus(ability);
    let mut success = total >= dc;
    push(
        log,
        round,
        CombatEvent::SavingThrow {
            name: combatant.name().to_string(),
            dc,
            total,
            success,
            source: source.to_string(),
        },
    );
    if !success
        && crate::monster::should_use_legendary_resistance(
            combatant.legendary_resistances_remaining,
            purpose,
        )
    {
        combatant.legendary_resistances_remaining -= 1;
        success = true;
        push(
            log,
            round,
            CombatEvent::LegendaryResistance {
                name: combatant.name().to_string(),
                charges_remaining: combatant.legendary_resistances_remaining,
            },
        );
    }
    success
}

/// Non-spell healing (a healer's touch). Reviving is the whole point: the
/// heal target policy only ever picks unconscious allies.
pub fn heal_action<R: Rng>(
    combatants: &mut [Combatant],
    healer_idx: usize,
    target_idx: usize,
    healing: DiceNotation,
    round: u32,
    log: &mut Vec<LogEntry>,
    rng: &mut R,
) {
    let (healer, target) = pair_mut(combatants, healer_idx, target_idx);
    let was_unconscious = target.is_unconscious;
    let amount = target.heal(healing.roll(rng).max(1));
    push(
        log,
        round,
        CombatEvent::Heal {
            healer: healer.name().to_string(),
            target: target.name().to_string(),
            amount,
        },
    );
    if was_unconscious && target.is_active() {
        push(
            log,
            round,
            CombatEvent::Revived {
                name: target.name().to_string(),
            },
        );
    }
}

/// Apply already-rolled spell damage to one target: mitigation, the
/// damage-while-down rule, drop transitions, and the target's own
/// concentration check. Returns a concentration sweep request if one arose.
#[allow(clippy::too_many_arguments)]
fn apply_spell_damage<R: Rng>(
    target: &mut Combatant,
    caster_name: &str,
    spell_name: &str,
    amount: i32,
    kind: DamageKind,
    saved: bool,
    round: u32,
    log: &mut Vec<LogEntry>,
    rng: &mut R,
) -> Option<(String, String)> {
    let mitigated = damage::mitigate(
        amount,
        kind,
        &target.config.resistances,
        &target.config.immunities,
        target.rage.is_active(),
    );
    push(
        log,
        round,
        CombatEvent::SpellDamage {
            caster: caster_name.to_string(),
            spell: spell_name.to_string(),
            target: target.name().to_string(),
            damage: mitigated,
            kind,
            saved,
        },
    );
    if target.is_unconscious && !target.is_dead {
        // Damage while down is a death save failure, not hit points.
        if mitigated > 0 {
            let died = target.add_death_save_failures(1);
            push(
                log,
                round,
                CombatEvent::CoupDeGrace {
                    attacker: caster_name.to_string(),
                    target: target.name().to_string(),
                    failures_added: 1,
                },
            );
            if died {
                push(
                    log,
                    round,
                    CombatEvent::Died {
                        name: target.name().to_string(),
                    },
                );
            }
        }
        return None;
    }
    let mut outcome = AttackOutcome::default();
    apply_damage_effects(target, mitigated, round, log, rng, &mut outcome)
}

/// Execute a casting decision.
pub fn cast_spell<R: Rng>(
    combatants: &mut [Combatant],
    caster_idx: usize,
    plan: &SpellPlan,
    round: u32,
    log: &mut Vec<LogEntry>,
    rng: &mut R,
) {
    match plan {
        SpellPlan::Heal {
            spell,
            slot,
            target,
        } => {
            let healing = spells::effective_healing_dice(spell, *slot)
                .unwrap_or(DiceNotation {
                    count: 1,
                    sides: 4,
                    modifier: 0,
                });
            let bonus = combatants[caster_idx].casting_mod();
            log_cast(combatants, caster_idx, spell.name, *slot, &[*target], round, log);
            combatants[caster_idx].slots.use_slot(*slot);

            let (caster, target) = pair_mut(combatants, caster_idx, *target);
            let was_unconscious = target.is_unconscious;
            let amount = target.heal((healing.roll(rng) + bonus).max(1));
            push(
                log,
                round,
                CombatEvent::Heal {
                    healer: caster.name().to_string(),
                    target: target.name().to_string(),
                    amount,
                },
            );
            if was_unconscious && target.is_active() {
                push(
                    log,
                    round,
                    CombatEvent::Revived {
                        name: target.name().to_string(),
                    },
                );
            }
        }
        SpellPlan::Area {
            spell,
            slot,
            targets,
        } => {
            log_cast(combatants, caster_idx, spell.name, *slot, targets, round, log);
            combatants[caster_idx].slots.use_slot(*slot);
            let caster_name = combatants[caster_idx].name().to_string();
            let caster_level = combatants[caster_idx].config.level;
            let dc = combatants[caster_idx].spell_save_dc();

            let rolled = spells::effective_damage_dice(spell, caster_level, *slot)
                .map(|d| d.roll(rng))
                .unwrap_or(0);
            let kind = spell.damage_kind.unwrap_or(DamageKind::Force);

            let mut sweeps = Vec::new();
            for &target_idx in targets {
                if !combatants[target_idx].is_alive() {
                    continue;
                }
                let (saved, amount) = match spell.save {
                    Some(save) => {
                        let max_hp = combatants[target_idx].config.max_hp;
                        let success = resolve_save(
                            combatants,
                            target_idx,
                            save.ability,
                            dc,
                            SavePurpose::Damage {
                                amount: rolled,
                                max_hp,
                            },
                            spell.name,
                            round,
                            log,
                            rng,
                        );
                        match (success, save.effect) {
                            (true, spells::SaveEffect::Half) => (true, rolled / 2),
                            (true, spells::SaveEffect::Negates) => (true, 0),
                            (false, _) => (false, rolled),
                        }
                    }
                    None => (false, rolled),
                };
                if let Some(sweep) = apply_spell_damage(
                    &mut combatants[target_idx],
                    &caster_name,
                    spell.name,
                    amount,
                    kind,
                    saved,
                    round,
                    log,
                    rng,
                ) {
                    sweeps.push(sweep);
                }
            }
            for (caster, spell_name) in sweeps {
                sweep_concentration(combatants, &caster, &spell_name, round, log);
            }
        }
        SpellPlan::Control {
            spell,
            slot,
            targets,
        } => {
            log_cast(combatants, caster_idx, spell.name, *slot, targets, round, log);
            combatants[caster_idx].slots.use_slot(*slot);

            // A new concentration spell displaces the old one.
            if let Some((caster, old_spell)) = take_concentration(&mut combatants[caster_idx], round, log)
            {
                sweep_concentration(combatants, &caster, &old_spell, round, log);
            }

            let caster_name = combatants[caster_idx].name().to_string();
            let dc = combatants[caster_idx].spell_save_dc();
            let Some(effect) = spell.applies else { return };
            let tag = format!("{}:{}", caster_name, spell.name);

            let mut any_held = false;
            for &target_idx in targets {
                if !combatants[target_idx].is_alive() {
                    continue;
                }
                let save = spell.save.map(|s| s.ability).unwrap_or(Ability::Wisdom);
                let success = resolve_save(
                    combatants,
                    target_idx,
                    save,
                    dc,
                    SavePurpose::Condition(effect.kind),
                    spell.name,
                    round,
                    log,
                    rng,
                );
                if success {
                    continue;
                }
                let mut condition = ActiveCondition::new(effect.kind, tag.clone());
                if let Some(duration) = effect.duration {
                    condition = condition.with_duration(duration);
                }
                if effect.save_ends {
                    condition = condition.with_save(save, dc);
                }
                let target = &mut combatants[target_idx];
                let applied = target
                    .conditions
                    .apply(condition, &target.config.condition_immunities);
                if applied != ApplyOutcome::Immune {
                    any_held = true;
                    push(
                        log,
                        round,
                        CombatEvent::ConditionApplied {
                            target: target.name().to_string(),
                            condition: effect.kind,
                            source: tag.clone(),
                        },
                    );
                }
            }
            if any_held && spell.concentration {
                combatants[caster_idx].concentration = Some(spell.name.to_string());
            }
        }
        SpellPlan::Damage {
            spell,
            slot,
            target,
        } => {
            log_cast(combatants, caster_idx, spell.name, *slot, &[*target], round, log);
            combatants[caster_idx].slots.use_slot(*slot);
            let caster_name = combatants[caster_idx].name().to_string();
            let kind = spell.damage_kind.unwrap_or(DamageKind::Force);

            let darts = spells::effective_projectiles(spell, *slot);
            let total: i32 = (0..darts)
                .map(|_| spell.damage_dice.map(|d| d.roll(rng)).unwrap_or(0))
                .sum();
            if let Some(sweep) = apply_spell_damage(
                &mut combatants[*target],
                &caster_name,
                spell.name,
                total,
                kind,
                false,
                round,
                log,
                rng,
            ) {
                sweep_concentration(combatants, &sweep.0, &sweep.1, round, log);
            }
        }
        SpellPlan::Cantrip { spell, target } => {
            log_cast(combatants, caster_idx, spell.name, 0, &[*target], round, log);
            let caster_name = combatants[caster_idx].name().to_string();
            let caster_level = combatants[caster_idx].config.level;
            let kind = spell.damage_kind.unwrap_or(DamageKind::Force);
            let rolled = spells::effective_damage_dice(spell, caster_level, 0)
                .map(|d| d.roll(rng))
                .unwrap_or(0);

            let mut result: Option<(bool, i32)> = None;
            if spell.attack_roll {
                let (caster, victim) = pair_mut(combatants, caster_idx, *target);
                let advantage = crate::conditions::combined_modifier(
                    &caster.conditions,
                    &victim.conditions,
                    AttackKind::Ranged,
                );
                let natural = dice::roll_d20(advantage, rng);
                let total = natural as i32 + caster.spell_attack_bonus();
                let hit = natural != 1 && (natural == 20 || total >= victim.config.armor_class);
                let critical = natural == 20;
                if hit {
                    let damage = if critical {
                        rolled
                            + spells::effective_damage_dice(spell, caster_level, 0)
                                .map(|d| d.roll(rng))
                                .unwrap_or(0)
                    } else {
                        rolled
                    };
                    result = Some((false, damage));
                }
                push(
                    log,
                    round,
                    CombatEvent::Attack {
                        attacker: caster.name().to_string(),
                        target: victim.name().to_string(),
                        natural,
                        total,
                        hit,
                        critical,
                        damage: 0,
                    },
                );
            } else if let Some(save) = spell.save {
                let dc = combatants[caster_idx].spell_save_dc();
                let max_hp = combatants[*target].config.max_hp;
                let success = resolve_save(
                    combatants,
                    *target,
                    save.ability,
                    dc,
                    SavePurpose::Damage {
                        amount: rolled,
                        max_hp,
                    },
                    spell.name,
                    round,
                    log,
                    rng,
                );
                result = match (success, save.effect) {
                    (true, spells::SaveEffect::Negates) => None,
                    (true, spells::SaveEffect::Half) => Some((true, rolled / 2)),
                    (false, _) => Some((false, rolled)),
                };
            } else {
                result = Some((false, rolled));
            }

            if let Some((saved, amount)) = result {
                if let Some(sweep) = apply_spell_damage(
                    &mut combatants[*target],
                    &caster_name,
                    spell.name,
                    amount,
                    kind,
                    saved,
                    round,
                    log,
                    rng,
                ) {
                    sweep_concentration(combatants, &sweep.0, &sweep.1, round, log);
                }
            }
        }
    }
}

/// Shared resolution for monster area abilities (breath weapons, sweeping
/// legendary actions): one damage roll, then a save for half per target.
#[allow(clippy::too_many_arguments)]
pub fn area_damage_ability<R: Rng>(
    combatants: &mut [Combatant],
    user_idx: usize,
    name: &str,
    damage_dice: DiceNotation,
    kind: DamageKind,
    save_ability: Ability,
    dc: i32,
    targets: &[usize],
    round: u32,
    log: &mut Vec<LogEntry>,
    rng: &mut R,
) {
    let user_name = combatants[user_idx].name().to_string();
    let rolled = damage_dice.roll(rng);
    let mut sweeps = Vec::new();
    for &target_idx in targets {
        if !combatants[target_idx].is_alive() {
            continue;
        }
        let max_hp = combatants[target_idx].config.max_hp;
        let success = resolve_save(
            combatants,
            target_idx,
            save_ability,
            dc,
            SavePurpose::Damage {
                amount: rolled,
                max_hp,
            },
            name,
            round,
            log,
            rng,
        );
        let amount = if success { rolled / 2 } else { rolled };
        if let Some(sweep) = apply_spell_damage(
            &mut combatants[target_idx],
            &user_name,
            name,
            amount,
            kind,
            success,
            round,
            log,
            rng,
        ) {
            sweeps.push(sweep);
        }
    }
    for (caster, spell) in sweeps {
        sweep_concentration(combatants, &caster, &spell, round, log);
    }
}

fn log_cast(
    combatants: &[Combatant],
    caster_idx: usize,
    spell: &str,
    slot: u8,
    targets: &[usize],
    round: u32,
    log: &mut Vec<LogEntry>,
) {
    push(
        log,
        round,
        CombatEvent::SpellCast {
            caster: combatants[caster_idx].name().to_string(),
            spell: spell.to_string(),
            slot,
            targets: targets
                .iter()
                .map(|&i| combatants[i].name().to_string())
                .collect(),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::{CharacterClass, CombatantConfig, Side};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn dn(count: u32, sides: u32, modifier: i32) -> DiceNotation {
        DiceNotation {
            count,
            sides,
            modifier,
        }
    }

    fn fighter() -> Combatant {
        let cfg = CombatantConfig::new("Aldric", 24, 14, 5, dn(1, 8, 3))
            .player()
            .with_class(CharacterClass::Fighter, 3);
        Combatant::new(&cfg, Side::Party)
    }

    fn orc() -> Combatant {
        let cfg = CombatantConfig::new("Orc", 15, 13, 5, dn(1, 12, 3));
        Combatant::new(&cfg, Side::Monsters)
    }

    #[test]
    fn test_attack_hp_stays_in_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut log = Vec::new();
        let mut arena = vec![fighter(), orc()];
        for _ in 0..50 {
            if !arena[1].is_alive() {
                break;
            }
            let profile = AttackProfile::for_combatant(&arena[0]);
            attack(&mut arena, 0, 1, &profile, false, 1, &mut log, &mut rng);
            assert!(arena[1].current_hp >= 0);
            assert!(arena[1].current_hp <= arena[1].config.max_hp);
        }
    }

    #[test]
    fn test_attack_on_unconscious_adds_two_failures() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut log = Vec::new();
        let mut arena = vec![fighter(), orc()];
        arena[0].apply_hp_loss(100);
        assert!(arena[0].is_unconscious);

        let profile = AttackProfile::for_combatant(&arena[1]);
        let outcome = attack(&mut arena, 1, 0, &profile, false, 1, &mut log, &mut rng);
        assert!(outcome.hit);
        assert_eq!(arena[0].death_save_failures, 2);
        assert!(!arena[0].is_dead);

        let outcome = attack(&mut arena, 1, 0, &profile, false, 1, &mut log, &mut rng);
        assert!(outcome.target_died);
        assert!(arena[0].is_dead);
    }

    #[test]
    fn test_monster_dies_from_attrition() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut log = Vec::new();
        let mut arena = vec![fighter(), orc()];
        let profile = AttackProfile::for_combatant(&arena[0]);
        let mut died = false;
        for _ in 0..100 {
            let outcome = attack(&mut arena, 0, 1, &profile, false, 1, &mut log, &mut rng);
            if outcome.target_died {
                died = true;
                break;
            }
        }
        assert!(died);
        assert!(arena[1].is_dead);
        assert!(!arena[1].is_unconscious);
    }

    #[test]
    fn test_concentration_breaks_and_sweeps() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut log = Vec::new();
        let mut caster = fighter();
        caster.concentration = Some("hold person".to_string());
        let mut held = orc();
        held.conditions.apply(
            ActiveCondition::new(
                crate::conditions::ConditionKind::Paralyzed,
                "Aldric:hold person",
            ),
            &[],
        );
        let mut arena = vec![caster, held];

        // Hammer the caster until a failed save (or going down) breaks it.
        let profile = AttackProfile {
            attack_bonus: 50,
            damage: dn(2, 6, 30),
            damage_kind: DamageKind::Bludgeoning,
            kind: AttackKind::Melee,
        };
        let mut broke = false;
        for _ in 0..10 {
            attack(&mut arena, 1, 0, &profile, false, 1, &mut log, &mut rng);
            if arena[0].concentration.is_none() {
                broke = true;
                break;
            }
        }
        assert!(broke);
        assert!(!arena[1].conditions.has(crate::conditions::ConditionKind::Paralyzed));
    }

    #[test]
    fn test_heal_action_revives() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut log = Vec::new();
        let mut arena = vec![fighter(), fighter()];
        arena[1].apply_hp_loss(100);
        assert!(arena[1].is_unconscious);
        heal_action(&mut arena, 0, 1, dn(1, 8, 3), 1, &mut log, &mut rng);
        assert!(arena[1].is_active());
        assert!(arena[1].current_hp > 0);
        assert_eq!(arena[1].death_save_failures, 0);
    }

    #[test]
    fn test_magic_missile_never_misses() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut log = Vec::new();
        let cfg = CombatantConfig::new("Mira", 18, 12, 2, dn(1, 4, 0))
            .player()
            .with_class(CharacterClass::Wizard, 5)
            .with_spells(vec!["magic missile".into()], vec![])
            .with_spell_slots([4, 0, 0, 0, 0, 0, 0, 0, 0]);
        let mut arena = vec![Combatant::new(&cfg, Side::Party), orc()];
        let spell = spells::get_spell("magic missile").unwrap();
        let plan = SpellPlan::Damage {
            spell,
            slot: 1,
            target: 1,
        };
        let before = arena[1].current_hp;
        cast_spell(&mut arena, 0, &plan, 1, &mut log, &mut rng);
        assert!(arena[1].current_hp < before);
        assert_eq!(arena[0].slots.available(1), 3);
    }
}
