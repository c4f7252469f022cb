//! The per-encounter turn and round state machine.
//!
//! One `Encounter` owns a freshly-built combatant arena, runs it to
//! completion in fixed initiative order, and produces an immutable result
//! with the full event log.

use crate::actions::{self, AttackProfile};
use crate::class_ai::{self, ClassAction, TurnContext};
use crate::combat_log::{CombatEvent, ConditionEndReason, LogEntry};
use crate::combatant::{Ability, Combatant, CombatantConfig, ConfigError, Side};
use crate::conditions::{ActiveCondition, ConditionKind};
use crate::dice::{self, Advantage};
use crate::monster::{self, SavePurpose};
use crate::position::AoeShape;
use crate::resources::ResourceKind;
use crate::spells;
use crate::targeting;
use log::{debug, trace};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Safety valve against encounters that can never resolve.
pub const MAX_ROUNDS: u32 = 100;

/// Error type for starting an encounter.
#[derive(Debug, Error)]
pub enum EncounterError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("both sides must field at least one combatant")]
    EmptySide,
}

/// The outcome of one completed encounter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub id: u32,
    pub party_won: bool,
    pub total_rounds: u32,
    pub surviving_party: Vec<String>,
    pub surviving_monsters: Vec<String>,
    pub log: Vec<LogEntry>,
}

/// One combat encounter, run to completion.
pub struct Encounter {
    id: u32,
    combatants: Vec<Combatant>,
    order: Vec<usize>,
    log: Vec<LogEntry>,
}

fn living_on_side(combatants: &[Combatant], side: Side) -> Vec<(usize, &Combatant)> {
    combatants
        .iter()
        .enumerate()
        .filter(|(_, c)| c.side == side && c.is_alive())
        .collect()
}

fn side_alive(combatants: &[Combatant], side: Side) -> bool {
    combatants.iter().any(|c| c.side == side && c.is_alive())
}

impl Encounter {
    /// Validate the configuration records and build the arena.
    pub fn new(
        party: &[CombatantConfig],
        monsters: &[CombatantConfig],
        id: u32,
    ) -> Result<Self, EncounterError> {
        if party.is_empty() || monsters.is_empty() {
            return Err(EncounterError::EmptySide);
        }
        for config in party.iter().chain(monsters) {
            config.validate()?;
        }
        let mut combatants = Vec::with_capacity(party.len() + monsters.len());
        combatants.extend(party.iter().map(|c| Combatant::new(c, Side::Party)));
        combatants.extend(monsters.iter().map(|c| Combatant::new(c, Side::Monsters)));
        Ok(Self {
            id,
            combatants,
            order: Vec::new(),
            log: Vec::new(),
        })
    }

    /// Run the encounter to completion.
    pub fn run<R: Rng>(mut self, rng: &mut R) -> SimulationResult {
        self.roll_initiative(rng);
        self.push(0, CombatEvent::CombatStart);

        let mut rounds_fought = 0;
        'combat: for round in 1..=MAX_ROUNDS {
            rounds_fought = round;
            self.push(round, CombatEvent::RoundStart);
            for combatant in self.combatants.iter_mut().filter(|c| c.is_alive()) {
                combatant.begin_round();
            }

            for turn in 0..self.order.len() {
                let idx = self.order[turn];
                if !side_alive(&self.combatants, Side::Party)
                    || !side_alive(&self.combatants, Side::Monsters)
                {
                    break 'combat;
                }
                self.take_turn(idx, round, rng);

                // Boss-tier monsters spend legendary actions between the
                // normal turns of their enemies.
                if self.combatants[idx].side == Side::Party {
                    self.legendary_reactions(round, rng);
                }
            }

            if !side_alive(&self.combatants, Side::Party)
                || !side_alive(&self.combatants, Side::Monsters)
            {
                break;
            }
            self.end_of_round(round);
        }

        self.finish(rounds_fought)
    }

    fn push(&mut self, round: u32, event: CombatEvent) {
        self.log.push(LogEntry { round, event });
    }

    /// One d20 + bonus per combatant, rolled once. Ties break players
    /// first, then by name, and the order is fixed for the whole encounter.
    fn roll_initiative<R: Rng>(&mut self, rng: &mut R) {
        let mut totals = vec![0i32; self.combatants.len()];
        for (idx, combatant) in self.combatants.iter().enumerate() {
            let roll = dice::roll_die(20, rng);
            let total = roll as i32 + combatant.config.initiative_bonus;
            totals[idx] = total;
            self.log.push(LogEntry {
                round: 0,
                event: CombatEvent::Initiative {
                    name: combatant.name().to_string(),
                    roll,
                    total,
                },
            });
        }
        self.order = (0..self.combatants.len()).collect();
        let combatants = &self.combatants;
        self.order.sort_by(|&a, &b| {
            totals[b]
                .cmp(&totals[a])
                .then_with(|| combatants[b].is_player().cmp(&combatants[a].is_player()))
                .then_with(|| combatants[a].name().cmp(combatants[b].name()))
        });
    }

    fn take_turn<R: Rng>(&mut self, idx: usize, round: u32, rng: &mut R) {
        if self.combatants[idx].is_dead {
            return;
        }
        self.combatants[idx].begin_turn();

        if self.combatants[idx].is_unconscious {
            if self.combatants[idx].is_stabilized {
                return;
            }
            let revived = self.roll_death_save(idx, round, rng);
            if !revived {
                return;
            }
            // A natural 20 puts them back on their feet mid-turn.
        }

        if !self.combatants[idx].conditions.can_act() {
            trace!("{} is held and loses the turn", self.combatants[idx].name());
            self.end_of_turn_saves(idx, round, rng);
            return;
        }

        let mut routines = 1u32;
        let mut flurry = false;
        if let Some(action) = self.decide_class_action(idx) {
            match action {
                ClassAction::EnterRage => self.enter_rage(idx, round),
                ClassAction::ActionSurge => {
                    if self.combatants[idx]
                        .resources
                        .consume(ResourceKind::ActionSurge, 1)
                    {
                        routines = 2;
                        self.spend_log(idx, round, ResourceKind::ActionSurge, 1);
                    }
                }
                ClassAction::SecondWind => self.second_wind(idx, round, rng),
                ClassAction::FlurryOfBlows => flurry = true,
                ClassAction::Inspire { ally } => self.inspire(idx, ally, round),
            }
        }

        // Casters run the spell AI; everyone else heals a downed ally or
        // swings. A caster with nothing worth casting still swings.
        if self.cast_best_spell(idx, round, rng) {
            self.end_of_turn_saves(idx, round, rng);
            return;
        }

        if self.heal_downed_ally(idx, round, rng) {
            self.end_of_turn_saves(idx, round, rng);
            return;
        }

        if self.combatants[idx].side == Side::Monsters {
            self.monster_turn(idx, routines, round, rng);
        } else {
            self.attack_routine(idx, routines, flurry, round, rng);
        }
        self.end_of_turn_saves(idx, round, rng);
    }

    /// Returns `true` when a natural 20 revives the combatant.
    fn roll_death_save<R: Rng>(&mut self, idx: usize, round: u32, rng: &mut R) -> bool {
        let roll = dice::roll_die(20, rng);
        let combatant = &mut self.combatants[idx];
        let mut revived = false;
        let mut died = false;
        let mut stabilized = false;
        match roll {
            20 => {
                combatant.revive_at_one_hp();
                revived = true;
            }
            1 => died = combatant.add_death_save_failures(2),
            10..=19 => stabilized = combatant.add_death_save_success(),
            _ => died = combatant.add_death_save_failures(1),
        }
        let name = combatant.name().to_string();
        let (successes, failures) = (combatant.death_save_successes, combatant.death_save_failures);
        self.push(
            round,
            CombatEvent::DeathSave {
                name: name.clone(),
                roll,
                successes,
                failures,
            },
        );
        if revived {
            self.push(round, CombatEvent::Revived { name });
        } else if died {
            self.push(round, CombatEvent::Died { name });
        } else if stabilized {
            self.push(round, CombatEvent::Stabilized { name });
        }
        revived
    }

    fn decide_class_action(&self, idx: usize) -> Option<ClassAction> {
        let combatant = &self.combatants[idx];
        let enemies = living_on_side(&self.combatants, combatant.side.opponent());
        let inspire_candidate = self.inspire_candidate(idx);
        let ctx = TurnContext {
            living_enemies: enemies.len(),
            inspire_candidate,
        };
        class_ai::decide(combatant, &ctx)
    }

    /// The ally who makes the best use of an inspiration die: the hardest
    /// hitter who doesn't already hold one.
    fn inspire_candidate(&self, bard_idx: usize) -> Option<usize> {
        let side = self.combatants[bard_idx].side;
        self.combatants
            .iter()
            .enumerate()
            .filter(|(i, c)| {
                *i != bard_idx && c.side == side && c.is_active() && c.inspiration.is_none()
            })
            .max_by_key(|(_, c)| c.config.attack_bonus)
            .map(|(i, _)| i)
    }

    fn enter_rage(&mut self, idx: usize, round: u32) {
        let combatant = &mut self.combatants[idx];
        if combatant.rage.enter(&mut combatant.resources) {
            let name = combatant.name().to_string();
            self.push(round, CombatEvent::RageStarted { name });
            self.spend_log(idx, round, ResourceKind::Rage, 1);
        }
    }

    fn second_wind<R: Rng>(&mut self, idx: usize, round: u32, rng: &mut R) {
        if !self.combatants[idx]
            .resources
            .consume(ResourceKind::SecondWind, 1)
        {
            return;
        }
        self.spend_log(idx, round, ResourceKind::SecondWind, 1);
        let combatant = &mut self.combatants[idx];
        let level = combatant.config.level as i32;
        let healed = combatant.heal(dice::roll_die(10, rng) as i32 + level);
        let name = combatant.name().to_string();
        self.push(
            round,
            CombatEvent::Heal {
                healer: name.clone(),
                target: name,
                amount: healed,
            },
        );
    }

    fn inspire(&mut self, bard_idx: usize, ally_idx: usize, round: u32) {
        if !self.combatants[bard_idx]
            .resources
            .consume(ResourceKind::BardicInspiration, 1)
        {
            return;
        }
        self.spend_log(bard_idx, round, ResourceKind::BardicInspiration, 1);
        let sides = crate::class_data::inspiration_die(self.combatants[bard_idx].config.level);
        self.combatants[ally_idx].inspiration = Some(sides);
        self.push(
            round,
            CombatEvent::AbilityUsed {
                name: self.combatants[bard_idx].name().to_string(),
                ability: "Bardic Inspiration".to_string(),
            },
        );
    }

    fn spend_log(&mut self, idx: usize, round: u32, resource: ResourceKind, amount: u32) {
        self.push(
            round,
            CombatEvent::ResourceSpent {
                name: self.combatants[idx].name().to_string(),
                resource: resource.name().to_string(),
                amount,
            },
        );
    }

    /// Run the caster AI. Returns `true` when a spell was cast.
    fn cast_best_spell<R: Rng>(&mut self, idx: usize, round: u32, rng: &mut R) -> bool {
        let caster = &self.combatants[idx];
        if caster.config.spells.is_empty() && caster.config.cantrips.is_empty() {
            return false;
        }
        let plan = {
            let allies = living_on_side(&self.combatants, caster.side);
            let enemies = living_on_side(&self.combatants, caster.side.opponent());
            spells::choose_spell(caster, &allies, &enemies, rng)
        };
        match plan {
            Some(plan) => {
                actions::cast_spell(&mut self.combatants, idx, &plan, round, &mut self.log, rng);
                true
            }
            None => false,
        }
    }

    /// Yo-yo healing with the healer's own dice, or a paladin's Lay on
    /// Hands pool. Returns `true` when a heal happened (it replaces the
    /// attack action).
    fn heal_downed_ally<R: Rng>(&mut self, idx: usize, round: u32, rng: &mut R) -> bool {
        let healing = self.combatants[idx].config.healing_dice;
        let lay_on_hands = self.combatants[idx]
            .resources
            .available(ResourceKind::LayOnHands);
        if healing.is_none() && lay_on_hands == 0 {
            return false;
        }
        let target = {
            let allies = living_on_side(&self.combatants, self.combatants[idx].side);
            targeting::select_heal_target(&allies)
        };
        let Some(target) = target else { return false };

        if let Some(healing) = healing {
            actions::heal_action(
                &mut self.combatants,
                idx,
                target,
                healing,
                round,
                &mut self.log,
                rng,
            );
            return true;
        }

        // Lay on Hands: pour up to ten points from the pool into the ally.
        let amount = lay_on_hands.min(10);
        if !self.combatants[idx]
            .resources
            .consume(ResourceKind::LayOnHands, amount)
        {
            return false;
        }
        self.spend_log(idx, round, ResourceKind::LayOnHands, amount);
        let healer_name = self.combatants[idx].name().to_string();
        let healed = self.combatants[target].heal(amount as i32);
        let target_name = self.combatants[target].name().to_string();
        self.push(
            round,
            CombatEvent::Heal {
                healer: healer_name,
                target: target_name.clone(),
                amount: healed,
            },
        );
        if self.combatants[target].is_active() {
            self.push(round, CombatEvent::Revived { name: target_name });
        }
        true
    }

    fn select_attack_target(&self, attacker_idx: usize) -> Option<usize> {
        let attacker = &self.combatants[attacker_idx];
        let enemies = living_on_side(&self.combatants, attacker.side.opponent());
        if enemies.is_empty() {
            return None;
        }
        if attacker.config.tactical {
            targeting::select_tactical_target(attacker, &enemies)
        } else {
            targeting::select_target(&enemies)
        }
    }

    /// Whether another active member of the attacker's side is holding the
    /// front line (enables sneak attack).
    fn ally_engaged(&self, attacker_idx: usize) -> bool {
        let side = self.combatants[attacker_idx].side;
        self.combatants.iter().enumerate().any(|(i, c)| {
            i != attacker_idx
                && c.side == side
                && c.is_active()
                && c.position == crate::position::Position::Front
        })
    }

    fn attack_routine<R: Rng>(
        &mut self,
        idx: usize,
        routines: u32,
        flurry: bool,
        round: u32,
        rng: &mut R,
    ) {
        let attacks = self.combatants[idx].config.num_attacks * routines;
        let ally_engaged = self.ally_engaged(idx);
        for _ in 0..attacks {
            let Some(target) = self.select_attack_target(idx) else {
                return;
            };
            let profile = AttackProfile::for_combatant(&self.combatants[idx]);
            actions::attack(
                &mut self.combatants,
                idx,
                target,
                &profile,
                ally_engaged,
                round,
                &mut self.log,
                rng,
            );
        }
        if flurry && self.combatants[idx].resources.consume(ResourceKind::Ki, 1) {
            self.spend_log(idx, round, ResourceKind::Ki, 1);
            if let Some(target) = self.select_attack_target(idx) {
                let profile = AttackProfile::for_combatant(&self.combatants[idx]);
                actions::attack(
                    &mut self.combatants,
                    idx,
                    target,
                    &profile,
                    ally_engaged,
                    round,
                    &mut self.log,
                    rng,
                );
            }
        }
    }

    fn monster_turn<R: Rng>(&mut self, idx: usize, routines: u32, round: u32, rng: &mut R) {
        self.frightful_presence(idx, round, rng);
        self.check_recharges(idx, round, rng);

        if self.use_recharge_ability(idx, round, rng) {
            return;
        }

        let sub_attacks = self.combatants[idx].config.monster.multiattack.clone();
        if sub_attacks.is_empty() {
            self.attack_routine(idx, routines, false, round, rng);
            return;
        }
        for _ in 0..routines {
            for sub in &sub_attacks {
                let Some(target) = self.select_attack_target(idx) else {
                    return;
                };
                let profile = AttackProfile {
                    attack_bonus: sub.attack_bonus,
                    damage: sub.damage_dice,
                    damage_kind: sub.damage_kind,
                    kind: sub.attack_kind,
                };
                actions::attack(
                    &mut self.combatants,
                    idx,
                    target,
                    &profile,
                    false,
                    round,
                    &mut self.log,
                    rng,
                );
            }
        }
    }

    /// The aura goes off once, on the monster's first turn. Enemies who
    /// save are immune for the rest of the encounter.
    fn frightful_presence<R: Rng>(&mut self, idx: usize, round: u32, rng: &mut R) {
        let Some(fp) = self.combatants[idx].config.monster.frightful_presence else {
            return;
        };
        if self.combatants[idx].frightful_used {
            return;
        }
        self.combatants[idx].frightful_used = true;
        let monster_name = self.combatants[idx].name().to_string();
        self.push(
            round,
            CombatEvent::FrightfulPresence {
                monster: monster_name.clone(),
            },
        );
        let targets: Vec<usize> = {
            let side = self.combatants[idx].side;
            self.combatants
                .iter()
                .enumerate()
                .filter(|(_, c)| {
                    c.side != side && c.is_active() && !c.frightful_immune
                })
                .map(|(i, _)| i)
                .collect()
        };
        for target in targets {
            let success = actions::resolve_save(
                &mut self.combatants,
                target,
                Ability::Wisdom,
                fp.dc,
                SavePurpose::Condition(ConditionKind::Frightened),
                "frightful presence",
                round,
                &mut self.log,
                rng,
            );
            let combatant = &mut self.combatants[target];
            if success {
                combatant.frightful_immune = true;
                continue;
            }
            let condition = ActiveCondition::new(ConditionKind::Frightened, monster_name.clone())
                .with_duration(fp.duration)
                .with_save(Ability::Wisdom, fp.dc);
            let outcome = combatant
                .conditions
                .apply(condition, &combatant.config.condition_immunities);
            if outcome != crate::conditions::ApplyOutcome::Immune {
                let target_name = combatant.name().to_string();
                self.push(
                    round,
                    CombatEvent::ConditionApplied {
                        target: target_name,
                        condition: ConditionKind::Frightened,
                        source: monster_name.clone(),
                    },
                );
            }
        }
    }

    /// Spent abilities roll to come back once per turn.
    fn check_recharges<R: Rng>(&mut self, idx: usize, round: u32, rng: &mut R) {
        let thresholds: Vec<(usize, u8, String)> = self.combatants[idx]
            .config
            .monster
            .recharge_abilities
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.combatants[idx].recharge_ready[*i])
            .map(|(i, a)| (i, a.recharge_min, a.name.clone()))
            .collect();
        let monster_name = self.combatants[idx].name().to_string();
        for (ability_idx, recharge_min, ability_name) in thresholds {
            let (roll, recharged) = monster::roll_recharge(recharge_min, rng);
            self.combatants[idx].recharge_ready[ability_idx] = recharged;
            self.push(
                round,
                CombatEvent::Recharge {
                    monster: monster_name.clone(),
                    ability: ability_name,
                    roll,
                    recharged,
                },
            );
        }
    }

    /// Fire the first ready recharge ability when its area is worth it.
    /// Returns `true` when one was used (it replaces the attack routine).
    fn use_recharge_ability<R: Rng>(&mut self, idx: usize, round: u32, rng: &mut R) -> bool {
        let ready: Option<(usize, crate::monster::RechargeAbility)> = self.combatants[idx]
            .config
            .monster
            .recharge_abilities
            .iter()
            .enumerate()
            .find(|(i, _)| self.combatants[idx].recharge_ready[*i])
            .map(|(i, a)| (i, a.clone()));
        let Some((ability_idx, ability)) = ready else {
            return false;
        };

        let targets = {
            let enemies = living_on_side(&self.combatants, self.combatants[idx].side.opponent());
            match ability.shape {
                AoeShape::Cone => {
                    let hit = crate::position::select_cone_targets(&enemies);
                    (!hit.is_empty()).then_some(hit)
                }
                AoeShape::Sphere => crate::position::select_sphere_targets(&enemies),
                AoeShape::Line => crate::position::select_line_targets(&enemies, rng),
            }
        };
        let Some(targets) = targets else { return false };

        self.combatants[idx].recharge_ready[ability_idx] = false;
        self.push(
            round,
            CombatEvent::AbilityUsed {
                name: self.combatants[idx].name().to_string(),
                ability: ability.name.clone(),
            },
        );
        actions::area_damage_ability(
            &mut self.combatants,
            idx,
            &ability.name,
            ability.damage_dice,
            ability.damage_kind,
            ability.save_ability,
            ability.save_dc,
            &targets,
            round,
            &mut self.log,
            rng,
        );
        true
    }

    /// After a party member's turn, each boss may spend from its legendary
    /// budget: an area action against groups, otherwise the biggest
    /// affordable single-target action.
    fn legendary_reactions<R: Rng>(&mut self, round: u32, rng: &mut R) {
        let monsters: Vec<usize> = self
            .combatants
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                c.side == Side::Monsters
                    && c.is_active()
                    && c.legendary_actions_remaining > 0
                    && !c.config.monster.legendary_actions.is_empty()
            })
            .map(|(i, _)| i)
            .collect();

        for idx in monsters {
            if !side_alive(&self.combatants, Side::Party) {
                return;
            }
            let living_enemies =
                living_on_side(&self.combatants, Side::Party).len();
            let monster_traits = &self.combatants[idx].config.monster;
            let Some(action_idx) = monster::choose_legendary_action(
                &monster_traits.legendary_actions,
                self.combatants[idx].legendary_actions_remaining,
                living_enemies,
            ) else {
                continue;
            };
            let action = monster_traits.legendary_actions[action_idx].clone();
            self.combatants[idx].legendary_actions_remaining -= action.cost;
            self.push(
                round,
                CombatEvent::LegendaryAction {
                    monster: self.combatants[idx].name().to_string(),
                    action: action.name.clone(),
                    cost: action.cost,
                },
            );

            if action.area {
                let targets = {
                    let enemies = living_on_side(&self.combatants, Side::Party);
                    crate::position::select_cone_targets(&enemies)
                };
                if targets.is_empty() {
                    continue;
                }
                // Validated at construction: area actions carry a DC.
                let dc = action.save_dc.unwrap_or(13);
                actions::area_damage_ability(
                    &mut self.combatants,
                    idx,
                    &action.name,
                    action.damage_dice,
                    action.damage_kind,
                    Ability::Dexterity,
                    dc,
                    &targets,
                    round,
                    &mut self.log,
                    rng,
                );
            } else if let Some(target) = self.select_attack_target(idx) {
                let profile = AttackProfile {
                    attack_bonus: action.attack_bonus,
                    damage: action.damage_dice,
                    damage_kind: action.damage_kind,
                    kind: crate::combatant::AttackKind::Melee,
                };
                actions::attack(
                    &mut self.combatants,
                    idx,
                    target,
                    &profile,
                    false,
                    round,
                    &mut self.log,
                    rng,
                );
            }
        }
    }

    /// End-of-turn saves against conditions that allow them.
    fn end_of_turn_saves<R: Rng>(&mut self, idx: usize, round: u32, rng: &mut R) {
        if !self.combatants[idx].is_alive() {
            return;
        }
        let saves = self.combatants[idx].conditions.saveable();
        for (kind, save) in saves {
            let total = dice::roll_d20(Advantage::Normal, rng) as i32
                + self.combatants[idx].save_bonus(save.ability);
            let success = total >= save.dc;
            let name = self.combatants[idx].name().to_string();
            self.push(
                round,
                CombatEvent::SavingThrow {
                    name: name.clone(),
                    dc: save.dc,
                    total,
                    success,
                    source: kind.name().to_string(),
                },
            );
            if success {
                self.combatants[idx].conditions.remove(kind);
                self.push(
                    round,
                    CombatEvent::ConditionEnded {
                        target: name,
                        condition: kind,
                        reason: ConditionEndReason::Saved,
                    },
                );
            }
        }
    }

    /// End-of-round bookkeeping: condition durations tick down and rage
    /// countdowns advance.
    fn end_of_round(&mut self, round: u32) {
        for idx in 0..self.combatants.len() {
            if !self.combatants[idx].is_alive() {
                continue;
            }
            let name = self.combatants[idx].name().to_string();
            for kind in self.combatants[idx].conditions.tick_durations() {
                self.push(
                    round,
                    CombatEvent::ConditionEnded {
                        target: name.clone(),
                        condition: kind,
                        reason: ConditionEndReason::Expired,
                    },
                );
            }
            if self.combatants[idx].rage.tick() {
                self.push(round, CombatEvent::RageEnded { name });
            }
        }
    }

    fn finish(mut self, rounds_fought: u32) -> SimulationResult {
        let party_alive = side_alive(&self.combatants, Side::Party);
        let monsters_alive = side_alive(&self.combatants, Side::Monsters);
        let (party_won, reason) = if party_alive && monsters_alive {
            // The safety valve tripped: decide by remaining hit points.
            let party_hp: i32 = self
                .combatants
                .iter()
                .filter(|c| c.side == Side::Party && c.is_alive())
                .map(|c| c.current_hp)
                .sum();
            let monster_hp: i32 = self
                .combatants
                .iter()
                .filter(|c| c.side == Side::Monsters && c.is_alive())
                .map(|c| c.current_hp)
                .sum();
            (party_hp >= monster_hp, "round limit".to_string())
        } else {
            (party_alive, "side eliminated".to_string())
        };

        debug!(
            "encounter {} finished after {} rounds, party_won={}",
            self.id, rounds_fought, party_won
        );
        self.push(rounds_fought, CombatEvent::CombatEnd { party_won, reason });

        let survivors = |side: Side| {
            self.combatants
                .iter()
                .filter(|c| c.side == side && c.is_alive())
                .map(|c| c.name().to_string())
                .collect::<Vec<_>>()
        };
        SimulationResult {
            id: self.id,
            party_won,
            total_rounds: rounds_fought,
            surviving_party: survivors(Side::Party),
            surviving_monsters: survivors(Side::Monsters),
            log: self.log,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::{CharacterClass, CombatantConfig};
    use crate::dice::DiceNotation;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn dn(s: &str) -> DiceNotation {
        DiceNotation::parse(s).unwrap()
    }

    fn fighter() -> CombatantConfig {
        CombatantConfig::new("Aldric", 28, 16, 5, dn("1d8+3"))
            .player()
            .with_class(CharacterClass::Fighter, 3)
            .with_initiative_bonus(2)
    }

    fn orc() -> CombatantConfig {
        CombatantConfig::new("Orc", 15, 13, 5, dn("1d12+3"))
    }

    #[test]
    fn test_empty_side_is_an_error() {
        assert!(matches!(
            Encounter::new(&[], &[orc()], 0),
            Err(EncounterError::EmptySide)
        ));
    }

    #[test]
    fn test_encounter_terminates_with_one_side_standing() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for id in 0..20 {
            let encounter = Encounter::new(&[fighter()], &[orc()], id).unwrap();
            let result = encounter.run(&mut rng);
            assert!(result.total_rounds <= MAX_ROUNDS);
            assert!(
                result.surviving_party.is_empty() != result.surviving_monsters.is_empty(),
                "exactly one side should be standing"
            );
        }
    }

    #[test]
    fn test_initiative_logged_for_everyone() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let encounter = Encounter::new(&[fighter()], &[orc(), orc()], 0).unwrap();
        let result = encounter.run(&mut rng);
        let initiative_entries = result
            .log
            .iter()
            .filter(|e| matches!(e.event, CombatEvent::Initiative { .. }))
            .count();
        assert_eq!(initiative_entries, 3);
    }

    #[test]
    fn test_round_limit_tie_break() {
        // Two sides that cannot hurt each other: immune to everything.
        let mut tank_a = fighter();
        tank_a.immunities = vec![crate::damage::DamageKind::Slashing];
        tank_a.max_hp = 50;
        let mut tank_b = orc();
        tank_b.immunities = vec![crate::damage::DamageKind::Slashing];
        tank_b.max_hp = 20;

        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let encounter = Encounter::new(&[tank_a], &[tank_b], 0).unwrap();
        let result = encounter.run(&mut rng);
        assert_eq!(result.total_rounds, MAX_ROUNDS);
        // Higher HP sum wins the tie-break.
        assert!(result.party_won);
        assert!(!result.surviving_party.is_empty());
        assert!(!result.surviving_monsters.is_empty());
    }

    #[test]
    fn test_log_is_ordered_by_round() {
        let mut rng = ChaCha8Rng::seed_from_u64(77);
        let encounter = Encounter::new(&[fighter()], &[orc()], 0).unwrap();
        let result = encounter.run(&mut rng);
        let rounds: Vec<u32> = result.log.iter().map(|e| e.round).collect();
        assert!(rounds.windows(2).all(|w| w[0] <= w[1]));
    }
}
