//! Condition catalogue and per-combatant condition bookkeeping.
//!
//! Each condition kind carries static combat traits: how it modifies the
//! bearer's own attacks, how it modifies attacks made against the bearer
//! (which may differ for melee and ranged), whether the bearer can act at
//! all, and whether melee hits against the bearer are automatic criticals.

use crate::combatant::{Ability, AttackKind};
use crate::dice::Advantage;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Status conditions tracked by the engine.
///
/// Unconsciousness is not in this list: it is modeled directly on the
/// combatant (HP, death saves) rather than as a curable condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionKind {
    Blinded,
    Charmed,
    Frightened,
    Grappled,
    Incapacitated,
    Paralyzed,
    Petrified,
    Poisoned,
    Prone,
    Restrained,
    Stunned,
}

impl ConditionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ConditionKind::Blinded => "Blinded",
            ConditionKind::Charmed => "Charmed",
            ConditionKind::Frightened => "Frightened",
            ConditionKind::Grappled => "Grappled",
            ConditionKind::Incapacitated => "Incapacitated",
            ConditionKind::Paralyzed => "Paralyzed",
            ConditionKind::Petrified => "Petrified",
            ConditionKind::Poisoned => "Poisoned",
            ConditionKind::Prone => "Prone",
            ConditionKind::Restrained => "Restrained",
            ConditionKind::Stunned => "Stunned",
        }
    }

    pub fn traits(&self) -> &'static ConditionTraits {
        &CONDITION_TRAITS[self]
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Static combat traits of a condition kind.
#[derive(Debug, Clone, Copy)]
pub struct ConditionTraits {
    /// Modifier on the bearer's own attack rolls.
    pub attack: Advantage,
    /// Modifier on melee attacks made against the bearer.
    pub defense_melee: Advantage,
    /// Modifier on ranged attacks made against the bearer.
    pub defense_ranged: Advantage,
    /// Whether the bearer can take actions on its turn.
    pub can_act: bool,
    /// Whether melee hits against the bearer are automatic criticals.
    pub auto_crit: bool,
}

impl ConditionTraits {
    pub fn defense(&self, attack: AttackKind) -> Advantage {
        match attack {
            AttackKind::Melee => self.defense_melee,
            AttackKind::Ranged => self.defense_ranged,
        }
    }

    const fn new(
        attack: Advantage,
        defense_melee: Advantage,
        defense_ranged: Advantage,
        can_act: bool,
        auto_crit: bool,
    ) -> Self {
        Self {
            attack,
            defense_melee,
            defense_ranged,
            can_act,
            auto_crit,
        }
    }
}

lazy_static! {
    /// Condition catalogue.
    static ref CONDITION_TRAITS: HashMap<ConditionKind, ConditionTraits> = {
        use crate::dice::Advantage::{Advantage as Adv, Disadvantage as Dis, Normal};
        let mut m = HashMap::new();
        m.insert(ConditionKind::Blinded, ConditionTraits::new(Dis, Adv, Adv, true, false));
        m.insert(ConditionKind::Charmed, ConditionTraits::new(Normal, Normal, Normal, true, false));
        m.insert(ConditionKind::Frightened, ConditionTraits::new(Dis, Normal, Normal, true, false));
        m.insert(ConditionKind::Grappled, ConditionTraits::new(Normal, Normal, Normal, true, false));
        m.insert(ConditionKind::Incapacitated, ConditionTraits::new(Normal, Normal, Normal, false, false));
        m.insert(ConditionKind::Paralyzed, ConditionTraits::new(Normal, Adv, Adv, false, true));
        m.insert(ConditionKind::Petrified, ConditionTraits::new(Normal, Adv, Adv, false, false));
        m.insert(ConditionKind::Poisoned, ConditionTraits::new(Dis, Normal, Normal, true, false));
        m.insert(ConditionKind::Prone, ConditionTraits::new(Dis, Adv, Dis, true, false));
        m.insert(ConditionKind::Restrained, ConditionTraits::new(Dis, Adv, Adv, true, false));
        m.insert(ConditionKind::Stunned, ConditionTraits::new(Normal, Adv, Adv, false, false));
        m
    };
}

/// End-of-turn save that can shake a condition off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndOfTurnSave {
    pub ability: Ability,
    pub dc: i32,
}

/// A condition applied to a combatant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveCondition {
    pub kind: ConditionKind,
    /// Remaining duration in rounds. `None` means the condition persists
    /// until cured by a save or explicit removal.
    pub duration: Option<u32>,
    /// Who or what applied it. Concentration-bound conditions carry the
    /// caster's concentration tag so a broken concentration can sweep them.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save: Option<EndOfTurnSave>,
}

impl ActiveCondition {
    pub fn new(kind: ConditionKind, source: impl Into<String>) -> Self {
        Self {
            kind,
            duration: None,
            source: source.into(),
            save: None,
        }
    }

    pub fn with_duration(mut self, rounds: u32) -> Self {
        self.duration = Some(rounds);
        self
    }

    pub fn with_save(mut self, ability: Ability, dc: i32) -> Self {
        self.save = Some(EndOfTurnSave { ability, dc });
        self
    }
}

/// Outcome of applying a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Inserted as a new entry.
    Applied,
    /// An entry of the same kind already existed. The stored duration is
    /// only ever lengthened, never shortened.
    Refreshed,
    /// The bearer is immune; nothing changed.
    Immune,
}

/// The set of conditions on one combatant. At most one entry per kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConditionSet {
    entries: Vec<ActiveCondition>,
}

impl ConditionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a condition, honoring immunities and the refresh rule.
    pub fn apply(
        &mut self,
        condition: ActiveCondition,
        immunities: &[ConditionKind],
    ) -> ApplyOutcome {
        if immunities.contains(&condition.kind) {
            return ApplyOutcome::Immune;
        }
        if let Some(existing) = self.entries.iter_mut().find(|e| e.kind == condition.kind) {
            let longer = match (existing.duration, condition.duration) {
                (Some(old), Some(new)) => new > old,
                (Some(_), None) => true,
                (None, _) => false,
            };
            if longer {
                existing.duration = condition.duration;
                existing.source = condition.source;
                existing.save = condition.save;
            }
            return ApplyOutcome::Refreshed;
        }
        self.entries.push(condition);
        ApplyOutcome::Applied
    }

    pub fn remove(&mut self, kind: ConditionKind) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.kind != kind);
        self.entries.len() != before
    }

    /// Remove every condition applied by the given source. Returns the
    /// removed kinds, in stored order.
    pub fn remove_from_source(&mut self, source: &str) -> Vec<ConditionKind> {
        let mut removed = Vec::new();
        self.entries.retain(|e| {
            if e.source == source {
                removed.push(e.kind);
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn has(&self, kind: ConditionKind) -> bool {
        self.entries.iter().any(|e| e.kind == kind)
    }

    pub fn get(&self, kind: ConditionKind) -> Option<&ActiveCondition> {
        self.entries.iter().find(|e| e.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveCondition> {
        self.entries.iter()
    }

    /// Whether the bearer can take actions.
    pub fn can_act(&self) -> bool {
        self.entries.iter().all(|e| e.kind.traits().can_act)
    }

    /// Whether melee hits against the bearer are automatic criticals.
    pub fn auto_crit(&self) -> bool {
        self.entries.iter().any(|e| e.kind.traits().auto_crit)
    }

    /// Advantage sources from the bearer's conditions on its own attacks.
    pub fn attack_modifiers(&self) -> impl Iterator<Item = Advantage> + '_ {
        self.entries.iter().map(|e| e.kind.traits().attack)
    }

    /// Advantage sources on attacks of the given kind made against the bearer.
    pub fn defense_modifiers(&self, attack: AttackKind) -> impl Iterator<Item = Advantage> + '_ {
        self.entries.iter().map(move |e| e.kind.traits().defense(attack))
    }

    /// Conditions carrying an end-of-turn save.
    pub fn saveable(&self) -> Vec<(ConditionKind, EndOfTurnSave)> {
        self.entries
            .iter()
            .filter_map(|e| e.save.map(|s| (e.kind, s)))
            .collect()
    }

    /// End-of-round duration tick. Decrements non-permanent durations and
    /// returns the kinds that expired.
    pub fn tick_durations(&mut self) -> Vec<ConditionKind> {
        let mut expired = Vec::new();
        for entry in &mut self.entries {
            if let Some(d) = entry.duration.as_mut() {
                *d = d.saturating_sub(1);
            }
        }
        self.entries.retain(|e| {
            if e.duration == Some(0) {
                expired.push(e.kind);
                false
            } else {
                true
            }
        });
        expired
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Combine the attacker's own advantage sources with the defender's
/// (against this attack kind). Any simultaneous advantage + disadvantage
/// from either side cancels to normal.
pub fn combined_modifier(
    attacker: &ConditionSet,
    defender: &ConditionSet,
    attack: AttackKind,
) -> Advantage {
    Advantage::combine_all(
        attacker
            .attack_modifiers()
            .chain(defender.defense_modifiers(attack)),
    )
}
