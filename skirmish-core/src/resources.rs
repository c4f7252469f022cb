//! Class resource pools and the rage state machine.
//!
//! Resource kinds are a closed enum validated at construction, not free-form
//! strings. Each pool tracks `current`, `max`, and which rest restores it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The class resources the engine knows how to track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Rage,
    Ki,
    ActionSurge,
    SecondWind,
    BardicInspiration,
    LayOnHands,
}

impl ResourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::Rage => "Rage",
            ResourceKind::Ki => "Ki",
            ResourceKind::ActionSurge => "Action Surge",
            ResourceKind::SecondWind => "Second Wind",
            ResourceKind::BardicInspiration => "Bardic Inspiration",
            ResourceKind::LayOnHands => "Lay on Hands",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Which rest restores a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestKind {
    Short,
    Long,
}

/// A single resource pool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResourcePool {
    pub current: u32,
    pub max: u32,
    pub rest: RestKind,
}

impl ResourcePool {
    pub fn new(max: u32, rest: RestKind) -> Self {
        Self {
            current: max,
            max,
            rest,
        }
    }
}

/// All resource pools for one combatant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceSet {
    pools: HashMap<ResourceKind, ResourcePool>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: ResourceKind, pool: ResourcePool) {
        self.pools.insert(kind, pool);
    }

    pub fn get(&self, kind: ResourceKind) -> Option<&ResourcePool> {
        self.pools.get(&kind)
    }

    /// Remaining uses, zero for pools the combatant does not have.
    pub fn available(&self, kind: ResourceKind) -> u32 {
        self.pools.get(&kind).map(|p| p.current).unwrap_or(0)
    }

    /// Spend from a pool. Returns `false` (and changes nothing) when the
    /// pool is missing or has fewer than `amount` uses left; probing for an
    /// absent capability is not an error.
    pub fn consume(&mut self, kind: ResourceKind, amount: u32) -> bool {
        match self.pools.get_mut(&kind) {
            Some(pool) if pool.current >= amount => {
                pool.current -= amount;
                true
            }
            _ => false,
        }
    }

    /// Restore pools recovered by a short rest.
    pub fn short_rest(&mut self) {
        for pool in self.pools.values_mut() {
            if matches!(pool.rest, RestKind::Short) {
                pool.current = pool.max;
            }
        }
    }

    /// Restore every pool.
    pub fn long_rest(&mut self) {
        for pool in self.pools.values_mut() {
            pool.current = pool.max;
        }
    }
}

/// Rage is a two-state machine: entering costs one rage charge and starts a
/// ten-round countdown; it drops back to inactive when the countdown ends
/// or the rage is explicitly ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RageState {
    #[default]
    Inactive,
    Active {
        rounds_remaining: u32,
    },
}

pub const RAGE_DURATION_ROUNDS: u32 = 10;

impl RageState {
    pub fn is_active(&self) -> bool {
        matches!(self, RageState::Active { .. })
    }

    /// Enter rage, spending one charge from the pool. Returns `false` when
    /// already raging or out of charges.
    pub fn enter(&mut self, resources: &mut ResourceSet) -> bool {
        if self.is_active() || !resources.consume(ResourceKind::Rage, 1) {
            return false;
        }
        *self = RageState::Active {
            rounds_remaining: RAGE_DURATION_ROUNDS,
        };
        true
    }

    /// End-of-round countdown. Returns `true` when the rage just expired.
    pub fn tick(&mut self) -> bool {
        if let RageState::Active { rounds_remaining } = self {
            *rounds_remaining = rounds_remaining.saturating_sub(1);
            if *rounds_remaining == 0 {
                *self = RageState::Inactive;
                return true;
            }
        }
        false
    }

    pub fn end(&mut self) {
        *self = RageState::Inactive;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_with(kind: ResourceKind, max: u32, rest: RestKind) -> ResourceSet {
        let mut set = ResourceSet::new();
        set.insert(kind, ResourcePool::new(max, rest));
        set
    }

    #[test]
    fn test_consume_is_a_noop_when_short() {
        let mut set = set_with(ResourceKind::Ki, 2, RestKind::Short);
        assert!(set.consume(ResourceKind::Ki, 1));
        assert!(!set.consume(ResourceKind::Ki, 2));
        assert_eq!(set.available(ResourceKind::Ki), 1);
        assert!(!set.consume(ResourceKind::Rage, 1));
    }

    #[test]
    fn test_short_rest_restores_short_pools_only() {
        let mut set = set_with(ResourceKind::Ki, 3, RestKind::Short);
        set.insert(ResourceKind::Rage, ResourcePool::new(2, RestKind::Long));
        set.consume(ResourceKind::Ki, 3);
        set.consume(ResourceKind::Rage, 1);
        set.short_rest();
        assert_eq!(set.available(ResourceKind::Ki), 3);
        assert_eq!(set.available(ResourceKind::Rage), 1);
        set.long_rest();
        assert_eq!(set.available(ResourceKind::Rage), 2);
    }

    #[test]
    fn test_rage_machine() {
        let mut resources = set_with(ResourceKind::Rage, 1, RestKind::Long);
        let mut rage = RageState::default();
        assert!(rage.enter(&mut resources));
        assert!(rage.is_active());
        // Can't double-enter, and the pool is spent.
        assert!(!rage.enter(&mut resources));
        for _ in 0..9 {
            assert!(!rage.tick());
        }
        assert!(rage.tick());
        assert!(!rage.is_active());
        // Out of charges now.
        assert!(!rage.enter(&mut resources));
    }

    #[test]
    fn test_rage_explicit_end() {
        let mut resources = set_with(ResourceKind::Rage, 2, RestKind::Long);
        let mut rage = RageState::default();
        rage.enter(&mut resources);
        rage.end();
        assert!(!rage.is_active());
    }
}
