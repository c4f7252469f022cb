//! Damage types and mitigation.

use serde::{Deserialize, Serialize};

/// Common damage types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageKind {
    Slashing,
    Piercing,
    Bludgeoning,
    Fire,
    Cold,
    Lightning,
    Thunder,
    Acid,
    Poison,
    Necrotic,
    Radiant,
    Force,
    Psychic,
}

impl DamageKind {
    pub fn name(&self) -> &'static str {
        match self {
            DamageKind::Slashing => "slashing",
            DamageKind::Piercing => "piercing",
            DamageKind::Bludgeoning => "bludgeoning",
            DamageKind::Fire => "fire",
            DamageKind::Cold => "cold",
            DamageKind::Lightning => "lightning",
            DamageKind::Thunder => "thunder",
            DamageKind::Acid => "acid",
            DamageKind::Poison => "poison",
            DamageKind::Necrotic => "necrotic",
            DamageKind::Radiant => "radiant",
            DamageKind::Force => "force",
            DamageKind::Psychic => "psychic",
        }
    }

    /// Rage resistance covers the three weapon damage types.
    pub fn is_physical(&self) -> bool {
        matches!(
            self,
            DamageKind::Slashing | DamageKind::Piercing | DamageKind::Bludgeoning
        )
    }
}

/// Apply immunity, resistance, and rage mitigation to a raw damage amount.
///
/// Immunity zeroes the damage. Resistance halves it (round down). A raging
/// target resists the physical types; resistance never stacks, so a raging
/// target that is also resistant still only takes half.
pub fn mitigate(
    amount: i32,
    kind: DamageKind,
    resistances: &[DamageKind],
    immunities: &[DamageKind],
    raging: bool,
) -> i32 {
    let amount = amount.max(0);
    if immunities.contains(&kind) {
        return 0;
    }
    let resistant = resistances.contains(&kind) || (raging && kind.is_physical());
    if resistant {
        amount / 2
    } else {
        amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immunity_zeroes() {
        assert_eq!(mitigate(17, DamageKind::Fire, &[], &[DamageKind::Fire], false), 0);
    }

    #[test]
    fn test_resistance_halves() {
        assert_eq!(mitigate(17, DamageKind::Cold, &[DamageKind::Cold], &[], false), 8);
    }

    #[test]
    fn test_rage_resists_physical_only() {
        assert_eq!(mitigate(10, DamageKind::Slashing, &[], &[], true), 5);
        assert_eq!(mitigate(10, DamageKind::Fire, &[], &[], true), 10);
    }

    #[test]
    fn test_resistance_does_not_stack_with_rage() {
        assert_eq!(
            mitigate(10, DamageKind::Bludgeoning, &[DamageKind::Bludgeoning], &[], true),
            5
        );
    }

    #[test]
    fn test_negative_amount_clamped() {
        assert_eq!(mitigate(-3, DamageKind::Fire, &[], &[], false), 0);
    }
}
