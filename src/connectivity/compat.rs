//! Type compatibility: which connection types may link, which must veto.
//!
//! The table is plain data handed to the world at construction; overrides
//! come from the `[compatibility]` section of the engine config.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::connection::ConnectionType;

/// Outcome of comparing two connection types (and of a whole overlap query).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Unrelated geometry; neither links nor blocks.
    #[default]
    Ignore,
    /// Overlapping geometry that cannot coexist.
    Reject,
    Connect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityRule {
    pub a: ConnectionType,
    pub b: ConnectionType,
    pub result: Classification,
}

impl CompatibilityRule {
    pub fn new(a: ConnectionType, b: ConnectionType, result: Classification) -> Self {
        Self { a, b, result }
    }
}

/// Symmetric lookup table; pairs without a rule classify as `Ignore`.
#[derive(Clone, Debug, PartialEq)]
pub struct CompatibilityTable {
    rules: HashMap<(ConnectionType, ConnectionType), Classification>,
}

impl Default for CompatibilityTable {
    fn default() -> Self {
        use Classification::*;
        use ConnectionType::*;
        let mut table = Self::empty();
        for (a, b) in [
            (Knob, Tube),
            (Knob, HollowTube),
            (HollowKnob, Tube),
            (HollowKnob, HollowTube),
            (HollowKnob, Bar),
            (Pin, PinHole),
            (Axle, AxleHole),
            (Axle, PinHole),
            (Bar, Clip),
        ] {
            table.set(a, b, Connect);
        }
        for (a, b) in [
            (Knob, PinHole),
            (Knob, AxleHole),
            (Pin, AxleHole),
            (Axle, Tube),
            (Pin, Tube),
            (Bar, AxleHole),
        ] {
            table.set(a, b, Reject);
        }
        table
    }
}

impl CompatibilityTable {
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Default table with `overrides` applied in order.
    pub fn with_overrides(overrides: &[CompatibilityRule]) -> Self {
        let mut table = Self::default();
        for rule in overrides {
            table.set(rule.a, rule.b, rule.result);
        }
        table
    }

    fn key(a: ConnectionType, b: ConnectionType) -> (ConnectionType, ConnectionType) {
        if a <= b { (a, b) } else { (b, a) }
    }

    pub fn set(&mut self, a: ConnectionType, b: ConnectionType, result: Classification) {
        self.rules.insert(Self::key(a, b), result);
    }

    pub fn classify(&self, a: ConnectionType, b: ConnectionType) -> Classification {
        if !a.is_slot() || !b.is_slot() {
            return Classification::Ignore;
        }
        self.rules
            .get(&Self::key(a, b))
            .copied()
            .unwrap_or(Classification::Ignore)
    }

    /// True if any pairing of the two type sets classifies as `Connect`.
    pub fn any_connect(&self, a: &HashSet<ConnectionType>, b: &HashSet<ConnectionType>) -> bool {
        a.iter()
            .any(|&ta| b.iter().any(|&tb| self.classify(ta, tb) == Classification::Connect))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionType::*;

    #[test]
    fn default_table_samples() {
        let table = CompatibilityTable::default();
        assert_eq!(table.classify(Axle, AxleHole), Classification::Connect);
        assert_eq!(table.classify(Pin, AxleHole), Classification::Reject);
        assert_eq!(table.classify(Knob, Knob), Classification::Ignore);
        assert_eq!(table.classify(Knob, Tube), Classification::Connect);
    }

    #[test]
    fn lookup_is_symmetric() {
        let table = CompatibilityTable::default();
        for &a in ConnectionType::all() {
            for &b in ConnectionType::all() {
                assert_eq!(table.classify(a, b), table.classify(b, a), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn empty_always_ignored() {
        let mut table = CompatibilityTable::empty();
        table.set(Empty, Knob, Classification::Reject);
        assert_eq!(table.classify(Empty, Knob), Classification::Ignore);
        assert_eq!(table.classify(Knob, Empty), Classification::Ignore);
    }

    #[test]
    fn overrides_replace_defaults() {
        let table = CompatibilityTable::with_overrides(&[
            CompatibilityRule::new(AxleHole, Pin, Classification::Connect),
            CompatibilityRule::new(Knob, Knob, Classification::Reject),
        ]);
        assert_eq!(table.classify(Pin, AxleHole), Classification::Connect);
        assert_eq!(table.classify(Knob, Knob), Classification::Reject);
        assert_eq!(table.classify(Axle, AxleHole), Classification::Connect);
    }

    #[test]
    fn any_connect_checks_cross_product() {
        let table = CompatibilityTable::default();
        let studs: HashSet<_> = [Knob, Bar].into_iter().collect();
        let holes: HashSet<_> = [PinHole, Clip].into_iter().collect();
        assert!(table.any_connect(&studs, &holes));
        let only_knobs: HashSet<_> = [Knob].into_iter().collect();
        assert!(!table.any_connect(&only_knobs, &holes));
    }
}
