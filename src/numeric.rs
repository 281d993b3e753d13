use serde::{Deserialize, Serialize};

/// Unit attached to an extracted number. Two numbers are only comparable when
/// their units are compatible; a unit-less number is compatible with anything.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Unit {
    Percent,
    PercentagePoint,
    Currency { symbol: String },
    Ratio,
    Rank,
    Multiplier,
    Count { noun: String },
    None,
}

impl Unit {
    pub fn compatible(&self, other: &Unit) -> bool {
        match (self, other) {
            (Unit::None, _) | (_, Unit::None) => true,
            // Percentage points are percent deltas; let them compare.
            (Unit::Percent, Unit::PercentagePoint) | (Unit::PercentagePoint, Unit::Percent) => true,
            (Unit::Currency { symbol: a }, Unit::Currency { symbol: b }) => a == b,
            (Unit::Count { .. }, Unit::Count { .. }) => true,
            (a, b) => a == b,
        }
    }
}

/// One quantitative assertion pulled out of a sentence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NumericValue {
    pub value: f64,
    pub unit: Unit,
    /// The sentence fragment the number came from.
    pub context: String,
}

impl NumericValue {
    pub fn new(value: f64, unit: Unit, context: impl Into<String>) -> Self {
        Self {
            value,
            unit,
            context: context.into(),
        }
    }
}

/// How far a computed value may drift from a claimed one.
///
/// The exact tolerance and the percentage-point-vs-relative distinction are
/// policy, not constants: callers may tighten or loosen both.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TolerancePolicy {
    /// Relative tolerance applied to most units.
    pub relative: f64,
    /// Additive window, in points, applied to percentage-point deltas.
    pub point_window: f64,
}

impl Default for TolerancePolicy {
    fn default() -> Self {
        Self {
            relative: 0.05,
            point_window: 5.0,
        }
    }
}

/// Outcome of comparing a claimed number against a computed one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Comparison {
    pub claimed: f64,
    pub computed: f64,
    pub within_tolerance: bool,
    /// Absolute difference; for percent units this is points.
    pub discrepancy: f64,
    /// Relative difference against the computed value, when defined.
    pub discrepancy_relative: Option<f64>,
}

impl TolerancePolicy {
    pub fn compare(&self, claimed: &NumericValue, computed: f64) -> Comparison {
        let diff = (claimed.value - computed).abs();
        let relative = if computed != 0.0 {
            Some(diff / computed.abs())
        } else {
            None
        };

        let within = match claimed.unit {
            // Point deltas are compared additively, not relatively.
            Unit::PercentagePoint => diff <= self.point_window,
            _ => match relative {
                Some(r) => r <= self.relative,
                None => diff <= f64::EPSILON,
            },
        };

        Comparison {
            claimed: claimed.value,
            computed,
            within_tolerance: within,
            discrepancy: diff,
            discrepancy_relative: relative,
        }
    }
}

/// Relative agreement used by the matcher: 1% by default, unit-aware.
pub fn values_agree(a: &NumericValue, b: &NumericValue, relative: f64) -> bool {
    if !a.unit.compatible(&b.unit) {
        return false;
    }
    let diff = (a.value - b.value).abs();
    if b.value == 0.0 {
        return diff <= f64::EPSILON;
    }
    diff / b.value.abs() <= relative
}
