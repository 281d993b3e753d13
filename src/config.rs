use crate::numeric::TolerancePolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Verification policy. Everything here is policy, not constants: the
/// defaults mirror the reference behavior but every knob can be overridden
/// from the environment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Minimum score the matcher accepts a candidate at.
    pub accept_threshold: f32,
    /// Relative tolerance for numeric agreement inside the matcher.
    pub match_numeric_relative: f64,
    /// Tolerance policy for the numeric verification stage.
    pub tolerance: TolerancePolicy,
    /// Keyword-score multiplier for candidates from a cited source.
    pub cited_source_boost: f32,
    /// Halt after a failed stage instead of running the rest.
    pub stop_on_fail: bool,
    /// Whether a wrong-source match blocks or merely warns.
    pub mismatch_blocking: bool,
    /// Minimum oracle confidence treated as a match.
    pub oracle_confidence_floor: f32,
    /// Per-call oracle timeout.
    pub oracle_timeout: Duration,
    /// Bounded fan-out for semantic and numeric stage workers.
    pub worker_limit: usize,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            accept_threshold: 0.5,
            match_numeric_relative: 0.01,
            tolerance: TolerancePolicy::default(),
            cited_source_boost: 1.25,
            stop_on_fail: true,
            mismatch_blocking: true,
            oracle_confidence_floor: 0.6,
            oracle_timeout: Duration::from_secs(20),
            worker_limit: 8,
        }
    }
}

impl VerifyConfig {
    /// Layer `FACTRAIL_*` environment overrides onto the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = env_parse("FACTRAIL_ACCEPT_THRESHOLD") {
            config.accept_threshold = v;
        }
        if let Some(v) = env_parse("FACTRAIL_MATCH_NUMERIC_RELATIVE") {
            config.match_numeric_relative = v;
        }
        if let Some(v) = env_parse("FACTRAIL_TOLERANCE_RELATIVE") {
            config.tolerance.relative = v;
        }
        if let Some(v) = env_parse("FACTRAIL_TOLERANCE_POINT_WINDOW") {
            config.tolerance.point_window = v;
        }
        if let Some(v) = env_parse("FACTRAIL_CITED_SOURCE_BOOST") {
            config.cited_source_boost = v;
        }
        if let Some(v) = env_parse("FACTRAIL_STOP_ON_FAIL") {
            config.stop_on_fail = v;
        }
        if let Some(v) = env_parse("FACTRAIL_MISMATCH_BLOCKING") {
            config.mismatch_blocking = v;
        }
        if let Some(v) = env_parse("FACTRAIL_ORACLE_CONFIDENCE_FLOOR") {
            config.oracle_confidence_floor = v;
        }
        if let Some(secs) = env_parse::<u64>("FACTRAIL_ORACLE_TIMEOUT_SECS") {
            config.oracle_timeout = Duration::from_secs(secs);
        }
        if let Some(v) = env_parse("FACTRAIL_WORKER_LIMIT") {
            config.worker_limit = v;
        }
        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|raw| raw.trim().parse().ok())
}
