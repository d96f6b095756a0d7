//! Colony tuning: queen, hive and liberation parameters.
//!
//! Every value has a serde default so a partial `colony:` section is valid.
//! Ranges read from configuration are clamped into the hard limits below
//! before anything is drawn from them; out-of-range input is never rejected.

use serde::Deserialize;

/// Hard lower bound on queen health.
pub const QUEEN_HEALTH_MIN: f32 = 40.0;
/// Hard upper bound on queen health.
pub const QUEEN_HEALTH_MAX: f32 = 100.0;
/// Hard lower bound on queen growth duration, in seconds.
pub const QUEEN_GROWTH_MIN_SECS: f32 = 60.0;
/// Hard upper bound on queen growth duration, in seconds.
pub const QUEEN_GROWTH_MAX_SECS: f32 = 120.0;

/// Hard lower bound on hive health.
pub const HIVE_HEALTH_MIN: f32 = 20.0;
/// Hard upper bound on hive health.
pub const HIVE_HEALTH_MAX: f32 = 30.0;
/// Hard lower bound on hive construction time, in seconds.
pub const HIVE_CONSTRUCTION_MIN_SECS: f32 = 10.0;
/// Hard upper bound on hive construction time, in seconds.
pub const HIVE_CONSTRUCTION_MAX_SECS: f32 = 15.0;
/// Smallest defensive swarm a hive requests.
pub const HIVE_SWARM_MIN: u32 = 50;
/// Largest defensive swarm a hive requests.
pub const HIVE_SWARM_MAX: u32 = 70;

/// Shortest liberation window, in seconds.
pub const LIBERATION_MIN_SECS: f32 = 180.0;
/// Longest liberation window, in seconds.
pub const LIBERATION_MAX_SECS: f32 = 300.0;
/// Smallest one-time liberation energy reward.
pub const LIBERATION_REWARD_MIN: f32 = 50.0;
/// Largest one-time liberation energy reward.
pub const LIBERATION_REWARD_MAX: f32 = 100.0;
/// Mining-speed bonus inside a liberated territory.
pub const LIBERATION_MINING_BONUS: f32 = 0.25;

/// Clamp `value` into `[min, max]`, mapping NaN to `min`.
pub fn clamp_to(value: f32, min: f32, max: f32) -> f32 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}

/// Clamp a configured `(lo, hi)` pair into `[min, max]` and order it.
fn clamp_pair(lo: f32, hi: f32, min: f32, max: f32) -> (f32, f32) {
    let a = clamp_to(lo, min, max);
    let b = clamp_to(hi, min, max);
    if a <= b { (a, b) } else { (b, a) }
}

/// All colony parameters.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ColonyConfig {
    /// Queen parameters.
    #[serde(default)]
    pub queen: QueenConfig,

    /// Hive parameters.
    #[serde(default)]
    pub hive: HiveConfig,

    /// Liberation parameters.
    #[serde(default)]
    pub liberation: LiberationConfig,
}

/// Queen spawn parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueenConfig {
    /// Lowest health a new queen may draw.
    #[serde(default = "default_queen_health_min")]
    pub health_min: f32,

    /// Highest health a new queen may draw.
    #[serde(default = "default_queen_health_max")]
    pub health_max: f32,

    /// Shortest growth phase, in seconds.
    #[serde(default = "default_queen_growth_min")]
    pub growth_min_secs: f32,

    /// Longest growth phase, in seconds.
    #[serde(default = "default_queen_growth_max")]
    pub growth_max_secs: f32,

    /// Most parasites a single queen may control.
    #[serde(default = "default_max_controlled_parasites")]
    pub max_controlled_parasites: u32,
}

impl QueenConfig {
    /// Health draw range, clamped to `[40, 100]`.
    pub fn health_range(&self) -> (f32, f32) {
        clamp_pair(self.health_min, self.health_max, QUEEN_HEALTH_MIN, QUEEN_HEALTH_MAX)
    }

    /// Growth duration draw range, clamped to `[60, 120]` seconds.
    pub fn growth_range(&self) -> (f32, f32) {
        clamp_pair(
            self.growth_min_secs,
            self.growth_max_secs,
            QUEEN_GROWTH_MIN_SECS,
            QUEEN_GROWTH_MAX_SECS,
        )
    }
}

impl Default for QueenConfig {
    fn default() -> Self {
        Self {
            health_min: default_queen_health_min(),
            health_max: default_queen_health_max(),
            growth_min_secs: default_queen_growth_min(),
            growth_max_secs: default_queen_growth_max(),
            max_controlled_parasites: default_max_controlled_parasites(),
        }
    }
}

/// Hive spawn parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HiveConfig {
    /// Lowest health a new hive may draw.
    #[serde(default = "default_hive_health_min")]
    pub health_min: f32,

    /// Highest health a new hive may draw.
    #[serde(default = "default_hive_health_max")]
    pub health_max: f32,

    /// Shortest construction time, in seconds.
    #[serde(default = "default_hive_construction_min")]
    pub construction_min_secs: f32,

    /// Longest construction time, in seconds.
    #[serde(default = "default_hive_construction_max")]
    pub construction_max_secs: f32,

    /// Smallest defensive swarm requested on completion.
    #[serde(default = "default_swarm_min")]
    pub swarm_min: u32,

    /// Largest defensive swarm requested on completion.
    #[serde(default = "default_swarm_max")]
    pub swarm_max: u32,
}

impl HiveConfig {
    /// Health draw range, clamped to `[20, 30]`.
    pub fn health_range(&self) -> (f32, f32) {
        clamp_pair(self.health_min, self.health_max, HIVE_HEALTH_MIN, HIVE_HEALTH_MAX)
    }

    /// Construction time draw range, clamped to `[10, 15]` seconds.
    pub fn construction_range(&self) -> (f32, f32) {
        clamp_pair(
            self.construction_min_secs,
            self.construction_max_secs,
            HIVE_CONSTRUCTION_MIN_SECS,
            HIVE_CONSTRUCTION_MAX_SECS,
        )
    }

    /// Swarm size draw range, clamped to `[50, 70]`.
    pub fn swarm_range(&self) -> (u32, u32) {
        let a = self.swarm_min.clamp(HIVE_SWARM_MIN, HIVE_SWARM_MAX);
        let b = self.swarm_max.clamp(HIVE_SWARM_MIN, HIVE_SWARM_MAX);
        (a.min(b), a.max(b))
    }
}

impl Default for HiveConfig {
    fn default() -> Self {
        Self {
            health_min: default_hive_health_min(),
            health_max: default_hive_health_max(),
            construction_min_secs: default_hive_construction_min(),
            construction_max_secs: default_hive_construction_max(),
            swarm_min: default_swarm_min(),
            swarm_max: default_swarm_max(),
        }
    }
}

/// Liberation window parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LiberationConfig {
    /// Shortest liberation window, in seconds.
    #[serde(default = "default_liberation_min")]
    pub duration_min_secs: f32,

    /// Longest liberation window, in seconds.
    #[serde(default = "default_liberation_max")]
    pub duration_max_secs: f32,

    /// Smallest energy reward.
    #[serde(default = "default_reward_min")]
    pub reward_min: f32,

    /// Largest energy reward.
    #[serde(default = "default_reward_max")]
    pub reward_max: f32,

    /// Mining-speed bonus while liberated.
    #[serde(default = "default_mining_bonus")]
    pub mining_bonus: f32,

    /// Most history records retained by the history trim.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl LiberationConfig {
    /// Duration draw range, clamped to `[180, 300]` seconds.
    pub fn duration_range(&self) -> (f32, f32) {
        clamp_pair(
            self.duration_min_secs,
            self.duration_max_secs,
            LIBERATION_MIN_SECS,
            LIBERATION_MAX_SECS,
        )
    }

    /// Reward draw range, clamped to `[50, 100]`.
    pub fn reward_range(&self) -> (f32, f32) {
        clamp_pair(
            self.reward_min,
            self.reward_max,
            LIBERATION_REWARD_MIN,
            LIBERATION_REWARD_MAX,
        )
    }
}

impl Default for LiberationConfig {
    fn default() -> Self {
        Self {
            duration_min_secs: default_liberation_min(),
            duration_max_secs: default_liberation_max(),
            reward_min: default_reward_min(),
            reward_max: default_reward_max(),
            mining_bonus: default_mining_bonus(),
            history_limit: default_history_limit(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_queen_health_min() -> f32 {
    QUEEN_HEALTH_MIN
}

const fn default_queen_health_max() -> f32 {
    QUEEN_HEALTH_MAX
}

const fn default_queen_growth_min() -> f32 {
    QUEEN_GROWTH_MIN_SECS
}

const fn default_queen_growth_max() -> f32 {
    QUEEN_GROWTH_MAX_SECS
}

const fn default_max_controlled_parasites() -> u32 {
    30
}

const fn default_hive_health_min() -> f32 {
    HIVE_HEALTH_MIN
}

const fn default_hive_health_max() -> f32 {
    HIVE_HEALTH_MAX
}

const fn default_hive_construction_min() -> f32 {
    HIVE_CONSTRUCTION_MIN_SECS
}

const fn default_hive_construction_max() -> f32 {
    HIVE_CONSTRUCTION_MAX_SECS
}

const fn default_swarm_min() -> u32 {
    HIVE_SWARM_MIN
}

const fn default_swarm_max() -> u32 {
    HIVE_SWARM_MAX
}

const fn default_liberation_min() -> f32 {
    LIBERATION_MIN_SECS
}

const fn default_liberation_max() -> f32 {
    LIBERATION_MAX_SECS
}

const fn default_reward_min() -> f32 {
    LIBERATION_REWARD_MIN
}

const fn default_reward_max() -> f32 {
    LIBERATION_REWARD_MAX
}

const fn default_mining_bonus() -> f32 {
    LIBERATION_MINING_BONUS
}

const fn default_history_limit() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_hard_limits() {
        let config = ColonyConfig::default();
        assert_eq!(config.queen.health_range(), (40.0, 100.0));
        assert_eq!(config.queen.growth_range(), (60.0, 120.0));
        assert_eq!(config.hive.health_range(), (20.0, 30.0));
        assert_eq!(config.hive.construction_range(), (10.0, 15.0));
        assert_eq!(config.hive.swarm_range(), (50, 70));
        assert_eq!(config.liberation.duration_range(), (180.0, 300.0));
        assert_eq!(config.liberation.reward_range(), (50.0, 100.0));
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let queen = QueenConfig {
            health_min: 20.0,
            health_max: 150.0,
            ..QueenConfig::default()
        };
        assert_eq!(queen.health_range(), (40.0, 100.0));

        let hive = HiveConfig {
            swarm_min: 90,
            swarm_max: 10,
            ..HiveConfig::default()
        };
        assert_eq!(hive.swarm_range(), (50, 70));
    }

    #[test]
    fn inverted_range_is_reordered() {
        let lib = LiberationConfig {
            duration_min_secs: 250.0,
            duration_max_secs: 200.0,
            ..LiberationConfig::default()
        };
        assert_eq!(lib.duration_range(), (200.0, 250.0));
    }

    #[test]
    fn nan_clamps_to_minimum() {
        assert!((clamp_to(f32::NAN, 40.0, 100.0) - 40.0).abs() < f32::EPSILON);
    }
}
