//! Threat levels and the thresholds they impose.
//!
//! Every field of [`ThreatPolicy`] moves in one direction as the level
//! rises: ceilings and budgets shrink, penalties and requirements grow.
//! `threat_policy_is_monotone` pins this.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordinal escalation, `Green` (1) to `Red` (5).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatLevel {
    Green = 1,
    Blue = 2,
    Yellow = 3,
    Orange = 4,
    Red = 5,
}

/// Thresholds applied by the engine at one threat level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ThreatPolicy {
    /// Verdict fails once cumulative risk reaches this value.
    pub risk_ceiling: f64,
    /// Multiplier on each barrier's base timeout.
    pub timeout_factor: f64,
    /// Attempts allowed in the caller's rate window, this one included.
    pub max_attempts: u32,
    /// Fraction of a barrier's weight charged for a WARNING.
    pub warning_weight: f64,
    /// Minimum biometric match score.
    pub biometric_threshold: f64,
    /// Allowed distance between request time and engine time.
    pub clock_skew_secs: u64,
    /// Oldest acceptable hardware binding.
    pub max_binding_age_secs: u64,
    /// Hardware barriers fail instead of warn.
    pub hardware_mandatory: bool,
    /// Behavioral barriers fail instead of warn.
    pub behavioral_mandatory: bool,
}

impl ThreatLevel {
    pub const ALL: [Self; 5] = [Self::Green, Self::Blue, Self::Yellow, Self::Orange, Self::Red];

    #[must_use]
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            1 => Some(Self::Green),
            2 => Some(Self::Blue),
            3 => Some(Self::Yellow),
            4 => Some(Self::Orange),
            5 => Some(Self::Red),
            _ => None,
        }
    }

    /// Stricter of the configured floor and a caller override.
    #[must_use]
    pub fn effective(floor: Self, requested: Option<Self>) -> Self {
        requested.map_or(floor, |r| r.max(floor))
    }

    #[must_use]
    pub const fn policy(self) -> ThreatPolicy {
        match self {
            Self::Green => ThreatPolicy {
                risk_ceiling: 1.0,
                timeout_factor: 1.0,
                max_attempts: 10,
                warning_weight: 0.25,
                biometric_threshold: 0.95,
                clock_skew_secs: 300,
                max_binding_age_secs: 31_536_000, // 365 days
                hardware_mandatory: false,
                behavioral_mandatory: false,
            },
            Self::Blue => ThreatPolicy {
                risk_ceiling: 0.8,
                timeout_factor: 0.9,
                max_attempts: 8,
                warning_weight: 0.35,
                biometric_threshold: 0.95,
                clock_skew_secs: 180,
                max_binding_age_secs: 15_552_000, // 180 days
                hardware_mandatory: false,
                behavioral_mandatory: false,
            },
            Self::Yellow => ThreatPolicy {
                risk_ceiling: 0.6,
                timeout_factor: 0.75,
                max_attempts: 5,
                warning_weight: 0.5,
                biometric_threshold: 0.96,
                clock_skew_secs: 120,
                max_binding_age_secs: 7_776_000, // 90 days
                hardware_mandatory: false,
                behavioral_mandatory: false,
            },
            Self::Orange => ThreatPolicy {
                risk_ceiling: 0.4,
                timeout_factor: 0.6,
                max_attempts: 3,
                warning_weight: 0.75,
                biometric_threshold: 0.97,
                clock_skew_secs: 60,
                max_binding_age_secs: 2_592_000, // 30 days
                hardware_mandatory: true,
                behavioral_mandatory: false,
            },
            Self::Red => ThreatPolicy {
                risk_ceiling: 0.25,
                timeout_factor: 0.5,
                max_attempts: 2,
                warning_weight: 1.0,
                biometric_threshold: 0.98,
                clock_skew_secs: 30,
                max_binding_age_secs: 604_800, // 7 days
                hardware_mandatory: true,
                behavioral_mandatory: true,
            },
        }
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Green => "GREEN",
            Self::Blue => "BLUE",
            Self::Yellow => "YELLOW",
            Self::Orange => "ORANGE",
            Self::Red => "RED",
        })
    }
}
