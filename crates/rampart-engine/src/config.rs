//! Strand configuration: the immutable policy an engine is built from.
//!
//! A strand binds a classification, a compliance set and a crypto suite to
//! the concrete parameters the barriers enforce. Build one with
//! [`StrandConfig::builder`] or load it with [`StrandConfig::from_json`];
//! both paths end in [`StrandConfig::validate`]. Share it by `Arc`.

use rampart_crypto_core::kdf::{derive_segment_key, SegmentType, DEFAULT_SEGMENT_COUNT};
use rampart_crypto_core::SecretBuffer;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::policy::{ComplianceFramework, CryptoParameters, CryptoSuite, SecurityClassification};
use crate::threat::ThreatLevel;

/// Largest accepted segment space (2^24).
pub const MAX_SEGMENT_COUNT: u32 = 1 << 24;

/// What the engine does after the first FAILED barrier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPolicy {
    /// Run all 24 barriers and report every result.
    #[default]
    RunToCompletion,
    /// Stop at the first FAILED barrier.
    ShortCircuit,
}

// ── Strand configuration ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StrandConfig {
    #[serde(default = "default_classification")]
    pub classification: SecurityClassification,

    #[serde(default)]
    pub compliance: ComplianceFramework,

    #[serde(default = "default_suite")]
    pub suite: CryptoSuite,

    /// Size of the per-master segment key space.
    #[serde(default = "default_segment_count")]
    pub segment_count: u32,

    /// Lowest threat level the engine will ever apply.
    #[serde(default = "default_threat_floor")]
    pub threat_floor: ThreatLevel,

    #[serde(default)]
    pub execution_policy: ExecutionPolicy,

    /// Hardware barriers fail instead of warn at every threat level.
    #[serde(default)]
    pub require_hardware: bool,

    /// Biometric barriers fail instead of warn.
    #[serde(default)]
    pub require_biometric: bool,

    /// At least two factor classes, whatever the classification.
    #[serde(default)]
    pub require_mfa: bool,

    /// Minimum match score; the threat level may raise it further.
    #[serde(default = "default_biometric_threshold")]
    pub biometric_threshold: f64,

    /// Shares from a split with a lower K are rejected.
    #[serde(default = "default_min_share_threshold")]
    pub min_share_threshold: u8,
}

const fn default_classification() -> SecurityClassification {
    SecurityClassification::Controlled
}
const fn default_suite() -> CryptoSuite {
    CryptoSuite::Standard
}
const fn default_segment_count() -> u32 {
    DEFAULT_SEGMENT_COUNT
}
const fn default_threat_floor() -> ThreatLevel {
    ThreatLevel::Green
}
const fn default_biometric_threshold() -> f64 {
    rampart_crypto_core::DEFAULT_MATCH_THRESHOLD
}
const fn default_min_share_threshold() -> u8 {
    2
}

impl Default for StrandConfig {
    fn default() -> Self {
        Self {
            classification: default_classification(),
            compliance: ComplianceFramework::NONE,
            suite: default_suite(),
            segment_count: default_segment_count(),
            threat_floor: default_threat_floor(),
            execution_policy: ExecutionPolicy::default(),
            require_hardware: false,
            require_biometric: false,
            require_mfa: false,
            biometric_threshold: default_biometric_threshold(),
            min_share_threshold: default_min_share_threshold(),
        }
    }
}

impl StrandConfig {
    #[must_use]
    pub fn builder() -> StrandConfigBuilder {
        StrandConfigBuilder::default()
    }

    /// Parse and validate a JSON strand. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// - `EngineError::Json` if the document does not parse
    /// - `EngineError::Config` if an unknown framework name appears or
    ///   [`validate`](Self::validate) rejects the result
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` when the segment count is outside
    /// `1..=MAX_SEGMENT_COUNT`, the suite is weaker than the classification
    /// allows, a FIPS framework is paired with a non-approved digest, the
    /// biometric threshold is outside `0.5..=1.0`, or the share threshold
    /// is zero.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.segment_count == 0 || self.segment_count > MAX_SEGMENT_COUNT {
            return Err(EngineError::Config(format!(
                "segment count {} outside 1..={MAX_SEGMENT_COUNT}",
                self.segment_count
            )));
        }
        let floor = self.classification.minimum_suite();
        if self.suite < floor {
            return Err(EngineError::Config(format!(
                "suite {:?} is weaker than {:?} required for {:?}",
                self.suite, floor, self.classification
            )));
        }
        if self.compliance.requires_fips() && !self.parameters().hash_algorithm.is_fips_approved() {
            return Err(EngineError::Config(format!(
                "suite {:?} uses a digest not approved under FIPS 140",
                self.suite
            )));
        }
        if !(0.5..=1.0).contains(&self.biometric_threshold) {
            return Err(EngineError::Config(format!(
                "biometric threshold {} outside 0.5..=1.0",
                self.biometric_threshold
            )));
        }
        if self.min_share_threshold == 0 {
            return Err(EngineError::Config(
                "minimum share threshold must be at least 1".into(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub const fn parameters(&self) -> CryptoParameters {
        self.suite.parameters()
    }

    /// Factor classes an attempt must pass under this strand.
    #[must_use]
    pub fn required_factors(&self) -> usize {
        let floor = self.classification.required_factors();
        if self.require_mfa || self.compliance.requires_mfa() {
            floor.max(2)
        } else {
            floor
        }
    }

    /// Segment key `index` of `master` within this strand's segment space.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Crypto` if `index` is out of range or the
    /// master is empty.
    pub fn segment_key(
        &self,
        master: &[u8],
        index: u32,
        segment_type: SegmentType,
    ) -> Result<SecretBuffer, EngineError> {
        Ok(derive_segment_key(master, index, segment_type, self.segment_count)?)
    }

    /// Pretty-printed JSON form, accepted back by [`from_json`](Self::from_json).
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ── Builder ────────────────────────────────────────────────────────

/// Fluent construction; [`build`](Self::build) validates.
#[derive(Debug, Clone, Default)]
pub struct StrandConfigBuilder {
    config: StrandConfig,
}

impl StrandConfigBuilder {
    #[must_use]
    pub fn classification(mut self, classification: SecurityClassification) -> Self {
        self.config.classification = classification;
        self
    }

    #[must_use]
    pub fn compliance(mut self, compliance: ComplianceFramework) -> Self {
        self.config.compliance = compliance;
        self
    }

    #[must_use]
    pub fn suite(mut self, suite: CryptoSuite) -> Self {
        self.config.suite = suite;
        self
    }

    #[must_use]
    pub fn segment_count(mut self, segment_count: u32) -> Self {
        self.config.segment_count = segment_count;
        self
    }

    #[must_use]
    pub fn threat_floor(mut self, threat_floor: ThreatLevel) -> Self {
        self.config.threat_floor = threat_floor;
        self
    }

    #[must_use]
    pub fn execution_policy(mut self, policy: ExecutionPolicy) -> Self {
        self.config.execution_policy = policy;
        self
    }

    #[must_use]
    pub fn require_hardware(mut self, required: bool) -> Self {
        self.config.require_hardware = required;
        self
    }

    #[must_use]
    pub fn require_biometric(mut self, required: bool) -> Self {
        self.config.require_biometric = required;
        self
    }

    #[must_use]
    pub fn require_mfa(mut self, required: bool) -> Self {
        self.config.require_mfa = required;
        self
    }

    #[must_use]
    pub fn biometric_threshold(mut self, threshold: f64) -> Self {
        self.config.biometric_threshold = threshold;
        self
    }

    #[must_use]
    pub fn min_share_threshold(mut self, k: u8) -> Self {
        self.config.min_share_threshold = k;
        self
    }

    /// # Errors
    ///
    /// Returns `EngineError::Config` if [`StrandConfig::validate`] fails.
    pub fn build(self) -> Result<StrandConfig, EngineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
