//! The verification engine: runs [`BARRIERS`] over one attempt and folds
//! the results into a [`VerificationVerdict`].
//!
//! Aggregation rules:
//!
//! - PASSED charges no risk, WARNING charges `weight * warning_weight`,
//!   FAILED charges the full `weight`.
//! - The verdict is PASSED only if no barrier FAILED and cumulative risk
//!   stays strictly below the threat level's ceiling.
//! - Missing evidence on a mandatory barrier is FAILED, never WARNING.
//! - A barrier that overruns its budget is FAILED whatever it concluded.
//!
//! The engine holds no per-attempt state between calls; one instance can
//! serve concurrent `verify` calls from several threads.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use data_encoding::HEXLOWER;
use rampart_crypto_core::hardware::AttestationVerifier;
use rampart_crypto_core::quantum::correlation_hash;
use rampart_crypto_core::SecretBuffer;
use serde::Serialize;

use crate::attempt::AuthenticationAttempt;
use crate::barrier::{BarrierSpec, BARRIERS, BARRIER_COUNT};
use crate::checks::{self, Outcome, Pipeline};
use crate::config::{ExecutionPolicy, StrandConfig};
use crate::error::EngineError;
use crate::threat::ThreatLevel;

const PRINCIPAL_TAG_CONTEXT: &str = "rampart principal-id v1";

// ── Clock ──────────────────────────────────────────────────────────

/// Time source for budgets and freshness checks.
pub trait Clock: Send + Sync {
    /// Monotonic instant used to time barriers.
    fn now(&self) -> Instant;
    /// Wall-clock Unix seconds used for request and binding freshness.
    fn unix_time(&self) -> u64;
}

/// [`Clock`] backed by the operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_time(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs())
    }
}

// ── Results ────────────────────────────────────────────────────────

/// Independent class of authentication evidence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorClass {
    /// Threshold secret and ZK proof of knowledge.
    Knowledge,
    /// Multi-layer signing key.
    Possession,
    /// Enrolled device with valid, fresh attestation.
    Hardware,
    /// Live biometric match.
    Inherence,
    /// Typing rhythm and interaction profile.
    Behavior,
}

impl FactorClass {
    pub const ALL: [Self; 5] = [
        Self::Knowledge,
        Self::Possession,
        Self::Hardware,
        Self::Inherence,
        Self::Behavior,
    ];

    /// Barriers that must all be PASSED for this class to count.
    #[must_use]
    pub const fn barriers(self) -> &'static [u8] {
        match self {
            Self::Knowledge => &[13, 14],
            Self::Possession => &[16, 17],
            Self::Hardware => &[6, 7, 8],
            Self::Inherence => &[9, 10, 11],
            Self::Behavior => &[19, 20],
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Knowledge => "knowledge",
            Self::Possession => "possession",
            Self::Hardware => "hardware",
            Self::Inherence => "inherence",
            Self::Behavior => "behavior",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BarrierStatus {
    Passed,
    Warning,
    Failed,
}

/// Why a barrier ended FAILED.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Evidence present but wrong or out of policy.
    Rejected,
    /// Mandatory evidence absent.
    MissingEvidence,
    /// Commitment or binding mismatch.
    Tamper,
    /// Budget exceeded.
    Timeout,
}

/// Outcome of one barrier.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BarrierResult {
    pub id: u8,
    pub name: &'static str,
    pub status: BarrierStatus,
    /// Set only when `status` is FAILED.
    pub failure: Option<FailureKind>,
    /// Non-secret explanation.
    pub details: String,
    pub execution_time: Duration,
    pub budget: Duration,
    pub risk_contribution: f64,
}

impl BarrierResult {
    /// Convert a FAILED result into the error a caller would surface.
    fn to_error(&self) -> Option<EngineError> {
        let kind = self.failure?;
        Some(match kind {
            FailureKind::Rejected => EngineError::VerificationFailure {
                barrier_id: self.id,
                reason: self.details.clone(),
            },
            FailureKind::MissingEvidence => EngineError::InsufficientEvidence(format!(
                "barrier {} ({}): {}",
                self.id, self.name, self.details
            )),
            FailureKind::Tamper => EngineError::TamperDetected(format!(
                "barrier {} ({}): {}",
                self.id, self.name, self.details
            )),
            FailureKind::Timeout => EngineError::Timeout {
                barrier_id: self.id,
                elapsed_ms: duration_ms(self.execution_time),
                budget_ms: duration_ms(self.budget),
            },
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictOutcome {
    Passed,
    Failed,
}

/// Aggregate result of one attempt.
///
/// Serializes to an audit record; the session key is never serialized and
/// is only present on a PASSED verdict.
#[derive(Debug, Serialize)]
pub struct VerificationVerdict {
    pub correlation_id: String,
    pub outcome: VerdictOutcome,
    pub threat_level: ThreatLevel,
    pub cumulative_risk: f64,
    pub risk_ceiling: f64,
    /// In barrier order. Shorter than 24 only under short-circuit.
    pub results: Vec<BarrierResult>,
    #[serde(skip)]
    session_key: Option<SecretBuffer>,
}

impl VerificationVerdict {
    #[must_use]
    pub fn is_passed(&self) -> bool {
        self.outcome == VerdictOutcome::Passed
    }

    /// Key derived by barrier 18, present only when the verdict PASSED.
    #[must_use]
    pub const fn session_key(&self) -> Option<&SecretBuffer> {
        self.session_key.as_ref()
    }

    /// Move the session key out, leaving `None`.
    pub fn take_session_key(&mut self) -> Option<SecretBuffer> {
        self.session_key.take()
    }

    #[must_use]
    pub fn result(&self, id: u8) -> Option<&BarrierResult> {
        self.results.iter().find(|r| r.id == id)
    }

    pub fn failed(&self) -> impl Iterator<Item = &BarrierResult> {
        self.results
            .iter()
            .filter(|r| r.status == BarrierStatus::Failed)
    }

    /// Error for the lowest-numbered FAILED barrier, if any.
    #[must_use]
    pub fn first_failure(&self) -> Option<EngineError> {
        self.failed().find_map(BarrierResult::to_error)
    }

    /// `Ok(self)` when PASSED; otherwise the first barrier failure, or
    /// `RiskExceeded` when warnings alone sank the verdict.
    ///
    /// # Errors
    ///
    /// Any [`EngineError`] variant describing why the verdict FAILED.
    pub fn into_result(self) -> Result<Self, EngineError> {
        if self.is_passed() {
            return Ok(self);
        }
        Err(self.first_failure().unwrap_or(EngineError::RiskExceeded {
            risk: self.cumulative_risk,
            ceiling: self.risk_ceiling,
        }))
    }
}

// ── Engine ─────────────────────────────────────────────────────────

/// Runs the barrier pipeline under one validated [`StrandConfig`].
#[derive(Clone)]
pub struct VerificationEngine {
    config: Arc<StrandConfig>,
    clock: Arc<dyn Clock>,
    attestation_verifier: Option<Arc<dyn AttestationVerifier>>,
}

impl fmt::Debug for VerificationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationEngine")
            .field("config", &self.config)
            .field("attestation_verifier", &self.attestation_verifier.is_some())
            .finish_non_exhaustive()
    }
}

impl VerificationEngine {
    /// Engine on the system clock.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if `config` fails validation.
    pub fn new(config: impl Into<Arc<StrandConfig>>) -> Result<Self, EngineError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Engine on a caller-supplied clock.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if `config` fails validation.
    pub fn with_clock(
        config: impl Into<Arc<StrandConfig>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, EngineError> {
        let config = config.into();
        config.validate()?;
        tracing::debug!(
            classification = ?config.classification,
            suite = ?config.suite,
            threat_floor = %config.threat_floor,
            "verification engine configured"
        );
        Ok(Self {
            config,
            clock,
            attestation_verifier: None,
        })
    }

    /// Delegate barrier 7 to a platform attestation verifier instead of
    /// the structural check.
    #[must_use]
    pub fn with_attestation_verifier(mut self, verifier: Arc<dyn AttestationVerifier>) -> Self {
        self.attestation_verifier = Some(verifier);
        self
    }

    #[must_use]
    pub fn config(&self) -> &StrandConfig {
        &self.config
    }

    /// Threat level applied to `attempt`: the stricter of the floor and the
    /// attempt's override.
    #[must_use]
    pub fn effective_threat(&self, attempt: &AuthenticationAttempt) -> ThreatLevel {
        ThreatLevel::effective(self.config.threat_floor, attempt.threat_override)
    }

    /// Run every barrier against `attempt`.
    ///
    /// A FAILED verdict is a normal return; only infrastructure problems
    /// (no randomness for the correlation id) are errors. Use
    /// [`VerificationVerdict::into_result`] to turn a FAILED verdict into
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Crypto` if the correlation id cannot be drawn.
    pub fn verify(
        &self,
        attempt: &AuthenticationAttempt,
    ) -> Result<VerificationVerdict, EngineError> {
        let correlation_id = correlation_hash()?;
        let threat = self.effective_threat(attempt);
        let policy = threat.policy();
        let principal = principal_tag(&attempt.principal_id);

        tracing::info!(
            correlation_id = %correlation_id,
            principal = %principal,
            threat = %threat,
            "verification started"
        );

        let mut pipeline = Pipeline {
            config: &self.config,
            threat,
            policy,
            attempt,
            now: self.clock.unix_time(),
            correlation_id: &correlation_id,
            verifier: self.attestation_verifier.as_ref(),
            secret: None,
            session_key: None,
            statuses: [None; BARRIER_COUNT],
        };

        let mut results: Vec<BarrierResult> = Vec::with_capacity(BARRIER_COUNT);
        let mut any_failed = false;

        for spec in &BARRIERS {
            let result = self.run_barrier(spec, &mut pipeline);
            if let Some(slot) = usize::from(spec.id)
                .checked_sub(1)
                .and_then(|i| pipeline.statuses.get_mut(i))
            {
                *slot = Some(result.status);
            }
            let failed = result.status == BarrierStatus::Failed;
            results.push(result);
            if failed {
                any_failed = true;
                pipeline.discard(spec.check);
                if self.config.execution_policy == ExecutionPolicy::ShortCircuit {
                    break;
                }
            }
        }

        let risk: f64 = results.iter().map(|r| r.risk_contribution).sum();
        let passed = !any_failed && risk < policy.risk_ceiling;
        let outcome = if passed {
            VerdictOutcome::Passed
        } else {
            VerdictOutcome::Failed
        };
        let session_key = if passed {
            pipeline.session_key.take()
        } else {
            None
        };

        tracing::info!(
            correlation_id = %correlation_id,
            principal = %principal,
            threat = %threat,
            outcome = ?outcome,
            cumulative_risk = risk,
            risk_ceiling = policy.risk_ceiling,
            barriers_run = results.len(),
            "verification finished"
        );

        Ok(VerificationVerdict {
            correlation_id,
            outcome,
            threat_level: threat,
            cumulative_risk: risk,
            risk_ceiling: policy.risk_ceiling,
            results,
            session_key,
        })
    }

    #[allow(clippy::arithmetic_side_effects)]
    fn run_barrier(&self, spec: &BarrierSpec, pipeline: &mut Pipeline<'_>) -> BarrierResult {
        let budget = spec.budget(pipeline.policy.timeout_factor);
        let mandatory = spec.is_mandatory(pipeline.config, &pipeline.policy);

        let started = self.clock.now();
        let outcome = checks::run(spec.check, pipeline);
        let execution_time = self.clock.now().saturating_duration_since(started);

        let (status, failure, details) = if execution_time > budget {
            (
                BarrierStatus::Failed,
                Some(FailureKind::Timeout),
                format!(
                    "took {}ms; budget {}ms",
                    duration_ms(execution_time),
                    duration_ms(budget)
                ),
            )
        } else {
            resolve(outcome, mandatory)
        };

        let risk_contribution = match status {
            BarrierStatus::Passed => 0.0,
            BarrierStatus::Warning => spec.weight * pipeline.policy.warning_weight,
            BarrierStatus::Failed => spec.weight,
        };

        tracing::debug!(
            barrier = spec.id,
            name = spec.name,
            status = ?status,
            elapsed_us = u64::try_from(execution_time.as_micros()).unwrap_or(u64::MAX),
            risk = risk_contribution,
            "barrier evaluated"
        );
        if status == BarrierStatus::Failed {
            tracing::warn!(
                barrier = spec.id,
                name = spec.name,
                failure = ?failure,
                details = %details,
                "barrier failed"
            );
        }

        BarrierResult {
            id: spec.id,
            name: spec.name,
            status,
            failure,
            details,
            execution_time,
            budget,
            risk_contribution,
        }
    }
}

/// Apply the barrier's mandate to a handler outcome.
fn resolve(outcome: Outcome, mandatory: bool) -> (BarrierStatus, Option<FailureKind>, String) {
    match outcome {
        Outcome::Pass(d) => (BarrierStatus::Passed, None, d),
        Outcome::Missing(d) if mandatory => {
            (BarrierStatus::Failed, Some(FailureKind::MissingEvidence), d)
        }
        Outcome::Degraded(d) if mandatory => {
            (BarrierStatus::Failed, Some(FailureKind::Rejected), d)
        }
        Outcome::Missing(d) | Outcome::Degraded(d) => (BarrierStatus::Warning, None, d),
        Outcome::Reject(d) => (BarrierStatus::Failed, Some(FailureKind::Rejected), d),
        Outcome::Tamper(d) => (BarrierStatus::Failed, Some(FailureKind::Tamper), d),
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Log-safe stand-in for a principal id.
fn principal_tag(principal_id: &str) -> String {
    let digest = blake3::derive_key(PRINCIPAL_TAG_CONTEXT, principal_id.as_bytes());
    HEXLOWER.encode(digest.get(..8).unwrap_or(&digest))
}
