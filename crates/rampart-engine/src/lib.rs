//! `rampart-engine`: the 24-barrier verification pipeline.
//!
//! Takes a validated [`StrandConfig`] and one [`AuthenticationAttempt`],
//! runs every barrier in order and returns a [`VerificationVerdict`].
//! No I/O, no storage: enrollment records and evidence come from the
//! caller, the verdict goes back to it.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;

pub mod policy;
pub mod threat;
pub mod config;

pub mod attempt;
pub mod barrier;
mod checks;
pub mod engine;

pub use attempt::{
    secret_fingerprint, signed_message, AuthenticationAttempt, BehavioralSignals,
    EnrolledCredentials, GeoFix, KeystrokeProfile, NetworkContext,
};
pub use barrier::{barrier, BarrierSpec, Check, CheckKind, BARRIERS, BARRIER_COUNT};
pub use config::{ExecutionPolicy, StrandConfig, StrandConfigBuilder, MAX_SEGMENT_COUNT};
pub use engine::{
    BarrierResult, BarrierStatus, Clock, FactorClass, FailureKind, SystemClock, VerdictOutcome,
    VerificationEngine, VerificationVerdict,
};
pub use error::EngineError;
pub use policy::{
    ComplianceFramework, CryptoParameters, CryptoSuite, HashAlgorithm, PqSignature,
    SecurityClassification,
};
pub use threat::{ThreatLevel, ThreatPolicy};
