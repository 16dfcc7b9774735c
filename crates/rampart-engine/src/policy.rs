//! Classification, compliance and crypto-suite policy types.
//!
//! Plain tagged enums plus a bitmask newtype. Presets compose by union and
//! the containment relations between them are pinned by tests.

use std::fmt;
use std::ops::BitOr;

use rampart_crypto_core::signature::ML_DSA_65_SIGNATURE_LEN;
use ring::digest;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

// ── Security classification ────────────────────────────────────────

/// Sensitivity of the resource being unlocked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityClassification {
    Unclassified,
    Controlled,
    Confidential,
    Secret,
    TopSecret,
}

impl SecurityClassification {
    /// Distinct factor classes that must pass (see [`crate::FactorClass`]).
    #[must_use]
    pub const fn required_factors(self) -> usize {
        match self {
            Self::Unclassified => 1,
            Self::Controlled | Self::Confidential => 2,
            Self::Secret => 3,
            Self::TopSecret => 4,
        }
    }

    /// Weakest suite a strand at this classification may use.
    #[must_use]
    pub const fn minimum_suite(self) -> CryptoSuite {
        match self {
            Self::Unclassified | Self::Controlled => CryptoSuite::Standard,
            Self::Confidential => CryptoSuite::Enhanced,
            Self::Secret | Self::TopSecret => CryptoSuite::QuantumSafe,
        }
    }
}

// ── Compliance frameworks ──────────────────────────────────────────

/// Set of compliance frameworks a strand must satisfy.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ComplianceFramework(u32);

const FRAMEWORK_NAMES: [(&str, ComplianceFramework); 12] = [
    ("fips_140", ComplianceFramework::FIPS_140),
    ("common_criteria", ComplianceFramework::COMMON_CRITERIA),
    ("soc2", ComplianceFramework::SOC2),
    ("iso27001", ComplianceFramework::ISO27001),
    ("hipaa", ComplianceFramework::HIPAA),
    ("pci_dss", ComplianceFramework::PCI_DSS),
    ("gdpr", ComplianceFramework::GDPR),
    ("nist_800_63", ComplianceFramework::NIST_800_63),
    ("fedramp", ComplianceFramework::FEDRAMP),
    ("cjis", ComplianceFramework::CJIS),
    ("itar", ComplianceFramework::ITAR),
    ("cmmc", ComplianceFramework::CMMC),
];

impl ComplianceFramework {
    pub const NONE: Self = Self(0);

    pub const FIPS_140: Self = Self(1 << 0);
    pub const COMMON_CRITERIA: Self = Self(1 << 1);
    pub const SOC2: Self = Self(1 << 2);
    pub const ISO27001: Self = Self(1 << 3);
    pub const HIPAA: Self = Self(1 << 4);
    pub const PCI_DSS: Self = Self(1 << 5);
    pub const GDPR: Self = Self(1 << 6);
    pub const NIST_800_63: Self = Self(1 << 7);
    pub const FEDRAMP: Self = Self(1 << 8);
    pub const CJIS: Self = Self(1 << 9);
    pub const ITAR: Self = Self(1 << 10);
    pub const CMMC: Self = Self(1 << 11);

    const ALL_BITS: u32 = 0x0FFF;

    pub const COMMERCIAL: Self = Self::SOC2.union(Self::ISO27001).union(Self::GDPR);
    pub const HEALTHCARE: Self = Self::HIPAA.union(Self::SOC2).union(Self::ISO27001);
    pub const GOVERNMENT: Self = Self::FIPS_140
        .union(Self::COMMON_CRITERIA)
        .union(Self::NIST_800_63)
        .union(Self::FEDRAMP)
        .union(Self::CJIS);
    pub const MILITARY: Self = Self::GOVERNMENT.union(Self::ITAR).union(Self::CMMC);

    /// Frameworks whose assurance level needs a hardware-bound authenticator.
    const HARDWARE_BOUND: Self = Self::NIST_800_63
        .union(Self::FEDRAMP)
        .union(Self::ITAR)
        .union(Self::CMMC);

    /// Frameworks that mandate multi-factor authentication.
    const MULTI_FACTOR: Self = Self::HIPAA
        .union(Self::PCI_DSS)
        .union(Self::NIST_800_63)
        .union(Self::FEDRAMP)
        .union(Self::CJIS);

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// # Errors
    ///
    /// Returns `EngineError::Config` if `bits` has any undefined flag set.
    pub fn from_bits(bits: u32) -> Result<Self, EngineError> {
        let unknown = bits & !Self::ALL_BITS;
        if unknown != 0 {
            return Err(EngineError::Config(format!(
                "unknown compliance flags {unknown:#x}"
            )));
        }
        Ok(Self(bits))
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// `true` if every flag of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn requires_fips(self) -> bool {
        self.intersects(Self::FIPS_140)
    }

    #[must_use]
    pub const fn requires_hardware(self) -> bool {
        self.intersects(Self::HARDWARE_BOUND)
    }

    #[must_use]
    pub const fn requires_mfa(self) -> bool {
        self.intersects(Self::MULTI_FACTOR)
    }

    /// Flag names in bit order.
    #[must_use]
    pub fn names(self) -> Vec<&'static str> {
        FRAMEWORK_NAMES
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(name, _)| *name)
            .collect()
    }

    /// Single flag or preset by name (`"hipaa"`, `"military"`, ...).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase().replace('-', "_");
        match lower.as_str() {
            "commercial" => Some(Self::COMMERCIAL),
            "healthcare" => Some(Self::HEALTHCARE),
            "government" => Some(Self::GOVERNMENT),
            "military" => Some(Self::MILITARY),
            other => FRAMEWORK_NAMES
                .iter()
                .find(|(n, _)| *n == other)
                .map(|(_, flag)| *flag),
        }
    }
}

impl BitOr for ComplianceFramework {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Debug for ComplianceFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComplianceFramework").field(&self.names()).finish()
    }
}

impl TryFrom<Vec<String>> for ComplianceFramework {
    type Error = EngineError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        names.iter().try_fold(Self::NONE, |acc, name| {
            Self::from_name(name)
                .map(|flag| acc.union(flag))
                .ok_or_else(|| EngineError::Config(format!("unknown compliance framework '{name}'")))
        })
    }
}

impl From<ComplianceFramework> for Vec<String> {
    fn from(value: ComplianceFramework) -> Self {
        value.names().into_iter().map(String::from).collect()
    }
}

// ── Crypto suites ──────────────────────────────────────────────────

/// Digest used for credential fingerprints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    Sha256,
    Sha384,
    Sha512,
    Blake3,
}

impl HashAlgorithm {
    #[must_use]
    pub const fn is_fips_approved(self) -> bool {
        !matches!(self, Self::Blake3)
    }

    /// Domain-separated digest of `data`.
    #[must_use]
    pub fn digest(self, domain: &[u8], data: &[u8]) -> Vec<u8> {
        let ring_alg = match self {
            Self::Sha256 => &digest::SHA256,
            Self::Sha384 => &digest::SHA384,
            Self::Sha512 => &digest::SHA512,
            Self::Blake3 => {
                let mut h = blake3::Hasher::new();
                h.update(&(domain.len() as u64).to_le_bytes());
                h.update(domain);
                h.update(data);
                return h.finalize().as_bytes().to_vec();
            }
        };
        let mut ctx = digest::Context::new(ring_alg);
        ctx.update(&(domain.len() as u64).to_le_bytes());
        ctx.update(domain);
        ctx.update(data);
        ctx.finish().as_ref().to_vec()
    }
}

/// Post-quantum signature family carried in the lattice layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PqSignature {
    MlDsa65,
}

impl PqSignature {
    #[must_use]
    pub const fn signature_len(self) -> usize {
        match self {
            Self::MlDsa65 => ML_DSA_65_SIGNATURE_LEN,
        }
    }
}

/// Concrete parameters selected by a [`CryptoSuite`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoParameters {
    pub hash_algorithm: HashAlgorithm,
    pub pq_signature: PqSignature,
    /// Floor for challenge size and reconstructed secret size, in bits.
    pub min_entropy_bits: u32,
    /// Strength required of external asymmetric keys, in bits.
    pub asymmetric_key_bits: u32,
}

/// Named algorithm suite.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CryptoSuite {
    Standard,
    Enhanced,
    QuantumSafe,
    Sovereign,
}

impl CryptoSuite {
    /// Resolve a suite by name; case, `-` and `_` are ignored.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` for an unknown name.
    pub fn lookup(name: &str) -> Result<Self, EngineError> {
        let key: String = name
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "standard" => Ok(Self::Standard),
            "enhanced" => Ok(Self::Enhanced),
            "quantumsafe" => Ok(Self::QuantumSafe),
            "sovereign" => Ok(Self::Sovereign),
            _ => Err(EngineError::Config(format!("unknown crypto suite '{name}'"))),
        }
    }

    #[must_use]
    pub const fn parameters(self) -> CryptoParameters {
        match self {
            Self::Standard => CryptoParameters {
                hash_algorithm: HashAlgorithm::Sha256,
                pq_signature: PqSignature::MlDsa65,
                min_entropy_bits: 128,
                asymmetric_key_bits: 256,
            },
            Self::Enhanced => CryptoParameters {
                hash_algorithm: HashAlgorithm::Sha384,
                pq_signature: PqSignature::MlDsa65,
                min_entropy_bits: 192,
                asymmetric_key_bits: 384,
            },
            Self::QuantumSafe => CryptoParameters {
                hash_algorithm: HashAlgorithm::Sha512,
                pq_signature: PqSignature::MlDsa65,
                min_entropy_bits: 256,
                asymmetric_key_bits: 521,
            },
            Self::Sovereign => CryptoParameters {
                hash_algorithm: HashAlgorithm::Blake3,
                pq_signature: PqSignature::MlDsa65,
                min_entropy_bits: 256,
                asymmetric_key_bits: 521,
            },
        }
    }
}
