mod biometric_enrollment;
mod hardware_scenarios;
mod signature_aggregate;
mod threshold_scenarios;
mod vrf_roundtrip;
