#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Security validation suite for rampart-crypto-core.
//!
//! - Debug/Display masking of every type that holds secret bytes
//! - CSPRNG output quality via Shannon entropy
//! - mlock status and core dump disabling

mod security;
