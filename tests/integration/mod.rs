//! Integration tests for kyc-onboard
//!
//! These tests run the library and the binary against an in-process fake of
//! the KYC backend.

#[path = "../common/mod.rs"]
pub mod common;

pub mod cli;
pub mod gateway_http;
pub mod onboarding_flow;
pub mod persistence_recovery;
