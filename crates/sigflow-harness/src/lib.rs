#![forbid(unsafe_code)]

//! Test harness for the sigflow signal engine.
//!
//! Provides a deterministic op-script driver plus a sequential reference
//! model of the delivery contract, so property-based tests and fuzz
//! targets can compare the real engine against expected per-observer
//! delivery logs.

pub mod script;
