#![no_std]

// Shared logic for the capacitive-sense fault-injection harness.
//
// This crate stays portable across MCU firmware and host tooling by avoiding
// the Rust standard library and reaching hardware only through the seams in
// `session` (pulse output, blocking delay) and `report` (observer sink).

pub mod config;
pub mod flags;
pub mod log;
pub mod params;
pub mod report;
pub mod rng;
pub mod session;
