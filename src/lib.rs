//! Firmware core for a humidity/temperature regulation node.
//!
//! The node samples its probes, sends telemetry to a single ESP-NOW peer, and
//! applies the heater/humidifier setpoints the peer sends back. The heater is
//! a resistive load on a triac, driven by phase-angle control synchronized to
//! the mains zero crossings.
//!
//! Everything here is board-agnostic; `main.rs` binds it to the ESP32-S3.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod error;
pub mod humidifier;
pub mod memlog;
pub mod peer;
pub mod phase_cut;
pub mod sensor;
pub mod storage;
pub mod task;
pub mod wire;
