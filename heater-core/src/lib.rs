//! Board-agnostic logic for the heater control board
//!
//! Everything in here runs on the host as well as on the MCU:
//!
//! - [`sensors`]: per-channel exponential moving-average filter bank
//! - [`safety`]: over-temperature interlock
//! - [`pid`]: fixed-point PI controller and its tick divider
//! - [`heater`]: heater mode state machine and output routing
//! - [`control`]: the control-timer tick tying the above together
//! - [`protocol`]: register-style command set and dispatcher

#![no_std]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod control;
pub mod heater;
pub mod pid;
pub mod protocol;
pub mod safety;
pub mod sensors;
