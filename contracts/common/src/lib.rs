#![cfg_attr(not(test), no_std)]
//! Shared fixed-point math for the Harambee funding contracts.

pub mod math;
