/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines all components related to execution gas cost and metering.
//!
//! Gas is the base measurement unit for transaction execution cost. The [constants] module
//! prices every step; the [gas_meter] module tallies what a single transaction consumed.

pub mod constants;
pub use constants::*;

pub mod gas_meter;
pub use gas_meter::*;
