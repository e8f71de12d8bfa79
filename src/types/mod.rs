/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines common data structures to be used inside this library, or from outside application.

pub mod values;
pub use values::*;

pub mod requests;
pub use requests::*;

pub mod responses;
pub use responses::*;

pub mod updates;
pub use updates::*;
