/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Implementation of the execution of transaction requests.
//!
//! A non-initial request goes through [admission] first. If admitted, it is executed across
//! [phases](phase): Pre-Charge -> Body -> Charge. The body runs [isolated](isolation) on its
//! own thread, against a private [heap] whose modifications become the [updates] of the
//! response. Initial requests, which bootstrap a node, are built by [initial].
//!
//! Everything here sees the node through a [node::NodeView], built by the runtime for each
//! request.

pub mod heap;

pub(crate) mod admission;

pub(crate) mod initial;

pub(crate) mod isolation;

pub(crate) mod node;

pub(crate) mod non_initial;

pub(crate) mod phase;

pub(crate) mod updates;
