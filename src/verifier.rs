/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The seam towards the bytecode verifier and instrumenter.

use std::fmt;

use crate::types::InstrumentedJar;

/// An error reported by the verifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationError {
    pub class_name: Option<String>,
    pub message: String,
}

impl VerificationError {
    pub fn new(message: &str) -> Self {
        Self {
            class_name: None,
            message: message.to_string(),
        }
    }

    pub fn in_class(class_name: &str, message: &str) -> Self {
        Self {
            class_name: Some(class_name.to_string()),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for VerificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.class_name {
            Some(class_name) => write!(f, "{class_name}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// What the verifier needs to know about the rule set to apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerificationRules {
    pub verification_version: u32,
    /// Initial jars may use features forbidden to ordinary jars.
    pub is_initial: bool,
    /// Instrument without reporting verification errors.
    pub skips_verification: bool,
}

pub trait Verifier: Send + Sync {
    /// Verifies the original bytes of a jar against the instrumented bytes of its dependencies
    /// and instruments it. Errors are reported in the order the verifier found them.
    fn verify_and_instrument(
        &self,
        jar: &[u8],
        dependencies: &[&InstrumentedJar],
        rules: VerificationRules,
    ) -> Result<InstrumentedJar, Vec<VerificationError>>;
}
