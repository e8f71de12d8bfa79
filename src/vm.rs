/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The seam towards the virtual machine that runs contract code.
//!
//! The engine never interprets bytecode. It asks the [Vm] for the class table of each
//! instrumented jar in a classpath, and it asks the [Vm] to run constructors and methods
//! against an [ExecutionContext], through which all state access and gas charging go.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::{
    context::ExecutionContext,
    error::ExecutionError,
    types::{ConstructorSignature, MethodSignature, StorageReference, StorageValue},
};

/// A class as declared by an instrumented jar.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ClassDescriptor {
    pub name: String,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub methods: Vec<MethodDescriptor>,
}

impl ClassDescriptor {
    pub fn new(name: &str, superclass: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            superclass: superclass.map(str::to_string),
            interfaces: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn implementing(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_string());
        self
    }

    pub fn with_method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }
}

/// Annotations of a method that the engine must honour.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct MethodDescriptor {
    pub signature: MethodSignature,
    /// The method must have no side effects besides gas bookkeeping.
    pub is_view: bool,
    /// The receiver, rather than the caller, pays for the gas.
    pub is_self_charged: bool,
    /// Checked exceptions thrown by the method are a normal outcome.
    pub throws_exceptions: bool,
}

impl MethodDescriptor {
    pub fn new(signature: MethodSignature) -> Self {
        Self {
            signature,
            is_view: false,
            is_self_charged: false,
            throws_exceptions: false,
        }
    }

    pub fn view(mut self) -> Self {
        self.is_view = true;
        self
    }

    pub fn self_charged(mut self) -> Self {
        self.is_self_charged = true;
        self
    }

    pub fn throws_exceptions(mut self) -> Self {
        self.throws_exceptions = true;
        self
    }
}

/// The code to run in the body of a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Invocation {
    Constructor {
        constructor: ConstructorSignature,
        actuals: Vec<StorageValue>,
    },
    Method {
        method: MethodSignature,
        receiver: Option<StorageReference>,
        actuals: Vec<StorageValue>,
    },
}

pub trait Vm: Send + Sync {
    /// Decodes the classes declared by an instrumented jar.
    fn classes_of(&self, instrumented_jar: &[u8]) -> anyhow::Result<Vec<ClassDescriptor>>;

    /// Runs a constructor or a method. A constructor returns a reference to the new object.
    fn invoke(
        &self,
        ctx: &mut ExecutionContext<'_>,
        invocation: &Invocation,
    ) -> Result<Option<StorageValue>, ExecutionError>;
}
