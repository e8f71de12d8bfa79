/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! State updates: the persistable delta produced by a transaction.
//!
//! Updates are totally ordered so that two independent computations of the same delta
//! serialize identically on every node:
//! 1. by the updated object,
//! 2. a class tag comes before any field update of the same object,
//! 3. field updates by defining class, then field name, then field type,
//! 4. finally by value, only to make the order total.

use std::cmp::Ordering;

use borsh::{BorshDeserialize, BorshSerialize};

use super::{ClassTag, FieldSignature, StorageReference, StorageValue, TransactionReference};

#[derive(Clone, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub enum Update {
    /// Run-time class and installing jar of an object, recorded when it first reaches the store.
    ClassTag {
        object: StorageReference,
        class_name: String,
        jar: TransactionReference,
    },
    Field {
        object: StorageReference,
        field: FieldSignature,
        value: StorageValue,
    },
}

impl Update {
    pub fn class_tag(object: StorageReference, tag: &ClassTag) -> Self {
        Update::ClassTag {
            object,
            class_name: tag.class_name.clone(),
            jar: tag.jar,
        }
    }

    pub fn field(object: StorageReference, field: FieldSignature, value: StorageValue) -> Self {
        Update::Field {
            object,
            field,
            value,
        }
    }

    pub fn object(&self) -> StorageReference {
        match self {
            Update::ClassTag { object, .. } | Update::Field { object, .. } => *object,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Update::ClassTag { .. } => 0,
            Update::Field { .. } => 1,
        }
    }
}

impl Ord for Update {
    fn cmp(&self, other: &Self) -> Ordering {
        self.object()
            .cmp(&other.object())
            .then_with(|| self.rank().cmp(&other.rank()))
            .then_with(|| match (self, other) {
                (
                    Update::ClassTag {
                        class_name: c1,
                        jar: j1,
                        ..
                    },
                    Update::ClassTag {
                        class_name: c2,
                        jar: j2,
                        ..
                    },
                ) => c1.cmp(c2).then_with(|| j1.cmp(j2)),
                (
                    Update::Field {
                        field: f1,
                        value: v1,
                        ..
                    },
                    Update::Field {
                        field: f2,
                        value: v2,
                        ..
                    },
                ) => f1.cmp(f2).then_with(|| v1.cmp(v2)),
                _ => Ordering::Equal,
            })
    }
}

impl PartialOrd for Update {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
