/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! References, values and signatures as they are persisted in the store.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};

/// Identifier of a request/response pair in the ledger. It is the SHA-256 hash of the
/// serialized request, which also gives references a total order used as a map key.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize,
)]
pub struct TransactionReference(pub [u8; 32]);

impl TransactionReference {
    pub fn new(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// Hashes arbitrary bytes into a reference.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for TransactionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Reference to an object in store: the transaction that created it and a progressive
/// number among the objects created by that transaction.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize,
)]
pub struct StorageReference {
    pub transaction: TransactionReference,
    pub progressive: u64,
}

impl StorageReference {
    pub fn new(transaction: TransactionReference, progressive: u64) -> Self {
        Self {
            transaction,
            progressive,
        }
    }
}

impl fmt::Display for StorageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{:x}", self.transaction, self.progressive)
    }
}

/// Static type of a field, a formal argument or a return value.
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize,
)]
pub enum StorageType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    /// A class type, by fully-qualified name.
    Class(String),
}

impl StorageType {
    pub fn class(name: &str) -> Self {
        StorageType::Class(name.to_string())
    }

    /// Basic types and the scalar classes are stored eagerly, everything else lazily.
    pub fn is_eager(&self) -> bool {
        match self {
            StorageType::Class(name) => {
                name == crate::constants::STRING || name == crate::constants::BIG_INTEGER
            }
            _ => true,
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageType::Boolean => write!(f, "boolean"),
            StorageType::Byte => write!(f, "byte"),
            StorageType::Char => write!(f, "char"),
            StorageType::Short => write!(f, "short"),
            StorageType::Int => write!(f, "int"),
            StorageType::Long => write!(f, "long"),
            StorageType::Class(name) => write!(f, "{name}"),
        }
    }
}

/// A value that can be kept in store, passed as an actual argument or returned.
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize,
)]
pub enum StorageValue {
    Null,
    Boolean(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    BigInteger(i128),
    String(String),
    /// Element of an enumeration without instance fields.
    Enum { class_name: String, name: String },
    Reference(StorageReference),
}

impl StorageValue {
    pub fn as_reference(&self) -> Option<StorageReference> {
        match self {
            StorageValue::Reference(reference) => Some(*reference),
            _ => None,
        }
    }

    pub fn as_big_integer(&self) -> Option<i128> {
        match self {
            StorageValue::BigInteger(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            StorageValue::Long(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            StorageValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StorageValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StorageValue::String(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for StorageValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageValue::Null => write!(f, "null"),
            StorageValue::Boolean(v) => write!(f, "{v}"),
            StorageValue::Byte(v) => write!(f, "{v}"),
            StorageValue::Char(v) => write!(f, "'\\u{v:04x}'"),
            StorageValue::Short(v) => write!(f, "{v}"),
            StorageValue::Int(v) => write!(f, "{v}"),
            StorageValue::Long(v) => write!(f, "{v}"),
            StorageValue::BigInteger(v) => write!(f, "{v}"),
            StorageValue::String(v) => write!(f, "\"{v}\""),
            StorageValue::Enum { class_name, name } => write!(f, "{class_name}.{name}"),
            StorageValue::Reference(r) => write!(f, "{r}"),
        }
    }
}

/// A field, identified by the class that defines it, its name and its static type.
/// The derived order (defining class, then name, then type) is the order of updates
/// of the same object.
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize,
)]
pub struct FieldSignature {
    pub defining_class: String,
    pub name: String,
    pub field_type: StorageType,
}

impl FieldSignature {
    pub fn new(defining_class: &str, name: &str, field_type: StorageType) -> Self {
        Self {
            defining_class: defining_class.to_string(),
            name: name.to_string(),
            field_type,
        }
    }

    /// Green balance of a contract.
    pub fn balance() -> Self {
        Self::new(
            crate::constants::CONTRACT,
            "balance",
            StorageType::class(crate::constants::BIG_INTEGER),
        )
    }

    /// Red balance of a contract.
    pub fn red_balance() -> Self {
        Self::new(
            crate::constants::CONTRACT,
            "balanceRed",
            StorageType::class(crate::constants::BIG_INTEGER),
        )
    }

    /// Nonce of an externally-owned account.
    pub fn nonce() -> Self {
        Self::new(
            crate::constants::EXTERNALLY_OWNED_ACCOUNT,
            "nonce",
            StorageType::class(crate::constants::BIG_INTEGER),
        )
    }

    /// Base64url-encoded public key of an externally-owned account.
    pub fn public_key() -> Self {
        Self::new(
            crate::constants::EXTERNALLY_OWNED_ACCOUNT,
            "publicKey",
            StorageType::class(crate::constants::STRING),
        )
    }

    /// The contract that emitted an event.
    pub fn event_creator() -> Self {
        Self::new(
            crate::constants::EVENT,
            "creator",
            StorageType::class(crate::constants::CONTRACT),
        )
    }
}

impl fmt::Display for FieldSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}:{}", self.defining_class, self.name, self.field_type)
    }
}

/// Signature of a constructor.
#[derive(Clone, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct ConstructorSignature {
    pub defining_class: String,
    pub formals: Vec<StorageType>,
}

impl ConstructorSignature {
    pub fn new(defining_class: &str, formals: Vec<StorageType>) -> Self {
        Self {
            defining_class: defining_class.to_string(),
            formals,
        }
    }
}

/// Signature of a method. `returns` is `None` for void methods.
#[derive(Clone, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct MethodSignature {
    pub defining_class: String,
    pub name: String,
    pub formals: Vec<StorageType>,
    pub returns: Option<StorageType>,
}

impl MethodSignature {
    pub fn new(
        defining_class: &str,
        name: &str,
        formals: Vec<StorageType>,
        returns: Option<StorageType>,
    ) -> Self {
        Self {
            defining_class: defining_class.to_string(),
            name: name.to_string(),
            formals,
            returns,
        }
    }

    /// A getter without arguments.
    pub fn getter(defining_class: &str, name: &str, returns: StorageType) -> Self {
        Self::new(defining_class, name, Vec::new(), Some(returns))
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formals = self
            .formals
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{}.{}({})", self.defining_class, self.name, formals)
    }
}

/// Run-time class of an object and the jar that installed that class.
#[derive(Clone, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct ClassTag {
    pub class_name: String,
    pub jar: TransactionReference,
}

/// The state of an object as known to the store, at the uncommitted tip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectState {
    pub class_tag: ClassTag,
    pub fields: std::collections::BTreeMap<FieldSignature, StorageValue>,
}
