/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The class loader of a classpath: the class tables of all its jars, and the capability
//! tests the engine needs on them ("is this class an externally-owned account?", "which
//! signature algorithm does this account use?").
//!
//! Capabilities are resolved once per class by walking its superclasses and interfaces, and
//! memoized for the lifetime of the class loader. A class loader is built for each classpath
//! and cached by the node, so that jars defining classes with the same name in different
//! classpaths never collide.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use crate::{
    constants,
    error::TransactionRejected,
    signatures::SignatureKind,
    types::{ClassTag, InstrumentedJar, MethodSignature, TransactionReference},
    vm::{ClassDescriptor, MethodDescriptor, Vm},
};

/// What the engine can do with objects of a class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub is_storage: bool,
    pub is_contract: bool,
    pub is_externally_owned_account: bool,
    pub is_event: bool,
    pub is_consensus_update_event: bool,
    pub is_gas_price_update_event: bool,
    pub is_inflation_update_event: bool,
    /// The signature algorithm selected by an account class, if any.
    pub signature: Option<SignatureKind>,
}

struct LoadedClass {
    descriptor: ClassDescriptor,
    jar: TransactionReference,
}

pub struct EngineClassLoader {
    classpath: TransactionReference,
    /// Jars in load order (dependencies first) with their lengths.
    jars: Vec<(TransactionReference, usize)>,
    classes: HashMap<String, LoadedClass>,
    capabilities: Mutex<HashMap<String, Capabilities>>,
}

impl EngineClassLoader {
    /// Builds the class loader of `classpath` from its jars, given dependencies first. A class
    /// defined by more than one jar is resolved to the first one.
    pub(crate) fn build(
        classpath: TransactionReference,
        jars: Vec<(TransactionReference, InstrumentedJar)>,
        vm: &dyn Vm,
    ) -> Result<Self, TransactionRejected> {
        let mut classes = HashMap::new();
        let mut lengths = Vec::with_capacity(jars.len());

        for (reference, jar) in jars {
            let descriptors = vm.classes_of(&jar.bytes).map_err(|e| {
                TransactionRejected::new(format!("cannot load the jar installed by {reference}: {e}"))
            })?;
            for descriptor in descriptors {
                classes
                    .entry(descriptor.name.clone())
                    .or_insert(LoadedClass {
                        descriptor,
                        jar: reference,
                    });
            }
            lengths.push((reference, jar.len()));
        }

        Ok(Self {
            classpath,
            jars: lengths,
            classes,
            capabilities: Mutex::new(HashMap::new()),
        })
    }

    pub fn classpath(&self) -> TransactionReference {
        self.classpath
    }

    /// Lengths of all jars in the classpath, including dependencies.
    pub fn lengths_of_jars(&self) -> impl Iterator<Item = usize> + '_ {
        self.jars.iter().map(|(_, len)| *len)
    }

    pub fn jars(&self) -> impl Iterator<Item = TransactionReference> + '_ {
        self.jars.iter().map(|(reference, _)| *reference)
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.classes.contains_key(class_name)
    }

    pub fn descriptor(&self, class_name: &str) -> Option<&ClassDescriptor> {
        self.classes.get(class_name).map(|class| &class.descriptor)
    }

    /// The class tag for new objects of the given class.
    pub fn class_tag(&self, class_name: &str) -> Option<ClassTag> {
        self.classes.get(class_name).map(|class| ClassTag {
            class_name: class_name.to_string(),
            jar: class.jar,
        })
    }

    /// Looks up a method in its defining class and then upwards in the superclasses.
    pub fn method(&self, signature: &MethodSignature) -> Option<&MethodDescriptor> {
        let mut current = Some(signature.defining_class.as_str());
        while let Some(class_name) = current {
            let descriptor = self.descriptor(class_name)?;
            let found = descriptor.methods.iter().find(|m| {
                m.signature.name == signature.name
                    && m.signature.formals == signature.formals
                    && m.signature.returns == signature.returns
            });
            if found.is_some() {
                return found;
            }
            current = descriptor.superclass.as_deref();
        }
        None
    }

    /// The capabilities of a class, or `None` if the class is not in this classpath.
    pub fn capabilities(&self, class_name: &str) -> Option<Capabilities> {
        if let Some(capabilities) = self.capabilities.lock().get(class_name) {
            return Some(*capabilities);
        }

        if !self.contains(class_name) {
            return None;
        }

        let ancestors = self.ancestors(class_name);
        let has = |name: &str| ancestors.contains(name);
        let signature = if has(constants::ACCOUNT_ED25519) {
            Some(SignatureKind::Ed25519)
        } else if has(constants::ACCOUNT_SHA256DSA) {
            Some(SignatureKind::Sha256Dsa)
        } else if has(constants::ACCOUNT_QTESLA1) {
            Some(SignatureKind::Qtesla1)
        } else if has(constants::ACCOUNT_QTESLA3) {
            Some(SignatureKind::Qtesla3)
        } else {
            None
        };

        let capabilities = Capabilities {
            is_storage: has(constants::STORAGE),
            is_contract: has(constants::CONTRACT),
            is_externally_owned_account: has(constants::EXTERNALLY_OWNED_ACCOUNT),
            is_event: has(constants::EVENT),
            is_consensus_update_event: has(constants::CONSENSUS_UPDATE_EVENT),
            is_gas_price_update_event: has(constants::GAS_PRICE_UPDATE_EVENT),
            is_inflation_update_event: has(constants::INFLATION_UPDATE_EVENT),
            signature,
        };

        self.capabilities
            .lock()
            .insert(class_name.to_string(), capabilities);
        Some(capabilities)
    }

    /// The class itself with all its superclasses and interfaces, transitively. Supertypes
    /// missing from the classpath are kept by name but not walked.
    fn ancestors(&self, class_name: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut pending = vec![class_name.to_string()];
        while let Some(name) = pending.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(descriptor) = self.descriptor(&name) {
                pending.extend(descriptor.superclass.iter().cloned());
                pending.extend(descriptor.interfaces.iter().cloned());
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use borsh::{BorshDeserialize, BorshSerialize};

    use super::*;
    use crate::{
        context::ExecutionContext,
        error::ExecutionError,
        types::{StorageType, StorageValue},
        vm::Invocation,
    };

    struct TableVm;

    impl Vm for TableVm {
        fn classes_of(&self, instrumented_jar: &[u8]) -> anyhow::Result<Vec<ClassDescriptor>> {
            Ok(Vec::<ClassDescriptor>::try_from_slice(instrumented_jar)?)
        }

        fn invoke(
            &self,
            _ctx: &mut ExecutionContext<'_>,
            _invocation: &Invocation,
        ) -> Result<Option<StorageValue>, ExecutionError> {
            Ok(None)
        }
    }

    fn jar(classes: Vec<ClassDescriptor>) -> InstrumentedJar {
        InstrumentedJar::new(classes.try_to_vec().unwrap())
    }

    fn loader() -> EngineClassLoader {
        let base = jar(vec![
            ClassDescriptor::new(constants::STORAGE, None),
            ClassDescriptor::new(constants::CONTRACT, Some(constants::STORAGE)),
            ClassDescriptor::new(constants::EXTERNALLY_OWNED_ACCOUNT, Some(constants::CONTRACT))
                .with_method(MethodDescriptor::new(MethodSignature::getter(
                    constants::EXTERNALLY_OWNED_ACCOUNT,
                    "nonce",
                    StorageType::class(constants::BIG_INTEGER),
                ))),
            ClassDescriptor::new(constants::ACCOUNT_QTESLA1, None),
            ClassDescriptor::new(constants::EVENT, Some(constants::STORAGE)),
            ClassDescriptor::new(constants::GAS_PRICE_UPDATE_EVENT, Some(constants::EVENT)),
        ]);
        let user = jar(vec![
            ClassDescriptor::new("Wallet", Some(constants::EXTERNALLY_OWNED_ACCOUNT))
                .implementing(constants::ACCOUNT_QTESLA1),
            ClassDescriptor::new("PriceChange", Some(constants::GAS_PRICE_UPDATE_EVENT)),
            ClassDescriptor::new("Plain", None),
            // shadowed by the definition in the base jar
            ClassDescriptor::new(constants::STORAGE, Some("Plain")),
        ]);

        EngineClassLoader::build(
            TransactionReference([2u8; 32]),
            vec![
                (TransactionReference([1u8; 32]), base),
                (TransactionReference([2u8; 32]), user),
            ],
            &TableVm,
        )
        .unwrap()
    }

    #[test]
    fn test_capabilities() {
        let loader = loader();

        let wallet = loader.capabilities("Wallet").unwrap();
        assert!(wallet.is_externally_owned_account);
        assert!(wallet.is_contract);
        assert!(wallet.is_storage);
        assert!(!wallet.is_event);
        assert_eq!(wallet.signature, Some(SignatureKind::Qtesla1));

        let event = loader.capabilities("PriceChange").unwrap();
        assert!(event.is_event && event.is_gas_price_update_event);
        assert!(!event.is_consensus_update_event);

        assert_eq!(loader.capabilities("Plain"), Some(Capabilities::default()));
        assert_eq!(loader.capabilities("Missing"), None);

        // memoized answers are the same
        assert_eq!(loader.capabilities("Wallet"), Some(wallet));
    }

    #[test]
    fn test_first_definition_wins() {
        let loader = loader();
        let tag = loader.class_tag(constants::STORAGE).unwrap();
        assert_eq!(tag.jar, TransactionReference([1u8; 32]));
        assert_eq!(loader.descriptor(constants::STORAGE).unwrap().superclass, None);
        assert_eq!(loader.lengths_of_jars().count(), 2);
    }

    #[test]
    fn test_method_lookup_walks_superclasses() {
        let loader = loader();
        let inherited = MethodSignature::getter(
            "Wallet",
            "nonce",
            StorageType::class(constants::BIG_INTEGER),
        );
        assert!(loader.method(&inherited).is_some());
        let missing = MethodSignature::getter("Wallet", "nonce", StorageType::Int);
        assert!(loader.method(&missing).is_none());
    }
}
