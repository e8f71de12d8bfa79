/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Names of the classes the engine needs to recognise in installed code, and the
//! getters it calls on the manifest contracts to rebuild the consensus parameters.

use crate::types::{MethodSignature, StorageType};

/* ↓↓↓ Scalar classes ↓↓↓ */

pub const STRING: &str = "java.lang.String";
pub const BIG_INTEGER: &str = "java.math.BigInteger";

/* ↓↓↓ Storage classes of the base library ↓↓↓ */

pub const STORAGE: &str = "io.takamaka.code.lang.Storage";
pub const CONTRACT: &str = "io.takamaka.code.lang.Contract";
pub const EXTERNALLY_OWNED_ACCOUNT: &str = "io.takamaka.code.lang.ExternallyOwnedAccount";
pub const GAMETE: &str = "io.takamaka.code.lang.Gamete";
pub const EVENT: &str = "io.takamaka.code.lang.Event";

pub const ACCOUNT_ED25519: &str = "io.takamaka.code.lang.AccountED25519";
pub const ACCOUNT_SHA256DSA: &str = "io.takamaka.code.lang.AccountSHA256DSA";
pub const ACCOUNT_QTESLA1: &str = "io.takamaka.code.lang.AccountQTESLA1";
pub const ACCOUNT_QTESLA3: &str = "io.takamaka.code.lang.AccountQTESLA3";

/* ↓↓↓ Governance ↓↓↓ */

pub const MANIFEST: &str = "io.takamaka.code.governance.Manifest";
pub const VALIDATORS: &str = "io.takamaka.code.governance.Validators";
pub const GAS_STATION: &str = "io.takamaka.code.governance.GasStation";
pub const VERSIONS: &str = "io.takamaka.code.governance.Versions";

pub const CONSENSUS_UPDATE_EVENT: &str = "io.takamaka.code.governance.ConsensusUpdate";
pub const GAS_PRICE_UPDATE_EVENT: &str = "io.takamaka.code.governance.GasPriceUpdate";
pub const INFLATION_UPDATE_EVENT: &str = "io.takamaka.code.governance.InflationUpdate";

/* ↓↓↓ Cause class names of failed responses ↓↓↓ */

pub const OUT_OF_GAS_ERROR: &str = "io.hotmoka.OutOfGasError";
pub const DESERIALIZATION_ERROR: &str = "io.hotmoka.DeserializationError";
pub const SIDE_EFFECTS_IN_VIEW_METHOD_EXCEPTION: &str =
    "io.hotmoka.SideEffectsInViewMethodException";
pub const ILLEGAL_ARGUMENT_EXCEPTION: &str = "java.lang.IllegalArgumentException";
pub const NON_EXISTENT_OBJECT_ERROR: &str = "io.hotmoka.NonExistentObjectError";
pub const VERIFICATION_EXCEPTION: &str = "io.hotmoka.VerificationException";
pub const ARITHMETIC_EXCEPTION: &str = "java.lang.ArithmeticException";

/// Gas given to every view call issued while rebuilding the consensus parameters.
pub const GAS_FOR_CONSENSUS_QUERY: u64 = 100_000;

/* ↓↓↓ Getters of the manifest contracts ↓↓↓ */

fn string() -> StorageType {
    StorageType::class(STRING)
}

fn big_integer() -> StorageType {
    StorageType::class(BIG_INTEGER)
}

pub fn get_chain_id() -> MethodSignature {
    MethodSignature::getter(MANIFEST, "getChainId", string())
}

pub fn get_max_error_length() -> MethodSignature {
    MethodSignature::getter(MANIFEST, "getMaxErrorLength", StorageType::Int)
}

pub fn get_max_dependencies() -> MethodSignature {
    MethodSignature::getter(MANIFEST, "getMaxDependencies", StorageType::Int)
}

pub fn get_max_cumulative_size_of_dependencies() -> MethodSignature {
    MethodSignature::getter(MANIFEST, "getMaxCumulativeSizeOfDependencies", StorageType::Long)
}

pub fn allows_self_charged() -> MethodSignature {
    MethodSignature::getter(MANIFEST, "allowsSelfCharged", StorageType::Boolean)
}

pub fn allows_unsigned_faucet() -> MethodSignature {
    MethodSignature::getter(MANIFEST, "allowsUnsignedFaucet", StorageType::Boolean)
}

pub fn skips_verification() -> MethodSignature {
    MethodSignature::getter(MANIFEST, "skipsVerification", StorageType::Boolean)
}

pub fn get_signature() -> MethodSignature {
    MethodSignature::getter(MANIFEST, "getSignature", string())
}

pub fn get_validators() -> MethodSignature {
    MethodSignature::getter(MANIFEST, "getValidators", StorageType::class(VALIDATORS))
}

pub fn get_gas_station() -> MethodSignature {
    MethodSignature::getter(MANIFEST, "getGasStation", StorageType::class(GAS_STATION))
}

pub fn get_versions() -> MethodSignature {
    MethodSignature::getter(MANIFEST, "getVersions", StorageType::class(VERSIONS))
}

pub fn get_max_gas_per_transaction() -> MethodSignature {
    MethodSignature::getter(GAS_STATION, "getMaxGasPerTransaction", big_integer())
}

pub fn get_initial_gas_price() -> MethodSignature {
    MethodSignature::getter(GAS_STATION, "getInitialGasPrice", big_integer())
}

pub fn get_target_gas_at_reward() -> MethodSignature {
    MethodSignature::getter(GAS_STATION, "getTargetGasAtReward", big_integer())
}

pub fn get_oblivion() -> MethodSignature {
    MethodSignature::getter(GAS_STATION, "getOblivion", StorageType::Long)
}

pub fn ignores_gas_price() -> MethodSignature {
    MethodSignature::getter(GAS_STATION, "ignoresGasPrice", StorageType::Boolean)
}

pub fn get_gas_price() -> MethodSignature {
    MethodSignature::getter(GAS_STATION, "getGasPrice", big_integer())
}

pub fn get_initial_inflation() -> MethodSignature {
    MethodSignature::getter(VALIDATORS, "getInitialInflation", StorageType::Long)
}

pub fn get_current_inflation() -> MethodSignature {
    MethodSignature::getter(VALIDATORS, "getCurrentInflation", StorageType::Long)
}

pub fn get_verification_version() -> MethodSignature {
    MethodSignature::getter(VERSIONS, "getVerificationVersion", StorageType::Int)
}
