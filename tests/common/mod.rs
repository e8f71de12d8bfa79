#[cfg(test)]
#[allow(dead_code)]
pub mod memory_store;
pub use memory_store::*;

#[cfg(test)]
#[allow(dead_code)]
pub mod mock_vm;
pub use mock_vm::*;

#[cfg(test)]
#[allow(dead_code)]
pub mod test_data;
pub use test_data::*;
