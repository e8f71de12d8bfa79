/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Runs the body of a transaction on a dedicated thread with its own stack.
//!
//! The thread is scoped: it borrows the execution context of the transaction, is always
//! joined before returning, and a panic inside contract code surfaces as an [InternalFailure]
//! instead of unwinding through the engine.

use std::any::Any;

use crate::error::InternalFailure;

pub(crate) fn run_isolated<T, F>(stack_size: usize, body: F) -> Result<T, InternalFailure>
where
    T: Send,
    F: FnOnce() -> T + Send,
{
    std::thread::scope(|scope| {
        let handle = std::thread::Builder::new()
            .name("transaction-body".to_string())
            .stack_size(stack_size)
            .spawn_scoped(scope, body)
            .map_err(|e| InternalFailure::new(format!("cannot start the execution thread: {e}")))?;

        handle.join().map_err(|panic| {
            InternalFailure::new(format!(
                "the execution thread panicked: {}",
                panic_message(panic.as_ref())
            ))
        })
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown cause"
    }
}
