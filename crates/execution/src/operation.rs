//! Traced operations around sub-computations
//!
//! Purely observational: a runner must return exactly what the operation
//! returns.

use std::fmt;
use std::time::Instant;
use tracing::{debug, debug_span};

/// Human-readable description of an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    display_name: String,
}

impl OperationDescriptor {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

impl fmt::Display for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}

/// Runs a computation under a descriptor
pub trait OperationRunner {
    fn call<T, F>(&self, descriptor: OperationDescriptor, operation: F) -> T
    where
        F: FnOnce() -> T;
}

/// Runs operations inside a `tracing` span and logs how long they took
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingOperationRunner;

impl OperationRunner for TracingOperationRunner {
    fn call<T, F>(&self, descriptor: OperationDescriptor, operation: F) -> T
    where
        F: FnOnce() -> T,
    {
        let span = debug_span!("operation", name = %descriptor);
        let _guard = span.enter();
        let start = Instant::now();
        let result = operation();
        debug!("{} took {:?}", descriptor, start.elapsed());
        result
    }
}

/// Runs operations directly
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopOperationRunner;

impl OperationRunner for NoopOperationRunner {
    fn call<T, F>(&self, _descriptor: OperationDescriptor, operation: F) -> T
    where
        F: FnOnce() -> T,
    {
        operation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records descriptors it was called with
    #[derive(Default)]
    struct RecordingRunner {
        seen: RefCell<Vec<String>>,
    }

    impl OperationRunner for RecordingRunner {
        fn call<T, F>(&self, descriptor: OperationDescriptor, operation: F) -> T
        where
            F: FnOnce() -> T,
        {
            self.seen.borrow_mut().push(descriptor.display_name().to_string());
            operation()
        }
    }

    #[test]
    fn test_runners_are_transparent() {
        let descriptor = OperationDescriptor::new("Fingerprint sources");
        assert_eq!(TracingOperationRunner.call(descriptor.clone(), || 42), 42);
        assert_eq!(NoopOperationRunner.call(descriptor, || "done"), "done");
    }

    #[test]
    fn test_descriptor_passed_through() {
        let runner = RecordingRunner::default();
        let value = runner.call(OperationDescriptor::new("first"), || 1)
            + runner.call(OperationDescriptor::new("second"), || 2);
        assert_eq!(value, 3);
        assert_eq!(*runner.seen.borrow(), vec!["first", "second"]);
    }
}
