// Copyright 2025 Cowboy AI, LLC.

//! Call targets
//!
//! A callback names what to run as an opaque (address, entry point) pair. The
//! directory maps addresses to [`CallTarget`] implementations and invokes them
//! with try/capture semantics: a target that fails, is missing, or panics
//! produces an error payload, never a fault in the caller.

use crate::identifiers::Address;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;

/// Something a callback can invoke
pub trait CallTarget: Send {
    /// Run `entry` with `payload`; `Err` carries the revert payload
    fn call(&mut self, entry: &str, payload: &[u8]) -> Result<Bytes, Bytes>;
}

/// Adapter turning a closure into a single-entry [`CallTarget`]
///
/// # Examples
///
/// ```rust
/// use bytes::Bytes;
/// use cim_promise::callback::{CallTarget, FnTarget};
///
/// let mut echo = FnTarget::new("echo", |payload: &[u8]| Ok(Bytes::copy_from_slice(payload)));
/// assert_eq!(echo.call("echo", b"hi").unwrap(), Bytes::from_static(b"hi"));
/// assert!(echo.call("other", b"hi").is_err());
/// ```
pub struct FnTarget<F> {
    entry: String,
    handler: F,
}

impl<F> FnTarget<F>
where
    F: FnMut(&[u8]) -> Result<Bytes, Bytes> + Send,
{
    /// Respond to `entry` by running `handler`
    pub fn new(entry: impl Into<String>, handler: F) -> Self {
        Self {
            entry: entry.into(),
            handler,
        }
    }
}

impl<F> CallTarget for FnTarget<F>
where
    F: FnMut(&[u8]) -> Result<Bytes, Bytes> + Send,
{
    fn call(&mut self, entry: &str, payload: &[u8]) -> Result<Bytes, Bytes> {
        if entry != self.entry {
            return Err(Bytes::from(format!("unknown entry point: {entry}")));
        }
        (self.handler)(payload)
    }
}

/// Call targets reachable on one domain
#[derive(Default)]
pub struct TargetDirectory {
    targets: HashMap<Address, Box<dyn CallTarget>>,
}

impl TargetDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `target` reachable at `address`, replacing any previous one
    pub fn register(&mut self, address: Address, target: impl CallTarget + 'static) {
        self.targets.insert(address, Box::new(target));
    }

    /// Remove the target at `address`
    pub fn unregister(&mut self, address: &Address) -> bool {
        self.targets.remove(address).is_some()
    }

    /// Whether a target is registered at `address`
    pub fn contains(&self, address: &Address) -> bool {
        self.targets.contains_key(address)
    }

    /// Invoke `address.entry(payload)` and capture the outcome
    pub fn invoke(&mut self, address: &Address, entry: &str, payload: &[u8]) -> Result<Bytes, Bytes> {
        let Some(target) = self.targets.get_mut(address) else {
            return Err(Bytes::from(format!("no call target at {address}")));
        };

        match catch_unwind(AssertUnwindSafe(|| target.call(entry, payload))) {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "target panicked".to_string());
                warn!(target_address = %address, entry, %message, "Call target panicked");
                Err(Bytes::from(message))
            }
        }
    }
}

impl fmt::Debug for TargetDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetDirectory")
            .field("targets", &self.targets.keys().collect::<Vec<_>>())
            .finish()
    }
}
