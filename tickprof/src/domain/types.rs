//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers keep method identities and thread ids apart from
//! the raw addresses that flow through the same `u64` frame slots.

use std::fmt;

/// Managed method identity as handed out by the host VM
///
/// Zero is never a valid method; tables use it as the empty-slot sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(pub u64);

impl MethodId {
    /// Returns true unless this is the null method
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Method#{:x}", self.0)
    }
}

/// Platform thread ID
///
/// Key of the thread filter. Signal handlers on platforms without a cheap
/// thread id pass `None` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tid(pub u32);

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TID:{}", self.0)
    }
}

/// Names of a managed method, as reported by the host VM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    /// Declaring class signature, e.g. `Ljava/lang/Thread;`
    pub class_signature: String,

    /// Method name, e.g. `run`
    pub name: String,
}

impl MethodInfo {
    pub fn new(class_signature: impl Into<String>, name: impl Into<String>) -> Self {
        Self { class_signature: class_signature.into(), name: name.into() }
    }
}
