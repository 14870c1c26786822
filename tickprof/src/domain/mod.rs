//! Domain model for tickprof
//!
//! Identifiers handed to us by the host VM and the controller-side error
//! type. Sampling failures are not errors here; they are counted as
//! [`tickprof_common::FailureKind`].

pub mod errors;
pub mod types;

pub use types::{MethodId, MethodInfo, Tid};

pub use errors::ProfilerError;
