//! Error classification and recovery.
//!
//! Every phase step returns a [`StepError`] on failure. The error is
//! classified into an [`ErrorKind`], recorded as an [`ErrorRecord`], and
//! [`RecoveryPolicy::decide`] chooses between retrying, suspending,
//! re-authenticating, fast-forwarding and aborting.

mod kind;
mod policy;
mod step;

pub use kind::{ErrorKind, ErrorRecord};
pub use policy::{Recovery, RecoveryPolicy, RedirectRules};
pub use step::StepError;
