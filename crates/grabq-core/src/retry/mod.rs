//! Retry and backoff policy for executor spawn failures.
//!
//! A job whose executor cannot be started stays queued and is retried on a
//! later admission scan; this module decides how long to wait and when to
//! give up and move the job to `error`.

mod policy;

pub use policy::{RetryDecision, RetryPolicy};
