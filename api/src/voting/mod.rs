//! Vote reconciliation: keeps vote records, post counters and author taste
//! scores in step.

mod error;
mod pair_lock;
mod reconciler;
mod transition;

pub use error::{VoteError, VoteResult};
pub use reconciler::{VoteOutcome, VoteReconciler};
