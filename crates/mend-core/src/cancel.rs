//! Structured cancellation for batch processing.
//!
//! The engine checks the token between records; a triggered token stops the
//! batch before the next record is issued. Work already committed stays
//! committed — there is no compensating rollback of prior records.

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};

/// A cheaply-clonable flag shared between the signal handler and the engine
/// loop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
  pub fn new() -> Self {
    Self::default()
  }

  /// Request that the batch stop before the next record.
  pub fn cancel(&self) {
    self.0.store(true, Ordering::Relaxed);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::Relaxed)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clones_share_state() {
    let token = CancelToken::new();
    let other = token.clone();
    assert!(!other.is_cancelled());
    token.cancel();
    assert!(other.is_cancelled());
  }
}
