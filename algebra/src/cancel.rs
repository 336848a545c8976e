//! Cooperative cancellation of long computations.
//!
//! A [`CancelToken`] is attached to the threads doing the work. The engine
//! calls [`check`] inside its loops and stops with [`Error::Cancelled`] once
//! the token has been cancelled.

use std::{
    cell::RefCell,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::{Error, Result};

thread_local! {
    static CURRENT: RefCell<Option<CancelToken>> = const { RefCell::new(None) };
}

#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Makes this the token [`check`] consults on the current thread.
    pub fn attach(&self) {
        CURRENT.with(|current| *current.borrow_mut() = Some(self.clone()));
    }

    pub fn detach() {
        CURRENT.with(|current| *current.borrow_mut() = None);
    }
}

/// Fails once the token attached to this thread has been cancelled. Threads
/// without a token never fail.
pub fn check() -> Result<()> {
    let cancelled = CURRENT.with(|current| {
        current
            .borrow()
            .as_ref()
            .map_or(false, CancelToken::is_cancelled)
    });
    if cancelled {
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_follows_the_attached_token() {
        assert!(check().is_ok());
        let token = CancelToken::new();
        token.attach();
        assert!(check().is_ok());
        token.cancel();
        assert!(matches!(check(), Err(Error::Cancelled)));
        CancelToken::detach();
        assert!(check().is_ok());
    }

    #[test]
    fn tokens_are_per_thread() {
        let token = CancelToken::new();
        token.cancel();
        token.attach();
        let other = std::thread::spawn(|| check().is_ok()).join().unwrap();
        assert!(other);
        CancelToken::detach();
    }
}
