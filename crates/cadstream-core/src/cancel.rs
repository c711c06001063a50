//! Cooperative cancellation for sector loads.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::{self, AbortHandle, Abortable, FutureExt, Pending, Shared};

type Signal = Shared<Abortable<Pending<()>>>;

/// A cloneable cancellation signal.
///
/// Loads check [`CancellationToken::is_cancelled`] at their fetch boundaries
/// and may race network futures against [`CancellationToken::cancelled`].
/// Cancelling aborts a never-ending future that every clone shares.
#[derive(Clone)]
pub struct CancellationToken {
    handle: AbortHandle,
    signal: Signal,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        let (handle, registration) = AbortHandle::new_pair();
        Self {
            handle,
            signal: Abortable::new(future::pending(), registration).shared(),
        }
    }

    /// Cancel this token and every clone of it.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Whether [`CancellationToken::cancel`] was called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.handle.is_aborted()
    }

    /// Resolves once [`CancellationToken::cancel`] has been called.
    pub fn cancelled(&self) -> Cancelled {
        Cancelled {
            signal: self.signal.clone(),
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Future returned by [`CancellationToken::cancelled`].
pub struct Cancelled {
    signal: Signal,
}

impl Future for Cancelled {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        // The signal only ever resolves as aborted
        self.signal.poll_unpin(cx).map(|_| ())
    }
}

impl fmt::Debug for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cancelled").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::LocalPool;
    use futures::task::LocalSpawnExt;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_cancel_is_shared_by_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_cancel_before_wait_resolves_at_once() {
        let token = CancellationToken::new();
        token.clone().cancel();
        futures::executor::block_on(token.cancelled());
        futures::executor::block_on(token.cancelled());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancelled_future_wakes() {
        let mut pool = LocalPool::new();
        let token = CancellationToken::new();
        let observed = Rc::new(Cell::new(false));

        let waiter = token.cancelled();
        let flag = observed.clone();
        pool.spawner()
            .spawn_local(async move {
                waiter.await;
                flag.set(true);
            })
            .unwrap();

        pool.run_until_stalled();
        assert!(!observed.get());

        token.cancel();
        pool.run_until_stalled();
        assert!(observed.get());
    }
}
