//! Background lock expiry
//!
//! One thread per [`Database`](crate::Database), named
//! `viewstore-lock-expiry`. It sleeps on the shared condvar until the
//! earliest lock deadline (or until `lock` wakes it), then releases every
//! due lock through the normal unlock path.

use crate::database::Shared;
use std::io;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, error};

pub(crate) const THREAD_NAME: &str = "viewstore-lock-expiry";

/// Handle to the expiry thread; joined by [`ExpiryWorker::shutdown`]
#[derive(Debug)]
pub(crate) struct ExpiryWorker {
    handle: Option<JoinHandle<()>>,
}

impl ExpiryWorker {
    pub(crate) fn spawn(shared: Arc<Shared>) -> io::Result<Self> {
        let handle = std::thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || expiry_loop(&shared))?;
        Ok(ExpiryWorker { handle: Some(handle) })
    }

    /// Signal the thread to exit and wait for it
    pub(crate) fn shutdown(&mut self, shared: &Shared) {
        shared.shutdown.store(true, Ordering::Release);

        // Notify under the state lock so the thread is either already
        // waiting or will see the flag before it waits.
        {
            let _state = shared.state.lock();
            shared.expiry_ready.notify_all();
        }

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("lock expiry thread panicked");
            }
        }
    }
}

fn expiry_loop(shared: &Shared) {
    let mut state = shared.state.lock();
    loop {
        if shared.shutdown.load(Ordering::Acquire) {
            return;
        }

        for (key, cas) in state.locks.take_expired(Instant::now()) {
            match state.locks.unlock(&key, cas) {
                Ok(()) => debug!(key = %key, cas = %cas, "lock expired"),
                // Relocked in the meantime; the newer lock wins
                Err(e) => debug!(key = %key, cas = %cas, error = %e, "lock expiry ignored"),
            }
        }

        match state.locks.next_deadline() {
            Some(deadline) => {
                shared.expiry_ready.wait_until(&mut state, deadline);
            }
            None => shared.expiry_ready.wait(&mut state),
        }
    }
}
