//! One-shot readiness signal for the TPM device node
//!
//! Device discovery runs elsewhere (a udev monitor, a coldplug scan) and
//! calls [`ReadinessGate::signal`] once the node exists. Anything that needs
//! the module waits on the gate with a deadline.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct ReadinessGate {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the device as present and wake every waiter
    ///
    /// Only the first call has an effect.
    pub fn signal(&self) {
        let (lock, cvar) = &*self.inner;
        let mut ready = Self::lock(lock);
        if !*ready {
            *ready = true;
            debug!("TPM device signalled ready");
            cvar.notify_all();
        }
    }

    pub fn is_ready(&self) -> bool {
        *Self::lock(&self.inner.0)
    }

    /// Block until signalled or until `timeout` elapses
    ///
    /// Returns `true` if the gate was signalled. Spurious wakeups do not
    /// shorten or extend the wait.
    pub fn await_ready(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let guard = Self::lock(lock);
        let (ready, _) = cvar
            .wait_timeout_while(guard, timeout, |ready| !*ready)
            .unwrap_or_else(PoisonError::into_inner);
        if !*ready {
            info!("no tpm devices found after {:?}", timeout);
        }
        *ready
    }

    // a panicking waiter cannot corrupt a bool
    fn lock(lock: &Mutex<bool>) -> MutexGuard<'_, bool> {
        lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
