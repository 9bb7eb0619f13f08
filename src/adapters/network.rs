use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, trace};

static ACTIVE: AtomicUsize = AtomicUsize::new(0);

/// Reference-counted guard over process-wide socket-library state.
///
/// The first guard performs initialization and the last one dropped tears
/// it down. On every platform std supports this is pure bookkeeping: the
/// runtime initializes its socket layer lazily. Guards nest freely.
#[derive(Debug)]
pub struct NetworkContext {
    _private: (),
}

impl NetworkContext {
    pub fn acquire() -> Self {
        let prev = ACTIVE.fetch_add(1, Ordering::AcqRel);
        if prev == 0 {
            debug!("network subsystem initialized");
        } else {
            trace!(refs = prev + 1, "network subsystem shared");
        }
        NetworkContext { _private: () }
    }

    /// Whether at least one guard is alive.
    pub fn is_initialized() -> bool {
        ACTIVE.load(Ordering::Acquire) > 0
    }

    pub fn ref_count() -> usize {
        ACTIVE.load(Ordering::Acquire)
    }
}

impl Clone for NetworkContext {
    fn clone(&self) -> Self {
        NetworkContext::acquire()
    }
}

impl Drop for NetworkContext {
    fn drop(&mut self) {
        if ACTIVE.fetch_sub(1, Ordering::AcqRel) == 1 {
            debug!("network subsystem released");
        }
    }
}
