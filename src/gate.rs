use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Mutual exclusion for link-layer operations. The underlying stack cannot
/// interleave scan and connect operations, so the scan and every worker's
/// connect-discover-disconnect sequence each hold the gate for their whole
/// duration.
///
/// Wake order among waiting workers is whatever the mutex provides; callers
/// must not rely on FIFO ordering.
#[derive(Clone, Default)]
pub struct LinkGate {
    inner: Arc<Mutex<()>>,
}

impl LinkGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self) -> LinkPermit {
        LinkPermit {
            _guard: Arc::clone(&self.inner).lock_owned().await,
        }
    }
}

/// Held for the duration of one link-layer operation; dropping it releases
/// the gate.
pub struct LinkPermit {
    _guard: OwnedMutexGuard<()>,
}
