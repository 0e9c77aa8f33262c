#![forbid(unsafe_code)]

//! Process-wide lifecycle.
//!
//! Library operations hold no global state. Applications that want a single
//! explicit init/teardown point (as the CLI does) take a [`Runtime`] guard for
//! the lifetime of their work; only one guard can be live at a time.

use solna_core::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

static ACTIVE: AtomicBool = AtomicBool::new(false);

/// Guard for the process-wide runtime. Dropping it tears the runtime down.
#[derive(Debug)]
pub struct Runtime {
    _private: (),
}

impl Runtime {
    /// Initialize the runtime. Fails with [`Error::Configuration`] while
    /// another guard is live.
    pub fn init() -> Result<Self, Error> {
        ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::Configuration("runtime is already initialized".into()))?;
        debug!("runtime initialized");
        Ok(Self { _private: () })
    }

    pub fn is_initialized() -> bool {
        ACTIVE.load(Ordering::Acquire)
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        ACTIVE.store(false, Ordering::Release);
        debug!("runtime shut down");
    }
}
