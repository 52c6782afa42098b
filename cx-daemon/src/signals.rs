//! Graceful-shutdown signal handling: SIGINT/SIGTERM set a process-wide
//! flag the event loop polls between accepts.

use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Install the handlers. Safe to call more than once.
#[cfg(unix)]
pub fn register() {
    unsafe {
        libc::signal(libc::SIGINT, handle as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handle as libc::sighandler_t);
    }
}

#[cfg(not(unix))]
pub fn register() {}

#[cfg(unix)]
extern "C" fn handle(_signal: libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

pub fn shutdown_requested() -> bool {
    SHUTDOWN.load(Ordering::SeqCst)
}

/// Reset the flag (used by tests and by a daemon restarting in-process).
pub fn reset() {
    SHUTDOWN.store(false, Ordering::SeqCst);
}
