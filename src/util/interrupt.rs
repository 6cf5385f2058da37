//! Interrupt tracking for SIGINT / SIGTERM.
//!
//! Signal handlers only flip an atomic flag. Long-running steps poll the
//! flag through an [`InterruptFlag`] and unwind with an `Interrupted` error,
//! so the workspace guard is dropped on the way out instead of the process
//! dying with the temp directory still on disk.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Set by the process signal handler.
static SIGNALLED: AtomicBool = AtomicBool::new(false);

/// Shared cancellation flag.
///
/// A flag either follows the process signal state (see
/// [`install_signal_handlers`]) or is purely local, which is what tests use.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    local: Arc<AtomicBool>,
    watch_signals: bool,
}

impl InterruptFlag {
    /// A flag that is only set by [`InterruptFlag::trigger`].
    pub fn new() -> Self {
        InterruptFlag {
            local: Arc::new(AtomicBool::new(false)),
            watch_signals: false,
        }
    }

    /// A flag that also reports delivered SIGINT / SIGTERM.
    pub fn watching_signals() -> Self {
        InterruptFlag {
            local: Arc::new(AtomicBool::new(false)),
            watch_signals: true,
        }
    }

    /// Request cancellation.
    pub fn trigger(&self) {
        self.local.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_set(&self) -> bool {
        self.local.load(Ordering::SeqCst) || (self.watch_signals && SIGNALLED.load(Ordering::SeqCst))
    }
}

#[cfg(unix)]
extern "C" fn on_signal(_signum: libc::c_int) {
    SIGNALLED.store(true, Ordering::SeqCst);
}

/// Install SIGINT and SIGTERM handlers and return a flag that observes them.
///
/// Subprocesses share the foreground process group, so they still receive
/// the terminal's SIGINT directly; this process keeps running long enough to
/// tear down its workspace.
#[cfg(unix)]
pub fn install_signal_handlers() -> InterruptFlag {
    let handler = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
    // SAFETY: the handler only performs an atomic store, which is
    // async-signal-safe.
    unsafe {
        libc::signal(libc::SIGINT, handler);
        libc::signal(libc::SIGTERM, handler);
    }
    InterruptFlag::watching_signals()
}

#[cfg(not(unix))]
pub fn install_signal_handlers() -> InterruptFlag {
    InterruptFlag::watching_signals()
}

/// Clear the process signal state.
#[cfg(test)]
pub(crate) fn reset_signal_state() {
    SIGNALLED.store(false, Ordering::SeqCst);
}
