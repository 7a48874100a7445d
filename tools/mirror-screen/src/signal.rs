//! SIGINT/SIGTERM → stop flag
//!
//! The handler only stores into an atomic, which is async-signal-safe.
//! The mirror loop checks the flag once per iteration.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

static STOP: AtomicBool = AtomicBool::new(false);

/// Flag set once a termination signal has arrived
pub fn stop_flag() -> &'static AtomicBool {
    &STOP
}

#[cfg(unix)]
extern "C" fn handle_signal(_: libc::c_int) {
    STOP.store(true, Ordering::SeqCst);
}

/// Route SIGINT and SIGTERM to the stop flag
#[cfg(unix)]
pub fn install() -> io::Result<()> {
    for signal in [libc::SIGINT, libc::SIGTERM] {
        // SAFETY: the handler only touches an atomic
        let previous = unsafe { libc::signal(signal, handle_signal as *const () as libc::sighandler_t) };
        if previous == libc::SIG_ERR {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn install() -> io::Result<()> {
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_sigterm_sets_flag() {
        install().unwrap();
        assert!(!stop_flag().load(Ordering::SeqCst));
        // SAFETY: raising a signal whose handler was just installed
        unsafe {
            libc::raise(libc::SIGTERM);
        }
        assert!(stop_flag().load(Ordering::SeqCst));
        STOP.store(false, Ordering::SeqCst);
    }
}
