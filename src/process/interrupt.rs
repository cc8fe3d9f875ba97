//! Cooperative cancellation and the scoped SIGINT guard

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use log::debug;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use shellfn_core::{Result, ShellfnError};

/// Number of SIGINTs received while a guard was installed
static INTERRUPTS: AtomicU64 = AtomicU64::new(0);

static REGISTRATION: Mutex<Registration> = Mutex::new(Registration {
    depth: 0,
    previous: None,
});

struct Registration {
    depth: usize,
    previous: Option<SigAction>,
}

extern "C" fn on_interrupt(_signal: nix::libc::c_int) {
    INTERRUPTS.fetch_add(1, Ordering::SeqCst);
}

/// Cancellation request shared between the caller and a running invocation
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    interrupt_epoch: Option<u64>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// True once cancelled explicitly, or once SIGINT arrived if the token observes interrupts
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self
                .interrupt_epoch
                .is_some_and(|epoch| INTERRUPTS.load(Ordering::SeqCst) > epoch)
    }

    /// Also treat SIGINTs delivered from now on as cancellation
    pub fn observing_interrupts(mut self) -> Self {
        self.interrupt_epoch = Some(INTERRUPTS.load(Ordering::SeqCst));
        self
    }
}

/// Installs the SIGINT handler while alive and restores the previous one on drop.
///
/// Guards nest: the handler is installed by the first live guard and the previous
/// disposition is restored when the last one drops.
#[derive(Debug)]
pub struct InterruptGuard {
    _private: (),
}

impl InterruptGuard {
    pub fn install() -> Result<Self> {
        let mut registration = REGISTRATION
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());

        if registration.depth == 0 {
            let action = SigAction::new(
                SigHandler::Handler(on_interrupt),
                SaFlags::SA_RESTART,
                SigSet::empty(),
            );
            // SAFETY: the handler only touches an atomic counter.
            let previous = unsafe { sigaction(Signal::SIGINT, &action) }
                .map_err(|e| ShellfnError::Signal(format!("failed to install SIGINT handler: {}", e)))?;
            registration.previous = Some(previous);
            debug!("Installed SIGINT handler");
        }
        registration.depth += 1;

        Ok(Self { _private: () })
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        let mut registration = REGISTRATION
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());

        registration.depth = registration.depth.saturating_sub(1);
        if registration.depth == 0 {
            if let Some(previous) = registration.previous.take() {
                // SAFETY: restores the disposition captured at install time.
                let _ = unsafe { sigaction(Signal::SIGINT, &previous) };
                debug!("Restored previous SIGINT handler");
            }
        }
    }
}
