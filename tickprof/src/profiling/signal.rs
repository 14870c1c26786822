//! `SIGPROF` interval timer driving the sampler
//!
//! The kernel delivers `SIGPROF` to whichever thread is consuming CPU when
//! `ITIMER_PROF` expires. The handler looks up the registered profiler,
//! rebuilds a [`CallContext`] from the saved registers and records a sample.
//!
//! Only one profiler per process can receive signals; [`register`] picks it.

#![allow(unsafe_code)] // sigaction, setitimer and ucontext access

use log::{debug, warn};
use std::io;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::domain::{ProfilerError, Tid};
use crate::host::InterruptSource;
use crate::session::Profiler;

use super::context::CallContext;

static TARGET: AtomicPtr<Profiler> = AtomicPtr::new(ptr::null_mut());

/// Route `SIGPROF` samples to `profiler`
pub fn register(profiler: &'static Profiler) {
    TARGET.store(ptr::from_ref(profiler).cast_mut(), Ordering::Release);
}

/// Stop routing samples; later signals are ignored
pub fn unregister() {
    TARGET.store(ptr::null_mut(), Ordering::Release);
}

fn registered() -> bool {
    !TARGET.load(Ordering::Acquire).is_null()
}

extern "C" fn handle_sigprof(_signo: libc::c_int, _info: *mut libc::siginfo_t, ucontext: *mut libc::c_void) {
    let target = TARGET.load(Ordering::Acquire);
    if target.is_null() || ucontext.is_null() {
        return;
    }
    // SAFETY: only 'static profilers are registered
    let profiler = unsafe { &*target };

    let saved_errno = errno();
    if let Some(context) = context_of(ucontext) {
        profiler.record_sample(&context, current_tid());
    }
    set_errno(saved_errno);
}

#[cfg(all(target_os = "linux", any(target_arch = "x86_64", target_arch = "aarch64")))]
fn context_of(ucontext: *mut libc::c_void) -> Option<CallContext> {
    // SAFETY: the kernel passes the interrupted thread's ucontext_t
    Some(unsafe { CallContext::from_ucontext(ucontext) })
}

#[cfg(not(all(target_os = "linux", any(target_arch = "x86_64", target_arch = "aarch64"))))]
fn context_of(_ucontext: *mut libc::c_void) -> Option<CallContext> {
    None
}

#[cfg(target_os = "linux")]
fn current_tid() -> Option<Tid> {
    // SAFETY: gettid has no preconditions and cannot fail
    let tid = unsafe { libc::syscall(libc::SYS_gettid) };
    u32::try_from(tid).ok().map(Tid)
}

#[cfg(not(target_os = "linux"))]
fn current_tid() -> Option<Tid> {
    None
}

#[cfg(target_os = "linux")]
fn errno() -> libc::c_int {
    // SAFETY: errno is thread-local
    unsafe { *libc::__errno_location() }
}

#[cfg(target_os = "linux")]
fn set_errno(value: libc::c_int) {
    // SAFETY: errno is thread-local
    unsafe { *libc::__errno_location() = value }
}

#[cfg(not(target_os = "linux"))]
fn errno() -> libc::c_int {
    0
}

#[cfg(not(target_os = "linux"))]
fn set_errno(_value: libc::c_int) {}

/// `ITIMER_PROF` split into the `itimerval` fields, never rounded to zero
#[allow(clippy::cast_possible_wrap)]
fn timer_value(interval_ns: i64) -> libc::timeval {
    let sec = interval_ns / 1_000_000_000;
    let usec = (interval_ns % 1_000_000_000) / 1000;
    let usec = if sec == 0 { usec.max(1) } else { usec };
    libc::timeval { tv_sec: sec as libc::time_t, tv_usec: usec as libc::suseconds_t }
}

/// CPU-time interval timer delivering `SIGPROF`
#[derive(Debug, Default, Clone, Copy)]
pub struct ItimerSource;

impl ItimerSource {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn install_handler() -> Result<(), ProfilerError> {
        // SAFETY: a zeroed sigaction is a valid starting point; every field
        // the kernel reads is set below
        let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
        action.sa_sigaction = handle_sigprof as libc::sighandler_t;
        action.sa_flags = libc::SA_RESTART | libc::SA_SIGINFO;

        // SAFETY: action is a valid, initialized sigaction
        let rc = unsafe {
            libc::sigemptyset(&mut action.sa_mask);
            libc::sigaction(libc::SIGPROF, &action, ptr::null_mut())
        };
        if rc != 0 {
            return Err(ProfilerError::InterruptSource(format!(
                "sigaction failed: {}",
                io::Error::last_os_error()
            )));
        }
        Ok(())
    }

    fn set_timer(value: libc::timeval) -> io::Result<()> {
        let timer = libc::itimerval { it_interval: value, it_value: value };
        // SAFETY: timer is a valid itimerval and the old value is not requested
        if unsafe { libc::setitimer(libc::ITIMER_PROF, &timer, ptr::null_mut()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl InterruptSource for ItimerSource {
    fn arm(&self, interval_ns: i64) -> Result<(), ProfilerError> {
        if !registered() {
            warn!("No profiler registered for SIGPROF; samples will be dropped");
        }
        Self::install_handler()?;
        Self::set_timer(timer_value(interval_ns))
            .map_err(|e| ProfilerError::InterruptSource(format!("setitimer failed: {e}")))?;
        debug!("ITIMER_PROF armed every {interval_ns} ns");
        Ok(())
    }

    fn disarm(&self) {
        let zero = libc::timeval { tv_sec: 0, tv_usec: 0 };
        if let Err(e) = Self::set_timer(zero) {
            warn!("Failed to disarm ITIMER_PROF: {e}");
        }
    }
}
