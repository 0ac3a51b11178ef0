//! Out-of-band child termination.
//!
//! Side tasks cannot reach the `Child` handle owned by the supervising
//! thread, so cancellation goes by pid. The caller must still hold the
//! completion channel open until the supervisor has reaped the child.

#[cfg(unix)]
pub(crate) fn terminate(pid: u32) {
    // ESRCH (already exited) is fine here.
    unsafe {
        libc::kill(pid as libc::pid_t, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
pub(crate) fn terminate(pid: u32) {
    tracing::warn!(pid, "out-of-band child termination is not supported on this platform");
}
