//! Unix process groups for spawned shells
//!
//! Every phase runs as the leader of its own process group, so a deadline kill or a
//! forwarded signal reaches everything the script started and not only `sh`. When the
//! runner owns the controlling terminal, the phase's group becomes the terminal's
//! foreground group while it runs so interactive scripts can still read stdin.

use std::future::poll_fn;
use std::io::{self, IsTerminal};
use std::os::fd::AsFd;
use std::task::{Context, Poll};

use nix::sys::signal::{killpg, pthread_sigmask, SigSet, SigmaskHow, Signal};
use nix::unistd::{getpgrp, tcgetpgrp, tcsetpgrp, Pid};
use tokio::signal::unix::{signal, Signal as SignalStream, SignalKind};
use tracing::{debug, warn};

/// Signals the runner relays to the running phase
pub const FORWARDED: [Signal; 4] = [
    Signal::SIGINT,
    Signal::SIGTERM,
    Signal::SIGHUP,
    Signal::SIGQUIT,
];

/// Listeners for a set of signals, registered once and kept across phases
#[derive(Debug)]
pub struct SignalListener {
    streams: Vec<(Signal, SignalStream)>,
}

impl SignalListener {
    pub fn install() -> io::Result<Self> {
        Self::for_signals(&FORWARDED)
    }

    pub fn for_signals(signals: &[Signal]) -> io::Result<Self> {
        let streams = signals
            .iter()
            .map(|&sig| Ok((sig, signal(SignalKind::from_raw(sig as i32))?)))
            .collect::<io::Result<Vec<_>>>()?;
        Ok(Self { streams })
    }

    /// Wait for the next signal
    pub async fn recv(&mut self) -> Signal {
        poll_fn(|cx| match self.poll_any(cx) {
            Some(sig) => Poll::Ready(sig),
            None => Poll::Pending,
        })
        .await
    }

    /// A signal delivered since the last call, without waiting
    pub async fn take_pending(&mut self) -> Option<Signal> {
        poll_fn(|cx| Poll::Ready(self.poll_any(cx))).await
    }

    fn poll_any(&mut self, cx: &mut Context<'_>) -> Option<Signal> {
        for (sig, stream) in &mut self.streams {
            if stream.poll_recv(cx).is_ready() {
                return Some(*sig);
            }
        }
        None
    }
}

/// Send `signal` to every process in `group`
pub fn signal_group(group: Pid, signal: Signal) -> nix::Result<()> {
    killpg(group, signal)
}

/// Group led by a freshly spawned child
pub fn group_of(child_id: Option<u32>) -> Option<Pid> {
    child_id
        .and_then(|id| i32::try_from(id).ok())
        .map(Pid::from_raw)
}

/// Holds the controlling terminal for a phase's group and hands it back on drop
#[derive(Debug)]
pub struct ForegroundGuard {
    restore: Option<Pid>,
}

impl ForegroundGuard {
    /// Make `group` the foreground group if the runner currently is
    pub fn acquire(group: Pid) -> Self {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            return Self { restore: None };
        }

        let own = getpgrp();
        match tcgetpgrp(stdin.as_fd()) {
            Ok(foreground) if foreground == own => {}
            _ => return Self { restore: None },
        }

        if let Err(e) = set_foreground(group) {
            debug!(error = %e, "Could not hand the terminal to the child");
            return Self { restore: None };
        }

        // The child may have stopped on terminal input before the handoff
        if let Err(e) = killpg(group, Signal::SIGCONT) {
            debug!(error = %e, "Could not resume child group");
        }

        Self { restore: Some(own) }
    }
}

impl Drop for ForegroundGuard {
    fn drop(&mut self) {
        if let Some(own) = self.restore.take() {
            if let Err(e) = set_foreground(own) {
                warn!(error = %e, "Could not take back the terminal");
            }
        }
    }
}

fn set_foreground(group: Pid) -> nix::Result<()> {
    // SIGTTOU stops a background group that changes the foreground unless it is blocked
    let mut blocked = SigSet::empty();
    blocked.add(Signal::SIGTTOU);
    let mut previous = SigSet::empty();
    pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&blocked), Some(&mut previous))?;

    let result = tcsetpgrp(io::stdin().as_fd(), group);

    pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&previous), None)?;
    result
}
