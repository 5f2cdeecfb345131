//! Wait/navigation coordinator
//!
//! Playback suspends only on waits armed here. Input handlers resolve them,
//! or cancel all of them when the player navigates back. At most one wait per
//! [`WaitKind`] is outstanding; replacing one is an explicit `supersede`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{Notify, oneshot};

use crate::error::WaitError;
use crate::runtime::debug::TARGET_INPUT;
use crate::types::LocationId;

/// Interaction a wait is blocked on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaitKind {
    Continue,
    Choice,
    WorldAction,
}

/// Things the player can do while no event is playing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldAction {
    Travel(LocationId),
    Rest { hours: u32 },
    Quit,
}

/// Value a wait resolves with
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Continue,
    Choice(usize),
    WorldAction(WorldAction),
}

impl Resolution {
    pub fn kind(&self) -> WaitKind {
        match self {
            Resolution::Continue => WaitKind::Continue,
            Resolution::Choice(_) => WaitKind::Choice,
            Resolution::WorldAction(_) => WaitKind::WorldAction,
        }
    }
}

/// Signals from the render/input boundary
#[derive(Debug, Clone, PartialEq)]
pub enum InputSignal {
    Continue,
    GoBack,
    ChoiceSelected(usize),
    SkipMode(bool),
    WorldAction(WorldAction),
}

/// Navigation requested while a wait was outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Back,
}

type Outcome = Result<Resolution, WaitError>;

/// A deferred result handed out by [`WaitCoordinator::wait`]
#[derive(Debug)]
pub struct Pending {
    kind: WaitKind,
    rx: oneshot::Receiver<Outcome>,
}

impl Pending {
    pub fn kind(&self) -> WaitKind {
        self.kind
    }

    /// Wait for resolution. A dropped sender counts as cancellation.
    pub async fn recv(self) -> Outcome {
        self.rx.await.unwrap_or(Err(WaitError::Cancelled))
    }
}

#[derive(Debug, Default)]
struct Inner {
    waiters: HashMap<WaitKind, oneshot::Sender<Outcome>>,
    skip: bool,
    navigation: Option<Navigation>,
}

#[derive(Debug, Default)]
pub struct WaitCoordinator {
    inner: Mutex<Inner>,
    armed: Notify,
}

impl WaitCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arm a wait of `kind`.
    ///
    /// Fails with `AlreadyWaiting` if one is outstanding; call `supersede`
    /// first (or use `rewait`) to replace it. A pending back navigation makes
    /// the new wait come back cancelled, and skip mode resolves continue waits
    /// at once.
    pub fn wait(&self, kind: WaitKind) -> Result<Pending, WaitError> {
        let (tx, rx) = oneshot::channel();
        {
            let mut inner = self.lock();
            if let Some(existing) = inner.waiters.get(&kind) {
                if !existing.is_closed() {
                    return Err(WaitError::AlreadyWaiting(kind));
                }
                inner.waiters.remove(&kind);
            }

            if inner.navigation.is_some() {
                let _ = tx.send(Err(WaitError::Cancelled));
            } else if kind == WaitKind::Continue && inner.skip {
                log::trace!(target: TARGET_INPUT, "[Wait] continue skipped");
                let _ = tx.send(Ok(Resolution::Continue));
            } else {
                log::trace!(target: TARGET_INPUT, "[Wait] armed {:?}", kind);
                inner.waiters.insert(kind, tx);
            }
        }
        self.armed.notify_waiters();
        Ok(Pending { kind, rx })
    }

    /// Cancel the outstanding wait of `kind`. Returns whether there was one.
    pub fn supersede(&self, kind: WaitKind) -> bool {
        let stale = self.lock().waiters.remove(&kind);
        match stale {
            Some(tx) => {
                log::debug!(target: TARGET_INPUT, "[Wait] superseded {:?}", kind);
                let _ = tx.send(Err(WaitError::Cancelled));
                true
            }
            None => false,
        }
    }

    /// `supersede` then `wait`
    pub fn rewait(&self, kind: WaitKind) -> Result<Pending, WaitError> {
        self.supersede(kind);
        self.wait(kind)
    }

    /// Fulfil the outstanding wait matching the resolution's kind
    pub fn resolve(&self, resolution: Resolution) -> bool {
        let kind = resolution.kind();
        let waiter = self.lock().waiters.remove(&kind);
        match waiter {
            Some(tx) => tx.send(Ok(resolution)).is_ok(),
            None => {
                log::trace!(target: TARGET_INPUT, "[Wait] nothing waiting for {:?}", kind);
                false
            }
        }
    }

    /// Cancel every outstanding wait. Returns how many were cancelled.
    pub fn reject_all(&self) -> usize {
        let waiters: Vec<_> = self.lock().waiters.drain().collect();
        let count = waiters.len();
        for (_, tx) in waiters {
            let _ = tx.send(Err(WaitError::Cancelled));
        }
        count
    }

    /// Record a back navigation and cancel whatever playback is waiting on
    pub fn go_back(&self) {
        self.lock().navigation = Some(Navigation::Back);
        let cancelled = self.reject_all();
        log::debug!(target: TARGET_INPUT, "[Input] go back, cancelled {} waits", cancelled);
    }

    pub fn take_navigation(&self) -> Option<Navigation> {
        self.lock().navigation.take()
    }

    pub fn set_skip(&self, on: bool) {
        let waiter = {
            let mut inner = self.lock();
            inner.skip = on;
            if on { inner.waiters.remove(&WaitKind::Continue) } else { None }
        };
        if let Some(tx) = waiter {
            let _ = tx.send(Ok(Resolution::Continue));
        }
    }

    pub fn is_skipping(&self) -> bool {
        self.lock().skip
    }

    pub fn is_waiting(&self, kind: WaitKind) -> bool {
        self.lock()
            .waiters
            .get(&kind)
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Resolves once a wait of `kind` is outstanding
    pub async fn armed(&self, kind: WaitKind) {
        loop {
            let mut notified = std::pin::pin!(self.armed.notified());
            notified.as_mut().enable();
            if self.is_waiting(kind) {
                return;
            }
            notified.await;
        }
    }

    /// Route one input signal
    pub fn handle(&self, signal: InputSignal) {
        log::debug!(target: TARGET_INPUT, "[Input] {:?}", signal);
        match signal {
            InputSignal::Continue => {
                self.resolve(Resolution::Continue);
            }
            InputSignal::GoBack => self.go_back(),
            InputSignal::ChoiceSelected(index) => {
                self.resolve(Resolution::Choice(index));
            }
            InputSignal::SkipMode(on) => self.set_skip(on),
            InputSignal::WorldAction(action) => {
                self.resolve(Resolution::WorldAction(action));
            }
        }
    }
}
