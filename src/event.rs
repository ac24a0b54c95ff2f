//! `Event`: a future over kernel completion.
//!
//! The host back-end resolves every event synchronously before `submit`
//! returns it, so the blocking paths below are degenerate in practice — they
//! exist because `Event` is a back-end-polymorphic type (`Kernel`, `Queue`,
//! `Event`, `Context` each expose a capability set implemented by each
//! back-end), and a future asynchronous back-end would populate a
//! still-`Pending` status this same type already knows how to wait on.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use anvil_core::Error;

/// The terminal (or not-yet-terminal) state of an `Event`.
#[derive(Clone, Debug)]
pub enum Status {
    Pending,
    Resolved,
    Failed(Arc<Error>),
    Cancelled,
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Status::Pending)
    }
}

/// Timestamps for the four lifecycle points `ProfilingInfo` tracks,
/// populated only when the `profiling` feature is enabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProfilingInfo {
    pub queued_at: Option<Duration>,
    pub submitted_at: Option<Duration>,
    pub started_at: Option<Duration>,
    pub ended_at: Option<Duration>,
}

impl ProfilingInfo {
    /// Renders the `{queued, submitted, started, ended}` nanosecond JSON
    /// object, omitting fields the back-end didn't populate.
    pub fn to_json(&self) -> String {
        let field = |name: &str, d: &Option<Duration>| -> Option<String> {
            d.map(|d| format!("\"{name}\":{}", d.as_nanos()))
        };
        let parts: Vec<String> = [
            field("queued", &self.queued_at),
            field("submitted", &self.submitted_at),
            field("started", &self.started_at),
            field("ended", &self.ended_at),
        ]
        .into_iter()
        .flatten()
        .collect();
        format!("{{{}}}", parts.join(","))
    }
}

struct Inner {
    backend: &'static str,
    status: Mutex<Status>,
    condvar: Condvar,
    profiling: Mutex<ProfilingInfo>,
}

/// A handle to a single submission's completion, cheaply cloned (all clones
/// observe the same underlying state).
#[derive(Clone)]
pub struct Event(Arc<Inner>);

impl Event {
    pub(crate) fn pending(backend: &'static str) -> Event {
        Event(Arc::new(Inner {
            backend,
            status: Mutex::new(Status::Pending),
            condvar: Condvar::new(),
            profiling: Mutex::new(ProfilingInfo::default()),
        }))
    }

    /// The back-end this event belongs to — enforced at `Queue::submit` so
    /// no queue's prereqs can cross a `BackendMismatch`.
    pub fn backend(&self) -> &'static str {
        self.0.backend
    }

    pub(crate) fn resolved(backend: &'static str) -> Event {
        let e = Event::pending(backend);
        e.resolve(Status::Resolved);
        e
    }

    pub(crate) fn failed(backend: &'static str, err: Error) -> Event {
        let e = Event::pending(backend);
        e.resolve(Status::Failed(Arc::new(err)));
        e
    }

    /// Wraps `err` as `PrereqFailed`, the infectious propagation a dependent
    /// event whose prerequisite failed must carry.
    pub(crate) fn failed_prereq(backend: &'static str, err: Arc<Error>) -> Event {
        let e = Event::pending(backend);
        e.resolve(Status::Failed(Arc::new(Error::PrereqFailed(Box::new((*err).clone())))));
        e
    }

    #[allow(dead_code)]
    pub(crate) fn cancelled(backend: &'static str) -> Event {
        let e = Event::pending(backend);
        e.resolve(Status::Cancelled);
        e
    }

    fn resolve(&self, status: Status) {
        let mut guard = self.0.status.lock().unwrap();
        if guard.is_terminal() {
            return;
        }
        *guard = status;
        self.0.condvar.notify_all();
    }

    #[cfg_attr(not(feature = "profiling"), allow(unused_variables))]
    pub(crate) fn mark(&self, point: ProfilingPoint, at: Duration) {
        #[cfg(feature = "profiling")]
        {
            let mut p = self.0.profiling.lock().unwrap();
            match point {
                ProfilingPoint::Queued => p.queued_at = Some(at),
                ProfilingPoint::Submitted => p.submitted_at = Some(at),
                ProfilingPoint::Started => p.started_at = Some(at),
                ProfilingPoint::Ended => p.ended_at = Some(at),
            }
        }
    }

    pub fn status(&self) -> Status {
        self.0.status.lock().unwrap().clone()
    }

    pub fn profiling(&self) -> ProfilingInfo {
        *self.0.profiling.lock().unwrap()
    }

    fn wait_until_terminal(&self, timeout: Option<Duration>) -> Option<Status> {
        let mut guard = self.0.status.lock().unwrap();
        match timeout {
            None => {
                while !guard.is_terminal() {
                    guard = self.0.condvar.wait(guard).unwrap();
                }
                Some(guard.clone())
            }
            Some(timeout) => {
                if guard.is_terminal() {
                    return Some(guard.clone());
                }
                let (g, result) = self.0.condvar.wait_timeout(guard, timeout).unwrap();
                guard = g;
                if result.timed_out() && !guard.is_terminal() {
                    None
                } else {
                    Some(guard.clone())
                }
            }
        }
    }

    fn status_to_result(status: Status) -> anvil_core::Result<()> {
        match status {
            Status::Resolved => Ok(()),
            Status::Failed(e) => Err((*e).clone()),
            Status::Cancelled => Err(Error::Cancelled),
            Status::Pending => unreachable!("wait_until_terminal only returns terminal states"),
        }
    }

    /// Blocks until this event reaches a terminal state.
    pub fn r#await(&self) -> anvil_core::Result<()> {
        let status = self.wait_until_terminal(None).expect("untimed wait always yields a status");
        Event::status_to_result(status)
    }

    /// Blocks until terminal or `timeout` elapses, whichever comes first.
    /// Does not change the event's state on timeout.
    pub fn await_for(&self, timeout: Duration) -> anvil_core::Result<()> {
        match self.wait_until_terminal(Some(timeout)) {
            Some(status) => Event::status_to_result(status),
            None => Err(Error::TimedOut),
        }
    }

    /// Requests cancellation. Advisory only: on the host back-end the
    /// kernel body has always already run by the time an `Event` exists, so
    /// this is a no-op here — a back-end is free to ignore cancellation once
    /// work has already begun.
    pub fn cancel(&self) {}

    /// Registers a continuation, returning a new `Event` that completes
    /// after `f` runs. A failed or cancelled source skips `f` and
    /// propagates; the host back-end runs `f` immediately, since the source
    /// is already resolved by construction.
    pub fn then<F>(&self, f: F) -> Event
    where
        F: FnOnce(&Status) -> anvil_core::Result<()> + Send + 'static,
    {
        let continuation = Event::pending(self.backend());
        let status = self.wait_until_terminal(None).expect("untimed wait always yields a status");
        match &status {
            Status::Failed(e) => continuation.resolve(Status::Failed(Arc::new(Error::PrereqFailed(Box::new(
                (**e).clone(),
            ))))),
            Status::Cancelled => continuation.resolve(Status::Cancelled),
            Status::Resolved => match f(&status) {
                Ok(()) => continuation.resolve(Status::Resolved),
                Err(e) => continuation.resolve(Status::Failed(Arc::new(e))),
            },
            Status::Pending => unreachable!(),
        }
        continuation
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event").field("status", &self.status()).finish()
    }
}

pub(crate) enum ProfilingPoint {
    Queued,
    Submitted,
    Started,
    Ended,
}

/// A collection of events a submission depends on or a caller wants to
/// await together, once more than one dependency is in play.
#[derive(Clone, Default)]
pub struct EventList(Vec<Event>);

impl EventList {
    pub fn new() -> EventList {
        EventList(Vec::new())
    }

    pub fn push(&mut self, event: Event) {
        self.0.push(event);
    }

    pub fn as_slice(&self) -> &[Event] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Awaits every member in order, short-circuiting on the first failure.
    pub fn wait_all(&self) -> anvil_core::Result<()> {
        for event in &self.0 {
            event.r#await()?;
        }
        Ok(())
    }

    /// The first member currently in a terminal failed/cancelled state, if
    /// any — used by `Queue::submit` to decide whether to skip the kernel
    /// body and propagate `PrereqFailed` instead.
    pub(crate) fn first_failure(&self) -> Option<Status> {
        self.0.iter().map(Event::status).find(|s| matches!(s, Status::Failed(_) | Status::Cancelled))
    }
}

impl From<Event> for EventList {
    fn from(event: Event) -> EventList {
        EventList(vec![event])
    }
}

impl From<Vec<Event>> for EventList {
    fn from(events: Vec<Event>) -> EventList {
        EventList(events)
    }
}
