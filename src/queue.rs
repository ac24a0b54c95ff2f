//! `Queue`: orders submissions for a context and produces `Event`s.
//!
//! The host back-end executes a kernel's body inline, on the calling
//! thread, before `submit` returns — a single-threaded, cooperative
//! execution model. The `Open → Flushing → Idle` state machine is kept
//! faithfully even though it's degenerate here, so invariants like
//! "`finish()` called twice with no intervening submission is a no-op"
//! hold the same way they would for a back-end that actually defers work.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anvil_core::{Error, MemoryHandle, Result};

use crate::bound_kernel::BoundKernel;
use crate::dispatcher::{build_env, evaluate_grid, launch_host};
use crate::event::{Event, EventList, ProfilingPoint, Status};
use crate::host::buffer::anchor_of;
use crate::kernel_spec::KernelSpec;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueueState {
    Open,
    Flushing,
    Idle,
}

/// A FIFO submission point for one back-end context. The host back-end has
/// exactly one queue per context and never actually defers work, but the
/// type is shaped so a future asynchronous back-end slots in without a
/// different public surface.
pub struct Queue {
    backend: &'static str,
    state: Mutex<QueueState>,
    epoch: Instant,
    submitted: AtomicU64,
}

impl Queue {
    pub fn new(backend: &'static str) -> Queue {
        Queue { backend, state: Mutex::new(QueueState::Idle), epoch: Instant::now(), submitted: AtomicU64::new(0) }
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }

    fn reopen(&self) {
        *self.state.lock().unwrap() = QueueState::Open;
    }

    fn elapsed(&self) -> std::time::Duration {
        self.epoch.elapsed()
    }

    fn check_backend(&self, handle_backend: &str) -> Result<()> {
        if handle_backend != self.backend {
            Err(Error::BackendMismatch { expected: self.backend.to_string(), got: handle_backend.to_string() })
        } else {
            Ok(())
        }
    }

    /// Submits a bound kernel for launch over `grid`, after `prereqs`
    /// resolve. Submission-time validation (`grid.len()` arity,
    /// back-end match, `GridMisalignment`) fails synchronously; a failed or
    /// cancelled prerequisite instead resolves the returned `Event` to
    /// `Failed(PrereqFailed(..))` without invoking the kernel body at all.
    pub fn submit(
        &self,
        op_name: &str,
        mut bound: BoundKernel,
        grid: Vec<i64>,
        prereqs: EventList,
    ) -> Result<Event> {
        self.reopen();
        let queued_at = self.elapsed();

        let spec: &KernelSpec = bound.spec();
        if grid.len() != spec.dimensions().len() {
            return Err(Error::ArityMismatch { expected: spec.dimensions().len(), got: grid.len() });
        }
        for event in prereqs.as_slice() {
            self.check_backend(event.backend())?;
        }

        let env = build_env(spec, &bound, &grid)?;
        spec.check_constraints(&env)?;

        let evaluated = evaluate_grid(spec, &env)?;

        if let Some(failure) = prereqs.first_failure() {
            let event = match failure {
                Status::Failed(e) => Event::failed_prereq(self.backend, e),
                Status::Cancelled => Event::failed_prereq(self.backend, Arc::new(Error::Cancelled)),
                Status::Resolved | Status::Pending => unreachable!(),
            };
            event.mark(ProfilingPoint::Queued, queued_at);
            return Ok(event);
        }

        let submitted_at = self.elapsed();
        *self.state.lock().unwrap() = QueueState::Flushing;

        let started_at = self.elapsed();
        let outcome = launch_host(spec.entry(), &mut bound, &evaluated, spec.outer_axis_as_range());
        let ended_at = self.elapsed();

        *self.state.lock().unwrap() = QueueState::Idle;
        self.submitted.fetch_add(1, Ordering::Relaxed);

        let event = match outcome {
            Ok(()) => Event::resolved(self.backend),
            Err(e) => Event::failed(self.backend, e),
        };
        event.mark(ProfilingPoint::Queued, queued_at);
        event.mark(ProfilingPoint::Submitted, submitted_at);
        event.mark(ProfilingPoint::Started, started_at);
        event.mark(ProfilingPoint::Ended, ended_at);

        #[cfg(feature = "debug_print")]
        eprintln!("anvil: queue '{}': submitted '{}' op '{}' -> {:?}", self.backend, spec.name(), op_name, event.status());
        #[cfg(not(feature = "debug_print"))]
        let _ = op_name;

        Ok(event)
    }

    /// Submits all queued work without waiting for it to complete. A no-op
    /// for the host back-end, which never defers.
    pub fn flush(&self) {}

    /// Waits until the queue is empty and every submitted event has reached
    /// a terminal state. Idempotent on an empty queue.
    pub fn finish(&self) {
        let mut state = self.state.lock().unwrap();
        if *state == QueueState::Idle {
            return;
        }
        *state = QueueState::Idle;
    }

    /// Returns a single `Event` standing in for the whole of `prereqs`: a
    /// lightweight stand-in for a native "fence" marker command, letting a
    /// caller join a batch of prior submissions into one dependency handle
    /// instead of threading the whole list around. Resolves once every
    /// member of `prereqs` has, or carries the first failure/cancellation
    /// found among them.
    pub fn marker(&self, prereqs: EventList) -> Result<Event> {
        for event in prereqs.as_slice() {
            self.check_backend(event.backend())?;
        }
        if let Some(failure) = prereqs.first_failure() {
            return Ok(match failure {
                Status::Failed(e) => Event::failed_prereq(self.backend, e),
                Status::Cancelled => Event::failed_prereq(self.backend, Arc::new(Error::Cancelled)),
                Status::Resolved | Status::Pending => unreachable!(),
            });
        }
        Ok(Event::resolved(self.backend))
    }

    /// Initialises `region[start_offset_bytes .. start_offset_bytes + len_bytes]`
    /// by repeating `pattern`. `len_bytes == -1` means "to the end of the
    /// region".
    pub fn fill_array(
        &self,
        region: &MemoryHandle,
        pattern: &[u8],
        start_offset_bytes: usize,
        len_bytes: i64,
        prereqs: EventList,
    ) -> Result<Event> {
        self.check_backend(region.backend())?;
        for event in prereqs.as_slice() {
            self.check_backend(event.backend())?;
        }
        if let Some(failure) = prereqs.first_failure() {
            return Ok(match failure {
                Status::Failed(e) => Event::failed_prereq(self.backend, e),
                Status::Cancelled => Event::failed_prereq(self.backend, Arc::new(Error::Cancelled)),
                Status::Resolved | Status::Pending => unreachable!(),
            });
        }

        let len = if len_bytes < 0 { region.length_bytes() - start_offset_bytes } else { len_bytes as usize };
        if pattern.is_empty() || len % pattern.len() != 0 {
            return Err(Error::SizeNotAligned { param_index: 0, element_size: pattern.len(), byte_len: len });
        }

        let outcome = match anchor_of(region) {
            Some(bytes) => {
                let mut guard = bytes.lock().unwrap();
                let mut pos = start_offset_bytes;
                while pos < start_offset_bytes + len {
                    guard[pos..pos + pattern.len()].copy_from_slice(pattern);
                    pos += pattern.len();
                }
                Ok(())
            }
            None => Err(Error::BackendMismatch { expected: self.backend.to_string(), got: "non-host anchor".into() }),
        };

        Ok(match outcome {
            Ok(()) => Event::resolved(self.backend),
            Err(e) => Event::failed(self.backend, e),
        })
    }
}
