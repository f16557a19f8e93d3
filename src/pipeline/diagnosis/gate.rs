//! Single-flight guard for diagnosis submissions.
//!
//! One orchestrator runs at most one submission at a time. A second
//! submission arriving while the first is between `Building` and a terminal
//! phase is rejected immediately instead of queued; the operator resubmits.
//! The gate also holds the observable phase of the current (or last) run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde::Serialize;

// ── Types ──────────────────────────────────────────────

/// Lifecycle of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisPhase {
    Idle,
    /// Normalizing the region, retrieving context, assembling the request.
    Building,
    /// Request handed to the transport; the only suspension point.
    AwaitingResponse,
    Succeeded,
    Failed,
}

impl DiagnosisPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Building | Self::AwaitingResponse)
    }
}

impl std::fmt::Display for DiagnosisPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Building => write!(f, "Building"),
            Self::AwaitingResponse => write!(f, "Awaiting response"),
            Self::Succeeded => write!(f, "Succeeded"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

// ── SubmissionGate ─────────────────────────────────────

pub struct SubmissionGate {
    in_flight: AtomicBool,
    phase: Mutex<DiagnosisPhase>,
}

impl SubmissionGate {
    pub fn new() -> Self {
        Self {
            in_flight: AtomicBool::new(false),
            phase: Mutex::new(DiagnosisPhase::Idle),
        }
    }

    /// Claim the gate without waiting.
    ///
    /// Returns `None` if another submission holds it. On success the phase
    /// moves to `Building`; the guard must be held until the submission ends.
    pub fn try_acquire(&self) -> Option<SubmissionGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        self.set_phase(DiagnosisPhase::Building);
        Some(SubmissionGuard { gate: self })
    }

    /// Phase of the current submission, or the outcome of the last one.
    pub fn phase(&self) -> DiagnosisPhase {
        self.phase
            .lock()
            .map(|p| *p)
            .unwrap_or(DiagnosisPhase::Idle)
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    // ── Internal ────────────────────────────────────────────

    fn set_phase(&self, next: DiagnosisPhase) {
        if let Ok(mut phase) = self.phase.lock() {
            tracing::debug!(from = %*phase, to = %next, "Diagnosis phase transition");
            *phase = next;
        }
    }
}

impl Default for SubmissionGate {
    fn default() -> Self {
        Self::new()
    }
}

// ── SubmissionGuard ────────────────────────────────────

/// Dropping the guard releases the gate. A submission abandoned before
/// reaching a terminal phase (its future was dropped) resets to `Idle`.
pub struct SubmissionGuard<'a> {
    gate: &'a SubmissionGate,
}

impl SubmissionGuard<'_> {
    pub fn advance(&self, next: DiagnosisPhase) {
        self.gate.set_phase(next);
    }
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        if self.gate.phase().is_in_flight() {
            self.gate.set_phase(DiagnosisPhase::Idle);
        }
        self.gate.in_flight.store(false, Ordering::Release);
    }
}
