use crate::models::outcome::ScanOutcome;
use crate::models::state::{Generation, SessionState};

/// Event delegate for scan sessions.
///
/// Methods may be called from the caller's thread, a camera completion
/// thread or the frame sampler thread. Calls never overlap and arrive in the
/// order the session changed. No controller state lock is held during a
/// call, so implementations may call back into the controller.
pub trait ScanDelegate: Send + Sync {
    /// Called on every session state transition.
    fn on_state_changed(&self, generation: Generation, state: SessionState);

    /// Called once with the decoded text, right before the matching `on_outcome`.
    fn on_scan_success(&self, text: &str);

    /// Called exactly once per scan attempt that produces an outcome.
    fn on_outcome(&self, outcome: &ScanOutcome);

    /// Non-fatal live decoder trouble, reported once per streak of faults.
    fn on_decode_warning(&self, detail: &str);
}
