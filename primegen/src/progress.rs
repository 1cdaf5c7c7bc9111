//! Progress reporting contract for prime generators (spec.md §4.2).
//!
//! Generators declare their phases up front via `add_linear`/
//! `add_probabilistic`, then call `report`/`report_attempt`/
//! `report_phase_complete` while working. A [`NullProgress`]
//! implementation is provided for callers that don't care.

#[derive(Debug, Clone, Copy)]
pub struct ProgressPhase(pub usize);

pub trait ProgressReceiver {
	/// Declare a phase whose progress is linear in time (e.g. sieving).
	fn add_linear(&mut self, weight:f32) -> ProgressPhase;

	/// Declare a phase whose expected number of attempts is known (e.g.
	/// probabilistic search, weighted by the reciprocal success
	/// probability).
	fn add_probabilistic(&mut self, weight:f32, success_probability:f64) -> ProgressPhase;

	/// Report fractional completion (0.0..=1.0) within a phase.
	fn report(&mut self, phase:ProgressPhase, fraction:f64);

	/// Report that one more candidate was tried within a probabilistic
	/// phase (used to update an estimate of remaining work).
	fn report_attempt(&mut self, phase:ProgressPhase);

	fn report_phase_complete(&mut self, phase:ProgressPhase);
}

/// A no-op progress receiver, for callers that don't have a UI to drive.
#[derive(Default)]
pub struct NullProgress;

impl ProgressReceiver for NullProgress {
	fn add_linear(&mut self, _weight:f32) -> ProgressPhase { ProgressPhase(0) }

	fn add_probabilistic(&mut self, _weight:f32, _success_probability:f64) -> ProgressPhase {
		ProgressPhase(0)
	}

	fn report(&mut self, _phase:ProgressPhase, _fraction:f64) {}

	fn report_attempt(&mut self, _phase:ProgressPhase) {}

	fn report_phase_complete(&mut self, _phase:ProgressPhase) {}
}
