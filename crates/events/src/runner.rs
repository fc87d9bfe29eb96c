//! Projection runner: the single writer in front of a projection.
//!
//! Read models are **disposable**; the log is the source of truth. The runner
//! rebuilds a projection from a full history and then keeps applying live
//! deliveries, remembering how far the rebuild got.

use thiserror::Error;
use tracing::{debug, warn};

use crate::{Applied, Event, EventEnvelope, Projection};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunnerError {
    #[error("non-monotonic sequence number in history (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

/// Counters for one rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct RunOutcome {
    /// Events handed to the runner.
    pub fetched: u64,
    /// Events that changed state.
    pub applied: u64,
    /// Events that were relevant but already reflected, or ignored by kind.
    pub unchanged: u64,
    /// Events rejected by the projection (reported and skipped).
    pub skipped: u64,
    /// Highest sequence number folded.
    pub last_sequence: Option<u64>,
}

#[derive(Debug)]
pub struct ProjectionRunner<P>
where
    P: Projection,
{
    projection: P,
    high_water_mark: Option<u64>,
}

impl<P> ProjectionRunner<P>
where
    P: Projection,
{
    pub fn new(projection: P) -> Self {
        Self {
            projection,
            high_water_mark: None,
        }
    }

    pub fn projection(&self) -> &P {
        &self.projection
    }

    /// Last sequence folded by the most recent rebuild.
    pub fn high_water_mark(&self) -> Option<u64> {
        self.high_water_mark
    }

    /// Whether a delivery's sequence number falls inside the rebuilt range.
    ///
    /// Only a hint: the bus keeps its log in memory, so after a bus restart
    /// new events reuse old sequence numbers.
    pub fn covered_by_replay(&self, sequence: Option<u64>) -> bool {
        matches!((sequence, self.high_water_mark), (Some(seq), Some(mark)) if seq <= mark)
    }

    /// Apply a live delivery.
    ///
    /// Every delivery is folded; the projection's idempotence absorbs echoes of
    /// events the rebuild already saw. Live sequence numbers do not advance the
    /// mark.
    pub fn apply_live(&mut self, sequence: Option<u64>, event: &Event) -> Result<Applied, P::Error> {
        if self.covered_by_replay(sequence) {
            debug!(?sequence, high_water_mark = ?self.high_water_mark, kind = %event.kind(), "live delivery inside replayed range");
        }
        self.projection.apply(event)
    }

    /// Rebuild the projection from scratch by folding the full history in order.
    ///
    /// The history is checked for strictly increasing sequence numbers before
    /// anything is reset, so a bad history leaves the current state untouched.
    pub fn rebuild_from_scratch(
        &mut self,
        history: &[EventEnvelope<Event>],
    ) -> Result<RunOutcome, RunnerError> {
        let mut last = 0u64;
        for env in history {
            let found = env.sequence_number();
            if found <= last {
                return Err(RunnerError::NonMonotonicSequence { last, found });
            }
            last = found;
        }

        self.projection.reset();
        self.high_water_mark = None;

        let mut outcome = RunOutcome::default();
        for env in history {
            outcome.fetched += 1;
            match self.projection.apply(env.payload()) {
                Ok(Applied::Changed) => outcome.applied += 1,
                Ok(Applied::Unchanged | Applied::Ignored) => outcome.unchanged += 1,
                Err(err) => {
                    outcome.skipped += 1;
                    warn!(
                        sequence = env.sequence_number(),
                        kind = %env.payload().kind(),
                        error = %err,
                        "projection skipped event during replay"
                    );
                }
            }
            outcome.last_sequence = Some(env.sequence_number());
        }

        self.high_water_mark = outcome.last_sequence;
        Ok(outcome)
    }
}
