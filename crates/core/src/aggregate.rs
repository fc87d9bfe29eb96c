//! Command/event aggregates for the blog domain.

use core::fmt::Debug;
use core::hash::Hash;

/// Identity and event count of an aggregate instance.
pub trait AggregateRoot {
    type Id: Clone + Eq + Hash + Debug;

    fn id(&self) -> &Self::Id;

    /// Events folded into this instance so far.
    fn version(&self) -> u64;
}

/// A pure decide/evolve pair.
///
/// `handle` looks at a command and the current state and answers with the
/// events that record what happened; it never mutates. `apply` folds one
/// event in. Neither side performs IO: publishing the decided events is the
/// caller's job.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + Debug;
    type Event: Clone + Debug;
    type Error: Debug;

    fn apply(&mut self, event: &Self::Event);

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Decide, then fold the decided events into `self`.
    ///
    /// On error the state is left untouched.
    fn execute(&mut self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let events = self.handle(command)?;
        for event in &events {
            self.apply(event);
        }
        Ok(events)
    }

    /// Rebuild an instance by folding `history` into `initial`.
    fn rehydrate<'a, I>(mut initial: Self, history: I) -> Self
    where
        Self: Sized,
        Self::Event: 'a,
        I: IntoIterator<Item = &'a Self::Event>,
    {
        for event in history {
            initial.apply(event);
        }
        initial
    }
}
