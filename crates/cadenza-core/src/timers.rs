//! Timeouts and intervals fired from ticks.
//!
//! Timers have no thread of their own. Each tick, the owning context calls
//! [`Timers::fire`], which runs every timer due at or before the tick time,
//! earliest first. An interval fires at most once per tick. When its period is
//! shorter than the tick spacing, the missed repeats are skipped and the next
//! one is due a full period after the tick.

use crate::clock::{Seconds, TIME_EPSILON};
use crate::emitter::{SubscriberError, Tick, TickCallback};
use crate::{Error, Result};

/// Handle for a pending timeout or interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

struct Timer<E> {
    id: TimerId,
    due: Seconds,
    period: Option<Seconds>,
    callback: TickCallback<E>,
}

/// Pending timers, fired in `(due, id)` order.
pub(crate) struct Timers<E> {
    entries: Vec<Timer<E>>,
    next_id: u64,
}

impl<E> Timers<E> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Add a timer due at `due`, repeating every `period` if given.
    pub(crate) fn add<F>(&mut self, due: Seconds, period: Option<Seconds>, callback: F) -> TimerId
    where
        F: FnMut(Tick, &mut E) -> std::result::Result<(), SubscriberError> + 'static,
    {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Timer {
            id,
            due,
            period,
            callback: Box::new(callback),
        });
        id
    }

    pub(crate) fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|t| t.id != id);
        self.entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Index of the earliest timer due by `time`.
    fn next_due(&self, time: Seconds) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= time + TIME_EPSILON)
            .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.id.cmp(&b.id)))
            .map(|(idx, _)| idx)
    }

    /// Run every timer due at or before `tick.time`.
    ///
    /// A failing timer is dropped and the error aborts the tick. Intervals
    /// that already fired are held back until the tick is done, so the loop
    /// ends however small their period is.
    pub(crate) fn fire(&mut self, tick: Tick, engine: &mut E) -> Result<()> {
        let mut rearmed = Vec::new();
        let result = self.fire_due(tick, engine, &mut rearmed);
        self.entries.append(&mut rearmed);
        result
    }

    fn fire_due(
        &mut self,
        tick: Tick,
        engine: &mut E,
        rearmed: &mut Vec<Timer<E>>,
    ) -> Result<()> {
        while let Some(idx) = self.next_due(tick.time) {
            let mut timer = self.entries.swap_remove(idx);
            (timer.callback)(tick, engine).map_err(|source| Error::Subscriber {
                time: tick.time,
                source,
            })?;
            if let Some(period) = timer.period {
                timer.due += period;
                if timer.due <= tick.time + TIME_EPSILON {
                    timer.due = tick.time + period;
                }
                rearmed.push(timer);
            }
        }
        Ok(())
    }
}
