//! Look-ahead note scheduler driven by the context's ticks.

use cadenza_core::{Seconds, SubscriberError, Tick};
use cadenza_synth::{SynthEngine, ToneSpec};

/// Places notes into the engine's graph shortly before they are due.
///
/// On every tick, each pending note starting before `tick.time + look_ahead`
/// is scheduled at its own start time. Notes are consumed in start order, so
/// a look-ahead shorter than the tick spacing delays when a note is placed,
/// never where it sounds.
pub struct Sequencer {
    notes: Vec<ToneSpec>,
    cursor: usize,
    look_ahead: Seconds,
}

impl Sequencer {
    /// Create a sequencer over `notes`, which must be sorted by start time.
    pub fn new(notes: Vec<ToneSpec>, look_ahead: Seconds) -> Self {
        debug_assert!(notes.windows(2).all(|w| w[0].start <= w[1].start));
        Self {
            notes,
            cursor: 0,
            look_ahead,
        }
    }

    /// Tick handler.
    pub fn on_tick(
        &mut self,
        tick: Tick,
        engine: &mut SynthEngine,
    ) -> Result<(), SubscriberError> {
        let horizon = tick.time + self.look_ahead;
        while let Some(note) = self.notes.get(self.cursor) {
            if note.start >= horizon {
                break;
            }
            let id = engine.graph_mut().schedule_tone(*note)?;
            tracing::trace!(?id, start = note.start, tick = tick.index, "note scheduled");
            self.cursor += 1;
        }
        Ok(())
    }
}
