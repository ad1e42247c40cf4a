//! Integration tests for offline rendering through a recording engine.

use cadenza_core::{
    AudioBuffer, Error, OfflineContext, OfflineEngine, RenderTarget, RenderingEngine, Result,
    Seconds, TICK_STEP,
};
use futures::executor::block_on;

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Tick(Seconds),
    Timer(Seconds),
    Render,
}

/// Engine that records everything done to it and writes a unit impulse at
/// every marked time.
#[derive(Debug)]
struct Recorder {
    channels: usize,
    length: usize,
    sample_rate: f32,
    log: Vec<Event>,
    marks: Vec<Seconds>,
    fail_with: Option<&'static str>,
}

impl RenderingEngine for Recorder {
    fn channels(&self) -> usize {
        self.channels
    }

    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

impl OfflineEngine for Recorder {
    fn with_shape(channels: usize, length: usize, sample_rate: f32) -> Result<Self> {
        Ok(Self {
            channels,
            length,
            sample_rate,
            log: Vec::new(),
            marks: Vec::new(),
            fail_with: None,
        })
    }

    fn length(&self) -> usize {
        self.length
    }

    async fn start_rendering(&mut self) -> Result<AudioBuffer> {
        self.log.push(Event::Render);
        if let Some(reason) = self.fail_with {
            return Err(Error::InvalidState(reason.to_string()));
        }
        let mut buffer = AudioBuffer::new(self.channels, self.length, self.sample_rate);
        for &time in &self.marks {
            let frame = buffer.frame_at(time);
            for channel in buffer.channels_mut() {
                if let Some(sample) = channel.get_mut(frame) {
                    *sample = 1.0;
                }
            }
        }
        Ok(buffer)
    }
}

fn tick_times(log: &[Event]) -> Vec<Seconds> {
    log.iter()
        .filter_map(|e| match e {
            Event::Tick(t) => Some(*t),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tick sequence
// ---------------------------------------------------------------------------

#[test]
fn one_second_render_ticks_every_five_ms() {
    let mut ctx = OfflineContext::<Recorder>::new(2, 1.0, 44100.0).unwrap();
    ctx.on_tick(|tick, engine| {
        engine.log.push(Event::Tick(tick.time));
        Ok(())
    });

    block_on(ctx.render()).unwrap();

    let times = tick_times(&ctx.engine().log);
    assert_eq!(times.len(), 201);
    assert_eq!(times[0], 0.0);
    assert!((times[200] - 1.0).abs() < 1e-9);
    for pair in times.windows(2) {
        assert!(pair[1] > pair[0], "ticks must strictly increase");
        assert!((pair[1] - pair[0] - TICK_STEP).abs() < 1e-9);
    }
}

#[test]
fn last_tick_is_last_step_not_past_duration() {
    let mut ctx = OfflineContext::<Recorder>::new(1, 0.0123, 8000.0).unwrap();
    ctx.on_tick(|tick, engine| {
        engine.log.push(Event::Tick(tick.time));
        Ok(())
    });

    block_on(ctx.render()).unwrap();

    let times = tick_times(&ctx.engine().log);
    assert_eq!(times.len(), 3);
    assert!((times[2] - 0.01).abs() < 1e-9);
    assert!(ctx.current_time() >= 0.0123);
}

#[test]
fn synthesis_happens_once_after_last_tick() {
    let mut ctx = OfflineContext::<Recorder>::new(2, 0.05, 48000.0).unwrap();
    ctx.on_tick(|tick, engine| {
        engine.log.push(Event::Tick(tick.time));
        Ok(())
    });

    block_on(ctx.render()).unwrap();

    let log = &ctx.engine().log;
    let renders = log.iter().filter(|e| **e == Event::Render).count();
    assert_eq!(renders, 1);
    assert_eq!(log.last(), Some(&Event::Render));
    assert_eq!(log.len(), 12);
}

#[test]
fn timers_fire_on_virtual_time() {
    let mut ctx = OfflineContext::<Recorder>::new(1, 0.1, 48000.0).unwrap();
    ctx.set_timeout(
        |tick, engine| {
            engine.log.push(Event::Timer(tick.time));
            Ok(())
        },
        0.05,
    )
    .unwrap();
    let interval = ctx
        .set_interval(
            |tick, engine| {
                engine.log.push(Event::Timer(tick.time));
                Ok(())
            },
            0.04,
        )
        .unwrap();

    block_on(ctx.render()).unwrap();

    let fired: Vec<Seconds> = ctx
        .engine()
        .log
        .iter()
        .filter_map(|e| match e {
            Event::Timer(t) => Some(*t),
            _ => None,
        })
        .collect();
    assert_eq!(fired.len(), 3);
    assert!((fired[0] - 0.04).abs() < 1e-9);
    assert!((fired[1] - 0.05).abs() < 1e-9);
    assert!((fired[2] - 0.08).abs() < 1e-9);
    assert!(ctx.clear_interval(interval));
}

#[test]
fn vanishing_interval_fires_once_per_tick() {
    let mut ctx = OfflineContext::<Recorder>::new(1, 0.02, 8000.0).unwrap();
    ctx.set_interval(
        |tick, engine| {
            engine.log.push(Event::Timer(tick.time));
            Ok(())
        },
        1e-20,
    )
    .unwrap();

    block_on(ctx.render()).unwrap();

    let fired = ctx
        .engine()
        .log
        .iter()
        .filter(|e| matches!(e, Event::Timer(_)))
        .count();
    assert_eq!(ctx.ticks_emitted(), 5);
    assert_eq!(fired, 5);
}

// ---------------------------------------------------------------------------
// Clock accessors
// ---------------------------------------------------------------------------

#[test]
fn now_tracks_current_time_not_wall_clock() {
    let mut ctx = OfflineContext::<Recorder>::new(1, 0.03, 8000.0).unwrap();
    assert_eq!(ctx.now(), ctx.current_time());

    std::thread::sleep(std::time::Duration::from_millis(5));
    assert_eq!(ctx.now(), 0.0);

    block_on(ctx.render()).unwrap();
    assert_eq!(ctx.now(), ctx.current_time());
}

#[test]
fn triple_and_engine_construction_match() {
    let triple = OfflineContext::<Recorder>::create(RenderTarget::shape(2, 1.0, 44100.0)).unwrap();
    let engine = Recorder::with_shape(2, 44100, 44100.0).unwrap();
    let adopted = OfflineContext::create(RenderTarget::Engine(engine)).unwrap();

    assert_eq!(triple.duration(), 1.0);
    assert_eq!(adopted.duration(), 1.0);
    assert_eq!(triple.sample_rate(), adopted.sample_rate());
    assert_eq!(triple.length(), adopted.length());
}

// ---------------------------------------------------------------------------
// Scheduling into the buffer
// ---------------------------------------------------------------------------

#[test]
fn work_scheduled_at_tick_lands_at_matching_frame() {
    let sample_rate = 44100.0;
    let mut ctx = OfflineContext::<Recorder>::new(2, 0.1, sample_rate).unwrap();
    ctx.on_tick(|tick, engine| {
        if tick.index == 7 {
            engine.marks.push(tick.time);
        }
        Ok(())
    });

    let buffer = block_on(ctx.render()).unwrap();

    let expected = (7.0 * TICK_STEP * sample_rate as f64).round() as usize;
    for channel in buffer.channels() {
        let hits: Vec<usize> = channel
            .iter()
            .enumerate()
            .filter(|(_, s)| **s != 0.0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(hits, vec![expected]);
    }
}

// ---------------------------------------------------------------------------
// Failure propagation
// ---------------------------------------------------------------------------

#[test]
fn engine_failure_propagates_unchanged() {
    let mut engine = Recorder::with_shape(1, 800, 8000.0).unwrap();
    engine.fail_with = Some("already started");
    let mut ctx = OfflineContext::from_engine(engine).unwrap();

    match block_on(ctx.render()) {
        Err(Error::InvalidState(reason)) => assert_eq!(reason, "already started"),
        other => panic!("expected invalid state, got {other:?}"),
    }
}

#[test]
fn subscriber_failure_aborts_before_synthesis() {
    let mut ctx = OfflineContext::<Recorder>::new(1, 0.1, 8000.0).unwrap();
    ctx.on_tick(|tick, engine| {
        engine.log.push(Event::Tick(tick.time));
        if tick.index == 3 {
            return Err("scheduler exploded".into());
        }
        Ok(())
    });

    let err = block_on(ctx.render()).unwrap_err();
    match err {
        Error::Subscriber { time, source } => {
            assert!((time - 0.015).abs() < 1e-9);
            assert_eq!(source.to_string(), "scheduler exploded");
        }
        other => panic!("expected subscriber error, got {other:?}"),
    }
    assert!(!ctx.engine().log.contains(&Event::Render));
    assert_eq!(ctx.engine().log.len(), 4);
}

#[test]
fn close_always_succeeds() {
    let ctx = OfflineContext::<Recorder>::new(1, 0.01, 8000.0).unwrap();
    assert!(block_on(ctx.close()).is_ok());
    assert_eq!(ctx.current_time(), 0.0);
}
