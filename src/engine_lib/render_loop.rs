// src/engine_lib/render_loop.rs

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic time since an arbitrary origin.
pub trait TimeSource {
    fn now(&self) -> Duration;
}

pub struct MonotonicTime {
    origin: Instant,
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self { origin: Instant::now() }
    }
}

impl TimeSource for MonotonicTime {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-advanced time, shared between the clock and the test driving it.
#[derive(Clone, Default)]
pub struct ManualTime(Rc<Cell<Duration>>);

impl ManualTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.0.set(self.0.get() + by);
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> Duration {
        self.0.get()
    }
}

/// Elapsed-time accumulator started once at scene construction.
pub struct Clock {
    source: Box<dyn TimeSource>,
    started_at: Duration,
}

impl Clock {
    pub fn new() -> Self {
        Self::with_source(MonotonicTime::default())
    }

    pub fn with_source(source: impl TimeSource + 'static) -> Self {
        let started_at = source.now();
        Self { source: Box::new(source), started_at }
    }

    pub fn elapsed(&self) -> Duration {
        self.source.now().saturating_sub(self.started_at)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTime {
    /// Seconds since the clock started.
    pub elapsed: f32,
    /// Seconds since the previous tick.
    pub delta: f32,
    pub frame: u64,
}

/// The host's frame presentation primitive.
pub trait FrameScheduler {
    /// Waits for the next frame callback. `false` once the host is gone.
    fn next_frame(&mut self) -> bool;
}

/// Stops a running loop from anywhere, including from inside a tick.
#[derive(Clone, Default)]
pub struct LoopControl(Rc<Cell<bool>>);

impl LoopControl {
    pub fn stop(&self) {
        self.0.set(true);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.get()
    }
}

/// One tick per host frame callback; never skips or coalesces frames.
///
/// After a suspension the next tick simply reports the whole gap as its
/// `delta`.
pub struct RenderLoop {
    clock: Clock,
    control: LoopControl,
    last_elapsed: f32,
    frame: u64,
}

impl RenderLoop {
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            control: LoopControl::default(),
            last_elapsed: 0.0,
            frame: 0,
        }
    }

    pub fn control(&self) -> LoopControl {
        self.control.clone()
    }

    pub fn stop(&self) {
        self.control.stop();
    }

    pub fn is_running(&self) -> bool {
        !self.control.is_stopped()
    }

    pub fn frames(&self) -> u64 {
        self.frame
    }

    pub fn tick(&mut self) -> Option<FrameTime> {
        if self.control.is_stopped() {
            return None;
        }
        let elapsed = self.clock.elapsed().as_secs_f32();
        let time = FrameTime {
            elapsed,
            delta: elapsed - self.last_elapsed,
            frame: self.frame,
        };
        self.last_elapsed = elapsed;
        self.frame += 1;
        Some(time)
    }

    /// Drives `tick_fn` once per scheduler frame until stopped or the host
    /// goes away. Returns the number of frames run.
    pub fn run<S, F>(&mut self, scheduler: &mut S, mut tick_fn: F) -> u64
    where
        S: FrameScheduler + ?Sized,
        F: FnMut(FrameTime),
    {
        let start = self.frame;
        while self.is_running() && scheduler.next_frame() {
            match self.tick() {
                Some(time) => tick_fn(time),
                None => break,
            }
        }
        log::debug!("render loop ended after {} frames", self.frame - start);
        self.frame - start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Frames {
        time: ManualTime,
        remaining: u32,
    }

    impl FrameScheduler for Frames {
        fn next_frame(&mut self) -> bool {
            if self.remaining == 0 {
                return false;
            }
            self.remaining -= 1;
            self.time.advance(Duration::from_millis(16));
            true
        }
    }

    #[test]
    fn runs_until_host_stops_scheduling() {
        let time = ManualTime::new();
        let mut render_loop = RenderLoop::new(Clock::with_source(time.clone()));
        let mut scheduler = Frames { time, remaining: 5 };

        let mut seen = Vec::new();
        let frames = render_loop.run(&mut scheduler, |t| seen.push(t));
        assert_eq!(frames, 5);
        assert_eq!(seen.iter().map(|t| t.frame).collect::<Vec<_>>(), [0, 1, 2, 3, 4]);
        assert!((seen[4].elapsed - 0.080).abs() < 1e-6);
    }

    #[test]
    fn stop_from_inside_a_tick_ends_the_loop() {
        let time = ManualTime::new();
        let mut render_loop = RenderLoop::new(Clock::with_source(time.clone()));
        let control = render_loop.control();
        let mut scheduler = Frames { time, remaining: 100 };

        let frames = render_loop.run(&mut scheduler, |t| {
            if t.frame == 2 {
                control.stop();
            }
        });
        assert_eq!(frames, 3);
        assert_eq!(render_loop.tick(), None);
    }

    #[test]
    fn suspension_shows_up_as_one_large_delta() {
        let time = ManualTime::new();
        let mut render_loop = RenderLoop::new(Clock::with_source(time.clone()));
        time.advance(Duration::from_millis(16));
        render_loop.tick();
        time.advance(Duration::from_secs(30));
        let resumed = render_loop.tick().unwrap();
        assert!((resumed.delta - 30.0).abs() < 1e-3);
        assert_eq!(resumed.frame, 1);
    }
}
