//! Two-rate scheduler: motion every frame, an AI turn whenever the turn
//! interval has elapsed.
//!
//! Time is supplied by the caller as frame deltas, so the driver works the
//! same under a render loop and in headless runs.

use crate::config::Config;
use crate::ecosystem::Ecosystem;

/// What happened during one driver frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub turns: u32,
    pub arrivals: usize,
}

/// Accumulates frame time and fires turns on a fixed interval
#[derive(Clone, Debug)]
pub struct TurnDriver {
    /// Seconds of simulated time between AI turns
    turn_interval: f32,
    max_frame_dt: f32,
    accumulator: f32,
    speed: f32,
}

impl TurnDriver {
    pub fn new(turn_interval: f32, max_frame_dt: f32) -> Self {
        Self {
            turn_interval: if turn_interval > 0.0 { turn_interval } else { 1.0 },
            max_frame_dt: max_frame_dt.max(0.0),
            accumulator: 0.0,
            speed: 1.0,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.world.turn_duration_ms as f32 / 1000.0,
            config.world.max_frame_dt,
        )
    }

    /// Simulation speed multiplier, clamped to `[0.1, 10]`
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = if speed.is_finite() { speed.clamp(0.1, 10.0) } else { 1.0 };
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Fraction of the current turn interval already elapsed, in `[0, 1]`
    pub fn turn_progress(&self) -> f32 {
        (self.accumulator / self.turn_interval).clamp(0.0, 1.0)
    }

    /// Advance by one frame of `dt` real seconds
    pub fn frame(&mut self, ecosystem: &mut Ecosystem, dt: f32) -> FrameReport {
        self.step(ecosystem, dt, u32::MAX, &mut |_: &Ecosystem| {})
    }

    /// One frame firing at most `max_turns` turns, calling `on_turn` after
    /// each. Time owed to further turns stays in the accumulator.
    fn step<F>(&mut self, ecosystem: &mut Ecosystem, dt: f32, max_turns: u32, on_turn: &mut F) -> FrameReport
    where
        F: FnMut(&Ecosystem),
    {
        let mut report = FrameReport::default();
        if ecosystem.is_paused() || !dt.is_finite() || dt <= 0.0 {
            return report;
        }

        let dt = (dt * self.speed).min(self.max_frame_dt.max(f32::EPSILON) * self.speed);
        report.arrivals = ecosystem.advance_motion(dt);

        self.accumulator += dt;
        while report.turns < max_turns && self.accumulator >= self.turn_interval {
            self.accumulator -= self.turn_interval;
            ecosystem.simulate_turn();
            on_turn(ecosystem);
            report.turns += 1;
        }
        report
    }

    /// Run fixed-size frames until `turns` AI turns have completed,
    /// invoking `on_turn` after each one
    pub fn run_turns<F>(&mut self, ecosystem: &mut Ecosystem, turns: u64, fps: u32, mut on_turn: F)
    where
        F: FnMut(&Ecosystem),
    {
        if ecosystem.is_paused() {
            return;
        }
        let dt = 1.0 / fps.max(1) as f32;
        let mut done = 0u64;
        while done < turns {
            let remaining = u32::try_from(turns - done).unwrap_or(u32::MAX);
            let report = self.step(ecosystem, dt, remaining, &mut on_turn);
            done += u64::from(report.turns);
        }
    }
}
