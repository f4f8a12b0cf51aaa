//! Keeps emulated time in step with real time and raises the raster interrupts.
//!
//! The scheduler turns elapsed time into a cycle budget, steps the machine until the budget is
//! spent, and at every half-frame boundary presents the next of two alternating restart vectors.
//! A presented vector is taken only if the chip has interrupts enabled; otherwise it is dropped.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::{
    trace::{Silent, Trace},
    Harness, Machine, Stop,
};

const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// Clock and raster parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Cycles per second.
    pub clock_rate: u64,
    /// Frames per second. Each frame has two interrupts.
    pub frame_rate: u32,
    /// Restart addresses presented at mid-frame and at end of frame, in that order.
    pub vectors: [u8; 2],
}

impl Default for Timing {
    fn default() -> Self {
        Self { clock_rate: 2_000_000, frame_rate: 60, vectors: [0x08, 0x10] }
    }
}

impl Timing {
    pub fn cycles_per_frame(&self) -> u64 {
        self.clock_rate / self.frame_rate.max(1) as u64
    }

    pub fn cycles_per_half_frame(&self) -> u64 {
        self.cycles_per_frame() / 2
    }

    pub fn frame(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate.max(1)
    }
}

/// What one call to [`Scheduler::advance`] did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Cycles run, interrupt entry included.
    pub cycles: u64,
    /// Half-frame boundaries at which a vector was offered.
    pub presented: u32,
    /// Offers the chip took.
    pub accepted: u32,
}

impl core::ops::AddAssign for Tick {
    fn add_assign(&mut self, other: Self) {
        self.cycles += other.cycles;
        self.presented += other.presented;
        self.accepted += other.accepted;
    }
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    timing: Timing,
    /// Cycles still owed to the machine. Negative after an instruction overshoots the budget.
    credit: i64,
    /// Sub-cycle remainder of past budgets, in cycle-nanoseconds.
    fraction: u128,
    half_frame: u64,
    next_vector: usize,
    pending: bool,
    last: Option<Instant>,
}

impl Default for Scheduler {
    fn default() -> Self { Self::new(Timing::default()) }
}

impl Scheduler {
    pub fn new(timing: Timing) -> Self {
        Self { timing, credit: 0, fraction: 0, half_frame: 0, next_vector: 0, pending: false, last: None }
    }

    pub fn timing(&self) -> &Timing { &self.timing }

    /// Marks `now` as the reference point for the next [`tick`](Self::tick).
    pub fn start(&mut self, now: Instant) {
        self.last = Some(now);
    }

    /// Runs the machine for the wall-clock time since the previous tick (or [`start`](Self::start)).
    /// The first tick without a reference point only records `now`.
    pub fn tick<H: Harness>(&mut self, machine: &mut Machine<H>, now: Instant) -> Result<Tick, Stop> {
        self.tick_traced(machine, now, &mut Silent)
    }

    /// [`tick`](Self::tick), showing every instruction to `trace`.
    pub fn tick_traced<H: Harness, T: Trace + ?Sized>(
        &mut self,
        machine: &mut Machine<H>,
        now: Instant,
        trace: &mut T,
    ) -> Result<Tick, Stop> {
        let elapsed = match self.last.replace(now) {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::ZERO,
        };
        self.advance_traced(machine, elapsed, trace)
    }

    /// Runs the machine for `elapsed` of emulated time. Never stops mid-instruction; whatever
    /// the last instruction overshoots is taken off the next budget.
    pub fn advance<H: Harness>(&mut self, machine: &mut Machine<H>, elapsed: Duration) -> Result<Tick, Stop> {
        self.advance_traced(machine, elapsed, &mut Silent)
    }

    /// [`advance`](Self::advance), showing every instruction to `trace`.
    pub fn advance_traced<H: Harness, T: Trace + ?Sized>(
        &mut self,
        machine: &mut Machine<H>,
        elapsed: Duration,
        trace: &mut T,
    ) -> Result<Tick, Stop> {
        self.credit = self.credit.saturating_add(self.budget(elapsed));
        let half_frame = self.timing.cycles_per_half_frame().max(1);
        let mut tick = Tick::default();
        while self.credit > 0 {
            let cycles = if self.pending {
                self.pending = false;
                let vector = self.timing.vectors[self.next_vector];
                self.next_vector ^= 1;
                tick.presented += 1;
                let before = machine.chip().cycles();
                let taken = machine.interrupt(vector)?;
                trace!(vector, taken, "interrupt presented");
                if !taken {
                    continue;
                }
                tick.accepted += 1;
                machine.chip().cycles().wrapping_sub(before)
            } else {
                machine.step_traced(trace)? as u64
            };
            self.credit -= cycles as i64;
            tick.cycles += cycles;
            self.half_frame += cycles;
            if self.half_frame >= half_frame {
                self.half_frame -= half_frame;
                self.pending = true;
            }
        }
        debug!(cycles = tick.cycles, presented = tick.presented, accepted = tick.accepted, "tick");
        Ok(tick)
    }

    fn budget(&mut self, elapsed: Duration) -> i64 {
        let scaled = elapsed.as_nanos() * self.timing.clock_rate as u128 + self.fraction;
        self.fraction = scaled % NANOS_PER_SECOND;
        i64::try_from(scaled / NANOS_PER_SECOND).unwrap_or(i64::MAX)
    }
}

/// Sleeps away what is left of each frame once its work is done.
#[derive(Debug, Clone)]
pub struct FramePacer {
    frame: Duration,
    deadline: Instant,
}

impl FramePacer {
    pub fn new(timing: &Timing, now: Instant) -> Self {
        let frame = timing.frame();
        Self { frame, deadline: now + frame }
    }

    /// Blocks until the current frame's deadline and returns the time slept. A caller that has
    /// fallen more than a frame behind is resynchronized instead of allowed to sprint.
    pub fn wait(&mut self) -> Duration {
        let now = Instant::now();
        let slept = self.deadline.saturating_duration_since(now);
        if !slept.is_zero() {
            spin_sleep::sleep(slept);
        }
        self.deadline += self.frame;
        if self.deadline + self.frame < now {
            self.deadline = now + self.frame;
        }
        slept
    }
}
