//! Timer driver abstraction.
//!
//! The generator re-programs its own interval on every interrupt, so the
//! platform timer is modelled as a one-shot that can be re-armed from inside
//! its own callback.

/// One-shot step timer.
///
/// The platform implementation schedules the generator's tick once, `delay_us`
/// microseconds after [`arm`](StepTimer::arm) is called. Arming replaces any
/// pending arm; the generator relies on that to re-program the interval from
/// inside the callback. Granularity must be 1 µs or better — the generator
/// never arms below its own 100 µs floor.
pub trait StepTimer {
    /// Schedule the next tick after `delay_us` microseconds, replacing any
    /// pending schedule.
    fn arm(&mut self, delay_us: u32);

    /// Drop any pending schedule.
    fn cancel(&mut self);
}
