//! Busy-wait delays computed from the current core clock.
//!
//! [`BusyWait`] implements both `DelayNs` traits, so it can be handed to the
//! driver directly. The wait never yields; the calling context is blocked for
//! the full duration.

/// Supplies the core clock frequency. Read on every wait so that clock
/// reconfiguration after start-up is picked up.
pub trait ClockSource {
    fn core_clock_hz(&self) -> u32;
}

/// Spin primitive that burns an exact number of core cycles in 4-cycle steps.
pub trait CycleSpin {
    /// `cycles` is always a non-zero multiple of 4.
    fn spin(&mut self, cycles: u32);
}

/// Granularity of the spin loop.
pub const SPIN_STEP: u64 = 4;
const MAX_SPIN_CHUNK: u64 = (u32::MAX as u64) & !(SPIN_STEP - 1);

pub const fn cycles_for_ms(freq_hz: u32, ms: u32) -> u64 {
    (freq_hz as u64 * ms as u64).div_ceil(1_000)
}

pub const fn cycles_for_us(freq_hz: u32, us: u32) -> u64 {
    (freq_hz as u64 * us as u64).div_ceil(1_000_000)
}

pub const fn cycles_for_ns(freq_hz: u32, ns: u32) -> u64 {
    (freq_hz as u64 * ns as u64).div_ceil(1_000_000_000)
}

/// Rounds up to the spin granularity, never below one step.
pub const fn spin_cycles(cycles: u64) -> u64 {
    let rounded = cycles.div_ceil(SPIN_STEP) * SPIN_STEP;
    if rounded == 0 { SPIN_STEP } else { rounded }
}

pub struct BusyWait<C, S> {
    clock: C,
    spin: S,
}

impl<C: ClockSource, S: CycleSpin> BusyWait<C, S> {
    pub fn new(clock: C, spin: S) -> Self {
        Self { clock, spin }
    }

    pub fn release(self) -> (C, S) {
        (self.clock, self.spin)
    }

    fn spin_for(&mut self, cycles: u64) {
        let mut remaining = spin_cycles(cycles);
        while remaining > 0 {
            let chunk = remaining.min(MAX_SPIN_CHUNK);
            self.spin.spin(chunk as u32);
            remaining -= chunk;
        }
    }

    pub fn wait_ns(&mut self, ns: u32) {
        let cycles = cycles_for_ns(self.clock.core_clock_hz(), ns);
        self.spin_for(cycles);
    }

    pub fn wait_us(&mut self, us: u32) {
        let cycles = cycles_for_us(self.clock.core_clock_hz(), us);
        self.spin_for(cycles);
    }

    pub fn wait_ms(&mut self, ms: u32) {
        let cycles = cycles_for_ms(self.clock.core_clock_hz(), ms);
        self.spin_for(cycles);
    }

    /// Millisecond granularity: runs `1000 * s` one-millisecond waits.
    pub fn wait_seconds(&mut self, s: u16) {
        for _ in 0..(s as u32 * 1_000) {
            self.wait_ms(1);
        }
    }
}

impl<C: ClockSource, S: CycleSpin> embedded_hal::delay::DelayNs for BusyWait<C, S> {
    fn delay_ns(&mut self, ns: u32) {
        self.wait_ns(ns);
    }

    fn delay_us(&mut self, us: u32) {
        self.wait_us(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.wait_ms(ms);
    }
}

impl<C: ClockSource, S: CycleSpin> embedded_hal_async::delay::DelayNs for BusyWait<C, S> {
    async fn delay_ns(&mut self, ns: u32) {
        self.wait_ns(ns);
    }

    async fn delay_us(&mut self, us: u32) {
        self.wait_us(us);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.wait_ms(ms);
    }
}

/// Fixed clock, for targets that never reconfigure the core clock.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u32);

impl ClockSource for FixedClock {
    fn core_clock_hz(&self) -> u32 {
        self.0
    }
}

/// Spins with `cortex_m::asm::delay`.
#[cfg(feature = "cortex-m")]
#[derive(Debug, Clone, Copy, Default)]
pub struct CortexMSpin;

#[cfg(feature = "cortex-m")]
impl CycleSpin for CortexMSpin {
    fn spin(&mut self, cycles: u32) {
        cortex_m::asm::delay(cycles);
    }
}
