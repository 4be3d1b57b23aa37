//! Device configuration and datasheet timing.

use crate::TppError;
use crate::command::{DEADTIME_MAX_NS, DeadTime, InterruptMask0, InterruptMask1, ModeFlags};
use crate::gpio::Polarity;

/// Bring-up delays from the GD3000 datasheet. These are hard device limits.
pub mod timing {
    /// RST held low before release. Minimum 2 ms.
    pub const RESET_DELAY_US: u32 = 2_500;
    /// EN1/EN2 high to first low-side toggle. Minimum 280 ns.
    pub const ENABLE_DELAY_US: u32 = 1;
    /// Low-side toggle width. Minimum 1 us.
    pub const LS_TOGGLE_DELAY_US: u32 = 1;
    /// Low-side toggle width on the standby to active path. Minimum 100 ns.
    pub const LS_TOGGLE_DELAY_STANDBY_US: u32 = 1;
    /// High-side toggle width for the default dead-time presets.
    pub const HS_TOGGLE_DELAY_US: u32 = 16;
    /// Margin added to the dead time for the high-side toggle.
    pub const HS_TOGGLE_MARGIN_NS: u32 = 100;

    /// High-side toggle width for a given dead time: the longer of the fixed
    /// delay and `dead time + 100 ns`.
    pub const fn hs_toggle_delay_ns(deadtime_ns: u16) -> u32 {
        let needed = deadtime_ns as u32 + HS_TOGGLE_MARGIN_NS;
        let fixed = HS_TOGGLE_DELAY_US * 1_000;
        if needed > fixed { needed } else { fixed }
    }
}

/// SPI clock used by the shipped boards.
pub const DEFAULT_SPI_BAUD_HZ: u32 = 2_000_000;

/// Configuration of one pre-driver. Read-only once handed to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    /// Requested dead time, 0..=15000 ns.
    pub deadtime_ns: u16,
    pub interrupt_mask0: InterruptMask0,
    pub interrupt_mask1: InterruptMask1,
    pub mode: ModeFlags,
    /// SPI clock of the bus. The bus must already run at this rate when handed
    /// to the driver; `init` only rejects zero.
    pub spi_baud_rate_hz: u32,
    pub cs_polarity: Polarity,
    /// How many times a `Busy` transfer is retried before bring-up fails.
    pub busy_retries: u8,
    /// Wait between `Busy` retries.
    pub busy_backoff_us: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            deadtime_ns: 500,
            interrupt_mask0: InterruptMask0::ALL,
            interrupt_mask1: InterruptMask1::ALL,
            mode: ModeFlags::new(true, true, false),
            spi_baud_rate_hz: DEFAULT_SPI_BAUD_HZ,
            cs_polarity: Polarity::ActiveLow,
            busy_retries: 3,
            busy_backoff_us: 1,
        }
    }
}

impl DeviceConfig {
    /// Preset of the S32K396 board: 650 ns, desaturation filter on, unlocked.
    pub fn s32k396() -> Self {
        Self {
            deadtime_ns: 650,
            mode: ModeFlags::new(false, false, true),
            ..Self::default()
        }
    }

    pub fn with_deadtime_ns(mut self, deadtime_ns: u16) -> Self {
        self.deadtime_ns = deadtime_ns;
        self
    }

    pub fn with_interrupt_masks(mut self, mask0: InterruptMask0, mask1: InterruptMask1) -> Self {
        self.interrupt_mask0 = mask0;
        self.interrupt_mask1 = mask1;
        self
    }

    pub fn with_mode(mut self, mode: ModeFlags) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_spi_baud_rate_hz(mut self, hz: u32) -> Self {
        self.spi_baud_rate_hz = hz;
        self
    }

    pub fn with_cs_polarity(mut self, polarity: Polarity) -> Self {
        self.cs_polarity = polarity;
        self
    }

    pub fn with_busy_retry(mut self, retries: u8, backoff_us: u32) -> Self {
        self.busy_retries = retries;
        self.busy_backoff_us = backoff_us;
        self
    }

    /// Checks every value before the driver touches any line.
    pub fn validate<E>(&self) -> Result<DeadTime, TppError<E>> {
        if self.deadtime_ns > DEADTIME_MAX_NS {
            return Err(TppError::OutOfRange);
        }
        if self.spi_baud_rate_hz == 0 {
            return Err(TppError::InvalidArgument("SPI baud rate must be non-zero"));
        }
        DeadTime::from_ns(self.deadtime_ns)
    }
}
