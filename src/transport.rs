//! Full-duplex byte exchange with the pre-driver.
//!
//! The transport clocks bytes only. Chip-select is always driven by the
//! driver through [`crate::gpio::ChipSelect`], so the same bring-up code works
//! whether or not the SPI peripheral could manage CS itself.

use embedded_hal::spi::ErrorKind;

/// Coarse classification of a transfer failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportErrorKind {
    /// Peripheral is still clocking a previous transfer. The caller may retry.
    Busy,
    /// Transfer deadline exceeded.
    Timeout,
    /// Buffers or device handle rejected before anything was clocked.
    InvalidArgument,
    /// Any other bus fault.
    Fail,
}

pub trait TransportError: core::fmt::Debug {
    fn kind(&self) -> TransportErrorKind;
}

/// Blocking transport.
pub trait SpiTransport {
    type Error: TransportError;

    /// Clocks out `write` while clocking in `read`. Both slices have the same length.
    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error>;
}

/// Async transport, same contract as [`SpiTransport`].
#[allow(async_fn_in_trait)]
pub trait AsyncSpiTransport {
    type Error: TransportError;

    async fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error>;
}

/// Error of [`HalSpi`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalSpiError {
    LengthMismatch,
    Bus(ErrorKind),
}

impl TransportError for HalSpiError {
    fn kind(&self) -> TransportErrorKind {
        match self {
            HalSpiError::LengthMismatch => TransportErrorKind::InvalidArgument,
            HalSpiError::Bus(_) => TransportErrorKind::Fail,
        }
    }
}

/// Adapts an `embedded-hal` [`SpiBus`](embedded_hal::spi::SpiBus) to the
/// pre-driver transport. The bus must not own the CS line.
pub struct HalSpi<B> {
    bus: B,
}

impl<B> HalSpi<B> {
    /// `bus` must already be clocked at
    /// [`DeviceConfig::spi_baud_rate_hz`](crate::DeviceConfig::spi_baud_rate_hz).
    /// The adapter never reconfigures it.
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn release(self) -> B {
        self.bus
    }
}

impl<B> SpiTransport for HalSpi<B>
where
    B: embedded_hal::spi::SpiBus,
{
    type Error = HalSpiError;

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        if read.len() != write.len() {
            return Err(HalSpiError::LengthMismatch);
        }
        use embedded_hal::spi::Error as _;
        self.bus
            .transfer(read, write)
            .map_err(|e| HalSpiError::Bus(e.kind()))?;
        self.bus.flush().map_err(|e| HalSpiError::Bus(e.kind()))
    }
}

impl<B> AsyncSpiTransport for HalSpi<B>
where
    B: embedded_hal_async::spi::SpiBus,
{
    type Error = HalSpiError;

    async fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        if read.len() != write.len() {
            return Err(HalSpiError::LengthMismatch);
        }
        use embedded_hal::spi::Error as _;
        self.bus
            .transfer(read, write)
            .await
            .map_err(|e| HalSpiError::Bus(e.kind()))?;
        self.bus.flush().await.map_err(|e| HalSpiError::Bus(e.kind()))
    }
}
