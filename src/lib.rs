#![cfg_attr(not(any(test, feature = "std")), no_std)]
//! # GD3000 Three-Phase Pre-driver Interface
//!
//! This crate provides a bisync-based driver for the GD3000, MC33937 and MC34937
//! three-phase MOSFET pre-drivers. It sequences the power-up of the device
//! (reset, enable, bootstrap toggling, dead-time calibration) and speaks its
//! one-byte SPI command protocol. Blocking and async operation share a single
//! implementation through the [`bisync`](https://docs.rs/bisync) crate.
//!
//! ## Features
//!
//! *   **Bring-up state machine:** reset pulse, EN1/EN2 ordering and toggle
//!     timing follow the datasheet, with the state exposed through [`State`].
//! *   **Typed command codec:** [`Command`] encodes and decodes every frame of
//!     the protocol, [`status`] decodes the four status registers.
//! *   **Injected hardware:** SPI through [`SpiTransport`], lines through
//!     `embedded-hal` output pins, timing through `DelayNs`. [`wait::BusyWait`]
//!     turns a core clock frequency into busy-wait cycles.
//! *   **`defmt` and `log` Integration:** Optional support for logging and debugging.
//!
//! ## Getting Started
//!
//! ```rust,no_run
//! # use embedded_hal::{delay::DelayNs, digital::OutputPin, spi::SpiBus};
//! # use gd3000_dd::{DeviceConfig, Gd3000, HalSpi, Pins};
//! # fn run<B: SpiBus, P: OutputPin, D: DelayNs>(bus: B, en: P, rst: P, cs: P, delay: D) {
//! let pins = Pins::shared_enable(en, rst, cs);
//! let mut tpp = Gd3000::new(HalSpi::new(bus), pins, delay, DeviceConfig::default());
//!
//! if let Err(e) = tpp.init() {
//!     // Outputs are in an undefined state, force them off.
//!     let _ = tpp.enter_safe_state();
//!     let _code = e.status_code().value();
//! }
//! # }
//! ```
//!
//! For async environments, use `Gd3000Async` with an
//! [`AsyncSpiTransport`] and an `embedded_hal_async::delay::DelayNs`.
//!
//! ## Warning!
//!
//! ***Caution!*** This chip drives power FETs. Incorrect configuration or a
//! bridge left enabled after a failed bring-up can destroy the power stage.
//! Always consult the GD3000 datasheet.

#[macro_use]
pub(crate) mod fmt;

pub mod command;
pub mod config;
pub mod gpio;
pub mod status;
pub mod status_code;
pub mod transport;
pub mod wait;

use embedded_hal::digital::ErrorKind;
use thiserror::Error;

pub use command::{
    Command, DeadTime, DeadTimeCalibration, InterruptMask0, InterruptMask1, ModeFlags,
    StatusRegister,
};
pub use config::DeviceConfig;
pub use gpio::{BridgeOutputs, NoPin, Pins, Polarity};
pub use status::{FaultStatus, StatusSnapshot};
pub use status_code::{StatusCode, StatusGroup};
pub use transport::{
    AsyncSpiTransport, HalSpi, SpiTransport, TransportError, TransportErrorKind,
};

#[derive(Debug, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TppError<E> {
    #[error("SPI transport error")]
    Transport(E),
    #[error("SPI transport still busy after retries")]
    BusyRetriesExhausted(E),
    #[error("GPIO error: {0:?}")]
    Gpio(ErrorKind),
    #[error("Configuration value out of range")]
    OutOfRange,
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("Pre-driver is not active (state {0:?})")]
    NotActive(State),
}

impl<E> From<ErrorKind> for TppError<E> {
    fn from(kind: ErrorKind) -> Self {
        TppError::Gpio(kind)
    }
}

/// Bring-up progress of one pre-driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    #[default]
    PoweredOff,
    ResetAsserted,
    ResetReleased,
    LowSideToggling,
    HighSideToggling,
    Configuring,
    Active,
    Faulted,
}

#[path = "."]
mod asynchronous {
    use crate::transport::AsyncSpiTransport as SpiTransport;
    use bisync::asynchronous::*;
    use embedded_hal_async::delay::DelayNs;
    mod driver;
    pub use driver::*;
}
pub use asynchronous::Gd3000 as Gd3000Async;

#[path = "."]
mod blocking {
    use crate::transport::SpiTransport;
    use bisync::synchronous::*;
    use embedded_hal::delay::DelayNs;
    #[allow(clippy::duplicate_mod)]
    mod driver;
    pub use driver::*;
}
pub use blocking::Gd3000;
