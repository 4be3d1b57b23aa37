//! Numeric status codes for callers that still speak the `group * 100 + code`
//! convention of the vendor SDKs.
//!
//! Inside the crate every operation returns a [`Result`]; convert at the
//! boundary with [`TppError::status_code`] or [`StatusCode::from_result`].

use crate::{State, TppError};
use crate::transport::{TransportError, TransportErrorKind};

/// Subsystem that owns a band of status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum StatusGroup {
    Generic = 0,
    AmlSpi = 101,
    AmlTimer = 102,
    AmlGpio = 104,
    /// Three-phase pre-driver.
    Tpp = 115,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusCode {
    pub group: StatusGroup,
    pub code: u8,
}

impl StatusCode {
    pub const fn new(group: StatusGroup, code: u8) -> Self {
        Self { group, code }
    }

    pub const SUCCESS: Self = Self::new(StatusGroup::Generic, 0);
    pub const FAIL: Self = Self::new(StatusGroup::Generic, 1);
    pub const READ_ONLY: Self = Self::new(StatusGroup::Generic, 2);
    pub const OUT_OF_RANGE: Self = Self::new(StatusGroup::Generic, 3);
    pub const INVALID_ARGUMENT: Self = Self::new(StatusGroup::Generic, 4);
    pub const TIMEOUT: Self = Self::new(StatusGroup::Generic, 5);
    pub const NO_TRANSFER_IN_PROGRESS: Self = Self::new(StatusGroup::Generic, 6);

    pub const SPI_BUSY: Self = Self::new(StatusGroup::AmlSpi, 1);
    pub const SPI_FAULT: Self = Self::new(StatusGroup::AmlSpi, 2);
    pub const GPIO_FAULT: Self = Self::new(StatusGroup::AmlGpio, 1);
    pub const TPP_NOT_ACTIVE: Self = Self::new(StatusGroup::Tpp, 1);
    pub const TPP_FAULTED: Self = Self::new(StatusGroup::Tpp, 2);

    /// Wire value, `group * 100 + code`.
    pub const fn value(self) -> i32 {
        self.group as i32 * 100 + self.code as i32
    }

    pub const fn is_success(self) -> bool {
        self.value() == 0
    }

    pub fn from_result<T, E: TransportError>(result: &Result<T, TppError<E>>) -> Self {
        match result {
            Ok(_) => Self::SUCCESS,
            Err(e) => e.status_code(),
        }
    }
}

impl From<StatusCode> for i32 {
    fn from(code: StatusCode) -> i32 {
        code.value()
    }
}

impl<E: TransportError> TppError<E> {
    pub fn status_code(&self) -> StatusCode {
        match self {
            TppError::Transport(e) => match e.kind() {
                TransportErrorKind::Busy => StatusCode::SPI_BUSY,
                TransportErrorKind::Timeout => StatusCode::TIMEOUT,
                TransportErrorKind::InvalidArgument => StatusCode::INVALID_ARGUMENT,
                TransportErrorKind::Fail => StatusCode::SPI_FAULT,
            },
            TppError::BusyRetriesExhausted(_) => StatusCode::SPI_BUSY,
            TppError::Gpio(_) => StatusCode::GPIO_FAULT,
            TppError::OutOfRange => StatusCode::OUT_OF_RANGE,
            TppError::InvalidArgument(_) => StatusCode::INVALID_ARGUMENT,
            TppError::NotActive(State::Faulted) => StatusCode::TPP_FAULTED,
            TppError::NotActive(_) => StatusCode::TPP_NOT_ACTIVE,
        }
    }
}
