//! Discrete lines between the MCU and the pre-driver.

use core::convert::Infallible;
use embedded_hal::digital::{Error as _, ErrorKind, ErrorType, OutputPin};

/// Level that selects the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    #[default]
    ActiveLow,
    ActiveHigh,
}

/// Drives `pin` high or low, reducing the pin error to its kind.
pub fn set_line<P: OutputPin>(pin: &mut P, high: bool) -> Result<(), ErrorKind> {
    let result = if high { pin.set_high() } else { pin.set_low() };
    result.map_err(|e| e.kind())
}

/// Software chip-select.
pub struct ChipSelect<P> {
    pin: P,
    polarity: Polarity,
}

impl<P> ChipSelect<P> {
    pub fn new(pin: P, polarity: Polarity) -> Self {
        Self { pin, polarity }
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> ChipSelect<P> {
    pub fn select(&mut self) -> Result<(), ErrorKind> {
        set_line(&mut self.pin, self.polarity == Polarity::ActiveHigh)
    }

    pub fn unselect(&mut self) -> Result<(), ErrorKind> {
        set_line(&mut self.pin, self.polarity == Polarity::ActiveLow)
    }
}

/// Lines owned by one pre-driver instance.
pub struct Pins<EN1, EN2, RST, CS> {
    pub en1: EN1,
    pub en2: EN2,
    /// Active low: the device is held in reset while this line is low.
    pub rst: RST,
    pub cs: CS,
}

impl<EN1, EN2, RST, CS> Pins<EN1, EN2, RST, CS> {
    pub fn new(en1: EN1, en2: EN2, rst: RST, cs: CS) -> Self {
        Self { en1, en2, rst, cs }
    }
}

impl<EN, RST, CS> Pins<EN, NoPin, RST, CS> {
    /// Boards that route EN1 and EN2 to a single MCU pin.
    pub fn shared_enable(en: EN, rst: RST, cs: CS) -> Self {
        Self { en1: en, en2: NoPin, rst, cs }
    }
}

/// Placeholder for a line that is not wired to the MCU.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Gate outputs toggled once during bring-up to charge the bootstrap
/// capacitors. Boards where the PWM peripheral does this use `()`.
pub trait BridgeOutputs {
    fn drive_low_side(&mut self, _on: bool) {}
    fn drive_high_side(&mut self, _on: bool) {}
}

impl BridgeOutputs for () {}
