//! SPI command frames of the GD3000 / MC33937 / MC34937.
//!
//! Every frame is a single byte: the opcode lives in bits `[7:4]` and up to four
//! payload bits in `[3:0]`. The device answers every frame with one status byte,
//! but that byte belongs to the *previous* frame (see [`StatusRegister`]).

use crate::TppError;

/// Nanoseconds per dead-time tick of the 17 MHz internal time base.
pub const DEADTIME_TICK_NS: u16 = 59;
/// Largest dead time the device can calibrate, in nanoseconds.
pub const DEADTIME_MAX_NS: u16 = 15_000;
/// The calibration pulse on CS is this many times longer than the requested dead time.
pub const PULSE_WIDTH_CAL_COEF: u32 = 16;

const OPCODE_SHIFT: u8 = 4;
const PAYLOAD_MASK: u8 = 0x0F;

/// Command class carried in the high nibble of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Opcode {
    Null = 0x0,
    Mask0 = 0x2,
    Mask1 = 0x3,
    Mode = 0x4,
    Clint0 = 0x6,
    Clint1 = 0x7,
    DeadTime = 0x8,
}

impl Opcode {
    pub fn from_nibble(nibble: u8) -> Option<Self> {
        match nibble {
            0x0 => Some(Self::Null),
            0x2 => Some(Self::Mask0),
            0x3 => Some(Self::Mask1),
            0x4 => Some(Self::Mode),
            0x6 => Some(Self::Clint0),
            0x7 => Some(Self::Clint1),
            0x8 => Some(Self::DeadTime),
            _ => None,
        }
    }
}

/// Status register selected by a NULL command.
///
/// Sending `NULLn` at frame *k* makes the device shift out STATUSn at frame
/// *k + 1*. Any non-NULL command selects STATUS0 for the following frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StatusRegister {
    /// Latched fault flags.
    Status0 = 0,
    /// Mode and dead-time calibration flags.
    Status1 = 1,
    /// Interrupt mask readback.
    Status2 = 2,
    /// Calibrated dead time in device ticks.
    Status3 = 3,
}

impl StatusRegister {
    pub const ALL: [StatusRegister; 4] = [
        StatusRegister::Status0,
        StatusRegister::Status1,
        StatusRegister::Status2,
        StatusRegister::Status3,
    ];

    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Status0),
            1 => Some(Self::Status1),
            2 => Some(Self::Status2),
            3 => Some(Self::Status3),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Fault interrupt enables written by MASK0 and cleared by CLINT0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptMask0(u8);

impl InterruptMask0 {
    /// Over-temperature.
    pub const OVER_TEMPERATURE: Self = Self(0x01);
    /// Desaturation detected on any phase.
    pub const DESATURATION: Self = Self(0x02);
    /// VLS under-voltage.
    pub const UNDER_VOLTAGE: Self = Self(0x04);
    /// Over-current comparator.
    pub const OVER_CURRENT: Self = Self(0x08);
    pub const NONE: Self = Self(0x00);
    pub const ALL: Self = Self(0x0F);

    /// Returns `None` if any bit outside the low nibble is set.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        if bits & !PAYLOAD_MASK == 0 { Some(Self(bits)) } else { None }
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl core::ops::BitOr for InterruptMask0 {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Fault interrupt enables written by MASK1 and cleared by CLINT1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptMask1(u8);

impl InterruptMask1 {
    /// Phase error.
    pub const PHASE_ERROR: Self = Self(0x01);
    /// SPI framing error.
    pub const FRAMING_ERROR: Self = Self(0x02);
    /// Write error after the mode was locked.
    pub const WRITE_ERROR: Self = Self(0x04);
    /// Device reset seen.
    pub const RESET_EVENT: Self = Self(0x08);
    pub const NONE: Self = Self(0x00);
    pub const ALL: Self = Self(0x0F);

    /// Returns `None` if any bit outside the low nibble is set.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        if bits & !PAYLOAD_MASK == 0 { Some(Self(bits)) } else { None }
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl core::ops::BitOr for InterruptMask1 {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Operating mode written by the MODE command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModeFlags {
    /// Ignore further mode, mask and dead-time writes until the next reset.
    pub lock: bool,
    /// Full-on mode: both transistors of a phase may be driven without dead time insertion.
    pub full_on: bool,
    /// Desaturation fault filtering.
    pub desaturation_filter: bool,
}

impl ModeFlags {
    const LOCK_BIT: u8 = 0x01;
    const FULL_BIT: u8 = 0x02;
    // Set means the filter is *disabled*.
    const DESF_DISABLE_BIT: u8 = 0x08;
    const VALID_BITS: u8 = Self::LOCK_BIT | Self::FULL_BIT | Self::DESF_DISABLE_BIT;

    pub const fn new(lock: bool, full_on: bool, desaturation_filter: bool) -> Self {
        Self { lock, full_on, desaturation_filter }
    }

    pub const fn to_payload(self) -> u8 {
        let mut bits = 0;
        if self.lock {
            bits |= Self::LOCK_BIT;
        }
        if self.full_on {
            bits |= Self::FULL_BIT;
        }
        if !self.desaturation_filter {
            bits |= Self::DESF_DISABLE_BIT;
        }
        bits
    }

    pub const fn from_payload(bits: u8) -> Option<Self> {
        if bits & !Self::VALID_BITS != 0 {
            return None;
        }
        Some(Self {
            lock: bits & Self::LOCK_BIT != 0,
            full_on: bits & Self::FULL_BIT != 0,
            desaturation_filter: bits & Self::DESF_DISABLE_BIT == 0,
        })
    }
}

/// Payload of the DEADTIME command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeadTimeCalibration {
    /// Run with zero dead time, no calibration pulse follows.
    Zero,
    /// Measure the CS pulse following this frame and derive the dead time from it.
    Calibrate,
}

/// Dead time as requested in nanoseconds, resolved to device ticks of
/// [`DEADTIME_TICK_NS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeadTime {
    ns: u16,
}

impl DeadTime {
    pub fn from_ns<E>(ns: u16) -> Result<Self, TppError<E>> {
        if ns > DEADTIME_MAX_NS {
            return Err(TppError::OutOfRange);
        }
        Ok(Self { ns })
    }

    /// Dead time as reported in STATUS3.
    pub const fn from_ticks(ticks: u8) -> Self {
        Self { ns: ticks as u16 * DEADTIME_TICK_NS }
    }

    pub const fn requested_ns(self) -> u16 {
        self.ns
    }

    /// Nearest device tick. 15000 ns rounds to 254, so this always fits.
    pub const fn ticks(self) -> u8 {
        let tick = DEADTIME_TICK_NS as u32;
        ((self.ns as u32 + tick / 2) / tick) as u8
    }

    /// Dead time the device will actually insert.
    pub const fn as_ns(self) -> u32 {
        self.ticks() as u32 * DEADTIME_TICK_NS as u32
    }

    pub const fn is_zero(self) -> bool {
        self.ns == 0
    }

    /// Width of the CS pulse that teaches the device this dead time.
    pub const fn calibration_pulse_ns(self) -> u32 {
        self.ns as u32 * PULSE_WIDTH_CAL_COEF
    }

    pub const fn calibration(self) -> DeadTimeCalibration {
        if self.is_zero() {
            DeadTimeCalibration::Zero
        } else {
            DeadTimeCalibration::Calibrate
        }
    }
}

/// One SPI command frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Request the given status register on the next frame.
    Null(StatusRegister),
    Mask0(InterruptMask0),
    Mask1(InterruptMask1),
    Mode(ModeFlags),
    /// Clear latched faults of STATUS0 bits 0..3.
    ClearInterrupts0(InterruptMask0),
    /// Clear latched faults of STATUS0 bits 4..7.
    ClearInterrupts1(InterruptMask1),
    DeadTime(DeadTimeCalibration),
}

/// A received byte is not a legal command frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    UnknownOpcode(u8),
    ReservedPayload(u8),
}

impl Command {
    pub fn opcode(self) -> Opcode {
        match self {
            Command::Null(_) => Opcode::Null,
            Command::Mask0(_) => Opcode::Mask0,
            Command::Mask1(_) => Opcode::Mask1,
            Command::Mode(_) => Opcode::Mode,
            Command::ClearInterrupts0(_) => Opcode::Clint0,
            Command::ClearInterrupts1(_) => Opcode::Clint1,
            Command::DeadTime(_) => Opcode::DeadTime,
        }
    }

    pub fn payload(self) -> u8 {
        match self {
            Command::Null(register) => register as u8,
            Command::Mask0(mask) | Command::ClearInterrupts0(mask) => mask.bits(),
            Command::Mask1(mask) | Command::ClearInterrupts1(mask) => mask.bits(),
            Command::Mode(mode) => mode.to_payload(),
            Command::DeadTime(DeadTimeCalibration::Zero) => 0x00,
            Command::DeadTime(DeadTimeCalibration::Calibrate) => 0x01,
        }
    }

    pub fn encode(self) -> u8 {
        ((self.opcode() as u8) << OPCODE_SHIFT) | (self.payload() & PAYLOAD_MASK)
    }

    pub fn decode(frame: u8) -> Result<Self, DecodeError> {
        let opcode =
            Opcode::from_nibble(frame >> OPCODE_SHIFT).ok_or(DecodeError::UnknownOpcode(frame))?;
        let payload = frame & PAYLOAD_MASK;
        let reserved = DecodeError::ReservedPayload(frame);
        Ok(match opcode {
            Opcode::Null => Command::Null(StatusRegister::from_bits(payload).ok_or(reserved)?),
            Opcode::Mask0 => Command::Mask0(InterruptMask0(payload)),
            Opcode::Mask1 => Command::Mask1(InterruptMask1(payload)),
            Opcode::Mode => Command::Mode(ModeFlags::from_payload(payload).ok_or(reserved)?),
            Opcode::Clint0 => Command::ClearInterrupts0(InterruptMask0(payload)),
            Opcode::Clint1 => Command::ClearInterrupts1(InterruptMask1(payload)),
            Opcode::DeadTime => Command::DeadTime(match payload {
                0x00 => DeadTimeCalibration::Zero,
                0x01 => DeadTimeCalibration::Calibrate,
                _ => return Err(reserved),
            }),
        })
    }

    /// Register the device will shift out on the frame after this one.
    pub fn selects(self) -> StatusRegister {
        match self {
            Command::Null(register) => register,
            _ => StatusRegister::Status0,
        }
    }
}
