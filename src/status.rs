//! Decoding of the four status registers shifted out by the device.

use crate::command::{DeadTime, StatusRegister};

macro_rules! flag {
    ($(#[$doc:meta])* $name:ident, $bit:expr) => {
        $(#[$doc])*
        #[inline]
        pub fn $name(&self) -> bool {
            self.0 & (1 << $bit) != 0
        }
    };
}

/// STATUS0: latched fault flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status0(pub u8);

impl Status0 {
    flag!(/// Over-temperature.
        over_temperature, 0);
    flag!(/// Desaturation detected on any phase.
        desaturation, 1);
    flag!(/// VLS under-voltage.
        under_voltage, 2);
    flag!(/// Over-current comparator tripped.
        over_current, 3);
    flag!(/// Phase error.
        phase_error, 4);
    flag!(/// SPI framing error.
        framing_error, 5);
    flag!(/// Write attempted after lock.
        write_error, 6);
    flag!(/// Device went through reset.
        reset_event, 7);

    pub fn any(&self) -> bool {
        self.0 != 0
    }
}

/// STATUS1: operating mode and dead-time calibration result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status1(pub u8);

impl Status1 {
    flag!(lock, 0);
    flag!(full_on, 1);
    flag!(/// Dead-time calibration has completed.
        deadtime_calibrated, 3);
    flag!(/// Calibration pulse was longer than the maximum dead time.
        deadtime_overflow, 4);
    flag!(/// Zero dead time is active.
        deadtime_zero, 5);
    flag!(/// Desaturation filter is *disabled*.
        desaturation_filter_disabled, 6);
}

/// STATUS2: interrupt mask readback, same layout as STATUS0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status2(pub u8);

impl Status2 {
    pub fn mask0(&self) -> u8 {
        self.0 & 0x0F
    }

    pub fn mask1(&self) -> u8 {
        self.0 >> 4
    }
}

/// STATUS3: calibrated dead time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status3(pub u8);

impl Status3 {
    pub fn dead_time(&self) -> DeadTime {
        DeadTime::from_ticks(self.0)
    }
}

/// A decoded status byte tagged with the register it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusFields {
    Status0(Status0),
    Status1(Status1),
    Status2(Status2),
    Status3(Status3),
}

impl StatusFields {
    pub fn decode(register: StatusRegister, raw: u8) -> Self {
        match register {
            StatusRegister::Status0 => Self::Status0(Status0(raw)),
            StatusRegister::Status1 => Self::Status1(Status1(raw)),
            StatusRegister::Status2 => Self::Status2(Status2(raw)),
            StatusRegister::Status3 => Self::Status3(Status3(raw)),
        }
    }
}

/// Last value latched from each status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusSnapshot {
    pub registers: [u8; 4],
}

impl StatusSnapshot {
    pub fn raw(&self, register: StatusRegister) -> u8 {
        self.registers[register.index()]
    }

    pub(crate) fn latch(&mut self, register: StatusRegister, raw: u8) {
        self.registers[register.index()] = raw;
    }

    pub fn status0(&self) -> Status0 {
        Status0(self.registers[0])
    }

    pub fn status1(&self) -> Status1 {
        Status1(self.registers[1])
    }

    pub fn status2(&self) -> Status2 {
        Status2(self.registers[2])
    }

    pub fn status3(&self) -> Status3 {
        Status3(self.registers[3])
    }

    pub fn fault_status(&self) -> FaultStatus {
        FaultStatus::from(self.status0())
    }
}

/// Fault summary taken from STATUS0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaultStatus {
    pub over_temperature: bool,
    pub desaturation: bool,
    pub under_voltage: bool,
    pub over_current: bool,
    pub phase_error: bool,
    pub framing_error: bool,
    pub write_error: bool,
    pub reset_event: bool,
}

impl FaultStatus {
    /// True for any condition that should stop the bridge.
    pub fn has_power_fault(&self) -> bool {
        self.over_temperature || self.desaturation || self.under_voltage || self.over_current
    }

    pub fn has_fault(&self) -> bool {
        self.has_power_fault()
            || self.phase_error
            || self.framing_error
            || self.write_error
            || self.reset_event
    }
}

impl From<Status0> for FaultStatus {
    fn from(s: Status0) -> Self {
        Self {
            over_temperature: s.over_temperature(),
            desaturation: s.desaturation(),
            under_voltage: s.under_voltage(),
            over_current: s.over_current(),
            phase_error: s.phase_error(),
            framing_error: s.framing_error(),
            write_error: s.write_error(),
            reset_event: s.reset_event(),
        }
    }
}
