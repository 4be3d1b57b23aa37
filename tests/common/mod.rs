#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::digital::{Error, ErrorKind, ErrorType, OutputPin};
use gd3000_dd::{
    AsyncSpiTransport, BridgeOutputs, Command, DeviceConfig, Gd3000, Pins, SpiTransport,
    StatusRegister, TransportError, TransportErrorKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    En1,
    En2,
    Rst,
    Cs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Pin(Line, bool),
    Delay(u64),
    /// Every transfer attempt, including ones that fail.
    Frame(u8),
    LowSide(bool),
    HighSide(bool),
}

pub type Log = Rc<RefCell<Vec<Event>>>;

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockPinError;

impl Error for MockPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

struct PinFault {
    line: Line,
    high: bool,
    skip: usize,
}

type PinFaults = Rc<RefCell<Vec<PinFault>>>;

pub struct MockPin {
    line: Line,
    log: Log,
    faults: PinFaults,
}

impl MockPin {
    fn set(&mut self, high: bool) -> Result<(), MockPinError> {
        let mut faults = self.faults.borrow_mut();
        if let Some(i) = faults.iter().position(|f| f.line == self.line && f.high == high) {
            if faults[i].skip == 0 {
                faults.remove(i);
                return Err(MockPinError);
            }
            faults[i].skip -= 1;
        }
        self.log.borrow_mut().push(Event::Pin(self.line, high));
        Ok(())
    }
}

impl ErrorType for MockPin {
    type Error = MockPinError;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), MockPinError> {
        self.set(false)
    }

    fn set_high(&mut self) -> Result<(), MockPinError> {
        self.set(true)
    }
}

pub struct MockDelay {
    log: Log,
}

impl MockDelay {
    fn record(&mut self, ns: u64) {
        self.log.borrow_mut().push(Event::Delay(ns));
    }
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.record(ns as u64);
    }

    fn delay_us(&mut self, us: u32) {
        self.record(us as u64 * 1_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.record(ms as u64 * 1_000_000);
    }
}

impl embedded_hal_async::delay::DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.record(ns as u64);
    }

    async fn delay_us(&mut self, us: u32) {
        self.record(us as u64 * 1_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.record(ms as u64 * 1_000_000);
    }
}

pub struct MockBridge {
    log: Log,
}

impl BridgeOutputs for MockBridge {
    fn drive_low_side(&mut self, on: bool) {
        self.log.borrow_mut().push(Event::LowSide(on));
    }

    fn drive_high_side(&mut self, on: bool) {
        self.log.borrow_mut().push(Event::HighSide(on));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError(pub TransportErrorKind);

impl TransportError for MockError {
    fn kind(&self) -> TransportErrorKind {
        self.0
    }
}

struct Fault {
    frame: u8,
    kind: TransportErrorKind,
    remaining: usize,
}

/// Simulated pre-driver behind the SPI transport. Each answer carries the
/// register selected by the previous frame.
pub struct MockTransport {
    log: Log,
    pub registers: [u8; 4],
    selected: StatusRegister,
    faults: VecDeque<Fault>,
}

impl MockTransport {
    /// Fails the next `times` transfers of `frame` with `kind`.
    pub fn fail_on(&mut self, frame: u8, kind: TransportErrorKind, times: usize) {
        self.faults.push_back(Fault { frame, kind, remaining: times });
    }

    fn exchange(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), MockError> {
        assert_eq!(read.len(), write.len());
        assert_eq!(write.len(), 1, "the GD3000 protocol uses one-byte frames");
        let frame = write[0];
        self.log.borrow_mut().push(Event::Frame(frame));

        if let Some(fault) = self.faults.iter_mut().find(|f| f.frame == frame && f.remaining > 0) {
            fault.remaining -= 1;
            return Err(MockError(fault.kind));
        }

        read[0] = self.registers[self.selected.index()];
        let command = Command::decode(frame).expect("driver sent an illegal frame");
        self.selected = command.selects();
        Ok(())
    }
}

impl SpiTransport for MockTransport {
    type Error = MockError;

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), MockError> {
        self.exchange(read, write)
    }
}

impl AsyncSpiTransport for MockTransport {
    type Error = MockError;

    async fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), MockError> {
        self.exchange(read, write)
    }
}

pub type MockDriver = Gd3000<MockTransport, MockDelay, MockPin, MockPin, MockPin, MockPin, MockBridge>;

pub struct Harness {
    pub log: Log,
    pin_faults: PinFaults,
    pub transport: MockTransport,
    pub pins: Pins<MockPin, MockPin, MockPin, MockPin>,
    pub delay: MockDelay,
    pub bridge: MockBridge,
}

impl Harness {
    pub fn new() -> Self {
        let log = new_log();
        let pin_faults: PinFaults = Rc::new(RefCell::new(Vec::new()));
        let pin = |line| MockPin { line, log: log.clone(), faults: pin_faults.clone() };
        Self {
            transport: MockTransport {
                log: log.clone(),
                registers: [0x00, 0x0B, 0xFF, 0x08],
                selected: StatusRegister::Status0,
                faults: VecDeque::new(),
            },
            pins: Pins::new(pin(Line::En1), pin(Line::En2), pin(Line::Rst), pin(Line::Cs)),
            delay: MockDelay { log: log.clone() },
            bridge: MockBridge { log: log.clone() },
            log,
            pin_faults,
        }
    }

    /// Fails the next drive of `line` to `high` once `skip` such drives have succeeded.
    /// Failed drives are not logged.
    pub fn fail_pin(&mut self, line: Line, high: bool, skip: usize) {
        self.pin_faults.borrow_mut().push(PinFault { line, high, skip });
    }

    pub fn driver(self, config: DeviceConfig) -> (MockDriver, Log) {
        let driver = Gd3000::new(self.transport, self.pins, self.delay, config)
            .with_bridge(self.bridge);
        (driver, self.log)
    }
}

pub fn frames(log: &Log) -> Vec<u8> {
    log.borrow()
        .iter()
        .filter_map(|e| match e {
            Event::Frame(f) => Some(*f),
            _ => None,
        })
        .collect()
}

pub fn position(log: &Log, event: Event) -> Option<usize> {
    log.borrow().iter().position(|e| *e == event)
}

/// Sum of all delays recorded between two log indices.
pub fn delay_between(log: &Log, from: usize, to: usize) -> u64 {
    log.borrow()[from..to]
        .iter()
        .map(|e| match e {
            Event::Delay(ns) => *ns,
            _ => 0,
        })
        .sum()
}
