use super::{DelayNs, SpiTransport, bisync};
use crate::command::{
    Command, DeadTime, DeadTimeCalibration, InterruptMask0, InterruptMask1, ModeFlags,
    StatusRegister,
};
use crate::config::{DeviceConfig, timing};
use crate::gpio::{BridgeOutputs, ChipSelect, Pins, set_line};
use crate::status::{FaultStatus, Status0, StatusSnapshot};
use crate::transport::{TransportError, TransportErrorKind};
use crate::{State, TppError};
use embedded_hal::digital::OutputPin;

/// One GD3000 / MC33937 / MC34937 pre-driver.
///
/// Owns the transport, the four discrete lines and the delay provider for its
/// whole lifetime. Nothing else may talk on the same SPI bus between a
/// select and the matching unselect.
pub struct Gd3000<T, D, EN1, EN2, RST, CS, B = ()> {
    transport: T,
    delay: D,
    en1: EN1,
    en2: EN2,
    rst: RST,
    cs: ChipSelect<CS>,
    bridge: B,
    config: DeviceConfig,
    state: State,
    status: StatusSnapshot,
    // Register the next response will carry. `None` until the first frame after reset.
    pending: Option<StatusRegister>,
}

impl<T, D, EN1, EN2, RST, CS> Gd3000<T, D, EN1, EN2, RST, CS, ()>
where
    T: SpiTransport,
    D: DelayNs,
    EN1: OutputPin,
    EN2: OutputPin,
    RST: OutputPin,
    CS: OutputPin,
{
    /// Takes ownership of the hardware. No line is touched until [`init`](Self::init).
    pub fn new(transport: T, pins: Pins<EN1, EN2, RST, CS>, delay: D, config: DeviceConfig) -> Self {
        Self {
            transport,
            delay,
            en1: pins.en1,
            en2: pins.en2,
            rst: pins.rst,
            cs: ChipSelect::new(pins.cs, config.cs_polarity),
            bridge: (),
            config,
            state: State::PoweredOff,
            status: StatusSnapshot::default(),
            pending: None,
        }
    }
}

impl<T, D, EN1, EN2, RST, CS, B> Gd3000<T, D, EN1, EN2, RST, CS, B> {
    /// Hooks up the gate outputs toggled during bring-up.
    pub fn with_bridge<B2: BridgeOutputs>(self, bridge: B2) -> Gd3000<T, D, EN1, EN2, RST, CS, B2> {
        Gd3000 {
            transport: self.transport,
            delay: self.delay,
            en1: self.en1,
            en2: self.en2,
            rst: self.rst,
            cs: self.cs,
            bridge,
            config: self.config,
            state: self.state,
            status: self.status,
            pending: self.pending,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Status registers as last shifted out by the device.
    pub fn status(&self) -> &StatusSnapshot {
        &self.status
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn release(self) -> (T, Pins<EN1, EN2, RST, CS>, D, B) {
        let pins = Pins::new(self.en1, self.en2, self.rst, self.cs.release());
        (self.transport, pins, self.delay, self.bridge)
    }

    fn enter(&mut self, state: State) {
        debug!("GD3000 {:?} -> {:?}", self.state, state);
        self.state = state;
    }
}

impl<T, D, EN1, EN2, RST, CS, B> Gd3000<T, D, EN1, EN2, RST, CS, B>
where
    T: SpiTransport,
    D: DelayNs,
    EN1: OutputPin,
    EN2: OutputPin,
    RST: OutputPin,
    CS: OutputPin,
    B: BridgeOutputs,
{
    /// Brings the device from power-on to [`State::Active`].
    ///
    /// The configuration is validated before any line or frame is driven. Any
    /// later failure leaves the driver in [`State::Faulted`] and the bridge in
    /// an undefined electrical state; call [`enter_safe_state`](Self::enter_safe_state)
    /// and run `init` again to recover.
    #[bisync]
    pub async fn init(&mut self) -> Result<(), TppError<T::Error>> {
        let deadtime = self.config.validate::<T::Error>()?;
        match self.bring_up(deadtime).await {
            Ok(()) => {
                self.enter(State::Active);
                info!("GD3000 active, dead time {} ns", deadtime.as_ns());
                Ok(())
            }
            Err(e) => {
                error!("GD3000 bring-up failed in {:?}: {}", self.state, e.status_code().value());
                self.enter(State::Faulted);
                Err(e)
            }
        }
    }

    #[bisync]
    async fn bring_up(&mut self, deadtime: DeadTime) -> Result<(), TppError<T::Error>> {
        self.status = StatusSnapshot::default();
        self.pending = None;

        self.cs.unselect()?;
        set_line(&mut self.en1, false)?;
        set_line(&mut self.en2, false)?;
        set_line(&mut self.rst, false)?;
        self.enter(State::ResetAsserted);
        self.delay.delay_us(timing::RESET_DELAY_US).await;

        set_line(&mut self.rst, true)?;
        self.enter(State::ResetReleased);

        // EN1 must lead EN2.
        set_line(&mut self.en1, true)?;
        set_line(&mut self.en2, true)?;
        self.delay.delay_us(timing::ENABLE_DELAY_US).await;

        self.enter(State::LowSideToggling);
        self.bridge.drive_low_side(true);
        self.delay.delay_us(timing::LS_TOGGLE_DELAY_US).await;
        self.bridge.drive_low_side(false);

        self.enter(State::HighSideToggling);
        self.bridge.drive_high_side(true);
        self.delay
            .delay_ns(timing::hs_toggle_delay_ns(deadtime.requested_ns()))
            .await;
        self.bridge.drive_high_side(false);

        self.enter(State::Configuring);
        self.exchange_retrying(Command::Mask0(self.config.interrupt_mask0))
            .await?;
        self.exchange_retrying(Command::Mask1(self.config.interrupt_mask1))
            .await?;
        self.exchange_retrying(Command::Mode(self.config.mode)).await?;
        self.calibrate(deadtime).await
    }

    /// Sends DEADTIME and, for a non-zero dead time, the CS calibration pulse.
    #[bisync]
    async fn calibrate(&mut self, deadtime: DeadTime) -> Result<(), TppError<T::Error>> {
        let calibration = deadtime.calibration();
        self.exchange_retrying(Command::DeadTime(calibration)).await?;
        if calibration == DeadTimeCalibration::Calibrate {
            self.cs.select()?;
            self.delay.delay_ns(deadtime.calibration_pulse_ns()).await;
            self.cs.unselect()?;
        }
        Ok(())
    }

    /// One frame, bracketed by select/unselect. Returns the byte clocked in,
    /// which answers the previous frame.
    #[bisync]
    async fn exchange(&mut self, command: Command) -> Result<u8, TppError<T::Error>> {
        let tx = [command.encode()];
        let mut rx = [0u8; 1];

        self.cs.select()?;
        let result = self.transport.transfer(&mut rx, &tx).await;
        self.cs.unselect()?;
        result.map_err(TppError::Transport)?;

        trace!("GD3000 tx {:#x} rx {:#x}", tx[0], rx[0]);
        if let Some(register) = self.pending {
            self.status.latch(register, rx[0]);
        }
        self.pending = Some(command.selects());
        Ok(rx[0])
    }

    #[bisync]
    async fn exchange_retrying(&mut self, command: Command) -> Result<u8, TppError<T::Error>> {
        let mut attempts = 0u8;
        loop {
            match self.exchange(command).await {
                Err(TppError::Transport(e)) if e.kind() == TransportErrorKind::Busy => {
                    if attempts >= self.config.busy_retries {
                        return Err(TppError::BusyRetriesExhausted(e));
                    }
                    attempts += 1;
                    warn!("GD3000 SPI busy, retry {}/{}", attempts, self.config.busy_retries);
                    self.delay.delay_us(self.config.busy_backoff_us).await;
                }
                other => return other,
            }
        }
    }

    fn require_active(&self) -> Result<(), TppError<T::Error>> {
        if self.state == State::Active {
            Ok(())
        } else {
            Err(TppError::NotActive(self.state))
        }
    }

    /// Exchange on an active device. A failed transfer faults the device.
    #[bisync]
    async fn command(&mut self, command: Command) -> Result<u8, TppError<T::Error>> {
        self.require_active()?;
        match self.exchange_retrying(command).await {
            Ok(raw) => Ok(raw),
            Err(e) => {
                error!("GD3000 command {:#x} failed: {}", command.encode(), e.status_code().value());
                self.enter(State::Faulted);
                Err(e)
            }
        }
    }

    /// Sends a raw command and returns the status byte answering the previous frame.
    #[bisync]
    pub async fn send_command(&mut self, command: Command) -> Result<u8, TppError<T::Error>> {
        self.command(command).await
    }

    /// Reads one status register: `NULLn` followed by a flushing `NULL0`.
    #[bisync]
    pub async fn read_status(
        &mut self,
        register: StatusRegister,
    ) -> Result<u8, TppError<T::Error>> {
        self.command(Command::Null(register)).await?;
        self.command(Command::Null(StatusRegister::Status0)).await
    }

    /// Refreshes all four status registers.
    #[bisync]
    pub async fn read_all_status(&mut self) -> Result<StatusSnapshot, TppError<T::Error>> {
        for register in StatusRegister::ALL {
            self.command(Command::Null(register)).await?;
        }
        self.command(Command::Null(StatusRegister::Status0)).await?;
        Ok(self.status)
    }

    /// Reads STATUS0 and decodes the latched faults.
    ///
    /// # Example
    /// ```rust,no_run
    /// # fn check<T, D, P>(tpp: &mut gd3000_dd::Gd3000<T, D, P, P, P, P>)
    /// # where T: gd3000_dd::SpiTransport, D: embedded_hal::delay::DelayNs, P: embedded_hal::digital::OutputPin
    /// # {
    /// if let Ok(faults) = tpp.get_fault_status() {
    ///     if faults.has_power_fault() {
    ///         let _ = tpp.disable_outputs();
    ///     }
    /// }
    /// # }
    /// ```
    #[bisync]
    pub async fn get_fault_status(&mut self) -> Result<FaultStatus, TppError<T::Error>> {
        let raw = self.read_status(StatusRegister::Status0).await?;
        Ok(FaultStatus::from(Status0(raw)))
    }

    #[bisync]
    pub async fn has_fault(&mut self) -> Result<bool, TppError<T::Error>> {
        let raw = self.read_status(StatusRegister::Status0).await?;
        Ok(Status0(raw).any())
    }

    /// Clears latched faults with CLINT0 and CLINT1.
    #[bisync]
    pub async fn clear_faults(
        &mut self,
        mask0: InterruptMask0,
        mask1: InterruptMask1,
    ) -> Result<(), TppError<T::Error>> {
        self.command(Command::ClearInterrupts0(mask0)).await?;
        self.command(Command::ClearInterrupts1(mask1)).await?;
        Ok(())
    }

    /// Ignored by the device once the mode has been locked.
    #[bisync]
    pub async fn set_interrupt_masks(
        &mut self,
        mask0: InterruptMask0,
        mask1: InterruptMask1,
    ) -> Result<(), TppError<T::Error>> {
        self.command(Command::Mask0(mask0)).await?;
        self.command(Command::Mask1(mask1)).await?;
        Ok(())
    }

    #[bisync]
    pub async fn set_mode(&mut self, mode: ModeFlags) -> Result<(), TppError<T::Error>> {
        self.command(Command::Mode(mode)).await?;
        Ok(())
    }

    /// Recalibrates the dead time. Out-of-range values are rejected before any frame is sent.
    #[bisync]
    pub async fn calibrate_dead_time(&mut self, deadtime_ns: u16) -> Result<(), TppError<T::Error>> {
        let deadtime = DeadTime::from_ns::<T::Error>(deadtime_ns)?;
        self.require_active()?;
        if let Err(e) = self.calibrate(deadtime).await {
            self.enter(State::Faulted);
            return Err(e);
        }
        Ok(())
    }

    /// Raises EN1 then EN2.
    pub fn enable_outputs(&mut self) -> Result<(), TppError<T::Error>> {
        self.require_active()?;
        set_line(&mut self.en1, true)?;
        set_line(&mut self.en2, true)?;
        Ok(())
    }

    /// Standby to active: EN1 then EN2, then one low-side toggle to recharge the
    /// bootstrap capacitors. The device keeps its configuration, so no reset
    /// pulse and no frame is sent. A pin failure faults the device.
    #[bisync]
    pub async fn wake_from_standby(&mut self) -> Result<(), TppError<T::Error>> {
        self.require_active()?;
        if let Err(e) = self.enable_outputs() {
            error!("GD3000 wake from standby failed: {}", e.status_code().value());
            self.enter(State::Faulted);
            return Err(e);
        }
        self.delay.delay_us(timing::ENABLE_DELAY_US).await;
        self.bridge.drive_low_side(true);
        self.delay.delay_us(timing::LS_TOGGLE_DELAY_STANDBY_US).await;
        self.bridge.drive_low_side(false);
        debug!("GD3000 left standby");
        Ok(())
    }

    pub fn disable_outputs(&mut self) -> Result<(), TppError<T::Error>> {
        set_line(&mut self.en1, false)?;
        set_line(&mut self.en2, false)?;
        Ok(())
    }

    /// Drops EN1/EN2, idles CS and holds the device in reset. Allowed in any state.
    pub fn enter_safe_state(&mut self) -> Result<(), TppError<T::Error>> {
        warn!("GD3000 forced into reset");
        set_line(&mut self.en1, false)?;
        set_line(&mut self.en2, false)?;
        self.cs.unselect()?;
        set_line(&mut self.rst, false)?;
        self.pending = None;
        self.enter(State::ResetAsserted);
        Ok(())
    }
}
