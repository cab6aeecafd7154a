//! STA350 renderer: amplifier control over I²C, PCM over the I²S bus
//!
//! The chip only needs three things from the player: a reset pulse at
//! bring-up, the EAPD bit to switch the power stage, and the master volume.
//! Everything else keeps its reset value. PCM never touches I²C; it goes
//! straight to the [`I2sBus`] DMA ring.
//!
//! # Singleton
//!
//! There is one amplifier on the board. A [`DriverSlot`] guards it: only one
//! [`Sta350`] can exist per slot, [`Sta350::destroy`] frees it again and
//! hands the peripherals back. Dropping the driver without `destroy` keeps
//! the slot taken.
//!
//! # Timeouts
//!
//! | Transaction    | Bound   |
//! |----------------|---------|
//! | register read  | 1000 ms |
//! | register write | 100 ms  |

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_time::{with_timeout, Duration};
use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use platform::{AudioOutput, BusWait, I2sBus, SampleRateHz, VolumeRegister, VolumeStep};

use super::registers::{with_eapd, I2C_ADDR, REG_CONFF, REG_MVOL, REG_STATUS};

/// Bound on a register read.
pub const READ_TIMEOUT: Duration = Duration::from_millis(1000);

/// Bound on a register write.
pub const WRITE_TIMEOUT: Duration = Duration::from_millis(100);

/// How long reset is held low, and how long the chip gets after release.
pub const RESET_HOLD_MS: u32 = 50;

/// Claim slot for the board's single amplifier.
pub struct DriverSlot {
    taken: AtomicBool,
}

impl DriverSlot {
    /// A free slot.
    pub const fn new() -> Self {
        Self {
            taken: AtomicBool::new(false),
        }
    }

    /// `true` while a driver holds the slot.
    pub fn is_taken(&self) -> bool {
        self.taken.load(Ordering::Acquire)
    }

    fn claim(&self) -> bool {
        !self.taken.swap(true, Ordering::AcqRel)
    }

    fn release(&self) {
        self.taken.store(false, Ordering::Release);
    }
}

impl Default for DriverSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// STA350 driver error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sta350Error<E> {
    /// The I²C transaction failed.
    I2c(E),
    /// The reset pin could not be driven.
    Pin,
    /// The audio bus rejected a command.
    Bus,
    /// An I²C transaction did not finish in time.
    Timeout,
    /// The slot already holds a driver.
    AlreadyCreated,
}

impl<E> Sta350Error<E> {
    /// Short description for logs.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::I2c(_) => "i2c transaction failed",
            Self::Pin => "reset pin error",
            Self::Bus => "audio bus error",
            Self::Timeout => "i2c timeout",
            Self::AlreadyCreated => "amplifier already in use",
        }
    }
}

impl<E> core::fmt::Display for Sta350Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// STA350 amplifier plus the I²S bus feeding it.
pub struct Sta350<'a, I2C, RST, BUS, DELAY> {
    i2c: I2C,
    reset: RST,
    bus: BUS,
    delay: DELAY,
    slot: &'a DriverSlot,
}

impl<'a, I2C, RST, BUS, DELAY> Sta350<'a, I2C, RST, BUS, DELAY>
where
    I2C: I2c,
    RST: OutputPin,
    BUS: I2sBus,
    DELAY: DelayNs,
{
    /// Claim `slot` and take the peripherals. Holds the chip in reset.
    pub fn create(
        slot: &'a DriverSlot,
        i2c: I2C,
        mut reset: RST,
        bus: BUS,
        delay: DELAY,
    ) -> Result<Self, Sta350Error<I2C::Error>> {
        if !slot.claim() {
            return Err(Sta350Error::AlreadyCreated);
        }
        if reset.set_low().is_err() {
            slot.release();
            return Err(Sta350Error::Pin);
        }
        Ok(Self {
            i2c,
            reset,
            bus,
            delay,
            slot,
        })
    }

    /// Free the slot and return the peripherals.
    pub fn destroy(self) -> (I2C, RST, BUS, DELAY) {
        self.slot.release();
        (self.i2c, self.reset, self.bus, self.delay)
    }

    /// Read the fault/status register.
    pub async fn status(&mut self) -> Result<u8, Sta350Error<I2C::Error>> {
        self.read_reg(REG_STATUS).await
    }

    /// The audio bus.
    pub fn bus(&self) -> &BUS {
        &self.bus
    }

    async fn read_reg(&mut self, reg: u8) -> Result<u8, Sta350Error<I2C::Error>> {
        let mut value = [0u8; 1];
        with_timeout(READ_TIMEOUT, self.i2c.write_read(I2C_ADDR.get(), &[reg], &mut value))
            .await
            .map_err(|_| Sta350Error::Timeout)?
            .map_err(Sta350Error::I2c)?;
        let [byte] = value;
        Ok(byte)
    }

    async fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), Sta350Error<I2C::Error>> {
        with_timeout(WRITE_TIMEOUT, self.i2c.write(I2C_ADDR.get(), &[reg, value]))
            .await
            .map_err(|_| Sta350Error::Timeout)?
            .map_err(Sta350Error::I2c)
    }

    /// Switch the power stage via CONFF.EAPD, keeping the other bits.
    async fn set_power_stage(&mut self, enabled: bool) -> Result<(), Sta350Error<I2C::Error>> {
        let conff = self.read_reg(REG_CONFF).await?;
        self.write_reg(REG_CONFF, with_eapd(conff, enabled)).await
    }
}

impl<I2C, RST, BUS, DELAY> AudioOutput for Sta350<'_, I2C, RST, BUS, DELAY>
where
    I2C: I2c,
    RST: OutputPin,
    BUS: I2sBus,
    DELAY: DelayNs,
{
    type Error = Sta350Error<I2C::Error>;

    async fn init(&mut self) -> Result<(), Self::Error> {
        self.bus.stop().await.map_err(|_| Sta350Error::Bus)?;
        self.bus.clear().await.map_err(|_| Sta350Error::Bus)?;

        self.reset.set_low().map_err(|_| Sta350Error::Pin)?;
        self.delay.delay_ms(RESET_HOLD_MS).await;
        self.reset.set_high().map_err(|_| Sta350Error::Pin)?;
        self.delay.delay_ms(RESET_HOLD_MS).await;

        #[cfg(feature = "defmt")]
        defmt::info!("sta350: out of reset");
        Ok(())
    }

    async fn start(&mut self) -> Result<(), Self::Error> {
        self.bus.start().await.map_err(|_| Sta350Error::Bus)?;
        self.set_power_stage(true).await
    }

    async fn stop(&mut self) -> Result<(), Self::Error> {
        // Tear the bus down even when the amplifier does not answer.
        let amp = self.set_power_stage(false).await;
        let stopped = self.bus.stop().await;
        let cleared = self.bus.clear().await;
        amp?;
        stopped.map_err(|_| Sta350Error::Bus)?;
        cleared.map_err(|_| Sta350Error::Bus)
    }

    async fn set_volume(&mut self, step: VolumeStep) -> Result<(), Self::Error> {
        let reg = VolumeRegister::from_step(step);
        #[cfg(feature = "defmt")]
        defmt::debug!("sta350: MVOL={=u8:#x}", reg.get());
        self.write_reg(REG_MVOL, reg.get()).await
    }

    async fn set_sample_rate(&mut self, rate: SampleRateHz) -> Result<(), Self::Error> {
        self.bus
            .set_sample_rate(rate)
            .await
            .map_err(|_| Sta350Error::Bus)
    }

    async fn write(&mut self, pcm: &[u8], wait: BusWait) -> Result<usize, Self::Error> {
        self.bus.write(pcm, wait).await.map_err(|_| Sta350Error::Bus)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    use crate::audio::renderer::mock::MockRegisterBank;
    use crate::audio::renderer::sta350::registers::CONFF_EAPD;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use platform::mocks::MockI2sBus;

    type TestDriver<'a> = Sta350<'a, MockRegisterBank, PinMock, MockI2sBus, NoopDelay>;

    fn bank() -> MockRegisterBank {
        MockRegisterBank::new(I2C_ADDR.get()).with_register(REG_CONFF, 0x5C)
    }

    /// Reset pin that only sees the hold-in-reset from `create`.
    fn held_reset() -> PinMock {
        PinMock::new(&[PinTransaction::set(PinState::Low)])
    }

    fn create<'a>(slot: &'a DriverSlot, reset: &PinMock) -> TestDriver<'a> {
        Sta350::create(slot, bank(), reset.clone(), MockI2sBus::new(), NoopDelay)
            .expect("slot is free")
    }

    #[test]
    fn second_create_fails_until_destroy() {
        let slot = DriverSlot::new();
        let mut rst_a = held_reset();
        let first = create(&slot, &rst_a);
        assert!(slot.is_taken());

        let mut rst_b = PinMock::new(&[]);
        let second = Sta350::create(&slot, bank(), rst_b.clone(), MockI2sBus::new(), NoopDelay);
        assert!(matches!(second, Err(Sta350Error::AlreadyCreated)));

        let _parts = first.destroy();
        assert!(!slot.is_taken());
        let mut rst_c = held_reset();
        let third = create(&slot, &rst_c);
        let _ = third.destroy();

        rst_a.done();
        rst_b.done();
        rst_c.done();
    }

    #[tokio::test]
    async fn init_pulses_reset_and_silences_the_bus() {
        let slot = DriverSlot::new();
        let mut rst = PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);
        let mut drv = create(&slot, &rst);
        drv.init().await.unwrap();
        assert_eq!(drv.bus().ops, ["stop", "clear"]);
        let (i2c, ..) = drv.destroy();
        assert!(i2c.writes.is_empty(), "reset needs no register writes");
        rst.done();
    }

    #[tokio::test]
    async fn start_and_stop_toggle_only_eapd() {
        let slot = DriverSlot::new();
        let mut rst = held_reset();
        let mut drv = create(&slot, &rst);

        drv.start().await.unwrap();
        assert!(drv.bus().running);
        drv.stop().await.unwrap();
        assert_eq!(drv.bus().ops, ["start", "stop", "clear"]);

        let (i2c, ..) = drv.destroy();
        assert_eq!(
            i2c.writes.as_slice(),
            &[(REG_CONFF, 0x5C | CONFF_EAPD), (REG_CONFF, 0x5C)]
        );
        rst.done();
    }

    #[tokio::test]
    async fn volume_step_maps_to_master_volume() {
        let slot = DriverSlot::new();
        let mut rst = held_reset();
        let mut drv = create(&slot, &rst);
        drv.set_volume(VolumeStep::LOUDEST).await.unwrap();
        drv.set_volume(VolumeStep::DEFAULT).await.unwrap();
        drv.set_volume(VolumeStep::QUIETEST).await.unwrap();
        let (i2c, ..) = drv.destroy();
        assert_eq!(
            i2c.writes.as_slice(),
            &[(REG_MVOL, 0x00), (REG_MVOL, 0x38), (REG_MVOL, 0x70)]
        );
        rst.done();
    }

    #[tokio::test]
    async fn stop_still_silences_bus_when_amplifier_is_offline() {
        let slot = DriverSlot::new();
        let mut rst = held_reset();
        let mut drv = create(&slot, &rst);
        drv.start().await.unwrap();
        drv.i2c.offline = true;

        assert!(matches!(drv.stop().await, Err(Sta350Error::I2c(_))));
        assert!(!drv.bus().running);
        assert_eq!(drv.bus().clears, 1);
        assert!(matches!(drv.status().await, Err(Sta350Error::I2c(_))));
        let _ = drv.destroy();
        rst.done();
    }

    #[tokio::test]
    async fn pcm_and_rate_go_to_the_bus() {
        let slot = DriverSlot::new();
        let mut rst = held_reset();
        let mut drv = create(&slot, &rst);
        let rate = SampleRateHz::new(48_000).unwrap();
        drv.set_sample_rate(rate).await.unwrap();
        assert_eq!(drv.write(&[1, 2, 3, 4], BusWait::Forever).await.unwrap(), 4);
        assert_eq!(drv.bus().rate, Some(rate));
        assert_eq!(drv.bus().written, [1, 2, 3, 4]);
        let _ = drv.destroy();
        rst.done();
    }
}
