/*!
 * This module is a driver for the true random number generator of the
 * STM32MP13 and STM32MP15 SoCs.
 *
 * The peripheral is found in the device tree, brought out of reset, then
 * polled for data. Seed errors follow the recovery sequence of the SoC
 * reference manual. A seed error that survives recovery is fatal: the noise
 * source is broken and no output of it may be trusted.
 */

use log::{debug, error, warn};
use rand_core::{CryptoRng, RngCore};

use crate::error::{Error, Fatal};
use crate::mmio::Bus;
use crate::platform::{Domain, Platform, Stage};
use crate::timer::{Clock, Timeout};

const RNG_CR: usize = 0x00;
const RNG_SR: usize = 0x04;
const RNG_DR: usize = 0x08;

bitflags! {
    struct Control : u32
    {
        const RNGEN = 1 << 2;
        const IE = 1 << 3;
        /// Set to disable clock error detection.
        const CED = 1 << 5;
        const CONDRST = 1 << 30;
    }
}

bitflags! {
    pub struct Status : u32
    {
        const DRDY = 1 << 0;
        const CECS = 1 << 1;
        const SECS = 1 << 2;
        const CEIS = 1 << 5;
        const SEIS = 1 << 6;

        const SEED_ERROR = Self::SECS.bits | Self::SEIS.bits;
    }
}

const RNG_TIMEOUT_US: u32 = 100_000;
const RNG_TIMEOUT_STEP_US: u32 = 10;
const RNG_POLL_RETRIES: u32 = RNG_TIMEOUT_US / RNG_TIMEOUT_STEP_US;

const RESET_TIMEOUT_US: u32 = 1_000;
const RESET_SETTLE_US: u32 = 20;

// Words buffered in the output FIFO each time DRDY is raised
const RNG_FIFO_WORDS: usize = 4;

// Reads needed to flush the FIFO when the conditioner has no auto-reset
const RNG_FIFO_FLUSH_READS: usize = 12;

/// The SoC family, which fixes the bring-up sequence and recovery details.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Variant {
    Stm32Mp13,
    Stm32Mp15,
}

impl Variant {
    /// Device tree compatible string of the peripheral.
    pub fn compatible(&self) -> &'static str {
        match self {
            Variant::Stm32Mp13 => "st,stm32mp13-rng",
            Variant::Stm32Mp15 => "st,stm32-rng",
        }
    }

    /// Discard reads after a seed error. The MP13 conditioner resets its
    /// FIFO by itself.
    pub fn flush_reads(&self) -> usize {
        match self {
            Variant::Stm32Mp13 => 0,
            Variant::Stm32Mp15 => RNG_FIFO_FLUSH_READS,
        }
    }

    fn start<B: Bus>(&self, bus: &mut B, base: usize) {
        match self {
            Variant::Stm32Mp13 => {
                // Reset the conditioning logic and disable clock error detection
                bus.set_bits(base + RNG_CR, (Control::CONDRST | Control::CED).bits());
                bus.clear_set_bits(
                    base + RNG_CR,
                    Control::CONDRST.bits(),
                    Control::RNGEN.bits(),
                );
            }
            Variant::Stm32Mp15 => {
                bus.write(base + RNG_CR, (Control::RNGEN | Control::CED).bits());
            }
        }
    }
}

/// Driver handle. Register accesses are only made once `init` has found and
/// enabled the peripheral.
pub struct Rng<B, C> {
    bus: B,
    clock: C,
    variant: Variant,
    stage: Stage,
    /// Set once the peripheral is clocked and out of reset.
    base: Option<usize>,
    clock_id: Option<u32>,
    enabled: bool,
}

impl<B: Bus, C: Clock> Rng<B, C> {
    pub fn new(bus: B, clock: C, variant: Variant, stage: Stage) -> Rng<B, C> {
        Rng {
            bus,
            clock,
            variant,
            stage,
            base: None,
            clock_id: None,
            enabled: false,
        }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn is_initialized(&self) -> bool {
        self.enabled
    }

    /// Base address of the register window, once the peripheral has been
    /// brought out of reset.
    pub fn base(&self) -> Option<usize> {
        self.base
    }

    /// Clock gate kept enabled for the peripheral.
    pub fn clock_id(&self) -> Option<u32> {
        self.clock_id
    }

    /**
     * Find the peripheral in the device tree and start it.
     *
     * A peripheral missing from the device tree, or not assigned to this
     * stage, is left alone and `Ok` is returned: reads will then fail with
     * `Error::NotInitialized`. Calling this again after a success does
     * nothing. After a timeout the clock, reset and iomem steps are done, so
     * the next call only starts the generator again.
     */
    pub fn init<P: Platform + ?Sized>(&mut self, platform: &mut P) -> Result<(), Error> {
        if self.enabled {
            return Ok(());
        }

        if let Some(base) = self.base {
            return self.finish_init(base);
        }

        let node = match platform
            .find_compatible(self.variant.compatible())
            .map_err(|_| Fatal::NoDeviceTree)?
        {
            Some(node) => node,
            None => {
                debug!("No {} node", self.variant.compatible());
                return Ok(());
            }
        };

        if !self.stage.owns(node.status) {
            debug!("RNG not assigned to {:?}", self.stage);
            return Ok(());
        }

        if node.base == 0 {
            return Err(Fatal::NullBase.into());
        }

        platform.register_iomem(node.base, Domain::of(node.status));

        let clock_id = node.clock.ok_or(Fatal::InvalidClock)?;
        platform.clock_enable(clock_id);

        if let Some(reset) = node.reset {
            platform
                .reset_assert(reset, RESET_TIMEOUT_US)
                .map_err(|_| Fatal::ResetAssert)?;
            self.clock.delay_us(RESET_SETTLE_US);
            platform
                .reset_deassert(reset, RESET_TIMEOUT_US)
                .map_err(|_| Fatal::ResetDeassert)?;
        }

        self.base = Some(node.base);
        self.clock_id = Some(clock_id);

        self.finish_init(node.base)
    }

    fn finish_init(&mut self, base: usize) -> Result<(), Error> {
        self.enable(base)?;
        self.enabled = true;
        debug!("Init RNG done");

        Ok(())
    }

    /**
     * Start the generator and wait for its first data.
     *
     * A recovered seed error restarts the bring-up, so the timeout is armed
     * again after each recovery.
     */
    fn enable(&mut self, base: usize) -> Result<(), Error> {
        self.variant.start(&mut self.bus, base);

        let mut timeout = Timeout::start(&self.clock, RNG_TIMEOUT_US as u64);
        let mut sr = self.status(base);
        while !sr.contains(Status::DRDY) {
            if timeout.elapsed(&self.clock) {
                warn!("Timeout waiting for RNG");
                return Err(Error::Timeout);
            }

            if sr.intersects(Status::SEED_ERROR) {
                self.seed_error_recovery(base)?;
                timeout = Timeout::start(&self.clock, RNG_TIMEOUT_US as u64);
            }

            self.clock.delay_us(RNG_TIMEOUT_STEP_US);
            sr = self.status(base);
        }

        Ok(())
    }

    fn status(&mut self, base: usize) -> Status {
        Status::from_bits_truncate(self.bus.read(base + RNG_SR))
    }

    fn seed_error_recovery(&mut self, base: usize) -> Result<(), Error> {
        self.bus.clear_bits(base + RNG_SR, Status::SEIS.bits());
        self.bus.mem_barrier();

        let flush_reads = self.variant.flush_reads();
        if flush_reads > 0 {
            for _ in 0..flush_reads {
                self.bus.read(base + RNG_DR);
            }
            self.bus.mem_barrier();
        }

        if self.status(base).contains(Status::SEIS) {
            error!("RNG noise");
            return Err(Fatal::SeedError.into());
        }

        Ok(())
    }

    /**
     * Fill `out` with random bytes.
     *
     * Once the hardware has been touched, any error zeroes the whole of
     * `out`, so a failed read never leaves partial entropy behind.
     */
    pub fn read(&mut self, out: &mut [u8]) -> Result<(), Error> {
        let base = match self.base {
            Some(base) if self.enabled => base,
            _ => return Err(Error::NotInitialized),
        };

        let result = self.fill(base, out);
        if result.is_err() {
            out.fill(0);
        }

        result
    }

    fn fill(&mut self, base: usize, out: &mut [u8]) -> Result<(), Error> {
        let mut filled = 0;
        while filled < out.len() {
            self.wait_data_ready(base)?;

            // DRDY guarantees a full FIFO, no need to poll between words
            for _ in 0..RNG_FIFO_WORDS {
                let word = self.bus.read(base + RNG_DR).to_le_bytes();
                let len = (out.len() - filled).min(word.len());
                out[filled..filled + len].copy_from_slice(&word[..len]);
                filled += len;

                if filled == out.len() {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Each poll costs one retry and one step delay, whether it triggered a
    /// recovery or not.
    fn wait_data_ready(&mut self, base: usize) -> Result<(), Error> {
        for _ in 0..RNG_POLL_RETRIES {
            let sr = self.status(base);
            let seed_error = sr.intersects(Status::SEED_ERROR);
            if seed_error {
                self.seed_error_recovery(base)?;
            }

            self.clock.delay_us(RNG_TIMEOUT_STEP_US);

            if !seed_error && sr.contains(Status::DRDY) {
                return Ok(());
            }
        }

        warn!("Timeout waiting for RNG data");
        Err(Error::Timeout)
    }
}

impl<B: Bus, C: Clock> RngCore for Rng<B, C> {
    fn next_u32(&mut self) -> u32 {
        rand_core::impls::next_u32_via_fill(self)
    }

    fn next_u64(&mut self) -> u64 {
        rand_core::impls::next_u64_via_fill(self)
    }

    /// Panics if the generator fails, which halts the firmware.
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        if let Err(e) = self.read(dest) {
            panic!("RNG read failed: {}", e);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.read(dest).map_err(rand_core::Error::from)
    }
}

impl<B: Bus, C: Clock> CryptoRng for Rng<B, C> {}
