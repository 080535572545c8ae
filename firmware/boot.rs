/*!
 * Firmware side of the drivers: owns the driver handles, routes monitor calls
 * to them and decides what an error means for the image.
 *
 * Drivers report unrecoverable hardware faults as `Error::Fatal`; this is
 * where they turn into a halt.
 */

use drivers::dfd::Dfd;
use drivers::mmio::Bus;
use drivers::platform::Platform;
use drivers::rng::Rng;
use drivers::timer::Clock;
use drivers::{Error, Fatal};
use log::{error, info, warn};

use crate::sip::{self, SipReturn, SMC_UNK};

// Bytes returned by one RNG monitor call, one word per register
const SIP_RNG_BYTES: usize = 12;

/// What the image does on an unrecoverable fault.
pub trait Halt {
    fn halt(&mut self, reason: Fatal) -> !;
}

/// Panic with the reason. The panic handler then parks the core.
pub struct PanicHalt;

impl Halt for PanicHalt {
    fn halt(&mut self, reason: Fatal) -> ! {
        panic!("{}", reason)
    }
}

/// The image context. `D` is the bus of the optional DFD engine.
pub struct Firmware<P, B, C, D, H> {
    platform: P,
    rng: Rng<B, C>,
    dfd: Option<Dfd<D>>,
    halt: H,
}

impl<P: Platform, B: Bus, C: Clock, D: Bus, H: Halt> Firmware<P, B, C, D, H> {
    /// Build the image context for the configured SoC and stage.
    pub fn new(platform: P, bus: B, clock: C, halt: H) -> Firmware<P, B, C, D, H> {
        let rng = Rng::new(bus, clock, crate::VARIANT, crate::STAGE);
        Firmware::with_rng(platform, rng, halt)
    }

    pub fn with_rng(platform: P, rng: Rng<B, C>, halt: H) -> Firmware<P, B, C, D, H> {
        Firmware {
            platform,
            rng,
            dfd: None,
            halt,
        }
    }

    /// Serve the DFD monitor calls on a board that has the engine.
    pub fn with_dfd(mut self, dfd: Dfd<D>) -> Firmware<P, B, C, D, H> {
        self.dfd = Some(dfd);
        self
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn rng(&self) -> &Rng<B, C> {
        &self.rng
    }

    pub fn dfd(&self) -> Option<&Dfd<D>> {
        self.dfd.as_ref()
    }

    /**
     * Bring up the drivers.
     *
     * An RNG that does not start in time is tolerated: the image keeps
     * booting, random requests report `Error::NotInitialized`, and
     * `retry_rng` may be called later.
     */
    pub fn boot(&mut self) {
        match self.start_rng() {
            Ok(()) if self.rng.is_initialized() => info!("RNG ready"),
            Ok(()) => info!("No RNG for this image"),
            Err(e) => warn!("RNG not started: {}", e),
        }
    }

    pub fn retry_rng(&mut self) -> Result<(), Error> {
        self.start_rng()
    }

    fn start_rng(&mut self) -> Result<(), Error> {
        let result = self.rng.init(&mut self.platform);
        self.check(result)
    }

    /// Fill `buf` with random bytes for a firmware service.
    pub fn random(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        let result = self.rng.read(buf);
        self.check(result)
    }

    /**
     * Route a SiP monitor call. `args` holds x1..x4.
     *
     * DFD commands go to the DFD dispatcher untouched. The RNG call returns
     * its status as a negative errno in x0.
     */
    pub fn sip_call(&mut self, fid: u32, args: [u64; 4]) -> SipReturn {
        match fid {
            sip::MTK_SIP_KERNEL_DFD_AARCH32 | sip::MTK_SIP_KERNEL_DFD_AARCH64 => {
                match self.dfd.as_mut() {
                    Some(dfd) => dfd.dispatch(args[0], args[1], args[2], args[3]).into(),
                    None => SMC_UNK.into(),
                }
            }
            sip::STM32_SIP_RNG => self.sip_random(),
            _ => {
                warn!("Unknown SiP call {:#x}", fid);
                SMC_UNK.into()
            }
        }
    }

    fn sip_random(&mut self) -> SipReturn {
        let mut buf = [0; SIP_RNG_BYTES];
        if let Err(e) = self.random(&mut buf) {
            return e.into();
        }

        let mut ret = [0; 4];
        for (reg, word) in ret[1..].iter_mut().zip(buf.chunks_exact(4)) {
            let mut bytes = [0; 4];
            bytes.copy_from_slice(word);
            *reg = u32::from_le_bytes(bytes) as u64;
        }
        SipReturn(ret)
    }

    /// The cluster is back from a low power state: restore the DFD setup.
    pub fn resume(&mut self) {
        if let Some(dfd) = self.dfd.as_mut() {
            dfd.resume();
        }
    }

    fn check(&mut self, result: Result<(), Error>) -> Result<(), Error> {
        match result {
            Err(Error::Fatal(reason)) => {
                error!("Unrecoverable: {}", reason);
                self.halt.halt(reason)
            }
            other => other,
        }
    }
}
