/*!
 * Time keeping for busy-wait polling loops.
 *
 * Drivers only see the `Clock` trait. On the board it is backed by the ARM
 * generic timer; tests provide a simulated clock that advances on each delay.
 */

/// A microsecond time source with a busy-wait delay.
pub trait Clock {
    /// Return the current time in µs.
    fn now_us(&self) -> u64;

    /// Spin for at least `micro_secs` µs.
    fn delay_us(&mut self, micro_secs: u32);
}

/// A deadline measured against a `Clock`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeout {
    deadline: u64,
}

impl Timeout {
    /// Start a timeout expiring `micro_secs` µs from now.
    pub fn start<C: Clock + ?Sized>(clock: &C, micro_secs: u64) -> Timeout {
        Timeout {
            deadline: clock.now_us().saturating_add(micro_secs),
        }
    }

    pub fn elapsed<C: Clock + ?Sized>(&self, clock: &C) -> bool {
        clock.now_us() > self.deadline
    }
}

/// Convert a counter value to µs for a counter running at `freq` Hz.
#[cfg(any(target_arch = "arm", test))]
fn ticks_to_us(ticks: u64, freq: u64) -> u64 {
    (ticks as u128 * 1_000_000 / freq as u128) as u64
}

#[cfg(target_arch = "arm")]
pub use self::generic_timer::GenericTimer;

/// ARMv7 generic timer, read through CP15.
#[cfg(target_arch = "arm")]
mod generic_timer {
    use super::{ticks_to_us, Clock};
    use crate::error::Fatal;
    use log::{debug, error};

    coproc_reg! {
        CNTFRQ : p15, c14, 0, c0, 0;
    }

    coproc_reg64! {
        CNTPCT : p15, c14, 0;
    }

    pub struct GenericTimer {
        freq: u64,
    }

    impl GenericTimer {
        /// The counter frequency must have been programmed by the boot ROM.
        pub fn new() -> Result<GenericTimer, Fatal> {
            let freq = unsafe { CNTFRQ::read() } as u64;
            if freq == 0 {
                error!("CNTFRQ not programmed");
                return Err(Fatal::TimerFrequency);
            }

            debug!("Generic timer at {} Hz", freq);
            Ok(GenericTimer { freq })
        }
    }

    impl Clock for GenericTimer {
        fn now_us(&self) -> u64 {
            ticks_to_us(unsafe { CNTPCT::read() }, self.freq)
        }

        fn delay_us(&mut self, micro_secs: u32) {
            let end = self.now_us() + micro_secs as u64;
            while self.now_us() < end {
                core::hint::spin_loop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(u64);

    impl Clock for Fixed {
        fn now_us(&self) -> u64 {
            self.0
        }

        fn delay_us(&mut self, micro_secs: u32) {
            self.0 += micro_secs as u64;
        }
    }

    #[test]
    fn timeout_expires_strictly_after_deadline() {
        let mut clock = Fixed(5);
        let timeout = Timeout::start(&clock, 100);
        clock.delay_us(100);
        assert!(!timeout.elapsed(&clock));
        clock.delay_us(1);
        assert!(timeout.elapsed(&clock));
    }

    #[test]
    fn counter_conversion_is_exact() {
        // 19.2 MHz, a common non integer MHz crystal
        assert_eq!(ticks_to_us(19_200_000, 19_200_000), 1_000_000);
        assert_eq!(ticks_to_us(192, 19_200_000), 10);
        // below 1 MHz
        assert_eq!(ticks_to_us(32_768, 32_768), 1_000_000);
        assert_eq!(ticks_to_us(u64::MAX, 1_000_000), u64::MAX);
    }

    #[test]
    fn timeout_saturates_near_end_of_time() {
        let clock = Fixed(u64::MAX - 1);
        let timeout = Timeout::start(&clock, 10);
        assert!(!timeout.elapsed(&clock));
    }
}
