use core::fmt;
use core::num::NonZeroU32;

/// Errors surfaced by the drivers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// The driver was used before a successful initialization.
    NotInitialized,
    /// The hardware did not become ready within its polling budget.
    Timeout,
    /// The hardware or its description cannot be trusted; the image must halt.
    Fatal(Fatal),
}

/// Unrecoverable conditions. Returned to the firmware, which halts on them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fatal {
    /// No device tree is mapped.
    NoDeviceTree,
    /// The peripheral node has no register window.
    NullBase,
    /// The peripheral node has no usable clock.
    InvalidClock,
    ResetAssert,
    ResetDeassert,
    /// The seed error flag survived the recovery sequence.
    SeedError,
    /// The system counter has no frequency, so no delay can be measured.
    TimerFrequency,
}

const EPERM: i32 = 1;
const ETIMEDOUT: i32 = 110;
const EIO: i32 = 5;

impl Error {
    /// Negative errno value, as returned over the monitor call interface.
    pub fn code(&self) -> i32 {
        match self {
            Error::NotInitialized => -EPERM,
            Error::Timeout => -ETIMEDOUT,
            Error::Fatal(_) => -EIO,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Fatal(_))
    }
}

impl From<Fatal> for Error {
    fn from(fatal: Fatal) -> Error {
        Error::Fatal(fatal)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NotInitialized => write!(f, "driver not initialized"),
            Error::Timeout => write!(f, "timeout waiting for hardware"),
            Error::Fatal(fatal) => write!(f, "fatal: {}", fatal),
        }
    }
}

impl fmt::Display for Fatal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            Fatal::NoDeviceTree => "no device tree",
            Fatal::NullBase => "peripheral without base address",
            Fatal::InvalidClock => "peripheral without clock",
            Fatal::ResetAssert => "reset assert failed",
            Fatal::ResetDeassert => "reset deassert failed",
            Fatal::SeedError => "RNG noise",
            Fatal::TimerFrequency => "counter frequency not programmed",
        };
        f.write_str(msg)
    }
}

const fn custom_code(n: u32) -> NonZeroU32 {
    match NonZeroU32::new(rand_core::Error::CUSTOM_START + n) {
        Some(code) => code,
        None => panic!("custom error codes are never zero"),
    }
}

const NOT_INITIALIZED_CODE: NonZeroU32 = custom_code(1);
const TIMEOUT_CODE: NonZeroU32 = custom_code(2);
const FATAL_CODE: NonZeroU32 = custom_code(3);

impl From<Error> for rand_core::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::NotInitialized => NOT_INITIALIZED_CODE.into(),
            Error::Timeout => TIMEOUT_CODE.into(),
            Error::Fatal(_) => FATAL_CODE.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_codes() {
        assert_eq!(Error::NotInitialized.code(), -1);
        assert_eq!(Error::Timeout.code(), -110);
        assert_eq!(Error::Fatal(Fatal::SeedError).code(), -5);
    }

    #[test]
    fn rand_core_codes_are_distinct() {
        let a: rand_core::Error = Error::NotInitialized.into();
        let b: rand_core::Error = Error::Timeout.into();
        let c: rand_core::Error = Error::Fatal(Fatal::NullBase).into();
        assert_ne!(a.code(), b.code());
        assert_ne!(b.code(), c.code());
        assert_eq!(c.code(), Some(FATAL_CODE));
    }
}
