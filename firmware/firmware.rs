#![cfg_attr(target_os = "none", no_std)]

#[cfg(target_os = "none")]
extern crate rlibc;

extern crate secfw_drivers as drivers;

#[cfg(all(target_os = "none", target_arch = "arm"))]
pub mod board;
pub mod boot;
pub mod console;
#[cfg(target_os = "none")]
mod panic;
pub mod sip;

pub use boot::{Firmware, Halt, PanicHalt};
pub use sip::SipReturn;
pub use drivers::platform::Stage;
pub use drivers::rng::Variant;

/// The SoC this image is built for.
#[cfg(feature = "stm32mp13")]
pub const VARIANT: Variant = Variant::Stm32Mp13;
#[cfg(not(feature = "stm32mp13"))]
pub const VARIANT: Variant = Variant::Stm32Mp15;

/// The boot stage this image runs as.
#[cfg(feature = "bl2")]
pub const STAGE: Stage = Stage::Bl2;
#[cfg(not(feature = "bl2"))]
pub const STAGE: Stage = Stage::Bl32;
