#![cfg_attr(not(any(test, feature = "mock")), no_std)]

#[macro_use] extern crate bitflags;

#[macro_use] pub mod coproc_reg;
pub mod mmio;
pub mod timer;
pub mod platform;
pub mod error;
mod stm32;
mod mediatek;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{Error, Fatal};
pub use stm32::rng;
pub use mediatek::dfd;
