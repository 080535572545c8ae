/*!
 * Drivers for the STMicroelectronics STM32MP1 peripherals.
 */

pub mod rng;
