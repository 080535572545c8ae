/*!
 * Drivers for the MediaTek MT8192 platform.
 */

pub mod dfd;
