/*!
 * Memory mapped register access.
 *
 * Drivers never dereference device addresses themselves: they go through a
 * `Bus`, so the same register sequences can run against the real peripheral
 * (`Mmio`) or against a scripted register bank in tests.
 */

use core::ptr::{read_volatile, write_volatile};

/// A 32 bit register bus addressed by absolute physical address.
pub trait Bus {
    /// Memory mapped read
    fn read(&mut self, addr: usize) -> u32;

    /// Memory mapped write
    fn write(&mut self, addr: usize, data: u32);

    fn set_bits(&mut self, addr: usize, bitmask: u32) {
        let val = self.read(addr) | bitmask;
        self.write(addr, val);
    }

    fn clear_bits(&mut self, addr: usize, bitmask: u32) {
        let val = self.read(addr) & !bitmask;
        self.write(addr, val);
    }

    /// Clear then set bits with a single read-modify-write.
    fn clear_set_bits(&mut self, addr: usize, clear: u32, set: u32) {
        let val = (self.read(addr) & !clear) | set;
        self.write(addr, val);
    }

    /// Write followed by a data synchronisation barrier.
    fn sync_write(&mut self, addr: usize, data: u32) {
        self.write(addr, data);
        self.sync_barrier();
    }

    fn mem_barrier(&mut self) {
        mem_barrier()
    }

    fn sync_barrier(&mut self) {
        sync_barrier()
    }
}

/// Volatile access to the real device memory.
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /**
     * # Safety
     *
     * Every address later given to this bus must be a mapped device register
     * that nothing else in the image accesses concurrently.
     */
    pub const unsafe fn new() -> Mmio {
        Mmio { _private: () }
    }
}

impl Bus for Mmio {
    #[inline]
    fn read(&mut self, addr: usize) -> u32 {
        unsafe { read_volatile(addr as *const u32) }
    }

    #[inline]
    fn write(&mut self, addr: usize, data: u32) {
        unsafe { write_volatile(addr as *mut u32, data) }
    }
}

/**
 * Data memory barrier
 * No memory access after the DMB can run until all memory accesses before it
 * have completed
 */
#[inline]
pub fn mem_barrier() {
    #[cfg(any(target_arch = "arm", target_arch = "aarch64"))]
    unsafe {
        core::arch::asm!("dmb sy", options(nostack, preserves_flags))
    }

    #[cfg(not(any(target_arch = "arm", target_arch = "aarch64")))]
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
}

/**
 * Data synchronisation barrier
 * No instruction after the DSB can run until all instructions before it have
 * completed
 */
#[inline]
pub fn sync_barrier() {
    #[cfg(any(target_arch = "arm", target_arch = "aarch64"))]
    unsafe {
        core::arch::asm!("dsb sy", options(nostack, preserves_flags))
    }

    #[cfg(not(any(target_arch = "arm", target_arch = "aarch64")))]
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
}
