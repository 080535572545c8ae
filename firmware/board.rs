/*!
 * Board entry points.
 *
 * The monitor's C side calls `secfw_main` once on cold boot, then
 * `secfw_sip_handler` for each SiP call and `secfw_resume` when the cluster
 * leaves a low power state. Platform services come back through the `plat_*`
 * functions it provides.
 */

use core::fmt::{self, Write};
use core::ptr::addr_of_mut;

use drivers::dfd::{Dfd, DfdLayout};
use drivers::mmio::Mmio;
use drivers::platform::{Domain, DtNode, DtStatus, Platform, PlatformError};
use drivers::timer::GenericTimer;
use log::LevelFilter;

use crate::boot::{Firmware, Halt, PanicHalt};
use crate::console::ConsoleLogger;
use crate::sip::{SipReturn, SMC_UNK};

#[repr(C)]
struct PlatDtNode {
    base: usize,
    status: u32,
    /// Negative when the node has no such property.
    clock: i32,
    reset: i32,
}

extern "C" {
    fn plat_console_putc(c: u8);

    /// 1 when found, 0 when absent, negative without a device tree.
    fn plat_dt_find_compatible(compatible: *const u8, len: usize, node: *mut PlatDtNode) -> i32;

    fn plat_clk_enable(id: u32);

    fn plat_reset_assert(id: u32, timeout_us: u32) -> i32;

    fn plat_reset_deassert(id: u32, timeout_us: u32) -> i32;

    fn plat_register_iomem(base: usize, non_secure: bool);
}

struct Console;

impl Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.bytes() {
            unsafe { plat_console_putc(c) }
        }
        Ok(())
    }
}

fn console_write(args: fmt::Arguments) {
    let _ = Console.write_fmt(args);
}

static LOGGER: ConsoleLogger = ConsoleLogger::new(console_write, LevelFilter::Info);

/// Platform services of the monitor.
pub struct BoardPlatform;

fn reset_result(rc: i32) -> Result<(), PlatformError> {
    if rc == 0 {
        Ok(())
    } else {
        Err(PlatformError::ResetTimeout)
    }
}

impl Platform for BoardPlatform {
    fn find_compatible(&self, compatible: &str) -> Result<Option<DtNode>, PlatformError> {
        let mut raw = PlatDtNode {
            base: 0,
            status: 0,
            clock: -1,
            reset: -1,
        };
        let rc = unsafe { plat_dt_find_compatible(compatible.as_ptr(), compatible.len(), &mut raw) };
        if rc < 0 {
            return Err(PlatformError::NoDeviceTree);
        }
        if rc == 0 {
            return Ok(None);
        }

        Ok(Some(DtNode {
            base: raw.base,
            status: DtStatus::from_bits_truncate(raw.status),
            clock: if raw.clock < 0 { None } else { Some(raw.clock as u32) },
            reset: if raw.reset < 0 { None } else { Some(raw.reset as u32) },
        }))
    }

    fn clock_enable(&mut self, clock: u32) {
        unsafe { plat_clk_enable(clock) }
    }

    fn reset_assert(&mut self, reset: u32, timeout_us: u32) -> Result<(), PlatformError> {
        reset_result(unsafe { plat_reset_assert(reset, timeout_us) })
    }

    fn reset_deassert(&mut self, reset: u32, timeout_us: u32) -> Result<(), PlatformError> {
        reset_result(unsafe { plat_reset_deassert(reset, timeout_us) })
    }

    fn register_iomem(&mut self, base: usize, domain: Domain) {
        unsafe { plat_register_iomem(base, domain == Domain::NonSecure) }
    }
}

type BoardFirmware = Firmware<BoardPlatform, Mmio, GenericTimer, Mmio, PanicHalt>;

static mut FIRMWARE: Option<BoardFirmware> = None;

// Single core, and the monitor never nests the entry points
fn firmware() -> Option<&'static mut BoardFirmware> {
    unsafe { (*addr_of_mut!(FIRMWARE)).as_mut() }
}

/// Cold boot. `dfd` is the layout of the board's DFD engine, null if it has
/// none.
#[no_mangle]
pub extern "C" fn secfw_main(dfd: Option<&'static DfdLayout>) {
    let _ = LOGGER.install();

    let clock = match GenericTimer::new() {
        Ok(clock) => clock,
        Err(reason) => PanicHalt.halt(reason),
    };

    let mut fw: BoardFirmware =
        Firmware::new(BoardPlatform, unsafe { Mmio::new() }, clock, PanicHalt);
    if let Some(layout) = dfd {
        fw = fw.with_dfd(Dfd::new(unsafe { Mmio::new() }, *layout));
    }
    fw.boot();

    unsafe { *addr_of_mut!(FIRMWARE) = Some(fw) };
}

/// SiP call with function identifier `fid` and arguments x1..x4. The values
/// for x0..x3 are stored in `ret`.
#[no_mangle]
pub extern "C" fn secfw_sip_handler(
    fid: u32,
    x1: u64,
    x2: u64,
    x3: u64,
    x4: u64,
    ret: &mut [u64; 4],
) {
    let result = match firmware() {
        Some(fw) => fw.sip_call(fid, [x1, x2, x3, x4]),
        None => SipReturn::from(SMC_UNK),
    };
    *ret = result.0;
}

#[no_mangle]
pub extern "C" fn secfw_resume() {
    if let Some(fw) = firmware() {
        fw.resume();
    }
}
