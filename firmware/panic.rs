use core::panic::PanicInfo;
use log::error;

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    error!("\x1b[31;1mFirmware panic !\x1b[0m");

    if let Some(loc) = info.location() {
        error!(
            "File {}, line {}, column {}:",
            loc.file(),
            loc.line(),
            loc.column()
        );
    }

    error!(" \x1b[1m{}\x1b[0m", info.message());

    loop {
        unsafe { core::arch::asm!("wfi", options(nomem, nostack)) }
    }
}
