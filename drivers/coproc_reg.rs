/**
 * This is the interface of an ARM coprocessor 32 bit register.
 * This trait can be automatically derived by the coproc_reg! macro.
 */
pub trait CoprocRegister {
    unsafe fn read() -> u32;
    unsafe fn write(val: u32);
}

/**
 * This is the interface of an ARM coprocessor 64 bit register.
 * This trait can be automatically derived by the coproc_reg64! macro.
 */
pub trait CoprocRegister64 {
    unsafe fn read() -> u64;
}

/**
 * This macro generates a CoprocRegister implementation for a list of
 * coprocessor registers.
 *
 * The read and write functions are implemented with the corresponding MRC and
 * MCR assembly instructions.
 *
 * Usage example:
 * ```ignore
 * coproc_reg! {
 *     CNTFRQ : p15, c14, 0, c0, 0;
 * }
 *
 * fn a() -> u32 {
 *     unsafe { CNTFRQ::read() }
 * }
 * ```
 */
#[macro_export]
macro_rules! coproc_reg
{
    { $( $reg_id: ident : $coproc: ident, $crn: ident, $opc1: literal,
                          $crm: ident, $opc2: literal; )* } =>
    {
        use $crate::coproc_reg::CoprocRegister;
        $( #[allow(non_camel_case_types)] struct $reg_id;
        impl CoprocRegister for $reg_id {
            unsafe fn read() -> u32 {
                let result : u32;
                core::arch::asm!(concat!("mrc ", stringify!($coproc), ", ",
                                         $opc1, ", {0}, ", stringify!($crn),
                                         ", ", stringify!($crm), ", ", $opc2),
                                 out(reg) result, options(nostack));
                result
            }

            unsafe fn write(val: u32) {
                core::arch::asm!(concat!("mcr ", stringify!($coproc), ", ",
                                         $opc1, ", {0}, ", stringify!($crn),
                                         ", ", stringify!($crm), ", ", $opc2),
                                 in(reg) val, options(nostack));
            }
        } )*
    }
}

/// Same as `coproc_reg!` but for 64 bit registers, read only.
#[macro_export]
macro_rules! coproc_reg64
{
    { $( $reg_id: ident : $coproc: ident, $crn: ident, $opc1: literal; )* } =>
    {
        use $crate::coproc_reg::CoprocRegister64;
        $( #[allow(non_camel_case_types)] struct $reg_id;
        impl CoprocRegister64 for $reg_id {
            unsafe fn read() -> u64 {
                let low : u32;
                let high : u32;
                core::arch::asm!(concat!("mrrc ", stringify!($coproc), ", ",
                                         $opc1, ", {0}, {1}, ", stringify!($crn)),
                                 out(reg) low, out(reg) high, options(nostack));
                (high as u64) << 32 | low as u64
            }
        } )*
    }
}
