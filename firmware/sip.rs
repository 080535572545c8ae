/*!
 * Silicon provider (SiP) monitor calls served by the image.
 *
 * The function identifier arrives in x0/w0, arguments in x1..x4, and up to
 * four values go back in x0..x3.
 */

use drivers::Error;

/// MediaTek kernel DFD service.
pub const MTK_SIP_KERNEL_DFD_AARCH32: u32 = 0x8200_0205;
pub const MTK_SIP_KERNEL_DFD_AARCH64: u32 = 0xC200_0205;

/// Three words of RNG output in w1..w3, status in w0.
pub const STM32_SIP_RNG: u32 = 0x8200_1010;

/// Unknown function identifier.
pub const SMC_UNK: u64 = -1i64 as u64;

/// Registers x0..x3 handed back to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SipReturn(pub [u64; 4]);

impl From<u64> for SipReturn {
    fn from(x0: u64) -> SipReturn {
        SipReturn([x0, 0, 0, 0])
    }
}

impl From<Error> for SipReturn {
    fn from(e: Error) -> SipReturn {
        SipReturn::from(e.code() as i64 as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_negative_errno() {
        assert_eq!(SipReturn::from(Error::Timeout).0[0] as i64, -110);
        assert_eq!(SipReturn::from(Error::NotInitialized).0, [-1i64 as u64, 0, 0, 0]);
    }
}
