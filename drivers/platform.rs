/*!
 * Services the drivers consume from the platform port: device tree lookup,
 * clock and reset controllers, and iomem registration with the secure
 * firmware access control.
 */

bitflags! {
    /// Device tree `status` / `secure-status` combination of a node.
    pub struct DtStatus : u32
    {
        const NON_SECURE = 1 << 0;
        const SECURE = 1 << 1;
        const SHARED = Self::NON_SECURE.bits | Self::SECURE.bits;
    }
}

impl DtStatus {
    /// A node with neither status bit is disabled.
    pub fn is_disabled(&self) -> bool {
        self.is_empty()
    }
}

/// The firmware stage a driver is built into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Trusted boot loader. Any enabled node is used.
    Bl2,
    /// Secure runtime. Only nodes assigned to the secure world are used.
    Bl32,
}

impl Stage {
    pub fn owns(&self, status: DtStatus) -> bool {
        match self {
            Stage::Bl2 => !status.is_disabled(),
            Stage::Bl32 => status.contains(DtStatus::SECURE),
        }
    }
}

/// The parts of a device tree node a peripheral driver needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DtNode {
    pub base: usize,
    pub status: DtStatus,
    /// Clock identifier, `None` if the node has no usable clock.
    pub clock: Option<u32>,
    /// Reset line identifier, if any.
    pub reset: Option<u32>,
}

/// Access domain of a peripheral register window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Domain {
    Secure,
    NonSecure,
}

impl Domain {
    pub fn of(status: DtStatus) -> Domain {
        if status.contains(DtStatus::NON_SECURE) {
            Domain::NonSecure
        } else {
            Domain::Secure
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlatformError {
    /// No device tree has been mapped.
    NoDeviceTree,
    /// A reset line did not reach the requested state in time.
    ResetTimeout,
}

pub trait Platform {
    /// Find the first node matching `compatible`.
    /// `Ok(None)` means the device tree does not describe it.
    fn find_compatible(&self, compatible: &str) -> Result<Option<DtNode>, PlatformError>;

    fn clock_enable(&mut self, clock: u32);

    fn reset_assert(&mut self, reset: u32, timeout_us: u32) -> Result<(), PlatformError>;

    fn reset_deassert(&mut self, reset: u32, timeout_us: u32) -> Result<(), PlatformError>;

    /// Declare the owner of a peripheral register window. Boot stages without
    /// a firewall keep the default, which does nothing.
    fn register_iomem(&mut self, _base: usize, _domain: Domain) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_ownership() {
        assert!(!Stage::Bl2.owns(DtStatus::empty()));
        assert!(Stage::Bl2.owns(DtStatus::NON_SECURE));
        assert!(Stage::Bl2.owns(DtStatus::SECURE));

        assert!(!Stage::Bl32.owns(DtStatus::empty()));
        assert!(!Stage::Bl32.owns(DtStatus::NON_SECURE));
        assert!(Stage::Bl32.owns(DtStatus::SECURE));
        assert!(Stage::Bl32.owns(DtStatus::SHARED));
    }

    #[test]
    fn domain_follows_non_secure_bit() {
        assert_eq!(Domain::of(DtStatus::SECURE), Domain::Secure);
        assert_eq!(Domain::of(DtStatus::SHARED), Domain::NonSecure);
        assert_eq!(Domain::of(DtStatus::NON_SECURE), Domain::NonSecure);
    }
}
