/*!
 * Driver for the debug feature dump (DFD) engine of the MediaTek MT8192.
 *
 * On a watchdog or hardware trigger, DFD shifts the CPU scan chains (and
 * optionally the caches) out to DRAM. The rich OS configures it through a
 * SiP monitor call; the configuration is kept so it can be replayed when the
 * cluster comes back from a low power state.
 *
 * Register addresses and platform tuning values come from a `DfdLayout`.
 */

use log::{debug, warn};

use crate::mmio::Bus;

/// SiP call argument selecting the DFD operation.
pub const DFD_SETUP_MAGIC: u64 = 0x9971_6150;
pub const DFD_READ_MAGIC: u64 = 0x9971_6151;
pub const DFD_WRITE_MAGIC: u64 = 0x9971_6152;

/// SiP return value for an unknown command.
pub const MTK_SIP_E_INVALID_PARAM: u64 = -1i64 as u64;

/// Largest offset reachable through the read and write commands.
const DFD_ACCESS_WINDOW: u64 = 0x200;

bitflags! {
    pub struct CacheDump : u64
    {
        /// DFD 3.5: dump the caches as well.
        const ENABLE = 1 << 0;
        /// Also trigger the dump on cache parity errors.
        const PARITY_ERR_TRIGGER = 1 << 1;
    }
}

// DFD internal control bits
const INTERNAL_DUMP_EN: u32 = 1 << 0;
const CLOCK_STOP_EN: u32 = 1 << 2;
const TRIGGER_SEL_WDT: u32 = 1 << 3;
const TRIGGER_SEL_HW: u32 = 1 << 4;
const XRESET_B_UPDATE_DISABLE: u32 = 1 << 13;
const ARMPLL_DIV_MUX_SEL_PLL2: u32 = 0x3 << 19;

// Auto power on, 10 µs delay, 20 µs wait
const AUTO_POWER_ON: u32 = 0xB;
// iLDO power control
const POWER_CTL_ILDO: u32 = 0xF9;
const V35_TAP_NUMBER: u32 = 0xB;
const HW_TRIGGER_MASK_PARITY: u32 = 0xC;

const PROTECT_EN_DFD: u32 = 1 << 8;
const MCU_PWR_CTL_MASK_DFD: u32 = 1 << 2;

/// Where the DFD registers live on a given platform, and the values the
/// platform programs into them. Laid out for the board's C code.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct DfdLayout {
    pub internal_ctl: usize,
    pub internal_pwr_on: usize,
    pub chain_length0: usize,
    pub internal_shift_clk_ratio: usize,
    pub internal_test_so_over_64: usize,
    pub test_si: [usize; 4],
    pub power_ctl: usize,
    pub set_baseaddr: usize,
    pub protect_en: usize,
    pub mcu_pwr_ctl_mask: usize,
    pub clean_status: usize,
    pub v30_ctl: usize,
    pub v35_enable: usize,
    pub v35_tap_number: usize,
    pub v35_tap_en: usize,
    pub v35_seq0_0: usize,
    pub hw_trigger_mask: usize,
    /// Base of the window reachable by the read and write commands.
    pub misc1_cfg_base: usize,

    /// Scan inputs, the first one used while caches are not dumped.
    pub test_si_values: [u32; 4],
    pub test_si_0_cache_en: u32,
    pub v35_tap_en_value: u32,
    pub v35_seq0_0_value: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Config {
    base_addr: u64,
    chain_length: u64,
    cache_dump: u64,
}

pub struct Dfd<B> {
    bus: B,
    layout: DfdLayout,
    config: Option<Config>,
}

impl<B: Bus> Dfd<B> {
    pub fn new(bus: B, layout: DfdLayout) -> Dfd<B> {
        Dfd {
            bus,
            layout,
            config: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_some()
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /**
     * Program the dump engine.
     *
     * `base_addr` is the DRAM buffer receiving the dump, `chain_length` the
     * longest scan chain and `cache_dump` a `CacheDump` bit set.
     */
    pub fn setup(&mut self, base_addr: u64, chain_length: u64, cache_dump: u64) {
        let l = self.layout;
        let bus = &mut self.bus;

        bus.sync_write(l.internal_ctl, INTERNAL_DUMP_EN | CLOCK_STOP_EN);
        bus.set_bits(l.internal_ctl, XRESET_B_UPDATE_DISABLE);
        bus.set_bits(l.internal_ctl, TRIGGER_SEL_WDT);
        bus.set_bits(l.internal_ctl, ARMPLL_DIV_MUX_SEL_PLL2);

        bus.write(l.internal_pwr_on, AUTO_POWER_ON);
        bus.write(l.chain_length0, chain_length as u32);
        bus.write(l.internal_shift_clk_ratio, 0);
        bus.write(l.internal_test_so_over_64, 1);

        // DFD 3.0
        for (&reg, &value) in l.test_si.iter().zip(l.test_si_values.iter()) {
            bus.write(reg, value);
        }

        bus.sync_write(l.power_ctl, POWER_CTL_ILDO);

        // The engine takes the buffer address in 16 MiB units
        bus.write(l.set_baseaddr, (base_addr >> 24) as u32);

        // Sleep protection would block the dump
        bus.clear_bits(l.protect_en, PROTECT_EN_DFD);
        bus.clear_bits(l.mcu_pwr_ctl_mask, MCU_PWR_CTL_MASK_DFD);

        bus.sync_write(l.clean_status, 1);
        bus.sync_write(l.clean_status, 0);

        bus.sync_write(l.v30_ctl, 1);

        self.config = Some(Config {
            base_addr,
            chain_length,
            cache_dump,
        });

        let cache_dump = CacheDump::from_bits_truncate(cache_dump);
        if cache_dump.contains(CacheDump::ENABLE) {
            // DFD 3.5
            bus.write(l.test_si[0], l.test_si_0_cache_en);
            bus.sync_write(l.v35_enable, 1);
            bus.sync_write(l.v35_tap_number, V35_TAP_NUMBER);
            bus.sync_write(l.v35_tap_en, l.v35_tap_en_value);
            bus.sync_write(l.v35_seq0_0, l.v35_seq0_0_value);

            if cache_dump.contains(CacheDump::PARITY_ERR_TRIGGER) {
                bus.sync_write(l.hw_trigger_mask, HW_TRIGGER_MASK_PARITY);
                bus.set_bits(l.internal_ctl, TRIGGER_SEL_HW);
            }
        }

        bus.sync_barrier();
        debug!("DFD set up, chain length {}", chain_length);
    }

    /// Replay the last setup after a power down. Nothing to do if DFD was
    /// never set up.
    pub fn resume(&mut self) {
        if let Some(config) = self.config {
            self.setup(config.base_addr, config.chain_length, config.cache_dump);
        }
    }

    /// SiP call entry point.
    pub fn dispatch(&mut self, command: u64, arg1: u64, arg2: u64, arg3: u64) -> u64 {
        match command {
            DFD_SETUP_MAGIC => {
                self.setup(arg1, arg2, arg3);
                0
            }
            DFD_READ_MAGIC => match self.window_addr(arg1) {
                Some(addr) => self.bus.read(addr) as u64,
                None => 0,
            },
            DFD_WRITE_MAGIC => {
                if let Some(addr) = self.window_addr(arg1) {
                    self.bus.sync_write(addr, arg2 as u32);
                }
                0
            }
            _ => {
                warn!("Unknown DFD command {:#x}", command);
                MTK_SIP_E_INVALID_PARAM
            }
        }
    }

    fn window_addr(&self, offset: u64) -> Option<usize> {
        if offset <= DFD_ACCESS_WINDOW {
            Some(self.layout.misc1_cfg_base + offset as usize)
        } else {
            warn!("DFD access at {:#x} out of window", offset);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Access, RegisterFile};

    const MISC1: usize = 0x0c53_a000;

    fn layout() -> DfdLayout {
        DfdLayout {
            internal_ctl: 0x100,
            internal_pwr_on: 0x104,
            chain_length0: 0x108,
            internal_shift_clk_ratio: 0x10c,
            internal_test_so_over_64: 0x110,
            test_si: [0x120, 0x124, 0x128, 0x12c],
            power_ctl: 0x130,
            set_baseaddr: 0x200,
            protect_en: 0x204,
            mcu_pwr_ctl_mask: 0x208,
            clean_status: 0x140,
            v30_ctl: 0x144,
            v35_enable: 0x150,
            v35_tap_number: 0x154,
            v35_tap_en: 0x158,
            v35_seq0_0: 0x15c,
            hw_trigger_mask: 0x160,
            misc1_cfg_base: MISC1,
            test_si_values: [0xaaaa_0000, 0x1111, 0x2222, 0x3333],
            test_si_0_cache_en: 0xcccc_0000,
            v35_tap_en_value: 0x3f,
            v35_seq0_0_value: 0x5a5a,
        }
    }

    fn dfd() -> Dfd<RegisterFile> {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut regs = RegisterFile::new();
        regs.set(0x204, 0xffff_ffff);
        regs.set(0x208, 0xffff_ffff);
        Dfd::new(regs, layout())
    }

    #[test]
    fn setup_programs_dfd_v30() {
        let mut dfd = dfd();
        dfd.setup(0x4_8000_0000, 0x1234, 0);
        let regs = dfd.bus();

        assert_eq!(regs.get(0x100), 0x5 | 1 << 13 | 1 << 3 | 0x3 << 19);
        assert_eq!(regs.get(0x104), 0xB);
        assert_eq!(regs.get(0x108), 0x1234);
        assert_eq!(regs.get(0x110), 1);
        assert_eq!(regs.get(0x120), 0xaaaa_0000);
        assert_eq!(regs.get(0x12c), 0x3333);
        assert_eq!(regs.get(0x130), 0xF9);
        assert_eq!(regs.get(0x200), 0x480);
        assert_eq!(regs.get(0x204), !(1 << 8));
        assert_eq!(regs.get(0x208), !(1 << 2));
        assert_eq!(regs.get(0x144), 1);
        assert_eq!(regs.get(0x150), 0);
        assert!(dfd.is_enabled());

        let clean: Vec<(usize, u32)> = regs
            .writes()
            .into_iter()
            .filter(|&(addr, _)| addr == 0x140)
            .collect();
        assert_eq!(clean, vec![(0x140, 1), (0x140, 0)]);
        assert_eq!(regs.log().last(), Some(&Access::SyncBarrier));
    }

    #[test]
    fn first_write_is_synchronised() {
        let mut dfd = dfd();
        dfd.setup(0, 1, 0);
        assert_eq!(
            &dfd.bus().log()[..2],
            &[Access::Write(0x100, 0x5), Access::SyncBarrier]
        );
    }

    #[test]
    fn cache_dump_enables_dfd_v35() {
        let mut dfd = dfd();
        dfd.setup(0, 1, CacheDump::ENABLE.bits());
        let regs = dfd.bus();

        assert_eq!(regs.get(0x120), 0xcccc_0000);
        assert_eq!(regs.get(0x150), 1);
        assert_eq!(regs.get(0x154), 0xB);
        assert_eq!(regs.get(0x158), 0x3f);
        assert_eq!(regs.get(0x15c), 0x5a5a);
        assert_eq!(regs.get(0x160), 0);
        assert_eq!(regs.get(0x100) & 1 << 4, 0);
    }

    #[test]
    fn parity_trigger_needs_cache_dump() {
        let mut dfd = dfd();
        dfd.setup(0, 1, CacheDump::PARITY_ERR_TRIGGER.bits());
        assert_eq!(dfd.bus().get(0x160), 0);

        dfd.setup(0, 1, CacheDump::all().bits());
        assert_eq!(dfd.bus().get(0x160), 0xC);
        assert_ne!(dfd.bus().get(0x100) & 1 << 4, 0);
    }

    #[test]
    fn resume_replays_last_setup() {
        let mut dfd = dfd();
        dfd.setup(0x8000_0000, 0x42, CacheDump::ENABLE.bits());
        let first = dfd.bus().writes();

        dfd.bus_mut().clear_log();
        dfd.resume();
        assert_eq!(dfd.bus().writes(), first);
    }

    #[test]
    fn resume_without_setup_does_nothing() {
        let mut dfd = dfd();
        dfd.resume();
        assert!(dfd.bus().log().is_empty());
        assert!(!dfd.is_enabled());
    }

    #[test]
    fn dispatch_setup_records_config() {
        let mut dfd = dfd();
        assert_eq!(dfd.dispatch(DFD_SETUP_MAGIC, 0x1_0000_0000, 0x77, 0), 0);
        assert_eq!(dfd.bus().get(0x108), 0x77);
        assert_eq!(dfd.bus().get(0x200), 0x100);
        assert!(dfd.is_enabled());
    }

    #[test]
    fn dispatch_read_and_write_are_bounded() {
        let mut dfd = dfd();
        dfd.bus_mut().set(MISC1 + 0x200, 0xdead_beef);
        dfd.bus_mut().set(MISC1 + 0x204, 0x1234);

        assert_eq!(dfd.dispatch(DFD_READ_MAGIC, 0x200, 0, 0), 0xdead_beef);
        assert_eq!(dfd.dispatch(DFD_READ_MAGIC, 0x204, 0, 0), 0);

        dfd.bus_mut().clear_log();
        assert_eq!(dfd.dispatch(DFD_WRITE_MAGIC, 0x10, 0x99, 0), 0);
        assert_eq!(
            dfd.bus().log(),
            &[Access::Write(MISC1 + 0x10, 0x99), Access::SyncBarrier]
        );

        dfd.bus_mut().clear_log();
        assert_eq!(dfd.dispatch(DFD_WRITE_MAGIC, 0x201, 0x99, 0), 0);
        assert!(dfd.bus().log().is_empty());
        assert!(!dfd.is_enabled());
    }

    #[test]
    fn dispatch_rejects_unknown_commands() {
        let mut dfd = dfd();
        assert_eq!(dfd.dispatch(0, 0, 0, 0), MTK_SIP_E_INVALID_PARAM);
        assert_eq!(dfd.dispatch(0x9971_6153, 0, 0, 0), MTK_SIP_E_INVALID_PARAM);
        assert!(dfd.bus().log().is_empty());
    }
}
