/*!
 * Simulated hardware for host tests.
 *
 * `RngBank` models the STM32 RNG register window: a sticky seed error flag
 * cleared by writing zero, a data ready flag, and a data register returning
 * an incrementing word sequence. Hardware events are scheduled on the
 * simulated clock: each `delay_us` is one tick.
 *
 * `RegisterFile` is a plain register memory that records every write.
 */

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::vec::Vec;

use crate::mmio::Bus;
use crate::platform::{Domain, DtNode, Platform, PlatformError};
use crate::timer::Clock;

const SR_OFFSET: usize = 0x04;
const DR_OFFSET: usize = 0x08;

const SR_DRDY: u32 = 1 << 0;
const SR_SECS: u32 = 1 << 2;
const SR_SEIS: u32 = 1 << 6;

/// Something the simulated RNG does on a clock tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    SeedError,
    Ready,
    NotReady,
}

#[derive(Default)]
struct RngState {
    base: usize,
    now_us: u64,
    ticks: u64,
    schedule: BTreeMap<u64, Vec<Event>>,
    status: u32,
    control: u32,
    stuck_seed_error: bool,
    next_word: u32,
    stall_after: Option<usize>,
    status_reads: usize,
    control_reads: usize,
    data_reads: usize,
    seed_clears: usize,
    barriers: usize,
    writes: Vec<(usize, u32)>,
}

impl RngState {
    fn apply(&mut self, event: Event) {
        match event {
            Event::SeedError => self.status |= SR_SEIS | SR_SECS,
            Event::Ready => self.status |= SR_DRDY,
            Event::NotReady => self.status &= !SR_DRDY,
        }
    }
}

/// Handle on the simulated RNG, shared by its bus and clock.
#[derive(Clone)]
pub struct RngBank {
    state: Rc<RefCell<RngState>>,
}

impl RngBank {
    pub fn new(base: usize) -> RngBank {
        RngBank {
            state: Rc::new(RefCell::new(RngState {
                base,
                ..RngState::default()
            })),
        }
    }

    pub fn bus(&self) -> RngBus {
        RngBus(self.state.clone())
    }

    pub fn clock(&self) -> RngClock {
        RngClock(self.state.clone())
    }

    pub fn set_ready(&self, ready: bool) {
        let event = if ready { Event::Ready } else { Event::NotReady };
        self.state.borrow_mut().apply(event);
    }

    pub fn raise_seed_error(&self) {
        self.state.borrow_mut().apply(Event::SeedError);
    }

    /// Seed error flag ignores clears from now on.
    pub fn stick_seed_error(&self) {
        self.state.borrow_mut().stuck_seed_error = true;
    }

    /// Drop the data ready flag once `words` more words have been read.
    pub fn stall_after_words(&self, words: usize) {
        self.state.borrow_mut().stall_after = Some(words);
    }

    /// Schedule `event` right after the `delays`-th delay from now.
    pub fn after(&self, delays: u64, event: Event) {
        let mut state = self.state.borrow_mut();
        let tick = state.ticks + delays;
        state.schedule.entry(tick).or_insert_with(Vec::new).push(event);
    }

    pub fn control(&self) -> u32 {
        self.state.borrow().control
    }

    pub fn now_us(&self) -> u64 {
        self.state.borrow().now_us
    }

    pub fn ticks(&self) -> u64 {
        self.state.borrow().ticks
    }

    pub fn status_reads(&self) -> usize {
        self.state.borrow().status_reads
    }

    pub fn data_reads(&self) -> usize {
        self.state.borrow().data_reads
    }

    /// Number of writes that tried to clear the sticky seed error flag.
    pub fn seed_clears(&self) -> usize {
        self.state.borrow().seed_clears
    }

    pub fn barriers(&self) -> usize {
        self.state.borrow().barriers
    }

    /// Register writes as `(offset, value)`.
    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.state.borrow().writes.clone()
    }

    /// Total register accesses, reads and writes.
    pub fn accesses(&self) -> usize {
        let state = self.state.borrow();
        state.status_reads + state.control_reads + state.data_reads + state.writes.len()
    }
}

pub struct RngBus(Rc<RefCell<RngState>>);

impl Bus for RngBus {
    fn read(&mut self, addr: usize) -> u32 {
        let mut state = self.0.borrow_mut();
        match addr - state.base {
            SR_OFFSET => {
                state.status_reads += 1;
                state.status
            }
            DR_OFFSET => {
                state.data_reads += 1;
                let word = state.next_word;
                state.next_word = word.wrapping_add(1);
                let stall_after = state.stall_after;
                match stall_after {
                    Some(left) if left <= 1 => {
                        state.stall_after = None;
                        state.status &= !SR_DRDY;
                    }
                    Some(left) => state.stall_after = Some(left - 1),
                    None => {}
                }
                word
            }
            _ => {
                state.control_reads += 1;
                state.control
            }
        }
    }

    fn write(&mut self, addr: usize, data: u32) {
        let mut state = self.0.borrow_mut();
        let offset = addr - state.base;
        state.writes.push((offset, data));
        match offset {
            SR_OFFSET => {
                if data & SR_SEIS == 0 && state.status & SR_SEIS != 0 {
                    state.seed_clears += 1;
                    if !state.stuck_seed_error {
                        state.status &= !(SR_SEIS | SR_SECS);
                    }
                }
            }
            DR_OFFSET => {}
            _ => state.control = data,
        }
    }

    fn mem_barrier(&mut self) {
        self.0.borrow_mut().barriers += 1;
    }

    fn sync_barrier(&mut self) {
        self.0.borrow_mut().barriers += 1;
    }
}

pub struct RngClock(Rc<RefCell<RngState>>);

impl Clock for RngClock {
    fn now_us(&self) -> u64 {
        self.0.borrow().now_us
    }

    fn delay_us(&mut self, micro_secs: u32) {
        let mut state = self.0.borrow_mut();
        state.now_us += micro_secs as u64;
        state.ticks += 1;
        let tick = state.ticks;
        if let Some(events) = state.schedule.remove(&tick) {
            for event in events {
                state.apply(event);
            }
        }
    }
}

/// A bus access, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Read(usize),
    Write(usize, u32),
    SyncBarrier,
    MemBarrier,
}

/// Plain register memory. Unwritten registers read as zero.
#[derive(Default)]
pub struct RegisterFile {
    regs: BTreeMap<usize, u32>,
    log: Vec<Access>,
}

impl RegisterFile {
    pub fn new() -> RegisterFile {
        RegisterFile::default()
    }

    pub fn get(&self, addr: usize) -> u32 {
        self.regs.get(&addr).copied().unwrap_or(0)
    }

    pub fn set(&mut self, addr: usize, data: u32) {
        self.regs.insert(addr, data);
    }

    pub fn log(&self) -> &[Access] {
        &self.log
    }

    /// Only the writes, as `(addr, value)`.
    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.log
            .iter()
            .filter_map(|access| match *access {
                Access::Write(addr, data) => Some((addr, data)),
                _ => None,
            })
            .collect()
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }
}

impl Bus for RegisterFile {
    fn read(&mut self, addr: usize) -> u32 {
        self.log.push(Access::Read(addr));
        self.get(addr)
    }

    fn write(&mut self, addr: usize, data: u32) {
        self.log.push(Access::Write(addr, data));
        self.regs.insert(addr, data);
    }

    fn mem_barrier(&mut self) {
        self.log.push(Access::MemBarrier);
    }

    fn sync_barrier(&mut self) {
        self.log.push(Access::SyncBarrier);
    }
}

/// Platform port backed by a list of device tree nodes.
#[derive(Default)]
pub struct MockPlatform {
    pub no_device_tree: bool,
    pub nodes: Vec<(&'static str, DtNode)>,
    pub fail_reset_assert: bool,
    pub fail_reset_deassert: bool,
    pub clocks_enabled: Vec<u32>,
    pub reset_asserts: Vec<u32>,
    pub reset_deasserts: Vec<u32>,
    pub iomem: Vec<(usize, Domain)>,
    lookups: Cell<usize>,
}

impl MockPlatform {
    pub fn new() -> MockPlatform {
        MockPlatform::default()
    }

    pub fn with_node(compatible: &'static str, node: DtNode) -> MockPlatform {
        MockPlatform {
            nodes: vec![(compatible, node)],
            ..MockPlatform::default()
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.get()
    }
}

impl Platform for MockPlatform {
    fn find_compatible(&self, compatible: &str) -> Result<Option<DtNode>, PlatformError> {
        self.lookups.set(self.lookups.get() + 1);
        if self.no_device_tree {
            return Err(PlatformError::NoDeviceTree);
        }
        Ok(self
            .nodes
            .iter()
            .find(|(compat, _)| *compat == compatible)
            .map(|(_, node)| *node))
    }

    fn clock_enable(&mut self, clock: u32) {
        self.clocks_enabled.push(clock);
    }

    fn reset_assert(&mut self, reset: u32, _timeout_us: u32) -> Result<(), PlatformError> {
        self.reset_asserts.push(reset);
        if self.fail_reset_assert {
            Err(PlatformError::ResetTimeout)
        } else {
            Ok(())
        }
    }

    fn reset_deassert(&mut self, reset: u32, _timeout_us: u32) -> Result<(), PlatformError> {
        self.reset_deasserts.push(reset);
        if self.fail_reset_deassert {
            Err(PlatformError::ResetTimeout)
        } else {
            Ok(())
        }
    }

    fn register_iomem(&mut self, base: usize, domain: Domain) {
        self.iomem.push((base, domain));
    }
}
