// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! In-memory model of the MXL371x MDIO window
//!
//! [SimBus] implements the address/data register sequencing of the
//! real part, a page-select register, the firmware status behaviour
//! around reset/release and the two-sample temperature sensor. Faults
//! can be injected per address or for the whole bus.
//! [SimDelay] is a simulated clock.

use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;

use crate::errors::Error;
use crate::registers::{
    Regs, CPU_SRC_SEL_RESET, CPU_SRC_SEL_RUN, FW_ERROR_BIT, FW_LOADED_BIT, FW_RUNNING_BIT,
    MDIO_ADDR_REG, MDIO_DATA_REG, PAGE_SELECT_REG,
};

/// Value selecting the second sensor input
const TSENS_SECOND_INPUT: u32 = 0x0000_0411;

/// How the simulated coprocessor reacts to being released from reset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirmwareModel {
    /// Status polls after release until the running bit shows up,
    /// `None` never starts
    pub ready_after: Option<u32>,
    /// Report the error bit instead of starting
    pub fault: bool,
}

impl Default for FirmwareModel {
    fn default() -> Self {
        Self {
            ready_after: Some(1),
            fault: false,
        }
    }
}

pub struct SimBus {
    mem: HashMap<u32, u32>,
    addr: u32,
    addr_lo_pending: bool,
    data_hi: u16,
    latched: u32,
    page: u16,
    paged: HashMap<(u16, u16), u16>,
    firmware: FirmwareModel,
    released: bool,
    status_polls: u32,
    t0: u32,
    t1: u32,
    fail_reads: HashSet<u32>,
    fail_writes: HashSet<u32>,
    fail_all: bool,
    ops: Arc<AtomicUsize>,
    status_reads: u32,
    stored: Vec<u32>,
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBus {
    /// A cold coprocessor: firmware not running
    pub fn new() -> Self {
        Self {
            mem: HashMap::new(),
            addr: 0,
            addr_lo_pending: false,
            data_hi: 0,
            latched: 0,
            page: 0,
            paged: HashMap::new(),
            firmware: FirmwareModel::default(),
            released: false,
            status_polls: 0,
            t0: 0,
            t1: 0,
            fail_reads: HashSet::new(),
            fail_writes: HashSet::new(),
            fail_all: false,
            ops: Arc::new(AtomicUsize::new(0)),
            status_reads: 0,
            stored: Vec::new(),
        }
    }

    /// A coprocessor whose firmware is already running
    pub fn warm() -> Self {
        let mut sim = Self::new();
        sim.poke(Regs::FwStatus.into(), FW_LOADED_BIT | FW_RUNNING_BIT);
        sim
    }

    pub fn with_firmware(mut self, firmware: FirmwareModel) -> Self {
        self.firmware = firmware;
        self
    }

    /// Chip identity as seen in the SRE registers
    pub fn with_device(mut self, family: u32, device_id: u16, revision: u16) -> Self {
        self.poke(Regs::ProductFamilyId.into(), family);
        self.poke(
            Regs::DeviceId.into(),
            (u32::from(revision) << 16) | u32::from(device_id),
        );
        self
    }

    /// Raw sensor values returned for the first and second input
    pub fn set_tsens(&mut self, t0: u32, t1: u32) {
        self.t0 = t0;
        self.t1 = t1;
    }

    pub fn poke(&mut self, addr: u32, val: u32) {
        self.mem.insert(addr, val);
    }

    pub fn peek(&self, addr: u32) -> u32 {
        self.mem.get(&addr).copied().unwrap_or(0)
    }

    pub fn poke64(&mut self, addr: u32, val: u64) {
        self.poke(addr, val as u32);
        self.poke(addr.wrapping_add(4), (val >> 32) as u32);
    }

    pub fn set_paged(&mut self, page: u16, reg: u16, val: u16) {
        self.paged.insert((page, reg), val);
    }

    pub fn paged(&self, page: u16, reg: u16) -> u16 {
        self.paged.get(&(page, reg)).copied().unwrap_or(0)
    }

    pub fn page(&self) -> u16 {
        self.page
    }

    /// Data reads of `addr` fail
    pub fn fail_reads_of(&mut self, addr: u32) {
        self.fail_reads.insert(addr);
    }

    /// Data writes to `addr` fail
    pub fn fail_writes_to(&mut self, addr: u32) {
        self.fail_writes.insert(addr);
    }

    pub fn clear_faults(&mut self) {
        self.fail_reads.clear();
        self.fail_writes.clear();
        self.fail_all = false;
    }

    /// Every transfer fails
    pub fn set_fail_all(&mut self, fail: bool) {
        self.fail_all = fail;
    }

    /// Shared count of MDIO transfers, readable while the bus is
    /// owned elsewhere
    pub fn op_counter(&self) -> Arc<AtomicUsize> {
        self.ops.clone()
    }

    pub fn ops(&self) -> usize {
        self.ops.load(Ordering::SeqCst)
    }

    /// Number of 32-bit words committed inside `range`
    pub fn writes_in(&self, range: Range<u32>) -> usize {
        self.stored.iter().filter(|&&a| range.contains(&a)).count()
    }

    /// Number of firmware status register reads
    pub fn status_reads(&self) -> u32 {
        self.status_reads
    }

    fn load(&mut self, addr: u32) -> u32 {
        if addr == u32::from(Regs::FwStatus) {
            self.status_reads += 1;
            if self.released {
                self.status_polls += 1;
                if self.firmware.fault {
                    return FW_ERROR_BIT;
                }
                if let Some(n) = self.firmware.ready_after {
                    if self.status_polls >= n {
                        let running = FW_LOADED_BIT | FW_RUNNING_BIT;
                        self.mem.insert(addr, running);
                        return running;
                    }
                }
                return FW_LOADED_BIT;
            }
        }
        if addr == u32::from(Regs::TsensData) {
            return if self.peek(Regs::RadioTsens2.into()) == TSENS_SECOND_INPUT {
                self.t1
            } else {
                self.t0
            };
        }
        self.peek(addr)
    }

    fn store(&mut self, addr: u32, val: u32) {
        if addr == u32::from(Regs::CpuSrcSel) {
            if val == CPU_SRC_SEL_RESET {
                self.released = false;
                self.status_polls = 0;
                self.mem.insert(Regs::FwStatus.into(), 0);
            } else if val == CPU_SRC_SEL_RUN && self.peek(addr) == CPU_SRC_SEL_RESET {
                self.released = true;
            }
        }
        self.mem.insert(addr, val);
    }
}

impl crate::transport::MdioBus for SimBus {
    fn read(&mut self, reg: u16) -> Result<u16, Error> {
        self.ops.fetch_add(1, Ordering::SeqCst);
        if self.fail_all {
            return Err(Error::BusError);
        }
        // The memory window only decodes on page 0
        let window = self.page == 0;
        match reg {
            PAGE_SELECT_REG => Ok(self.page),
            MDIO_DATA_REG if window => {
                if self.fail_reads.contains(&self.addr) {
                    return Err(Error::BusError);
                }
                self.latched = self.load(self.addr);
                Ok((self.latched >> 16) as u16)
            }
            r if window && r == MDIO_DATA_REG + 1 => Ok(self.latched as u16),
            _ => Ok(self.paged(self.page, reg)),
        }
    }

    fn write(&mut self, reg: u16, val: u16) -> Result<(), Error> {
        self.ops.fetch_add(1, Ordering::SeqCst);
        if self.fail_all {
            return Err(Error::BusError);
        }
        let window = self.page == 0;
        match reg {
            PAGE_SELECT_REG => self.page = val,
            MDIO_ADDR_REG if window => {
                self.addr = (u32::from(val) << 16) | (self.addr & 0xffff);
                self.addr_lo_pending = true;
            }
            // Low address half and high data half share a register
            MDIO_DATA_REG if window && self.addr_lo_pending => {
                self.addr = (self.addr & 0xffff_0000) | u32::from(val);
                self.addr_lo_pending = false;
            }
            MDIO_DATA_REG if window => self.data_hi = val,
            r if window && r == MDIO_DATA_REG + 1 => {
                if self.fail_writes.contains(&self.addr) {
                    return Err(Error::BusError);
                }
                let word = (u32::from(self.data_hi) << 16) | u32::from(val);
                self.stored.push(self.addr);
                self.store(self.addr, word);
            }
            _ => {
                self.paged.insert((self.page, reg), val);
            }
        }
        Ok(())
    }
}

/// Simulated clock: delays return immediately and add up
#[derive(Clone, Default)]
pub struct SimDelay {
    elapsed_ns: Arc<AtomicU64>,
}

impl SimDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns.load(Ordering::SeqCst) / 1_000_000
    }

    fn advance(&self, ns: u64) {
        self.elapsed_ns.fetch_add(ns, Ordering::SeqCst);
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.advance(u64::from(ns));
    }
    fn delay_us(&mut self, us: u32) {
        self.advance(u64::from(us) * 1_000);
    }
    fn delay_ms(&mut self, ms: u32) {
        self.advance(u64::from(ms) * 1_000_000);
    }
}
