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

//! Indirect access to coprocessor memory over the 16-bit MDIO bus

use crate::errors::Error;
use crate::registers::{MDIO_ADDR_REG, MDIO_DATA_REG, PAGE_SELECT_REG};

use crate::trace;

/// Trait for 16-bit register transfers to/from the PHY
///
/// This is the host MDIO primitive. There is an in-memory
/// implementation in [crate::sim].
pub trait MdioBus {
    /// Read a 16-bit register
    fn read(&mut self, reg: u16) -> Result<u16, Error>;
    /// Write a 16-bit register
    fn write(&mut self, reg: u16, val: u16) -> Result<(), Error>;
}

impl<T> MdioBus for &mut T
where
    T: MdioBus + ?Sized,
{
    fn read(&mut self, reg: u16) -> Result<u16, Error> {
        (**self).read(reg)
    }
    fn write(&mut self, reg: u16, val: u16) -> Result<(), Error> {
        (**self).write(reg, val)
    }
}

/// Builds 32 and 64-bit memory accesses out of MDIO transfers.
///
/// Nothing here is atomic: the caller must own the bus for the
/// whole duration of one access.
pub struct MemAccess<B: MdioBus> {
    bus: B,
}

impl<B: MdioBus> MemAccess<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    fn select_address(&mut self, addr: u32) -> Result<(), Error> {
        self.bus.write(MDIO_ADDR_REG, (addr >> 16) as u16)?;
        self.bus.write(MDIO_ADDR_REG + 1, addr as u16)
    }

    pub fn read32(&mut self, addr: u32) -> Result<u32, Error> {
        self.select_address(addr)?;
        let hi = self.bus.read(MDIO_DATA_REG)?;
        let lo = self.bus.read(MDIO_DATA_REG + 1)?;
        let val = (u32::from(hi) << 16) | u32::from(lo);
        trace!("read32 {:#x} -> {:#x}", addr, val);
        Ok(val)
    }

    pub fn write32(&mut self, addr: u32, val: u32) -> Result<(), Error> {
        trace!("write32 {:#x} <- {:#x}", addr, val);
        self.select_address(addr)?;
        self.bus.write(MDIO_DATA_REG, (val >> 16) as u16)?;
        self.bus.write(MDIO_DATA_REG + 1, val as u16)
    }

    /// Low word lives at `addr`, high word at `addr + 4`
    pub fn read64(&mut self, addr: u32) -> Result<u64, Error> {
        let lo = self.read32(addr)?;
        let hi = self.read32(addr.wrapping_add(4))?;
        Ok((u64::from(hi) << 32) | u64::from(lo))
    }

    /// Run `op` with `page` selected, then put the previous page back.
    /// The restore is attempted even when `op` failed.
    fn with_page<T>(
        &mut self,
        page: u16,
        op: impl FnOnce(&mut B) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let old_page = self.bus.read(PAGE_SELECT_REG)?;
        self.bus.write(PAGE_SELECT_REG, page)?;
        let res = op(&mut self.bus);
        let restored = self.bus.write(PAGE_SELECT_REG, old_page);
        let val = res?;
        restored?;
        Ok(val)
    }

    pub fn read_paged(&mut self, page: u16, reg: u16) -> Result<u16, Error> {
        self.with_page(page, |bus| bus.read(reg))
    }

    /// Read-modify-write of the bits in `mask`, returns the old value
    pub fn modify_paged(&mut self, page: u16, reg: u16, mask: u16, set: u16) -> Result<u16, Error> {
        self.with_page(page, |bus| {
            let old = bus.read(reg)?;
            let new = (old & !mask) | (set & mask);
            if new != old {
                bus.write(reg, new)?;
            }
            Ok(old)
        })
    }
}
