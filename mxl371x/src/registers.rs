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

//! MDIO registers and coprocessor memory map

/// MDIO register receiving the high half of the memory address.
/// The next register takes the low half.
pub(crate) const MDIO_ADDR_REG: u16 = 0x0e;
/// MDIO register pair carrying the data, high half first.
/// Shares its first register with the low address half.
pub(crate) const MDIO_DATA_REG: u16 = 0x0f;
/// Standard page select register
pub(crate) const PAGE_SELECT_REG: u16 = 0x1f;

/// Page holding the host interface (SGMII) control register
pub(crate) const SGMII_CTRL_PAGE: u16 = 0xa000;
/// Register within [SGMII_CTRL_PAGE]
pub(crate) const SGMII_CTRL_REG: u16 = 0x10;
pub(crate) const SGMII_MODE_MASK: u16 = 0xff;

/// Device ids of the Leucadia SoC family
pub(crate) const LEUCADIA_DEVICE_IDS: [u16; 2] = [0x3710, 0x3711];
pub(crate) const REVISION_ID_SHIFT: u32 = 16;

/// Firmware status register bits
pub(crate) const FW_LOADED_BIT: u32 = 1 << 0;
pub(crate) const FW_RUNNING_BIT: u32 = 1 << 1;
pub(crate) const FW_ERROR_BIT: u32 = 1 << 2;

/// CPU source select value holding the coprocessor in reset
pub(crate) const CPU_SRC_SEL_RESET: u32 = 0x8;
/// CPU source select value letting the coprocessor run
pub(crate) const CPU_SRC_SEL_RUN: u32 = 0x0;
/// Load address of the firmware image
pub(crate) const FW_BASE_ADDR: u32 = 0x0000_0000;
/// Largest accepted firmware image
pub const MAX_FIRMWARE_SIZE: usize = 4 * 1024 * 1024;

pub(crate) const LINK_STATUS_MASK: u32 = 0x07;
pub(crate) const SECURITY_ENABLED_BIT: u32 = 1 << 0;

/// Coprocessor memory addresses, reached through the MDIO window
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(u32)]
pub(crate) enum Regs {
    // System resource engine
    ProductFamilyId = 0x0820_0000,
    DeviceId = 0x0820_0004,
    CpuSrcSel = 0x0820_0010,
    FwStatus = 0x0820_0100,
    // Temperature sensor
    TsensCtrl = 0x0820_0200,
    TsensData = 0x0820_0204,
    RadioTsens1 = 0x0c14_c110,
    RadioTsens2 = 0x0c14_c100,
    RadioTsens3 = 0x0c14_c108,
    // Statistics, 64-bit counters
    StatsTxPackets = 0x0c00_0000,
    StatsTxBytes = 0x0c00_0008,
    StatsTxDropped = 0x0c00_0010,
    StatsTxBroadcast = 0x0c00_0018,
    StatsTxMulticast = 0x0c00_0020,
    StatsRxPackets = 0x0c00_0028,
    StatsRxBytes = 0x0c00_0030,
    StatsRxDropped = 0x0c00_0038,
    StatsRxErrors = 0x0c00_0040,
    // Link status
    LinkStatus = 0x0c10_0000,
    LinkPhyRate = 0x0c10_0004,
    LinkMocaVersion = 0x0c10_0008,
    LinkNodeId = 0x0c10_000c,
    LinkNcNodeId = 0x0c10_0010,
    LinkLof = 0x0c10_0014,
    LinkNetworkState = 0x0c10_0018,
    LinkActiveNodes = 0x0c10_001c,
    GuidHi = 0x0c10_0020,
    GuidLo = 0x0c10_0024,
    SecurityStatus = 0x0c10_0200,
}

impl From<Regs> for u32 {
    fn from(val: Regs) -> Self {
        val as u32
    }
}
