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

//! MoCA link status and statistics snapshots
//!
//! Both readers are best-effort: every register is read on its own,
//! a failed read keeps the previous value of that field and is
//! recorded in a [ReadReport].

use crate::errors::Error;
use crate::registers::{Regs, LINK_STATUS_MASK, SECURITY_ENABLED_BIT};
use crate::transport::{MdioBus, MemAccess};

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub enum LinkState {
    #[default]
    Down,
    Up,
    Scanning,
}

impl From<u32> for LinkState {
    fn from(val: u32) -> Self {
        match val {
            1 => Self::Up,
            2 => Self::Scanning,
            _ => Self::Down,
        }
    }
}

impl core::fmt::Display for LinkState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Down => "down",
            Self::Up => "up",
            Self::Scanning => "scanning",
        })
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub enum NetworkState {
    #[default]
    Idle,
    Searching,
    Network,
}

impl From<u32> for NetworkState {
    fn from(val: u32) -> Self {
        match val {
            1 => Self::Searching,
            2 => Self::Network,
            _ => Self::Idle,
        }
    }
}

impl core::fmt::Display for NetworkState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Searching => "searching",
            Self::Network => "network",
        })
    }
}

/// MoCA protocol version, major in the high nibble
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct MocaVersion(pub u8);

impl MocaVersion {
    pub fn major(&self) -> u8 {
        self.0 >> 4
    }
    pub fn minor(&self) -> u8 {
        self.0 & 0xf
    }
}

impl core::fmt::Display for MocaVersion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}

/// Bitmap of the nodes present in the MoCA network
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct ActiveNodes(pub u32);

impl core::fmt::Display for ActiveNodes {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct LinkStatus {
    pub link: LinkState,
    pub version: MocaVersion,
    pub phy_rate: u16,
    pub node_id: u8,
    pub nc_node_id: u8,
    /// Loss-of-frame count
    pub lof: u32,
    pub network_state: NetworkState,
    pub active_nodes: ActiveNodes,
    pub security_enabled: bool,
}

/// The register batches read as a unit
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Batch {
    Status,
    Stats,
}

impl core::fmt::Display for Batch {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Status => "status",
            Self::Stats => "statistics",
        })
    }
}

/// Something a batch reader can report as failed
pub trait ReportField: Copy {
    const BATCH: Batch;
    fn index(self) -> usize;
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum StatusField {
    Link,
    PhyRate,
    Version,
    NodeId,
    NcNodeId,
    Lof,
    NetworkState,
    ActiveNodes,
    Security,
}

impl StatusField {
    pub const ALL: [Self; 9] = [
        Self::Link,
        Self::PhyRate,
        Self::Version,
        Self::NodeId,
        Self::NcNodeId,
        Self::Lof,
        Self::NetworkState,
        Self::ActiveNodes,
        Self::Security,
    ];

    pub(crate) fn reg(self) -> Regs {
        match self {
            Self::Link => Regs::LinkStatus,
            Self::PhyRate => Regs::LinkPhyRate,
            Self::Version => Regs::LinkMocaVersion,
            Self::NodeId => Regs::LinkNodeId,
            Self::NcNodeId => Regs::LinkNcNodeId,
            Self::Lof => Regs::LinkLof,
            Self::NetworkState => Regs::LinkNetworkState,
            Self::ActiveNodes => Regs::LinkActiveNodes,
            Self::Security => Regs::SecurityStatus,
        }
    }
}

impl ReportField for StatusField {
    const BATCH: Batch = Batch::Status;
    fn index(self) -> usize {
        self as usize
    }
}

impl LinkStatus {
    fn apply(&mut self, field: StatusField, raw: u32) {
        match field {
            StatusField::Link => self.link = (raw & LINK_STATUS_MASK).into(),
            StatusField::PhyRate => self.phy_rate = raw as u16,
            StatusField::Version => self.version = MocaVersion(raw as u8),
            StatusField::NodeId => self.node_id = raw as u8,
            StatusField::NcNodeId => self.nc_node_id = raw as u8,
            StatusField::Lof => self.lof = raw,
            StatusField::NetworkState => self.network_state = (raw & 0xff).into(),
            StatusField::ActiveNodes => self.active_nodes = ActiveNodes(raw),
            StatusField::Security => self.security_enabled = raw & SECURITY_ENABLED_BIT != 0,
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct MocaStats {
    pub tx_packets: u64,
    pub tx_bytes: u64,
    pub tx_dropped: u64,
    pub tx_broadcast: u64,
    pub tx_multicast: u64,
    pub rx_packets: u64,
    pub rx_bytes: u64,
    pub rx_dropped: u64,
    pub rx_errors: u64,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Counter {
    TxPackets,
    TxBytes,
    TxDropped,
    TxBroadcast,
    TxMulticast,
    RxPackets,
    RxBytes,
    RxDropped,
    RxErrors,
}

impl Counter {
    pub const ALL: [Self; 9] = [
        Self::TxPackets,
        Self::TxBytes,
        Self::TxDropped,
        Self::TxBroadcast,
        Self::TxMulticast,
        Self::RxPackets,
        Self::RxBytes,
        Self::RxDropped,
        Self::RxErrors,
    ];

    pub(crate) fn reg(self) -> Regs {
        match self {
            Self::TxPackets => Regs::StatsTxPackets,
            Self::TxBytes => Regs::StatsTxBytes,
            Self::TxDropped => Regs::StatsTxDropped,
            Self::TxBroadcast => Regs::StatsTxBroadcast,
            Self::TxMulticast => Regs::StatsTxMulticast,
            Self::RxPackets => Regs::StatsRxPackets,
            Self::RxBytes => Regs::StatsRxBytes,
            Self::RxDropped => Regs::StatsRxDropped,
            Self::RxErrors => Regs::StatsRxErrors,
        }
    }
}

impl ReportField for Counter {
    const BATCH: Batch = Batch::Stats;
    fn index(self) -> usize {
        self as usize
    }
}

impl MocaStats {
    fn slot(&mut self, counter: Counter) -> &mut u64 {
        match counter {
            Counter::TxPackets => &mut self.tx_packets,
            Counter::TxBytes => &mut self.tx_bytes,
            Counter::TxDropped => &mut self.tx_dropped,
            Counter::TxBroadcast => &mut self.tx_broadcast,
            Counter::TxMulticast => &mut self.tx_multicast,
            Counter::RxPackets => &mut self.rx_packets,
            Counter::RxBytes => &mut self.rx_bytes,
            Counter::RxDropped => &mut self.rx_dropped,
            Counter::RxErrors => &mut self.rx_errors,
        }
    }
}

/// Counters in the shape of the generic PHY statistics export
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct PhyStats {
    pub rx_packets: u64,
    pub rx_bytes: u64,
    pub rx_errors: u64,
    pub tx_packets: u64,
    pub tx_bytes: u64,
    pub tx_errors: u64,
}

impl From<&MocaStats> for PhyStats {
    fn from(s: &MocaStats) -> Self {
        Self {
            rx_packets: s.rx_packets,
            rx_bytes: s.rx_bytes,
            rx_errors: s.rx_errors,
            tx_packets: s.tx_packets,
            tx_bytes: s.tx_bytes,
            tx_errors: s.tx_dropped,
        }
    }
}

/// Which reads of a batch failed
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct ReadReport {
    batch: Batch,
    failed: u16,
}

impl ReadReport {
    fn new(batch: Batch) -> Self {
        Self { batch, failed: 0 }
    }

    fn mark<F: ReportField>(&mut self, field: F) {
        self.failed |= 1 << field.index();
    }

    pub fn batch(&self) -> Batch {
        self.batch
    }

    /// Always false for a field of another batch
    pub fn is_failed<F: ReportField>(&self, field: F) -> bool {
        F::BATCH == self.batch && self.failed & (1 << field.index()) != 0
    }

    pub fn failed_count(&self) -> u32 {
        self.failed.count_ones()
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    fn into_result(self) -> Result<(), Error> {
        if self.is_clean() {
            Ok(())
        } else {
            Err(Error::AggregateReadFailure(self))
        }
    }
}

pub(crate) fn read_link_status<B: MdioBus>(
    mem: &mut MemAccess<B>,
    status: &mut LinkStatus,
) -> Result<(), Error> {
    let mut report = ReadReport::new(Batch::Status);
    for field in StatusField::ALL {
        match mem.read32(field.reg().into()) {
            Ok(raw) => status.apply(field, raw),
            Err(_) => report.mark(field),
        }
    }
    report.into_result()
}

pub(crate) fn read_stats<B: MdioBus>(
    mem: &mut MemAccess<B>,
    stats: &mut MocaStats,
) -> Result<(), Error> {
    let mut report = ReadReport::new(Batch::Stats);
    for counter in Counter::ALL {
        match mem.read64(counter.reg().into()) {
            Ok(val) => *stats.slot(counter) = val,
            Err(_) => report.mark(counter),
        }
    }
    report.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimBus;
    use std::string::ToString;

    fn populated() -> SimBus {
        let mut sim = SimBus::new();
        sim.poke(Regs::LinkStatus.into(), 0xf9); // masked to 1
        sim.poke(Regs::LinkPhyRate.into(), 0x0003_0a28);
        sim.poke(Regs::LinkMocaVersion.into(), 0x125);
        sim.poke(Regs::LinkNodeId.into(), 0x103);
        sim.poke(Regs::LinkNcNodeId.into(), 0x01);
        sim.poke(Regs::LinkLof.into(), 0x8000_0011);
        sim.poke(Regs::LinkNetworkState.into(), 0x02);
        sim.poke(Regs::LinkActiveNodes.into(), 0x0b);
        sim.poke(Regs::SecurityStatus.into(), 0x3);
        sim
    }

    #[test]
    fn test_status_decode() {
        let mut mem = MemAccess::new(populated());
        let mut status = LinkStatus::default();
        read_link_status(&mut mem, &mut status).unwrap();
        assert_eq!(status.link, LinkState::Up);
        assert_eq!(status.phy_rate, 0x0a28);
        assert_eq!(status.version.to_string(), "2.5");
        assert_eq!(status.node_id, 3);
        assert_eq!(status.nc_node_id, 1);
        assert_eq!(status.lof, 0x8000_0011);
        assert_eq!(status.network_state, NetworkState::Network);
        assert_eq!(status.active_nodes.to_string(), "0x0000000b");
        assert!(status.security_enabled);
    }

    #[test]
    fn test_status_partial_failure_keeps_old_value() {
        let mut sim = populated();
        sim.fail_reads_of(Regs::LinkLof.into());
        let mut mem = MemAccess::new(sim);
        let mut status = LinkStatus {
            lof: 77,
            ..Default::default()
        };
        let err = read_link_status(&mut mem, &mut status).unwrap_err();
        let Error::AggregateReadFailure(report) = err else {
            panic!("unexpected error {:?}", err);
        };
        assert_eq!(report.batch(), Batch::Status);
        assert_eq!(report.failed_count(), 1);
        assert!(report.is_failed(StatusField::Lof));
        assert!(!report.is_failed(Counter::RxPackets));
        // Every other field still got refreshed
        assert_eq!(
            status,
            LinkStatus {
                link: LinkState::Up,
                version: MocaVersion(0x25),
                phy_rate: 0x0a28,
                node_id: 3,
                nc_node_id: 1,
                lof: 77,
                network_state: NetworkState::Network,
                active_nodes: ActiveNodes(0x0b),
                security_enabled: true,
            }
        );
    }

    #[test]
    fn test_unknown_states_map_to_defaults() {
        assert_eq!(LinkState::from(5), LinkState::Down);
        assert_eq!(NetworkState::from(9), NetworkState::Idle);
        assert_eq!(LinkState::Scanning.to_string(), "scanning");
        assert_eq!(NetworkState::Searching.to_string(), "searching");
    }

    #[test]
    fn test_stats_partial_failure() {
        let mut sim = SimBus::new();
        for (i, counter) in Counter::ALL.iter().enumerate() {
            sim.poke64(counter.reg().into(), 0x1_0000_0000 + i as u64);
        }
        // Fail the high word of the rx bytes counter only
        sim.fail_reads_of(u32::from(Regs::StatsRxBytes) + 4);
        let mut mem = MemAccess::new(sim);
        let mut stats = MocaStats {
            rx_bytes: 5,
            ..Default::default()
        };
        let err = read_stats(&mut mem, &mut stats).unwrap_err();
        let Error::AggregateReadFailure(report) = err else {
            panic!("unexpected error {:?}", err);
        };
        assert_eq!(report.batch(), Batch::Stats);
        assert_eq!(report.failed_count(), 1);
        assert!(report.is_failed(Counter::RxBytes));
        assert!(!report.is_failed(Counter::RxErrors));
        assert!(!report.is_failed(StatusField::NodeId));
        assert_eq!(
            stats,
            MocaStats {
                tx_packets: 0x1_0000_0000,
                tx_bytes: 0x1_0000_0001,
                tx_dropped: 0x1_0000_0002,
                tx_broadcast: 0x1_0000_0003,
                tx_multicast: 0x1_0000_0004,
                rx_packets: 0x1_0000_0005,
                rx_bytes: 5,
                rx_dropped: 0x1_0000_0007,
                rx_errors: 0x1_0000_0008,
            }
        );

        let phy = PhyStats::from(&stats);
        assert_eq!(phy.tx_errors, stats.tx_dropped);
        assert_eq!(phy.rx_packets, stats.rx_packets);
    }
}
