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

//! Helpers for running the driver against the simulated PHY

use std::time::Duration;

use log::info;
use mxl371x::sim::{FirmwareModel, SimBus};
use mxl371x::{Error, LinkStatus, Mxl371x, PhyStats, SharedPhy, StdDelay};

pub type SimPhy = Mxl371x<SimBus, StdDelay>;

const LINK_STATUS: u32 = 0x0c10_0000;
const LINK_PHY_RATE: u32 = 0x0c10_0004;
const LINK_VERSION: u32 = 0x0c10_0008;
const LINK_NODE_ID: u32 = 0x0c10_000c;
const LINK_NC_NODE_ID: u32 = 0x0c10_0010;
const LINK_NETWORK_STATE: u32 = 0x0c10_0018;
const LINK_ACTIVE_NODES: u32 = 0x0c10_001c;
const STATS_BASE: u32 = 0x0c00_0000;

/// Which SoC the simulated board carries
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum Chip {
    Leucadia,
    Cardiff,
}

impl Chip {
    fn device_id(self) -> u16 {
        match self {
            Chip::Leucadia => 0x3710,
            Chip::Cardiff => 0x3720,
        }
    }
}

/// A board with a MoCA network already up
pub fn board(chip: Chip, warm: bool) -> SimBus {
    let mut sim = if warm { SimBus::warm() } else { SimBus::new() };
    sim = sim
        .with_device(0x0037_0000, chip.device_id(), 0x0002)
        .with_firmware(FirmwareModel {
            ready_after: Some(3),
            fault: false,
        });
    sim.set_tsens(1_000, 1_000 + 150_000);
    sim.poke(LINK_STATUS, 1);
    sim.poke(LINK_PHY_RATE, 2_500);
    sim.poke(LINK_VERSION, 0x25);
    sim.poke(LINK_NODE_ID, 3);
    sim.poke(LINK_NC_NODE_ID, 1);
    sim.poke(LINK_NETWORK_STATE, 2);
    sim.poke(LINK_ACTIVE_NODES, 0b1011);
    sim
}

/// Pretend traffic went through since the last call
pub fn add_traffic(phy: &mut SimPhy, packets: u64) {
    let bus = phy.bus_mut();
    for (slot, per_packet) in [(0, 1), (1, 1_400), (5, 1), (6, 1_400)] {
        let addr = STATS_BASE + slot * 8;
        let old = (u64::from(bus.peek(addr + 4)) << 32) | u64::from(bus.peek(addr));
        bus.poke64(addr, old + packets * per_packet);
    }
}

pub fn print_status(status: &LinkStatus) {
    println!("link:          {}", status.link);
    println!("moca version:  {}", status.version);
    println!("phy rate:      {} Mbps", status.phy_rate);
    println!("node id:       {}", status.node_id);
    println!("nc node id:    {}", status.nc_node_id);
    println!("lof:           {}", status.lof);
    println!("network state: {}", status.network_state);
    println!("active nodes:  {}", status.active_nodes);
    println!("security:      {}", status.security_enabled);
}

pub fn print_stats(stats: &PhyStats) {
    println!(
        "rx {} packets / {} bytes / {} errors, tx {} packets / {} bytes / {} errors",
        stats.rx_packets,
        stats.rx_bytes,
        stats.rx_errors,
        stats.tx_packets,
        stats.tx_bytes,
        stats.tx_errors
    );
}

/// Run the poller for `seconds`, feeding traffic every second
pub fn poll_for(
    shared: &mut SharedPhy<SimBus, StdDelay>,
    seconds: u32,
    period: Duration,
) -> Result<(), Error> {
    shared.start_poller(period)?;
    for second in 1..=seconds {
        shared.with(|phy| add_traffic(phy, 100));
        std::thread::sleep(Duration::from_secs(1));
        let stats = shared.with(|phy| phy.phy_stats());
        info!("{}s: {} packets received", second, stats.rx_packets);
        print_stats(&stats);
    }
    shared.suspend();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traffic_accumulates() {
        let mut phy = Mxl371x::new(board(Chip::Leucadia, true), StdDelay);
        add_traffic(&mut phy, 10);
        add_traffic(&mut phy, 5);
        phy.update_stats().unwrap();
        assert_eq!(phy.stats().rx_packets, 15);
        assert_eq!(phy.stats().rx_bytes, 15 * 1_400);
    }
}
