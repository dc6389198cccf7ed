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

//! End to end bring-up against the simulated PHY

use std::thread;
use std::time::Duration;

use mxl371x::sim::{SimBus, SimDelay};
use mxl371x::{
    BootKind, Error, FirmwareStore, Guid, GuidSource, HostInterface, LinkState, Mxl371x,
    PlatformConfig, SharedPhy, StaticFirmware,
};
use rand_core::RngCore;

const GUID_HI: u32 = 0x0c10_0020;
const GUID_LO: u32 = 0x0c10_0024;
const LINK_STATUS: u32 = 0x0c10_0000;
const LINK_VERSION: u32 = 0x0c10_0008;
const STATS_RX_PACKETS: u32 = 0x0c00_0028;
const STATS_TX_DROPPED: u32 = 0x0c00_0010;
const SGMII_PAGE: u16 = 0xa000;
const SGMII_REG: u16 = 0x10;

#[derive(Default)]
struct CountingRng {
    calls: u32,
}

impl RngCore for CountingRng {
    fn next_u32(&mut self) -> u32 {
        self.calls += 1;
        0x5a5a_5a5a
    }
    fn next_u64(&mut self) -> u64 {
        self.calls += 1;
        0x5a5a_5a5a_5a5a_5a5a
    }
    fn fill_bytes(&mut self, dst: &mut [u8]) {
        self.calls += 1;
        dst.fill(0x5a);
    }
}

/// Records which image names were asked for
struct Images<'a> {
    image: &'a [u8],
    requested: Vec<String>,
}

impl FirmwareStore for Images<'_> {
    fn request(&mut self, name: &str) -> Result<&[u8], Error> {
        self.requested.push(name.to_string());
        Ok(self.image)
    }
}

fn leucadia(sim: SimBus) -> SimBus {
    sim.with_device(0x0037_0000, 0x3710, 0x0002)
}

#[test_log::test]
fn cold_boot_bring_up() {
    let mut sim = leucadia(SimBus::new());
    sim.set_paged(SGMII_PAGE, SGMII_REG, 0x03);
    sim.poke(LINK_VERSION, 0x25);
    let clock = SimDelay::new();
    let mut phy = Mxl371x::new(sim, clock.clone());

    let image = vec![0xa5u8; 10_000];
    let mut store = Images {
        image: &image,
        requested: Vec::new(),
    };
    let mut rng = CountingRng::default();
    let report = phy
        .init(&PlatformConfig::default(), &mut store, &mut rng)
        .unwrap();

    assert_eq!(store.requested, ["ccpu.elf.leucadia"]);
    assert_eq!(report.boot, BootKind::Cold);
    assert_eq!(report.interface, HostInterface::Hsgmii);
    let (guid, source) = report.guid.unwrap();
    assert_eq!(source, GuidSource::Random);
    assert_eq!(guid, Guid::new([0x02, 0x24, 0x3e, 0x5a, 0x5a, 0x5a]));
    assert_eq!(rng.calls, 1);
    assert_eq!(phy.bus().peek(GUID_HI), 0x0224_3e5a);
    assert_eq!(phy.bus().peek(GUID_LO), 0x5a5a_0000);
    assert_eq!(phy.status().version.to_string(), "2.5");
    assert_eq!(
        phy.info().unwrap().version(),
        "Leucadia Device 0x3710 Rev 0x0002"
    );
    // reset hold, release settle, one ready poll
    assert_eq!(clock.elapsed_ms(), 700);
    // last image word, zero padded
    assert_eq!(phy.bus().peek(9_996), 0xa5a5_a5a5);
    assert_eq!(phy.bus().peek(10_000), 0);

    let ops = phy.bus().ops();
    assert_eq!(phy.load_firmware(&mut store), Ok(BootKind::AlreadyLoaded));
    assert_eq!(store.requested.len(), 1);
    assert_eq!(phy.bus().ops(), ops);
}

#[test_log::test]
fn warm_boot_keeps_hardware_guid() {
    let mut sim = leucadia(SimBus::warm());
    sim.poke(GUID_HI, 0x0011_2233);
    sim.poke(GUID_LO, 0x4455_0000);
    let mut phy = Mxl371x::new(sim, SimDelay::new());

    let mut store = Images {
        image: &[],
        requested: Vec::new(),
    };
    let mut rng = CountingRng::default();
    let config = PlatformConfig::default()
        .with_guid(Guid::new([2, 0, 0, 0, 0, 1]))
        .with_interface(HostInterface::Base1000X);
    let report = phy.init(&config, &mut store, &mut rng).unwrap();

    assert_eq!(report.boot, BootKind::Warm);
    assert!(store.requested.is_empty());
    assert_eq!(
        report.guid,
        Some((
            Guid::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]),
            GuidSource::Hardware
        ))
    );
    assert_eq!(rng.calls, 0);
    assert_eq!(report.interface, HostInterface::Base1000X);
    assert_eq!(phy.bus().paged(SGMII_PAGE, SGMII_REG) & 0xff, 0x04);
    assert_eq!(phy.bus().page(), 0);
}

#[test_log::test]
fn guid_failure_does_not_stop_init() {
    let mut sim = leucadia(SimBus::warm());
    sim.fail_writes_to(GUID_HI);
    let mut phy = Mxl371x::new(sim, SimDelay::new());
    phy.attach(Guid::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]));
    let report = phy
        .init(
            &PlatformConfig::default(),
            &mut StaticFirmware(&[1, 2, 3, 4]),
            &mut CountingRng::default(),
        )
        .unwrap();
    assert_eq!(report.guid, None);
    assert_eq!(report.interface, HostInterface::Sgmii);

    phy.bus_mut().clear_faults();
    let (guid, source) = phy
        .resolve_guid(None, &mut CountingRng::default())
        .unwrap();
    assert_eq!(source, GuidSource::Peer);
    assert_eq!(guid, Guid::new([0x02, 0x11, 0x22, 0x33, 0x44, 0x54]));
}

#[test_log::test]
fn missing_device_is_fatal() {
    let mut sim = SimBus::new();
    sim.set_fail_all(true);
    let mut phy = Mxl371x::new(sim, SimDelay::new());
    let result = phy.init(
        &PlatformConfig::default(),
        &mut StaticFirmware(&[1, 2, 3, 4]),
        &mut CountingRng::default(),
    );
    assert_eq!(result, Err(Error::BusError));
    assert!(!phy.read_link());
}

#[test_log::test]
fn poller_refreshes_until_suspended() {
    let mut sim = leucadia(SimBus::warm());
    let ops = sim.op_counter();
    sim.poke(LINK_STATUS, 1);
    sim.poke64(STATS_RX_PACKETS, 1234);
    sim.poke64(STATS_TX_DROPPED, 7);
    let mut phy = Mxl371x::new(sim, SimDelay::new());
    phy.init(
        &PlatformConfig::default(),
        &mut StaticFirmware(&[1, 2, 3, 4]),
        &mut CountingRng::default(),
    )
    .unwrap();
    phy.attach(Guid::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]));

    let mut shared = SharedPhy::new(phy);
    shared.start_poller(Duration::from_millis(5)).unwrap();
    thread::sleep(Duration::from_millis(100));
    shared.suspend();

    let quiet = ops.load(std::sync::atomic::Ordering::SeqCst);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(ops.load(std::sync::atomic::Ordering::SeqCst), quiet);

    let stats = shared.with(|phy| phy.phy_stats());
    assert_eq!(stats.rx_packets, 1234);
    assert_eq!(stats.tx_errors, 7);
    assert_eq!(shared.lock().status().link, LinkState::Up);

    shared.resume().unwrap();
    assert!(!shared.lock().is_firmware_loaded());
    let phy = shared.remove().unwrap();
    assert!(!phy.is_firmware_loaded());
}
