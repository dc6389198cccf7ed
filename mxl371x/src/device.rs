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

//! The device context: transport, delay and everything decoded from
//! the coprocessor

use arrayvec::ArrayString;
use core::fmt::Write;
use embedded_hal::delay::DelayNs;
use rand_core::RngCore;

use crate::boot::{self, BootKind, BootState, FirmwareState, FirmwareStore};
use crate::errors::Error;
use crate::guid::{self, Guid, GuidSource};
use crate::interface::{self, HostInterface};
use crate::registers::{Regs, LEUCADIA_DEVICE_IDS, REVISION_ID_SHIFT};
use crate::status::{self, LinkState, LinkStatus, MocaStats, PhyStats};
use crate::thermal::{self, TemperatureSample};
use crate::transport::{MdioBus, MemAccess};

use crate::{error, info, warn};

/// MoCA SoC generation, selects the firmware image
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum SocType {
    Leucadia,
    Cardiff,
}

impl SocType {
    pub fn from_device_id(device_id: u16) -> Self {
        if LEUCADIA_DEVICE_IDS.contains(&device_id) {
            Self::Leucadia
        } else {
            Self::Cardiff
        }
    }

    pub fn firmware_name(&self) -> &'static str {
        match self {
            Self::Leucadia => "ccpu.elf.leucadia",
            Self::Cardiff => "ccpu.elf.cardiff",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Self::Leucadia => "Leucadia",
            Self::Cardiff => "Cardiff",
        }
    }
}

impl core::fmt::Display for SocType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Leucadia => "leucadia",
            Self::Cardiff => "cardiff",
        })
    }
}

/// Identity of the SoC, read once during bring-up
#[derive(Debug, PartialEq, Clone)]
pub struct DeviceInfo {
    pub product_family: u32,
    pub device_id: u16,
    pub revision_id: u16,
    pub chip: SocType,
    version: ArrayString<64>,
}

impl DeviceInfo {
    pub fn from_regs(product_family: u32, device_reg: u32) -> Result<Self, Error> {
        let device_id = device_reg as u16;
        let revision_id = (device_reg >> REVISION_ID_SHIFT) as u16;
        let chip = SocType::from_device_id(device_id);
        let mut version = ArrayString::new();
        write!(
            version,
            "{} Device {:#06x} Rev {:#06x}",
            chip.title(),
            device_id,
            revision_id
        )?;
        Ok(Self {
            product_family,
            device_id,
            revision_id,
            chip,
            version,
        })
    }

    /// e.g. `Leucadia Device 0x3710 Rev 0x0002`
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn firmware_name(&self) -> &'static str {
        self.chip.firmware_name()
    }
}

/// Platform provided settings, the device-tree equivalent
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct PlatformConfig {
    /// Pre-assigned MoCA GUID
    pub guid: Option<Guid>,
    /// Host interface mode to use instead of detecting it
    pub interface: Option<HostInterface>,
}

impl PlatformConfig {
    pub fn with_guid(mut self, guid: Guid) -> Self {
        self.guid = Some(guid);
        self
    }

    pub fn with_interface(mut self, interface: HostInterface) -> Self {
        self.interface = Some(interface);
        self
    }
}

/// Outcome of [Mxl371x::init]
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct InitReport {
    pub boot: BootKind,
    /// `None` when the GUID could not be committed
    pub guid: Option<(Guid, GuidSource)>,
    pub interface: HostInterface,
}

pub struct Mxl371x<B: MdioBus, D: DelayNs> {
    mem: MemAccess<B>,
    delay: D,
    info: Option<DeviceInfo>,
    firmware: FirmwareState,
    status: LinkStatus,
    stats: MocaStats,
    interface: Option<HostInterface>,
    // Address of the network interface we're attached to
    attached: Option<Guid>,
}

impl<B: MdioBus, D: DelayNs> Mxl371x<B, D> {
    pub fn new(bus: B, delay: D) -> Self {
        Self {
            mem: MemAccess::new(bus),
            delay,
            info: None,
            firmware: FirmwareState::NotLoaded,
            status: LinkStatus::default(),
            stats: MocaStats::default(),
            interface: None,
            attached: None,
        }
    }

    pub fn bus(&self) -> &B {
        self.mem.bus()
    }

    pub fn bus_mut(&mut self) -> &mut B {
        self.mem.bus_mut()
    }

    pub fn info(&self) -> Option<&DeviceInfo> {
        self.info.as_ref()
    }

    pub fn firmware_state(&self) -> FirmwareState {
        self.firmware
    }

    pub fn is_firmware_loaded(&self) -> bool {
        self.firmware == FirmwareState::Loaded
    }

    /// Last decoded link status, stale between refreshes
    pub fn status(&self) -> &LinkStatus {
        &self.status
    }

    /// Last decoded counters, stale between refreshes
    pub fn stats(&self) -> &MocaStats {
        &self.stats
    }

    pub fn phy_stats(&self) -> PhyStats {
        PhyStats::from(&self.stats)
    }

    pub fn host_interface(&self) -> Option<HostInterface> {
        self.interface
    }

    /// Bind to a network interface with the given address.
    /// Polling only runs while attached.
    pub fn attach(&mut self, peer_address: Guid) {
        self.attached = Some(peer_address);
    }

    pub fn detach(&mut self) {
        self.attached = None;
    }

    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    pub fn read_device_info(&mut self) -> Result<&DeviceInfo, Error> {
        let family = self.mem.read32(Regs::ProductFamilyId.into())?;
        info!("Product Family ID: {:#x}", family);
        let device = self.mem.read32(Regs::DeviceId.into())?;
        let info = DeviceInfo::from_regs(family, device)?;
        info!("{}", info.version());
        Ok(self.info.insert(info))
    }

    /// Brings the firmware up. The image is only requested from
    /// `store` when the coprocessor is not running already.
    pub fn load_firmware<S: FirmwareStore + ?Sized>(
        &mut self,
        store: &mut S,
    ) -> Result<BootKind, Error> {
        if self.is_firmware_loaded() {
            return Ok(BootKind::AlreadyLoaded);
        }
        let name = self
            .info
            .as_ref()
            .map(|i| i.firmware_name())
            .ok_or(Error::InvalidState)?;
        let mut state = BootState::default();
        if boot::step(&mut self.mem, &mut self.delay, &mut state)? {
            return Ok(self.firmware_running(&state));
        }
        info!("Loading firmware {}...", name);
        let image = store.request(name).inspect_err(|err| {
            error!("Failed to load firmware: {:?}", err);
        })?;
        self.upload(state, image)
    }

    /// Like [Self::load_firmware], with the image at hand. The image
    /// is only checked when it is going to be uploaded.
    pub fn load_firmware_image(&mut self, image: &[u8]) -> Result<BootKind, Error> {
        if self.is_firmware_loaded() {
            return Ok(BootKind::AlreadyLoaded);
        }
        let mut state = BootState::default();
        if boot::step(&mut self.mem, &mut self.delay, &mut state)? {
            return Ok(self.firmware_running(&state));
        }
        self.upload(state, image)
    }

    fn upload<'a>(
        &mut self,
        mut state: BootState<'a>,
        image: &'a [u8],
    ) -> Result<BootKind, Error> {
        state.attach(image)?;
        info!("Firmware size: {} bytes", image.len());
        boot::run(&mut self.mem, &mut self.delay, &mut state)?;
        Ok(self.firmware_running(&state))
    }

    fn firmware_running(&mut self, state: &BootState) -> BootKind {
        self.firmware = FirmwareState::Loaded;
        if state.is_warm() {
            info!("Skipping firmware load (already running)");
            BootKind::Warm
        } else {
            BootKind::Cold
        }
    }

    pub fn read_temperature_sample(&mut self) -> Result<TemperatureSample, Error> {
        thermal::sample(&mut self.mem, &mut self.delay)
    }

    /// Samples the sensor, blocks for about 60 ms
    pub fn read_temperature(&mut self) -> Result<i64, Error> {
        self.read_temperature_sample()?.temperature()
    }

    /// Refresh the counters. On failure the fields that could be read
    /// are updated anyway.
    pub fn update_stats(&mut self) -> Result<(), Error> {
        status::read_stats(&mut self.mem, &mut self.stats)
            .inspect_err(|_| warn!("Failed to update MoCA statistics"))
    }

    /// Refresh the link status, same partial semantics as
    /// [Self::update_stats]
    pub fn read_moca_status(&mut self) -> Result<(), Error> {
        status::read_link_status(&mut self.mem, &mut self.status)
            .inspect_err(|_| warn!("Failed to read MoCA status"))
    }

    /// Link state for the PHY layer: up only when the MoCA link is
    pub fn read_link(&mut self) -> bool {
        if !self.is_firmware_loaded() {
            return false;
        }
        let _ = self.read_moca_status();
        self.status.link == LinkState::Up
    }

    pub fn guid(&mut self) -> Result<Guid, Error> {
        guid::read_guid(&mut self.mem)
    }

    pub fn set_guid(&mut self, guid: Guid) -> Result<(), Error> {
        guid::write_guid(&mut self.mem, &guid)?;
        info!("MoCA GUID set to {}", guid);
        Ok(())
    }

    /// Keep the GUID in hardware, or pick one from `configured`, the
    /// attached interface address or `rng`, in that order
    pub fn resolve_guid<R: RngCore + ?Sized>(
        &mut self,
        configured: Option<Guid>,
        rng: &mut R,
    ) -> Result<(Guid, GuidSource), Error> {
        let (guid, source) = guid::resolve(&mut self.mem, configured, self.attached, rng)?;
        match source {
            GuidSource::Hardware => info!("Using existing MoCA GUID: {}", guid),
            GuidSource::Config => info!("Using configured MoCA GUID: {}", guid),
            GuidSource::Peer => info!("Using MoCA GUID derived from netdev: {}", guid),
            GuidSource::Random => info!("Generated MoCA GUID: {}", guid),
        }
        Ok((guid, source))
    }

    pub fn configure_host_interface(
        &mut self,
        hint: Option<HostInterface>,
    ) -> Result<HostInterface, Error> {
        let mode = interface::configure(&mut self.mem, hint)?;
        self.interface = Some(mode);
        Ok(mode)
    }

    /// Full bring-up: identify, load firmware, settle the GUID, read
    /// the status and configure the host interface.
    /// GUID and status problems are only logged.
    pub fn init<S, R>(
        &mut self,
        config: &PlatformConfig,
        store: &mut S,
        rng: &mut R,
    ) -> Result<InitReport, Error>
    where
        S: FirmwareStore + ?Sized,
        R: RngCore + ?Sized,
    {
        self.read_device_info()?;
        let boot = self
            .load_firmware(store)
            .inspect_err(|err| error!("Firmware loading failed: {:?}", err))?;
        let guid = self
            .resolve_guid(config.guid, rng)
            .inspect_err(|err| warn!("Failed to set MoCA GUID: {:?}", err))
            .ok();
        let _ = self.read_moca_status();
        let interface = self
            .configure_host_interface(config.interface)
            .inspect_err(|err| error!("Host interface configuration failed: {:?}", err))?;
        let version = self.status.version;
        info!(
            "MoCA PHY initialized ({} boot, MoCA v{}.{}, {}Mbps)",
            if boot == BootKind::Warm { "warm" } else { "cold" },
            version.major(),
            version.minor(),
            interface.speed_mbps()
        );
        Ok(InitReport {
            boot,
            guid,
            interface,
        })
    }

    /// One poll cycle: statistics then status, only with firmware
    /// running and an interface attached. Returns whether it ran.
    pub fn poll(&mut self) -> bool {
        if !self.is_firmware_loaded() || !self.is_attached() {
            return false;
        }
        let _ = self.update_stats();
        let _ = self.read_moca_status();
        true
    }

    /// After a resume the firmware state is unknown and has to be
    /// established again
    pub fn mark_resumed(&mut self) {
        self.firmware = FirmwareState::NotLoaded;
    }
}
