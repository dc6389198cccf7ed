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

//! Host side serial interface (SGMII family) selection

use crate::errors::Error;
use crate::registers::{SGMII_CTRL_PAGE, SGMII_CTRL_REG, SGMII_MODE_MASK};
use crate::transport::{MdioBus, MemAccess};

use crate::{info, warn};

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum HostInterface {
    /// 1000 Mb/s
    Sgmii,
    /// 2500 Mb/s
    Hsgmii,
    /// 1000 Mb/s
    Base1000X,
}

impl HostInterface {
    pub fn speed_mbps(&self) -> u32 {
        match self {
            Self::Hsgmii => 2500,
            Self::Sgmii | Self::Base1000X => 1000,
        }
    }

    pub(crate) fn mode_code(&self) -> u16 {
        match self {
            Self::Sgmii => 0x02,
            Self::Hsgmii => 0x03,
            Self::Base1000X => 0x04,
        }
    }
}

impl TryFrom<u8> for HostInterface {
    type Error = Error;
    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0x02 => Ok(Self::Sgmii),
            0x03 => Ok(Self::Hsgmii),
            0x04 => Ok(Self::Base1000X),
            _ => Err(Error::UnknownInterfaceMode(val)),
        }
    }
}

impl core::fmt::Display for HostInterface {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Sgmii => "SGMII",
            Self::Hsgmii => "HSGMII",
            Self::Base1000X => "1000BASE-X",
        })
    }
}

/// Mode the hardware is currently configured for
pub(crate) fn detect<B: MdioBus>(mem: &mut MemAccess<B>) -> Result<HostInterface, Error> {
    let val = mem.read_paged(SGMII_CTRL_PAGE, SGMII_CTRL_REG)? & SGMII_MODE_MASK;
    HostInterface::try_from(val as u8)
}

/// Uses `hint` when given, otherwise keeps what the hardware runs,
/// falling back to SGMII. The choice is always written back.
pub(crate) fn configure<B: MdioBus>(
    mem: &mut MemAccess<B>,
    hint: Option<HostInterface>,
) -> Result<HostInterface, Error> {
    let mode = match hint {
        Some(mode) => {
            info!("Using {} mode from configuration", mode);
            mode
        }
        None => match detect(mem) {
            Ok(mode) => {
                info!("Detected {} mode", mode);
                mode
            }
            Err(err) => {
                warn!("No interface mode configured and detection failed: {:?}", err);
                HostInterface::Sgmii
            }
        },
    };
    mem.modify_paged(
        SGMII_CTRL_PAGE,
        SGMII_CTRL_REG,
        SGMII_MODE_MASK,
        mode.mode_code(),
    )?;
    info!("Configured {} @ {}Mbps", mode, mode.speed_mbps());
    Ok(mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimBus;

    #[test]
    fn test_hint_overrides_hardware() {
        let mut sim = SimBus::new();
        sim.set_paged(SGMII_CTRL_PAGE, SGMII_CTRL_REG, 0x5a02);
        let mut mem = MemAccess::new(sim);
        let mode = configure(&mut mem, Some(HostInterface::Hsgmii)).unwrap();
        assert_eq!(mode, HostInterface::Hsgmii);
        assert_eq!(mem.bus().paged(SGMII_CTRL_PAGE, SGMII_CTRL_REG), 0x5a03);
        assert_eq!(mem.bus().page(), 0);
    }

    #[test]
    fn test_detected_mode_is_kept() {
        let mut sim = SimBus::new();
        sim.set_paged(SGMII_CTRL_PAGE, SGMII_CTRL_REG, 0x0004);
        let mut mem = MemAccess::new(sim);
        assert_eq!(configure(&mut mem, None), Ok(HostInterface::Base1000X));
        assert_eq!(mem.bus().paged(SGMII_CTRL_PAGE, SGMII_CTRL_REG), 0x0004);
    }

    #[test]
    fn test_unknown_mode_defaults_to_sgmii() {
        let mut sim = SimBus::new();
        sim.set_paged(SGMII_CTRL_PAGE, SGMII_CTRL_REG, 0x0177);
        let mut mem = MemAccess::new(sim);
        assert_eq!(detect(&mut mem), Err(Error::UnknownInterfaceMode(0x77)));
        assert_eq!(configure(&mut mem, None), Ok(HostInterface::Sgmii));
        assert_eq!(mem.bus().paged(SGMII_CTRL_PAGE, SGMII_CTRL_REG), 0x0102);
        assert_eq!(HostInterface::Sgmii.speed_mbps(), 1000);
    }

    #[test]
    fn test_mode_register_is_not_the_memory_window() {
        let mut sim = SimBus::new();
        sim.poke(0x0c10_0000, 0x1234_5678);
        sim.set_paged(SGMII_CTRL_PAGE, SGMII_CTRL_REG, 0x0002);
        let mut mem = MemAccess::new(sim);
        assert_eq!(mem.read32(0x0c10_0000), Ok(0x1234_5678));
        assert_eq!(configure(&mut mem, Some(HostInterface::Hsgmii)), Ok(HostInterface::Hsgmii));
        assert_eq!(mem.bus().paged(SGMII_CTRL_PAGE, SGMII_CTRL_REG), 0x0003);
        assert_eq!(mem.bus().peek(0x0c10_0000), 0x1234_5678);
        assert_eq!(mem.bus().writes_in(0..u32::MAX), 0);
        assert_eq!(mem.read32(0x0c10_0000), Ok(0x1234_5678));
    }

    #[test]
    fn test_write_failure_is_fatal() {
        let mut sim = SimBus::new();
        sim.set_fail_all(true);
        let mut mem = MemAccess::new(sim);
        assert_eq!(
            configure(&mut mem, Some(HostInterface::Sgmii)),
            Err(Error::BusError)
        );
    }
}
