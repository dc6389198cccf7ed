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

//! MaxLinear MXL371x MoCA PHY driver core
//!
//! The PHY is a MoCA SoC with its own coprocessor. Everything goes
//! through 32-bit indirect accesses tunneled over clause 22 MDIO
//! registers, see [transport].
//!
//! The main entry point is [Mxl371x]. With the `std` feature,
//! [SharedPhy] wraps it for use from several threads and runs the
//! periodic statistics poller.
//!
//! Basic usage:
//! ```no_run
//! # use mxl371x::{Mxl371x, PlatformConfig, StaticFirmware};
//! # use mxl371x::sim::{SimBus, SimDelay};
//! # let image = [0u8; 4];
//! # struct Rng;
//! # impl rand_core::RngCore for Rng {
//! #     fn next_u32(&mut self) -> u32 { 4 }
//! #     fn next_u64(&mut self) -> u64 { 4 }
//! #     fn fill_bytes(&mut self, dst: &mut [u8]) { dst.fill(4) }
//! # }
//! # let mut rng = Rng;
//! // bus: something that implements MdioBus
//! // delay: embedded_hal::delay::DelayNs
//! // rng: rand_core::RngCore, used when no GUID is known
//! let mut phy = Mxl371x::new(SimBus::new(), SimDelay::new());
//! let report = phy.init(
//!     &PlatformConfig::default(),
//!     &mut StaticFirmware(&image),
//!     &mut rng,
//! );
//! let up = phy.read_link();
//! ```
#![no_std]

#[cfg(any(test, feature = "std"))]
extern crate std;

#[cfg(all(feature = "defmt", feature = "log"))]
compile_error!("Features 'defmt' and 'log' are mutually exclusive");

#[cfg(feature = "defmt")]
#[allow(unused_imports)]
pub(crate) use defmt::{debug, error, info, trace, warn};
#[cfg(not(feature = "defmt"))]
#[allow(unused_imports)]
pub(crate) use log::{debug, error, info, trace, warn};

pub mod boot;
pub mod errors;
pub mod guid;
pub mod interface;
mod registers;
pub mod status;
pub mod thermal;
pub mod transport;

mod device;

#[cfg(any(test, feature = "std"))]
pub mod sim;

#[cfg(feature = "std")]
pub mod poller;
#[cfg(feature = "std")]
mod shared;

pub use boot::{BootKind, FirmwareState, FirmwareStore, StaticFirmware};
pub use device::{DeviceInfo, InitReport, Mxl371x, PlatformConfig, SocType};
pub use errors::Error;
pub use guid::{Guid, GuidSource};
pub use interface::HostInterface;
pub use registers::MAX_FIRMWARE_SIZE;
pub use status::{
    Batch, LinkState, LinkStatus, MocaStats, MocaVersion, NetworkState, PhyStats, ReadReport,
};
pub use thermal::TemperatureSample;
pub use transport::{MdioBus, MemAccess};

#[cfg(feature = "std")]
pub use shared::{SharedPhy, StdDelay};
