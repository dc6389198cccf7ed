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

use arrayvec::CapacityError;

use crate::status::ReadReport;

/// Errors reported by the control core
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Error {
    /// A 16-bit MDIO transfer failed
    BusError,
    /// Temperature samples are inconsistent (t1 < t0)
    InvalidSample,
    /// Firmware image is empty or larger than the coprocessor memory
    InvalidFirmware,
    /// Bus failure while writing the image, at this byte offset.
    /// The coprocessor has to be reset before retrying.
    UploadFailed { offset: u32 },
    /// Coprocessor raised its firmware error bit
    FirmwareFault,
    /// Firmware never reported running
    Timeout,
    /// One or more reads of a batch failed, the rest were applied
    AggregateReadFailure(ReadReport),
    /// The firmware store could not supply the image
    FirmwareRequest,
    /// GUID is all-zero
    InvalidGuid,
    /// GUID text is not six colon separated hex octets
    GuidParse,
    /// Operation not valid in the current state
    InvalidState,
    /// Host interface register holds an unknown mode code
    UnknownInterfaceMode(u8),
    /// Version string did not fit
    StrCapacity,
    /// The background poller could not be started
    PollerStart,
}

impl<T> From<CapacityError<T>> for Error {
    fn from(_: CapacityError<T>) -> Self {
        Self::StrCapacity
    }
}

impl From<core::fmt::Error> for Error {
    fn from(_: core::fmt::Error) -> Self {
        Self::StrCapacity
    }
}

impl From<ReadReport> for Error {
    fn from(v: ReadReport) -> Self {
        Self::AggregateReadFailure(v)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BusError => f.write_str("MDIO bus transfer failed"),
            Self::InvalidSample => f.write_str("inconsistent temperature samples"),
            Self::InvalidFirmware => f.write_str("invalid firmware image size"),
            Self::UploadFailed { offset } => {
                write!(f, "firmware write failed at offset {}", offset)
            }
            Self::FirmwareFault => f.write_str("firmware reported an error"),
            Self::Timeout => f.write_str("firmware start timeout"),
            Self::AggregateReadFailure(report) => {
                write!(
                    f,
                    "{} of the {} reads failed",
                    report.failed_count(),
                    report.batch()
                )
            }
            Self::FirmwareRequest => f.write_str("firmware image not available"),
            Self::InvalidGuid => f.write_str("GUID must not be all-zero"),
            Self::GuidParse => f.write_str("malformed GUID"),
            Self::InvalidState => f.write_str("invalid state"),
            Self::UnknownInterfaceMode(mode) => {
                write!(f, "unknown host interface mode {:#04x}", mode)
            }
            Self::StrCapacity => f.write_str("string capacity exceeded"),
            Self::PollerStart => f.write_str("cannot start the poller"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
