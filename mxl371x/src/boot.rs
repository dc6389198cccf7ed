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

//! Firmware bring-up state machine

use embedded_hal::delay::DelayNs;

use crate::errors::Error;
use crate::registers::{
    Regs, CPU_SRC_SEL_RESET, CPU_SRC_SEL_RUN, FW_BASE_ADDR, FW_ERROR_BIT, FW_RUNNING_BIT,
    MAX_FIRMWARE_SIZE,
};
use crate::transport::{MdioBus, MemAccess};

use crate::{debug, error, info, warn};

const RESET_HOLD_MS: u32 = 100;
const RELEASE_SETTLE_MS: u32 = 500;
const READY_POLL_MS: u32 = 100;
const READY_MAX_POLLS: u32 = 50;
/// Bytes written per upload step
const UPLOAD_STEP: usize = 4096;
const PROGRESS_INTERVAL: usize = 256 * 1024;

/// Source of firmware images, keyed by file name
pub trait FirmwareStore {
    fn request(&mut self, name: &str) -> Result<&[u8], Error>;
}

/// A single image held in memory, handed out for any name
pub struct StaticFirmware<'a>(pub &'a [u8]);

impl FirmwareStore for StaticFirmware<'_> {
    fn request(&mut self, _name: &str) -> Result<&[u8], Error> {
        Ok(self.0)
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub enum FirmwareState {
    #[default]
    NotLoaded,
    Loaded,
}

/// How the firmware came to be running
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BootKind {
    /// Nothing to do, loaded by an earlier call
    AlreadyLoaded,
    /// Coprocessor was running when we looked
    Warm,
    /// Reset, upload and release
    Cold,
}

/// The stages of the bring-up
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Clone, Copy)]
pub(crate) enum BootStage {
    CheckRunning,
    Resetting,
    Uploading,
    Releasing,
    AwaitingReady,
    Running,
}

/// Progress of one bring-up
pub(crate) struct BootState<'a> {
    stage: BootStage,
    image: Option<&'a [u8]>,
    offset: usize,
    polls: u32,
    warm: bool,
}

impl Default for BootState<'_> {
    fn default() -> Self {
        Self {
            stage: BootStage::CheckRunning,
            image: None,
            offset: 0,
            polls: 0,
            warm: false,
        }
    }
}

impl<'a> BootState<'a> {
    #[cfg(test)]
    fn with_image(image: &'a [u8]) -> Result<Self, Error> {
        let mut state = Self::default();
        state.attach(image)?;
        Ok(state)
    }

    /// Supply the image; rejected before anything touches the hardware
    pub(crate) fn attach(&mut self, image: &'a [u8]) -> Result<(), Error> {
        if image.is_empty() || image.len() > MAX_FIRMWARE_SIZE {
            error!("Invalid firmware size: {}", image.len());
            return Err(Error::InvalidFirmware);
        }
        self.image = Some(image);
        Ok(())
    }

    #[cfg(test)]
    fn stage(&self) -> BootStage {
        self.stage
    }

    pub(crate) fn is_warm(&self) -> bool {
        self.warm
    }

    /// Ready-status polls done so far
    #[cfg(test)]
    fn polls(&self) -> u32 {
        self.polls
    }
}

/// Packs up to four bytes little-endian, missing bytes are zero
fn pack_word(chunk: &[u8]) -> u32 {
    let mut bytes = [0u8; 4];
    bytes[..chunk.len()].copy_from_slice(chunk);
    u32::from_le_bytes(bytes)
}

/// Advances the bring-up by one stage. Returns true once the
/// firmware runs.
pub(crate) fn step<B: MdioBus, D: DelayNs>(
    mem: &mut MemAccess<B>,
    delay: &mut D,
    state: &mut BootState,
) -> Result<bool, Error> {
    debug!("Firmware bring-up stage: {:?}", state.stage);
    match state.stage {
        BootStage::CheckRunning => {
            match mem.read32(Regs::FwStatus.into()) {
                Ok(status) if status & FW_RUNNING_BIT != 0 => {
                    info!("Firmware already running (warm boot detected)");
                    state.warm = true;
                    state.stage = BootStage::Running;
                    return Ok(true);
                }
                Ok(status) if status & FW_ERROR_BIT != 0 => {
                    warn!("Firmware in error state, will reload");
                }
                Ok(_) => {}
                Err(err) => warn!("Cannot read firmware status: {:?}", err),
            }
            state.stage = BootStage::Resetting;
        }
        BootStage::Resetting => {
            if state.image.is_none() {
                return Err(Error::InvalidState);
            }
            mem.write32(Regs::CpuSrcSel.into(), CPU_SRC_SEL_RESET)
                .inspect_err(|_| error!("Failed to reset SoC"))?;
            delay.delay_ms(RESET_HOLD_MS);
            info!("Uploading firmware...");
            state.offset = 0;
            state.stage = BootStage::Uploading;
        }
        BootStage::Uploading => {
            let image = state.image.ok_or(Error::InvalidState)?;
            let end = image.len().min(state.offset + UPLOAD_STEP);
            for chunk in image[state.offset..end].chunks(4) {
                let offset = state.offset as u32;
                mem.write32(FW_BASE_ADDR + offset, pack_word(chunk))
                    .map_err(|_| {
                        error!("Firmware write failed at offset {}", offset);
                        Error::UploadFailed { offset }
                    })?;
                state.offset += 4;
                if state.offset % PROGRESS_INTERVAL == 0 {
                    debug!("Uploaded {}%", state.offset * 100 / image.len());
                }
            }
            if end == image.len() {
                info!("Firmware upload complete ({} bytes)", image.len());
                state.stage = BootStage::Releasing;
            }
        }
        BootStage::Releasing => {
            mem.write32(Regs::CpuSrcSel.into(), CPU_SRC_SEL_RUN)
                .inspect_err(|_| error!("Failed to release SoC from reset"))?;
            info!("Waiting for firmware to start...");
            delay.delay_ms(RELEASE_SETTLE_MS);
            state.polls = 0;
            state.stage = BootStage::AwaitingReady;
        }
        BootStage::AwaitingReady => {
            delay.delay_ms(READY_POLL_MS);
            state.polls += 1;
            let status = mem
                .read32(Regs::FwStatus.into())
                .inspect_err(|_| error!("Cannot read firmware status"))?;
            if status & FW_RUNNING_BIT != 0 {
                info!("Firmware started successfully");
                state.stage = BootStage::Running;
                return Ok(true);
            }
            if status & FW_ERROR_BIT != 0 {
                error!("Firmware error detected (status: {:#x})", status);
                return Err(Error::FirmwareFault);
            }
            if state.polls >= READY_MAX_POLLS {
                error!("Firmware start timeout (status: {:#x})", status);
                return Err(Error::Timeout);
            }
        }
        BootStage::Running => return Ok(true),
    }
    Ok(false)
}

/// Steps until the firmware runs or a stage fails
pub(crate) fn run<B: MdioBus, D: DelayNs>(
    mem: &mut MemAccess<B>,
    delay: &mut D,
    state: &mut BootState,
) -> Result<(), Error> {
    while !step(mem, delay, state)? {}
    Ok(())
}
