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

//! Two-sample differential temperature sensor

use embedded_hal::delay::DelayNs;

use crate::errors::Error;
use crate::registers::Regs;
use crate::transport::{MdioBus, MemAccess};

const TSENS_COEFF_A: i64 = 1_338_680;
const TSENS_COEFF_B: i64 = 277_770;
const TSENS_RSSI_MAX: i64 = 524_288;

/// Conversion settles within 30-40 ms; wait for the lower bound,
/// scheduler jitter only makes it longer
const TSENS_SETTLE_US: u32 = 30_000;

const RADIO_TSENS1_CONF: u32 = 0x3100_0001;
const RADIO_TSENS2_FIRST_INPUT: u32 = 0x0000_0401;
const RADIO_TSENS2_SECOND_INPUT: u32 = 0x0000_0411;
const RADIO_TSENS3_CONF: u32 = 0x0000_0001;
const TSENS_CTRL_START: u32 = 0x0113_0103;
const TSENS_CTRL_IDLE: u32 = 0x0113_0003;

/// Raw sensor readings of one measurement
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct TemperatureSample {
    pub t0: u32,
    pub t1: u32,
}

impl TemperatureSample {
    /// Calibrated temperature, in the units of the hwmon export
    pub fn temperature(&self) -> Result<i64, Error> {
        if self.t1 < self.t0 {
            return Err(Error::InvalidSample);
        }
        let delta = i64::from(self.t1 - self.t0);
        Ok(delta * TSENS_COEFF_A / TSENS_RSSI_MAX - TSENS_COEFF_B)
    }
}

/// Runs the sensor register sequence. Order matters, any failed
/// access aborts the whole sample.
pub(crate) fn sample<B: MdioBus, D: DelayNs>(
    mem: &mut MemAccess<B>,
    delay: &mut D,
) -> Result<TemperatureSample, Error> {
    mem.write32(Regs::RadioTsens1.into(), RADIO_TSENS1_CONF)?;
    mem.write32(Regs::RadioTsens2.into(), RADIO_TSENS2_FIRST_INPUT)?;
    mem.write32(Regs::RadioTsens3.into(), RADIO_TSENS3_CONF)?;
    mem.write32(Regs::TsensCtrl.into(), TSENS_CTRL_START)?;
    delay.delay_us(TSENS_SETTLE_US);
    let t0 = mem.read32(Regs::TsensData.into())?;

    mem.write32(Regs::TsensCtrl.into(), TSENS_CTRL_IDLE)?;
    mem.write32(Regs::RadioTsens2.into(), RADIO_TSENS2_SECOND_INPUT)?;
    mem.write32(Regs::TsensCtrl.into(), TSENS_CTRL_IDLE)?;
    mem.write32(Regs::TsensCtrl.into(), TSENS_CTRL_START)?;
    delay.delay_us(TSENS_SETTLE_US);
    let t1 = mem.read32(Regs::TsensData.into())?;

    Ok(TemperatureSample { t0, t1 })
}
