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

//! Thread-safe device handle with the poller lifecycle

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use embedded_hal::delay::DelayNs;

use crate::device::Mxl371x;
use crate::errors::Error;
use crate::poller::{Poller, DEFAULT_POLL_PERIOD};
use crate::transport::MdioBus;
use crate::info;

/// Blocking delay on the host
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

/// A device shared between callers and the poller. Every operation
/// takes the lock for its whole duration.
pub struct SharedPhy<B: MdioBus, D: DelayNs> {
    device: Arc<Mutex<Mxl371x<B, D>>>,
    poller: Option<Poller>,
    period: Duration,
}

impl<B, D> SharedPhy<B, D>
where
    B: MdioBus + Send + 'static,
    D: DelayNs + Send + 'static,
{
    pub fn new(device: Mxl371x<B, D>) -> Self {
        Self {
            device: Arc::new(Mutex::new(device)),
            poller: None,
            period: DEFAULT_POLL_PERIOD,
        }
    }

    /// Exclusive access to the device. Don't hold the guard across
    /// calls that stop the poller.
    pub fn lock(&self) -> MutexGuard<'_, Mxl371x<B, D>> {
        self.device.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` under the device lock
    pub fn with<T>(&self, f: impl FnOnce(&mut Mxl371x<B, D>) -> T) -> T {
        f(&mut self.lock())
    }

    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(Poller::is_running)
    }

    /// (Re)start the poller with the given period
    pub fn start_poller(&mut self, period: Duration) -> Result<(), Error> {
        self.stop_poller();
        self.poller = Some(Poller::start(self.device.clone(), period)?);
        self.period = period;
        Ok(())
    }

    fn stop_poller(&mut self) {
        if let Some(mut poller) = self.poller.take() {
            poller.cancel();
        }
    }

    /// Stops polling. No bus access from the poller after this returns.
    pub fn suspend(&mut self) {
        self.stop_poller();
        info!("MoCA PHY suspended");
    }

    /// The firmware may have been lost, the next load re-checks it
    pub fn resume(&mut self) -> Result<(), Error> {
        self.lock().mark_resumed();
        self.start_poller(self.period)?;
        info!("MoCA PHY resumed");
        Ok(())
    }

    /// Stops polling and hands the device back
    pub fn remove(self) -> Option<Mxl371x<B, D>> {
        let Self { device, poller, .. } = self;
        drop(poller);
        info!("MoCA PHY removed");
        Arc::into_inner(device).map(|m| m.into_inner().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boot::FirmwareState;
    use crate::guid::Guid;
    use crate::sim::{SimBus, SimDelay};
    use std::sync::atomic::Ordering;

    fn attached() -> (SharedPhy<SimBus, SimDelay>, Arc<std::sync::atomic::AtomicUsize>) {
        let sim = SimBus::warm();
        let ops = sim.op_counter();
        let mut dev = Mxl371x::new(sim, SimDelay::new());
        dev.load_firmware_image(&[0; 4]).unwrap();
        dev.attach(Guid::new([0, 1, 2, 3, 4, 5]));
        (SharedPhy::new(dev), ops)
    }

    #[test]
    fn test_suspend_resume() {
        let (mut phy, ops) = attached();
        phy.start_poller(Duration::from_millis(5)).unwrap();
        assert!(phy.is_polling());
        phy.suspend();
        assert!(!phy.is_polling());
        let quiet = ops.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(ops.load(Ordering::SeqCst), quiet);

        phy.resume().unwrap();
        assert!(phy.is_polling());
        assert_eq!(phy.lock().firmware_state(), FirmwareState::NotLoaded);
        // Not loaded, so ticks stay off the bus
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(ops.load(Ordering::SeqCst), quiet);
    }

    #[test]
    fn test_remove_returns_device() {
        let (mut phy, ops) = attached();
        phy.start_poller(Duration::from_millis(5)).unwrap();
        let dev = phy.remove().unwrap();
        let after = ops.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(ops.load(Ordering::SeqCst), after);
        assert!(dev.is_firmware_loaded());
    }
}
