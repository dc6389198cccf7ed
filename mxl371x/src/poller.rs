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

//! Background refresh of statistics and link status

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::device::Mxl371x;
use crate::errors::Error;
use crate::transport::MdioBus;
use crate::{debug, error, warn};

pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(1);

/// Handle to a running poll task. Dropping it cancels the task.
///
/// The poller brings its own runtime, so neither [Poller::cancel] nor
/// drop may happen inside an async context.
pub struct Poller {
    runtime: Runtime,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Poller {
    /// Spawn the poll task. The first tick happens one `period` after
    /// the start.
    pub fn start<B, D>(
        device: Arc<Mutex<Mxl371x<B, D>>>,
        period: Duration,
    ) -> Result<Self, Error>
    where
        B: MdioBus + Send + 'static,
        D: DelayNs + Send + 'static,
    {
        if period.is_zero() {
            return Err(Error::InvalidState);
        }
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("mxl371x-poll")
            .enable_time()
            .build()
            .map_err(|err| {
                error!("Cannot create poller runtime: {}", err);
                Error::PollerStart
            })?;
        let cancel = CancellationToken::new();
        let task = runtime.spawn(poll_task(device, period, cancel.clone()));
        debug!("Poller started, period {} ms", period.as_millis() as u64);
        Ok(Self {
            runtime,
            cancel,
            task: Some(task),
        })
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the task and wait for an in-flight tick to finish.
    /// Must not be called while holding the device lock.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = self.runtime.block_on(task) {
                warn!("Poller task failed: {}", err);
            }
            debug!("Poller stopped");
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn poll_task<B, D>(
    device: Arc<Mutex<Mxl371x<B, D>>>,
    period: Duration,
    cancel: CancellationToken,
) where
    B: MdioBus + Send + 'static,
    D: DelayNs + Send + 'static,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let device = Arc::clone(&device);
                let tick = tokio::task::spawn_blocking(move || {
                    device.lock().unwrap_or_else(PoisonError::into_inner).poll();
                });
                if let Err(err) = tick.await {
                    warn!("Poll tick failed: {}", err);
                }
            }
        }
    }
}
