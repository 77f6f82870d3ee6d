//! Background refresh
//!
//! A dedicated thread waits on a command channel; the receive timeout is
//! the refresh timer, so any command cancels the pending tick. After each
//! pass, successful or not, the next tick is scheduled one interval out.

use crate::reader::TelemetryReader;
use fuelgauge_config::PollerConfig;
use fuelgauge_hal::RegisterTransport;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Poller lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// Waiting for the next tick
    Idle,
    /// A refresh pass is running
    Refreshing,
    /// Timer cancelled until resume
    Suspended,
    /// Worker has exited
    Stopped,
}

#[derive(Debug, Clone, Copy)]
enum Command {
    Wake,
    Suspend,
    Resume,
    Shutdown,
}

struct Shared {
    state: Mutex<PollerState>,
    passes: AtomicU64,
}

impl Shared {
    fn set(&self, state: PollerState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    fn get(&self) -> PollerState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Periodic driver for a [`TelemetryReader`]
pub struct Poller {
    tx: Sender<Command>,
    handle: Option<JoinHandle<()>>,
    shared: Arc<Shared>,
}

impl Poller {
    /// Spawn the worker; the first tick fires one interval from now
    pub fn start<T>(reader: Arc<TelemetryReader<T>>, config: &PollerConfig) -> std::io::Result<Self>
    where
        T: RegisterTransport + 'static,
    {
        let (tx, rx) = channel();
        let shared = Arc::new(Shared {
            state: Mutex::new(PollerState::Idle),
            passes: AtomicU64::new(0),
        });

        let worker = Worker {
            reader,
            rx,
            shared: Arc::clone(&shared),
            interval: config.interval(),
            resume_delay: config.resume_delay(),
        };
        let handle = thread::Builder::new()
            .name("fuelgauge-poller".into())
            .spawn(move || worker.run())?;

        tracing::info!(
            "Telemetry poller started (interval {:?}, resume delay {:?})",
            config.interval(),
            config.resume_delay()
        );

        Ok(Self {
            tx,
            handle: Some(handle),
            shared,
        })
    }

    pub fn state(&self) -> PollerState {
        self.shared.get()
    }

    /// Completed passes, failed ones included
    pub fn passes(&self) -> u64 {
        self.shared.passes.load(Ordering::Acquire)
    }

    /// Run a pass now
    pub fn wake(&self) {
        self.send(Command::Wake);
    }

    /// Cancel the pending tick until [`Poller::resume`]
    pub fn suspend(&self) {
        self.send(Command::Suspend);
    }

    /// Reschedule a forced pass after the resume delay
    pub fn resume(&self) {
        self.send(Command::Resume);
    }

    /// Cancel the timer, wait for any running pass and join the worker
    pub fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.send(Command::Shutdown);
        if handle.join().is_err() {
            tracing::error!("Telemetry poller thread panicked");
        }
        self.shared.set(PollerState::Stopped);
        tracing::info!("Telemetry poller stopped");
    }

    fn send(&self, command: Command) {
        if self.tx.send(command).is_err() {
            tracing::debug!("Poller already stopped, dropping {:?}", command);
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker<T> {
    reader: Arc<TelemetryReader<T>>,
    rx: Receiver<Command>,
    shared: Arc<Shared>,
    interval: Duration,
    resume_delay: Duration,
}

impl<T: RegisterTransport> Worker<T> {
    fn run(self) {
        let mut delay = Some(self.interval);
        let mut force = false;

        loop {
            let command = match delay {
                Some(timeout) => match self.rx.recv_timeout(timeout) {
                    Ok(command) => Some(command),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => Some(Command::Shutdown),
                },
                None => Some(self.rx.recv().unwrap_or(Command::Shutdown)),
            };

            match command {
                // Tick
                None | Some(Command::Wake) => {
                    self.pass(force);
                    force = false;
                    if delay.is_some() {
                        delay = Some(self.interval);
                    }
                }
                Some(Command::Suspend) => {
                    tracing::debug!("Poller suspended");
                    delay = None;
                    self.shared.set(PollerState::Suspended);
                }
                Some(Command::Resume) => {
                    tracing::debug!("Poller resumed, refreshing in {:?}", self.resume_delay);
                    // The monotonic clock may not have advanced across the
                    // suspend, so the cache cannot be trusted
                    force = true;
                    delay = Some(self.resume_delay);
                    self.shared.set(PollerState::Idle);
                }
                Some(Command::Shutdown) => break,
            }
        }

        self.shared.set(PollerState::Stopped);
    }

    fn pass(&self, force: bool) {
        let resting = self.shared.get();
        self.shared.set(PollerState::Refreshing);

        match self.reader.refresh(force) {
            Ok(outcome) => tracing::debug!("Background refresh: {:?}", outcome),
            Err(e) => tracing::warn!("Background refresh failed: {}", e),
        }

        self.shared.set(resting);
        self.shared.passes.fetch_add(1, Ordering::Release);
    }
}
