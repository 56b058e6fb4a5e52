//! Drains captured key events into the engine.
//!
//! Each event is applied under one engine lock acquisition. The capture
//! side only ever `try_send`s into the channel, so a slow intake can cost
//! dropped keystrokes but never a blocked capture hook.

use crate::collector::types::KeyEvent;
use crate::core::SharedEngine;
use crate::stats::SharedStreamStats;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct Intake {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Intake {
    pub fn spawn(
        receiver: Receiver<KeyEvent>,
        engine: SharedEngine,
        stats: SharedStreamStats,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();

        let handle = thread::spawn(move || {
            while r.load(Ordering::SeqCst) {
                match receiver.recv_timeout(POLL_INTERVAL) {
                    Ok(event) => {
                        stats.record_keystroke();
                        if engine.with(|engine| engine.apply(&event)).is_some() {
                            stats.record_word();
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => {
                        tracing::info!("Key event source disconnected");
                        break;
                    }
                }
            }

            // Count a word left in the buffer when intake ends
            if engine.with(|engine| engine.flush_word(Instant::now())).is_some() {
                stats.record_word();
            }
            tracing::debug!("Intake stopped");
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Ask the intake thread to stop after its current poll.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Wait for the thread to exit on its own (source disconnected).
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Stop and wait for the thread to exit.
    pub fn shutdown(self) {
        self.stop();
        self.join();
    }
}

impl Drop for Intake {
    fn drop(&mut self) {
        self.stop();
    }
}
