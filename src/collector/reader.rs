//! Collector that reads keystrokes from a byte stream.
//!
//! The capture hook itself lives outside this crate and feeds any `Read`
//! (stdin by default) in one of two [`InputFormat`]s:
//!
//! - `Keys`: raw UTF-8 keystrokes. Each character is stamped when it is
//!   decoded, so the source must deliver keys as they are typed (a tty in
//!   raw mode). Ctrl+C and Ctrl+D end the input, since raw mode turns them
//!   into plain bytes.
//! - `Records`: one JSON object per line, `{"key": "a", "t": 12.034}`, where
//!   `t` is the hook's own clock in seconds. Buffered pipes stay accurate
//!   because timing comes from the record, not from arrival.
//!
//! Events go out on a bounded channel without ever blocking the reading
//! thread on the consumer.

use crate::collector::types::{KeyEvent, KeyInput};
use crate::config::InputFormat;
use crossbeam_channel::{bounded, Receiver, Sender};
use serde::Deserialize;
use std::io::{BufRead, BufReader, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Events buffered between the reader thread and the intake.
const CHANNEL_CAPACITY: usize = 10_000;

/// Ctrl+C and Ctrl+D as delivered by a raw-mode terminal.
const INTERRUPT: char = '\u{3}';
const END_OF_TRANSMISSION: char = '\u{4}';

/// Errors that can occur during event collection.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Collector is already running")]
    AlreadyRunning,

    #[error("Collector source has already been consumed")]
    SourceConsumed,
}

/// Reads keystrokes from `R` on a background thread.
pub struct ReaderCollector<R> {
    source: Option<R>,
    format: InputFormat,
    sender: Sender<KeyEvent>,
    receiver: Receiver<KeyEvent>,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl<R: Read + Send + 'static> ReaderCollector<R> {
    /// Collector for raw keystrokes.
    pub fn new(source: R) -> Self {
        Self::with_format(source, InputFormat::Keys)
    }

    pub fn with_format(source: R, format: InputFormat) -> Self {
        let (sender, receiver) = bounded(CHANNEL_CAPACITY);
        Self {
            source: Some(source),
            format,
            sender,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }

    /// Start reading in a background thread.
    pub fn start(&mut self) -> Result<(), CollectorError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }
        let source = self.source.take().ok_or(CollectorError::SourceConsumed)?;

        self.running.store(true, Ordering::SeqCst);

        let sender = self.sender.clone();
        let running = self.running.clone();
        let format = self.format;

        let handle = thread::spawn(move || {
            match format {
                InputFormat::Keys => read_keys(source, &sender, &running),
                InputFormat::Records => read_records(source, &sender, &running),
            }
            running.store(false, Ordering::SeqCst);
            tracing::debug!("Collector source exhausted");
        });

        self.thread_handle = Some(handle);
        Ok(())
    }

    /// Stop forwarding events.
    ///
    /// A read already blocked on the source is not interrupted; the thread
    /// exits after that read returns.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            if handle.is_finished() {
                let _ = handle.join();
            }
        }
    }

    /// False once the source is exhausted, interrupted, or stopped.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the receiver for key events.
    pub fn receiver(&self) -> &Receiver<KeyEvent> {
        &self.receiver
    }
}

fn read_keys<R: Read>(mut source: R, sender: &Sender<KeyEvent>, running: &AtomicBool) {
    let mut buf = [0u8; 1024];
    let mut pending = Vec::new();

    while running.load(Ordering::SeqCst) {
        let n = match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!("Collector read failed: {}", e);
                break;
            }
        };

        pending.extend_from_slice(&buf[..n]);
        for ch in decode_utf8(&mut pending).chars() {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            if ch == INTERRUPT || ch == END_OF_TRANSMISSION {
                tracing::info!("End of input requested from the terminal");
                return;
            }
            if let Some(input) = KeyInput::classify(ch) {
                // Don't block if the channel is full - just drop the event
                let _ = sender.try_send(KeyEvent::new(input));
            }
        }
    }
}

fn read_records<R: Read>(source: R, sender: &Sender<KeyEvent>, running: &AtomicBool) {
    let mut clock = RecordClock::default();

    for line in BufReader::new(source).lines() {
        if !running.load(Ordering::SeqCst) {
            return;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Collector read failed: {}", e);
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let record: KeyRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Skipping malformed key record {:?}: {}", line, e);
                continue;
            }
        };
        let Some(input) = record.input() else {
            tracing::debug!("Ignoring key {:?}", record.key);
            continue;
        };

        let event = KeyEvent::at(input, clock.instant_for(record.t));
        let _ = sender.try_send(event);
    }
}

/// One line of the `Records` format.
#[derive(Debug, Deserialize)]
struct KeyRecord {
    key: String,
    /// Seconds on the hook's clock; only differences matter
    t: f64,
}

impl KeyRecord {
    fn input(&self) -> Option<KeyInput> {
        match self.key.as_str() {
            "backspace" => Some(KeyInput::Backspace),
            "space" | "enter" | "return" | "tab" => Some(KeyInput::Boundary),
            key => {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => KeyInput::classify(ch),
                    _ => None,
                }
            }
        }
    }
}

/// Maps hook timestamps onto `Instant`s, anchored at the first record.
#[derive(Debug, Default)]
struct RecordClock {
    origin: Option<(f64, Instant)>,
    last: Option<Instant>,
}

impl RecordClock {
    /// Never goes backwards, even if the hook's clock does.
    fn instant_for(&mut self, t: f64) -> Instant {
        let (origin_t, origin) = *self.origin.get_or_insert_with(|| (t, Instant::now()));
        let offset = Duration::try_from_secs_f64(t - origin_t).unwrap_or(Duration::ZERO);
        let at = match self.last {
            Some(last) => (origin + offset).max(last),
            None => origin + offset,
        };
        self.last = Some(at);
        at
    }
}

/// Decode as much of `pending` as forms complete UTF-8, leaving a trailing
/// partial sequence in place. Invalid bytes are skipped.
fn decode_utf8(pending: &mut Vec<u8>) -> String {
    let mut out = String::new();
    loop {
        match std::str::from_utf8(pending) {
            Ok(s) => {
                out.push_str(s);
                pending.clear();
                return out;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                // valid_up_to guarantees this prefix is UTF-8
                out.push_str(&String::from_utf8_lossy(&pending[..valid]));
                match e.error_len() {
                    Some(bad) => {
                        pending.drain(..valid + bad);
                    }
                    None => {
                        pending.drain(..valid);
                        return out;
                    }
                }
            }
        }
    }
}
