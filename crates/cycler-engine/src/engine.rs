//! Link protocol engine.
//!
//! Owns the transport and drives it on a fixed tick. Each tick drains
//! inbound bytes through the line framer, then advances the single
//! outbound delivery slot:
//!
//! - At most one message is on the wire awaiting ACK at any time
//! - A message is retransmitted on ACK timeout, up to the retry
//!   budget, then dropped so the queue keeps moving
//! - `syn` handshakes are answered immediately and statelessly
//!
//! Inbound lines go through three independent checks (handshake, ACK,
//! telemetry-or-text); a single line can satisfy more than one. In
//! particular an `ack` line also fails JSON parsing and is therefore
//! echoed to the transcript verbatim, which is what the instrument's
//! operators expect to see.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_channel::mpsc;
use tokio::time::{sleep, Instant};

use core_types::{LineFramer, Transport};
use cycler_protocol::{CyclerError, Severity, SystemEvent};

use crate::config::LinkConfig;
use crate::decoder::TelemetryDecoder;
use crate::{link_debug, link_error, link_info, link_warn};

/// State shared between the engine task and its handles
#[derive(Default)]
struct EngineShared {
    /// Outbound FIFO; locked only to push or pop
    queue: Mutex<VecDeque<String>>,
    target_reached: Arc<AtomicBool>,
    shutdown: AtomicBool,
}

/// Cheap, cloneable handle to a running [`LinkEngine`].
#[derive(Clone)]
pub struct LinkHandle {
    shared: Arc<EngineShared>,
}

impl LinkHandle {
    /// Queue a message for delivery. Always succeeds.
    ///
    /// Input is trimmed; empty or whitespace-only input is ignored.
    /// The newline terminator is appended at the wire, never stored.
    pub fn enqueue(&self, text: &str) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        self.lock_queue().push_back(trimmed.to_string());
    }

    /// Latest target-reached flag reported by the instrument
    pub fn target_reached(&self) -> bool {
        self.shared.target_reached.load(Ordering::Relaxed)
    }

    /// Override the target-reached signal.
    ///
    /// Normally written only by the telemetry decoder; exposed for
    /// simulation and dry runs.
    pub fn set_target_reached(&self, reached: bool) {
        self.shared.target_reached.store(reached, Ordering::Relaxed);
    }

    /// Messages queued but not yet handed to the wire
    pub fn pending(&self) -> usize {
        self.lock_queue().len()
    }

    /// Remove and return everything still queued.
    ///
    /// Racy against a live engine; meant for detached handles, where
    /// it reads back what a dry run would have sent.
    pub fn take_pending(&self) -> Vec<String> {
        self.lock_queue().drain(..).collect()
    }

    /// Ask the engine task to exit after its current tick
    pub fn shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::Relaxed);
    }

    /// A handle connected to no engine.
    ///
    /// Queued messages are never sent; useful for dry runs and tests.
    pub fn detached() -> Self {
        Self {
            shared: Arc::new(EngineShared::default()),
        }
    }

    fn lock_queue(&self) -> MutexGuard<'_, VecDeque<String>> {
        // A poisoned queue is still a valid queue
        self.shared
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// The single outbound delivery slot
struct DeliveryState {
    in_flight: Option<String>,
    /// Transmissions so far for the in-flight message (first send = 1)
    retry_count: u32,
    last_send: Instant,
}

impl DeliveryState {
    fn new() -> Self {
        Self {
            in_flight: None,
            retry_count: 0,
            last_send: Instant::now(),
        }
    }
}

/// Drives one serial link. See the module docs for the tick contract.
pub struct LinkEngine<T: Transport> {
    transport: T,
    framer: LineFramer,
    shared: Arc<EngineShared>,
    delivery: DeliveryState,
    decoder: TelemetryDecoder,
    config: LinkConfig,
    event_tx: mpsc::Sender<SystemEvent>,
}

impl<T: Transport> LinkEngine<T> {
    pub fn new(transport: T, config: LinkConfig, event_tx: mpsc::Sender<SystemEvent>) -> Self {
        let shared = Arc::new(EngineShared::default());
        let decoder = TelemetryDecoder::new(shared.target_reached.clone());
        Self {
            transport,
            framer: LineFramer::new(),
            shared,
            delivery: DeliveryState::new(),
            decoder,
            config,
            event_tx,
        }
    }

    pub fn handle(&self) -> LinkHandle {
        LinkHandle {
            shared: self.shared.clone(),
        }
    }

    /// Run the tick loop until shutdown or link loss.
    pub async fn run(mut self) -> Result<(), CyclerError> {
        link_info!("LinkEngine: tick loop starting");
        while !self.shared.shutdown.load(Ordering::Relaxed) {
            self.tick()?;
            sleep(self.config.tick_interval).await;
        }
        link_info!("LinkEngine: shut down");
        Ok(())
    }

    /// One engine step: drain inbound lines, then advance the
    /// delivery slot. Synchronous so tests can drive it directly.
    pub fn tick(&mut self) -> Result<(), CyclerError> {
        loop {
            let chunk = self
                .transport
                .try_read()
                .map_err(|e| CyclerError::LinkUnavailable(format!("read failed: {e}")))?;
            let Some(chunk) = chunk else { break };
            for raw in self.framer.push(&chunk) {
                let text = String::from_utf8_lossy(&raw).into_owned();
                self.process_line(text.trim())?;
            }
        }
        self.advance_outbound()
    }

    fn process_line(&mut self, line: &str) -> Result<(), CyclerError> {
        if line.is_empty() {
            return Ok(());
        }

        // Handshake: answer immediately, no state involved
        if line.eq_ignore_ascii_case("syn") {
            let reply = if self.config.sd_card {
                "syn ack"
            } else {
                "syn ack no_sd"
            };
            self.send_wire(reply)?;
        }

        // ACK resolves the in-flight message, if any
        if line.eq_ignore_ascii_case("ack") && self.delivery.in_flight.is_some() {
            link_debug!("LinkEngine: ACK resolved in-flight message");
            self.delivery.in_flight = None;
            self.delivery.retry_count = 0;
            self.send_event(SystemEvent::Transcript {
                text: "ACK received".into(),
                severity: Severity::Info,
            });
        }

        // Telemetry, or failing that, plain text for the transcript
        if let Some((record, readings)) = self.decoder.ingest(line) {
            self.send_event(SystemEvent::Telemetry { record, readings });
        } else {
            self.send_event(SystemEvent::Transcript {
                text: line.to_string(),
                severity: Severity::Info,
            });
        }
        Ok(())
    }

    fn advance_outbound(&mut self) -> Result<(), CyclerError> {
        if let Some(message) = self.delivery.in_flight.clone() {
            if self.delivery.last_send.elapsed() < self.config.ack_timeout {
                return Ok(());
            }
            if self.delivery.retry_count < self.config.max_retries {
                let attempt = self.delivery.retry_count;
                self.send_wire(&message)?;
                link_warn!("LinkEngine: no ACK for '{message}', retrying ({attempt})");
                self.send_event(SystemEvent::Transcript {
                    text: format!("Retrying ({attempt})"),
                    severity: Severity::Warning,
                });
                self.delivery.retry_count += 1;
                self.delivery.last_send = Instant::now();
            } else {
                link_error!("LinkEngine: giving up on '{message}'");
                self.send_event(SystemEvent::Transcript {
                    text: format!("Failed to send after {} retries", self.config.max_retries),
                    severity: Severity::Error,
                });
                self.delivery.in_flight = None;
                self.delivery.retry_count = 0;
            }
            return Ok(());
        }

        let next = self.lock_queue().pop_front();
        if let Some(message) = next {
            self.send_wire(&message)?;
            self.delivery.in_flight = Some(message);
            self.delivery.retry_count = 1;
            self.delivery.last_send = Instant::now();
        }
        Ok(())
    }

    fn send_wire(&mut self, text: &str) -> Result<(), CyclerError> {
        let mut wire = String::with_capacity(text.len() + 1);
        wire.push_str(text);
        wire.push('\n');
        self.transport
            .write(wire.as_bytes())
            .map_err(|e| CyclerError::LinkUnavailable(format!("write failed: {e}")))?;
        link_debug!("LinkEngine: sent '{text}'");
        self.send_event(SystemEvent::Transcript {
            text: format!("Sent: {text}"),
            severity: Severity::Info,
        });
        Ok(())
    }

    /// Best-effort event delivery; a stuck sink never stalls the link
    fn send_event(&mut self, event: SystemEvent) {
        if let Err(e) = self.event_tx.clone().try_send(event) {
            if e.is_full() {
                link_warn!("LinkEngine: event channel full, dropping event");
            } else {
                link_debug!("LinkEngine: event channel closed");
            }
        }
    }

    fn lock_queue(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.shared
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
