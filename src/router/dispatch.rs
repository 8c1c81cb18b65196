//! Event dispatch
//!
//! Turns ultrasonic alarm readings into commands for the alarm peripheral and
//! forwards every other event to subscribers unchanged.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::config::RouterConfig;
use crate::protocol::line::{ControlEvent, EventTag};
use crate::server::sender::{OutboundSender, SendOutcome};

/// A command the router wants written to a peripheral
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Peripheral name
    pub target: String,
    /// Line to send
    pub message: String,
}

/// What to do with one inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Command to send, if any
    pub command: Option<Command>,
    /// Whether subscribers see the event
    pub forward: bool,
}

impl Route {
    fn forward() -> Self {
        Self {
            command: None,
            forward: true,
        }
    }
}

/// Applies alarm rules to the inbound event stream
pub struct CommandRouter {
    config: RouterConfig,
    sender: OutboundSender,
    forwarded: broadcast::Sender<ControlEvent>,
}

impl CommandRouter {
    /// Create a router writing commands through `sender`
    pub fn new(config: RouterConfig, sender: OutboundSender) -> Self {
        let (forwarded, _) = broadcast::channel(config.forward_capacity);

        Self {
            config,
            sender,
            forwarded,
        }
    }

    /// Get the router configuration
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Subscribe to forwarded events
    pub fn subscribe(&self) -> broadcast::Receiver<ControlEvent> {
        self.forwarded.subscribe()
    }

    /// Decide what to do with an event without acting on it
    pub fn decide(&self, event: &ControlEvent) -> Route {
        if self.is_ultrasonic_reading(event) {
            let payload = event.payload();

            if payload.eq_ignore_ascii_case(&self.config.danger_sentinel) {
                return self.alarm(&self.config.alarm_on, false);
            }
            if payload.eq_ignore_ascii_case(&self.config.safe_sentinel) {
                return self.alarm(&self.config.alarm_off, false);
            }

            return Route::forward();
        }

        // Losing the sensor must not leave the alarm sounding
        if event.tag() == EventTag::ClientDisconnected
            && event.payload() == self.config.ultrasonic_peripheral
        {
            return self.alarm(&self.config.alarm_off, true);
        }

        Route::forward()
    }

    /// Act on one event: send its command, then forward it if required
    ///
    /// Returns the send outcome when a command was issued.
    pub async fn route(&self, event: ControlEvent) -> Option<SendOutcome> {
        let route = self.decide(&event);

        let outcome = match &route.command {
            Some(command) => {
                let outcome = self.sender.send(&command.target, &command.message).await;
                tracing::debug!(
                    trigger = %event,
                    peripheral = %command.target,
                    command = %command.message,
                    outcome = ?outcome,
                    "Routed command"
                );
                Some(outcome)
            }
            None => None,
        };

        if route.forward {
            // Err only means nobody is subscribed right now
            let _ = self.forwarded.send(event);
        }

        outcome
    }

    /// Spawn the routing task over `inbound`
    ///
    /// The task ends when the inbound channel closes.
    pub fn spawn(self: Arc<Self>, mut inbound: broadcast::Receiver<ControlEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match inbound.recv().await {
                    Ok(event) => {
                        self.route(event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped = skipped, "Router lagging, events skipped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            tracing::debug!("Router stopped");
        })
    }

    fn is_ultrasonic_reading(&self, event: &ControlEvent) -> bool {
        match event.tag() {
            EventTag::Ultrasonic => true,
            // Bare lines from a renamed sensor decode untagged
            EventTag::Message => event.source() == Some(self.config.ultrasonic_peripheral.as_str()),
            _ => false,
        }
    }

    fn alarm(&self, message: &str, forward: bool) -> Route {
        Route {
            command: Some(Command {
                target: self.config.alarm_peripheral.clone(),
                message: message.to_string(),
            }),
            forward,
        }
    }
}
