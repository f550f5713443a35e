use serde::Serialize;
use tokio::sync::mpsc;

use super::message::Notification;
use super::message::ServiceCall;

/// Everything the card sends outward, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum Outbound {
    Call(ServiceCall),
    Notify(Notification),
}

/// Channel types for messages FROM the card TO the host (unbounded - the card must not block)
pub type OutboundSender = mpsc::UnboundedSender<Outbound>;
pub type OutboundReceiver = mpsc::UnboundedReceiver<Outbound>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("control service is no longer listening")]
    Closed,
}

/// Outbound seam between the card and the dashboard host.
///
/// Calls are fire-and-forget: the card never waits for a result, and the
/// next state push is the only feedback it gets.
pub trait ControlService {
    /// Send a light service request
    fn call(&mut self, call: ServiceCall) -> Result<(), ServiceError>;

    /// Send a UI notification
    fn notify(&mut self, notification: Notification) -> Result<(), ServiceError>;
}

/// Delivers outbound messages over a tokio channel to an async consumer.
#[derive(Debug, Clone)]
pub struct ChannelService {
    tx: OutboundSender,
}

impl ChannelService {
    pub fn new() -> (Self, OutboundReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ControlService for ChannelService {
    fn call(&mut self, call: ServiceCall) -> Result<(), ServiceError> {
        self.tx
            .send(Outbound::Call(call))
            .map_err(|_| ServiceError::Closed)
    }

    fn notify(&mut self, notification: Notification) -> Result<(), ServiceError> {
        self.tx
            .send(Outbound::Notify(notification))
            .map_err(|_| ServiceError::Closed)
    }
}

/// Records outbound messages in memory for hosts that poll after each event.
#[derive(Debug, Default, Clone)]
pub struct OutboundQueue {
    items: Vec<Outbound>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything recorded so far
    pub fn drain(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.items)
    }

    pub fn items(&self) -> &[Outbound] {
        &self.items
    }

    pub fn calls(&self) -> impl Iterator<Item = &ServiceCall> {
        self.items.iter().filter_map(|o| match o {
            Outbound::Call(c) => Some(c),
            Outbound::Notify(_) => None,
        })
    }

    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter().filter_map(|o| match o {
            Outbound::Notify(n) => Some(n),
            Outbound::Call(_) => None,
        })
    }
}

impl ControlService for OutboundQueue {
    fn call(&mut self, call: ServiceCall) -> Result<(), ServiceError> {
        self.items.push(Outbound::Call(call));
        Ok(())
    }

    fn notify(&mut self, notification: Notification) -> Result<(), ServiceError> {
        self.items.push(Outbound::Notify(notification));
        Ok(())
    }
}
