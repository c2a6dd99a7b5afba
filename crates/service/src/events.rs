//! Service events broadcast after successful mutations.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::errors::{ServiceError, ServiceResult};

pub const CREATED: &str = "created";
pub const UPDATED: &str = "updated";
pub const PATCHED: &str = "patched";
pub const REMOVED: &str = "removed";

pub const STANDARD_EVENTS: [&str; 4] = [CREATED, UPDATED, PATCHED, REMOVED];

const BUFFER_SIZE: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceEvent {
    pub service: String,
    pub event: String,
    pub data: Value,
}

/// Event hub for one service.
#[derive(Debug)]
pub struct EventHub {
    service: String,
    /// Custom event names callers may emit
    custom: Vec<String>,
    tx: broadcast::Sender<ServiceEvent>,
}

impl EventHub {
    pub fn new(service: impl Into<String>, custom: Vec<String>) -> Self {
        let (tx, _) = broadcast::channel(BUFFER_SIZE);
        Self { service: service.into(), custom, tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServiceEvent> { self.tx.subscribe() }

    pub fn is_known(&self, event: &str) -> bool {
        STANDARD_EVENTS.contains(&event) || self.custom.iter().any(|e| e == event)
    }

    /// Publish one event per record. Having no subscribers is not an error.
    pub(crate) fn publish(&self, event: &str, records: &[Value]) {
        for data in records {
            let _ = self.tx.send(ServiceEvent { service: self.service.clone(), event: event.to_string(), data: data.clone() });
        }
    }

    /// Publish a caller-defined event; the name must be registered.
    pub fn emit(&self, event: &str, data: Value) -> ServiceResult<()> {
        if !self.custom.iter().any(|e| e == event) {
            return Err(ServiceError::InvalidData(format!("event '{event}' is not registered on {}", self.service)));
        }
        let _ = self.tx.send(ServiceEvent { service: self.service.clone(), event: event.to_string(), data });
        Ok(())
    }
}
