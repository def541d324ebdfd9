use crate::core::descriptor::Kind;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

/// How an invocation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure(String),
}

/// A single entry in the invocation trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationTrace {
    pub id: Uuid,
    pub timestamp: u64,
    pub name: String,
    pub kind: Kind,
    pub stages: usize,
    pub duration_micros: u64,
    pub outcome: Outcome,
}

/// Trait for recording invocation traces.
pub trait Telemetry: Send + Sync {
    fn record(&self, entry: InvocationTrace);
    fn flush(&self);
}

/// Simple in-memory collector for traces.
#[derive(Default)]
pub struct MemoryTelemetry {
    traces: Mutex<Vec<InvocationTrace>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_traces(&self) -> Vec<InvocationTrace> {
        self.traces
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Telemetry for MemoryTelemetry {
    fn record(&self, entry: InvocationTrace) {
        self.traces
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    fn flush(&self) {
        // No-op for memory collector
    }
}
