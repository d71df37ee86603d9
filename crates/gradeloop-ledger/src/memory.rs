//! In-memory reference implementation of [`GradingEventStore`]
//!
//! Events live in an append-only `Vec`; the primary index maps idempotency
//! key to position and secondary indexes map message and trace ids to
//! positions. A single mutex guards all of it so the duplicate check and the
//! insert happen atomically.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::storage_traits::*;

#[derive(Debug, Default)]
struct Inner {
    events: Vec<GradingEvent>,
    by_key: HashMap<String, usize>,
    by_message: HashMap<String, Vec<usize>>,
    by_trace: HashMap<String, Vec<usize>>,
}

impl Inner {
    fn collect(&self, positions: Option<&Vec<usize>>) -> Vec<GradingEvent> {
        positions
            .map(|idx| idx.iter().map(|&i| self.events[i].clone()).collect())
            .unwrap_or_default()
    }
}

/// In-memory grading event store.
#[derive(Debug, Default)]
pub struct MemoryGradingEventStore {
    inner: Mutex<Inner>,
}

impl MemoryGradingEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Writers never leave the indexes half-updated, so a poisoned lock still
    // guards consistent data.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl GradingEventStore for MemoryGradingEventStore {
    async fn record(&self, event: GradingEvent) -> StorageResult<()> {
        let mut inner = self.lock();
        if inner.by_key.contains_key(&event.idempotency_key) {
            warn!(
                idempotency_key = %event.idempotency_key,
                trace_id = %event.trace_id,
                "duplicate grading event rejected"
            );
            return Err(StorageError::IdempotencyViolation {
                key: event.idempotency_key,
            });
        }

        let pos = inner.events.len();
        inner.by_key.insert(event.idempotency_key.clone(), pos);
        inner
            .by_message
            .entry(event.message_id.clone())
            .or_default()
            .push(pos);
        inner
            .by_trace
            .entry(event.trace_id.clone())
            .or_default()
            .push(pos);
        debug!(
            trace_id = %event.trace_id,
            attempt_no = event.attempt_no,
            decision = %event.decision,
            "grading event recorded"
        );
        inner.events.push(event);
        Ok(())
    }

    async fn is_duplicate(&self, idempotency_key: &str) -> StorageResult<bool> {
        Ok(self.lock().by_key.contains_key(idempotency_key))
    }

    async fn get_by_message_id(&self, message_id: &str) -> StorageResult<Vec<GradingEvent>> {
        let inner = self.lock();
        Ok(inner.collect(inner.by_message.get(message_id)))
    }

    async fn get_by_trace_id(&self, trace_id: &str) -> StorageResult<Vec<GradingEvent>> {
        let inner = self.lock();
        let mut events = inner.collect(inner.by_trace.get(trace_id));
        // stable: equal attempt numbers keep insertion order
        events.sort_by_key(|e| e.attempt_no);
        Ok(events)
    }

    async fn get_latest_by_trace_id(&self, trace_id: &str) -> StorageResult<Option<GradingEvent>> {
        let inner = self.lock();
        let latest = inner.by_trace.get(trace_id).and_then(|idx| {
            idx.iter()
                .map(|&i| &inner.events[i])
                // max_by_key returns the last maximum, i.e. the newest on ties
                .max_by_key(|e| e.attempt_no)
                .cloned()
        });
        Ok(latest)
    }

    async fn count(&self, decision: Option<DecisionOutcome>) -> StorageResult<usize> {
        let inner = self.lock();
        Ok(match decision {
            Some(d) => inner.events.iter().filter(|e| e.decision == d).count(),
            None => inner.events.len(),
        })
    }

    async fn query(&self, query: &EventQuery) -> StorageResult<Vec<GradingEvent>> {
        let inner = self.lock();
        Ok(inner
            .events
            .iter()
            .filter(|e| query.matches(e))
            .cloned()
            .collect())
    }
}
