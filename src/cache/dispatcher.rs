//! Pessimistic mutation dispatch.
//!
//! A mutation issues exactly one request. Only once the server has accepted
//! it are the mutation's tags invalidated; failures leave the cache as is.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{info, warn};

use super::events::{Epoch, Mutation, MutationEvent};
use super::keys::display_tags;
use super::store::TagInvalidator;

const METRIC_MUTATION_MS: &str = "libris_mutation_ms";
const METRIC_MUTATION_FAILED: &str = "libris_mutation_failed_total";

pub struct MutationDispatcher {
    invalidator: Arc<dyn TagInvalidator>,
    epoch_counter: AtomicU64,
}

impl MutationDispatcher {
    pub fn new(invalidator: Arc<dyn TagInvalidator>) -> Self {
        Self {
            invalidator,
            epoch_counter: AtomicU64::new(0),
        }
    }

    fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Await `request` and, if it succeeds, invalidate the tags of `mutation`
    /// before handing the response back.
    pub async fn dispatch<T, E, F>(&self, mutation: Mutation, request: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        let event = MutationEvent::new(mutation, self.next_epoch());
        let operation = event.mutation.operation();
        info!(
            event_id = %event.id,
            event_epoch = event.epoch,
            dispatched_at = %event.timestamp,
            mutation = %event.mutation,
            "Mutation dispatched"
        );

        let started_at = Instant::now();
        let result = request.await;
        histogram!(METRIC_MUTATION_MS, "operation" => operation)
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(response) => {
                let tags = event.mutation.invalidates();
                let outcome = self.invalidator.invalidate(&tags);
                info!(
                    event_id = %event.id,
                    tags = %display_tags(&tags),
                    marked_stale = outcome.marked_stale,
                    refetched = outcome.refetched,
                    "Mutation succeeded"
                );
                Ok(response)
            }
            Err(err) => {
                counter!(METRIC_MUTATION_FAILED, "operation" => operation).increment(1);
                warn!(
                    event_id = %event.id,
                    mutation = %event.mutation,
                    error = %err,
                    "Mutation failed; cache left untouched"
                );
                Err(err)
            }
        }
    }
}
