//! In-memory loader and transport shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use corral_core::{
    CollectionLoader, FetchError, ListEnvelope, Mutation, MutationResponse, MutationTransport,
    Page, QueryKey,
};
use serde_json::{Value, json};

/// A product catalog served with client-side pagination.
#[derive(Default)]
pub struct Catalog {
    rows: Vec<Value>,
    delays: HashMap<u32, Duration>,
    calls: AtomicUsize,
    keys: Mutex<Vec<QueryKey>>,
    failing: AtomicBool,
}

impl Catalog {
    /// `count` products with ids `1..=count` and titles `product-NN`.
    pub fn with_products(count: usize) -> Self {
        let rows = (1..=count)
            .map(|id| json!({"_id": id.to_string(), "title": format!("product-{id:02}"), "price": id}))
            .collect();
        Self {
            rows,
            ..Self::default()
        }
    }

    /// Delays responses for `page`.
    pub fn delay_page(mut self, page: u32, delay: Duration) -> Self {
        self.delays.insert(page, delay);
        self
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<QueryKey> {
        self.keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl CollectionLoader<Value> for Catalog {
    async fn load(&self, key: &QueryKey) -> Result<Page<Value>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.keys.lock().unwrap().push(key.clone());
        let delay = self
            .delays
            .get(&key.page())
            .copied()
            .unwrap_or(Duration::from_millis(10));
        tokio::time::sleep(delay).await;

        if self.failing.load(Ordering::SeqCst) {
            return Err(FetchError::Status {
                status: 503,
                message: "Service unavailable".into(),
            });
        }

        let rows = match key.filter("search") {
            Some(term) => self
                .rows
                .iter()
                .filter(|row| row["title"].as_str().is_some_and(|t| t.contains(term)))
                .cloned()
                .collect(),
            None => self.rows.clone(),
        };
        Ok(ListEnvelope::from_rows(rows).into_page(key))
    }
}

/// Records mutations and answers with a canned reply.
pub struct RecordingTransport {
    reply: Mutex<Result<MutationResponse, FetchError>>,
    pub seen: Mutex<Vec<Mutation>>,
}

impl RecordingTransport {
    pub fn accepting(message: &str) -> Arc<Self> {
        Self::replying(Ok(MutationResponse {
            success: true,
            message: message.into(),
            data: None,
        }))
    }

    pub fn replying(reply: Result<MutationResponse, FetchError>) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(reply),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl MutationTransport for RecordingTransport {
    async fn execute(&self, mutation: &Mutation) -> Result<MutationResponse, FetchError> {
        self.seen.lock().unwrap().push(mutation.clone());
        self.reply.lock().unwrap().clone()
    }
}

pub fn ids(rows: &[Value]) -> Vec<&str> {
    rows.iter().filter_map(|row| row["_id"].as_str()).collect()
}
