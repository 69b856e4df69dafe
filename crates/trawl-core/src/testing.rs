//! Test doubles.
//!
//! - **StubFetcher**: 応答をスクリプトで決め、呼び出し時刻と同時実行数を記録する
//! - **EventLog**: handler が見たものを順番に記録する

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::ports::{Fetch, FetchError, FetchRequest, FetchResponse};

type Responder = Box<dyn Fn(&FetchRequest, u32) -> Result<FetchResponse, FetchError> + Send + Sync>;

#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub request: FetchRequest,
    pub at: Instant,
}

/// Scripted `Fetch`: the responder gets the request and the 1-based attempt
/// number for its URI.
pub(crate) struct StubFetcher {
    responder: Responder,
    latency: Duration,
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubFetcher {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&FetchRequest, u32) -> Result<FetchResponse, FetchError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn ok() -> Self {
        Self::new(|_, _| Ok(FetchResponse::new(200, "ok")))
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn uris(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.request.uri).collect()
    }

    pub fn attempts(&self, uri: &str) -> usize {
        self.calls().iter().filter(|c| c.request.uri == uri).count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetch for StubFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call {
                request: request.clone(),
                at: Instant::now(),
            });
            calls.iter().filter(|c| c.request.uri == request.uri).count() as u32
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        (self.responder)(&request, attempt)
    }
}

/// Shared, ordered record of what handlers saw.
#[derive(Clone, Default)]
pub(crate) struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.entries().iter().filter(|e| e.starts_with(prefix)).count()
    }
}
