use crate::error::ScoutError;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex};
use tracing::warn;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// The three downstream feeds.
#[derive(Debug, Clone)]
pub struct QueueNames {
    pub new_client: String,
    pub unauthenticated: String,
    pub authenticated: String,
}

/// Outbound message publisher.
///
/// Subject-per-queue on a NATS broker, or an in-memory sink for tests and
/// broker-less lab runs. Publish failures are per-message: the caller logs
/// and moves on, nothing is retried in-line.
#[derive(Clone)]
pub enum Publisher {
    Nats(async_nats::Client),
    Memory(MemorySink),
}

impl Publisher {
    pub async fn connect_nats(url: &str) -> Result<Self, ScoutError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| ScoutError::QueuePublish(e.to_string()))?;
        Ok(Self::Nats(client))
    }

    pub fn memory() -> Self {
        Self::Memory(MemorySink::default())
    }

    pub async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<(), ScoutError> {
        match self {
            Self::Nats(client) => client
                .publish(queue.to_string(), payload.into())
                .await
                .map_err(|e| ScoutError::QueuePublish(e.to_string())),
            Self::Memory(sink) => {
                sink.push(queue, payload);
                Ok(())
            }
        }
    }

    /// Serialize, frame per the producer setting, and publish.
    pub async fn publish_json<T: Serialize>(
        &self,
        queue: &str,
        message: &T,
        gzip_frame: bool,
    ) -> Result<(), ScoutError> {
        let json =
            serde_json::to_vec(message).map_err(|e| ScoutError::QueuePublish(e.to_string()))?;
        let result = self.publish(queue, encode_payload(&json, gzip_frame)).await;
        match &result {
            Ok(()) => {
                metrics::counter!("scout_queue_published_total", "queue" => queue.to_string())
                    .increment(1);
            }
            Err(_) => {
                metrics::counter!("scout_queue_publish_errors_total", "queue" => queue.to_string())
                    .increment(1);
            }
        }
        result
    }
}

/// Gzip-frame a payload when the producer setting asks for it. A framing
/// failure falls back to the plain body, since consumers accept both forms.
pub fn encode_payload(payload: &[u8], gzip_frame: bool) -> Vec<u8> {
    if !gzip_frame {
        return payload.to_vec();
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    let framed = encoder
        .write_all(payload)
        .and_then(|_| encoder.finish());
    match framed {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("queue: gzip framing failed, sending plain, error={}", e);
            payload.to_vec()
        }
    }
}

/// Unframe a queue payload. Framed bodies are detected by the gzip magic
/// bytes; everything else passes through untouched.
pub fn decode_payload(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut decoder = GzDecoder::new(bytes);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    } else {
        Ok(bytes.to_vec())
    }
}

/// In-memory sink retaining everything published, in order.
#[derive(Clone, Default)]
pub struct MemorySink {
    messages: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl MemorySink {
    fn push(&self, queue: &str, payload: Vec<u8>) {
        self.messages
            .lock()
            .expect("memory sink poisoned")
            .push((queue.to_string(), payload));
    }

    pub fn messages_for(&self, queue: &str) -> Vec<Vec<u8>> {
        self.messages
            .lock()
            .expect("memory sink poisoned")
            .iter()
            .filter(|(q, _)| q == queue)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().expect("memory sink poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
