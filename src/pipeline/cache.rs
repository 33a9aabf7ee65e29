// rams-document-service/src/pipeline/cache.rs

use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::composition::GenerationInput;
use crate::error::{RamsError, Result};
use crate::models::GeneratedDocument;
use tracing::debug;

const DATA_URI_PREFIX: &str = "data:application/pdf;base64,";

/// SHA-256 over the canonical JSON serialization of a generation input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn derive(input: &GenerationInput) -> Result<Self> {
        // Struct fields serialize in declaration order and the input holds no
        // hash maps, so identical inputs give identical bytes.
        let canonical = serde_json::to_vec(input)?;
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        Ok(Self(hex::encode(hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A generated PDF. Cloning shares the underlying bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfPayload {
    bytes: Arc<[u8]>,
    filename: String,
}

impl PdfPayload {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
        }
    }

    /// Decode a renderer response, checking the declared size.
    pub fn from_generated(doc: &GeneratedDocument) -> Result<Self> {
        let encoded = doc
            .content_base64
            .strip_prefix(DATA_URI_PREFIX)
            .unwrap_or(&doc.content_base64);
        let bytes = general_purpose::STANDARD.decode(encoded)?;
        if bytes.is_empty() {
            return Err(RamsError::InvalidData("renderer returned an empty document".into()));
        }
        if doc.size_bytes != 0 && doc.size_bytes != bytes.len() {
            return Err(RamsError::InvalidData(format!(
                "renderer declared {} bytes but sent {}",
                doc.size_bytes,
                bytes.len()
            )));
        }
        Ok(Self::new(bytes, doc.filename.clone()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn to_data_uri(&self) -> String {
        format!("{}{}", DATA_URI_PREFIX, general_purpose::STANDARD.encode(&self.bytes))
    }
}

pub const DEFAULT_CACHE_CAPACITY: usize = 8;

/// Generated documents by input key, holding at most `capacity` entries.
/// The least recently used entry is dropped first.
#[derive(Debug)]
pub struct DocumentCache {
    capacity: usize,
    entries: HashMap<CacheKey, PdfPayload>,
    /// Most recently used at the back
    order: VecDeque<CacheKey>,
}

impl Default for DocumentCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<&PdfPayload> {
        if self.entries.contains_key(key) {
            self.touch(key);
        }
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: CacheKey, payload: PdfPayload) {
        if self.entries.insert(key.clone(), payload).is_some() {
            self.touch(&key);
            return;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
                debug!(cache_key = %oldest, "Dropped least recently used document");
            }
        }
    }

    pub fn evict(&mut self, key: &CacheKey) -> Option<PdfPayload> {
        self.order.retain(|k| k != key);
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn touch(&mut self, key: &CacheKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::compose_document;
    use crate::models::{NewRisk, RiskUpdate, SignOff, Signature};
    use crate::store::RamsStore;
    use chrono::NaiveDate;

    fn input_for(store: &RamsStore) -> GenerationInput {
        GenerationInput::new(compose_document(&store.snapshot(), None, None))
    }

    fn store_with_risk() -> (RamsStore, String) {
        let mut store = RamsStore::with_date(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap());
        let id = store.add_risk(NewRisk {
            hazard: "Working at height".into(),
            risk: "Fall".into(),
            likelihood: 3,
            severity: 4,
            ..Default::default()
        });
        (store, id)
    }

    #[test]
    fn identical_input_gives_identical_key() {
        let (store, _) = store_with_risk();
        let a = CacheKey::derive(&input_for(&store)).unwrap();
        let b = CacheKey::derive(&input_for(&store)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn any_change_misses() {
        let (mut store, id) = store_with_risk();
        let before = CacheKey::derive(&input_for(&store)).unwrap();

        store.update_risk(
            &id,
            RiskUpdate {
                severity: Some(5),
                ..Default::default()
            },
        );
        let after_risk = CacheKey::derive(&input_for(&store)).unwrap();
        assert_ne!(before, after_risk);

        store.set_signatures(SignOff {
            approved_by: Some(Signature {
                name: "A. Jones".into(),
                date: NaiveDate::from_ymd_opt(2025, 1, 11).unwrap(),
                signature_data_url: None,
            }),
            ..Default::default()
        });
        let after_sign_off = CacheKey::derive(&input_for(&store)).unwrap();
        assert_ne!(after_risk, after_sign_off);
    }

    fn key(n: u8) -> CacheKey {
        CacheKey(format!("{:064}", n))
    }

    fn payload(n: u8) -> PdfPayload {
        PdfPayload::new(vec![b'%', n], format!("{}.pdf", n))
    }

    #[test]
    fn cache_drops_least_recently_used() {
        let mut cache = DocumentCache::with_capacity(2);
        assert!(cache.is_empty());
        cache.insert(key(1), payload(1));
        cache.insert(key(2), payload(2));

        // Reading 1 makes 2 the oldest
        assert!(cache.get(&key(1)).is_some());
        cache.insert(key(3), payload(3));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key(2)).is_none());
        assert_eq!(cache.get(&key(1)), Some(&payload(1)));
        assert_eq!(cache.get(&key(3)), Some(&payload(3)));
    }

    #[test]
    fn reinsert_and_evict_keep_order_consistent() {
        let mut cache = DocumentCache::with_capacity(2);
        cache.insert(key(1), payload(1));
        cache.insert(key(2), payload(2));
        cache.insert(key(1), payload(9));
        cache.insert(key(3), payload(3));
        assert!(cache.get(&key(2)).is_none());
        assert_eq!(cache.get(&key(1)), Some(&payload(9)));

        assert!(cache.evict(&key(1)).is_some());
        cache.insert(key(4), payload(4));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key(3)).is_some());
        assert_eq!(DocumentCache::with_capacity(0).capacity(), 1);
    }

    #[test]
    fn payload_decodes_plain_and_data_uri() {
        let payload = PdfPayload::new(b"%PDF-1.7 body".to_vec(), "a.pdf");
        let uri = payload.to_data_uri();
        assert!(uri.starts_with("data:application/pdf;base64,"));

        let doc = GeneratedDocument {
            content_base64: uri,
            filename: "a.pdf".into(),
            mime_type: "application/pdf".into(),
            size_bytes: payload.len(),
        };
        assert_eq!(PdfPayload::from_generated(&doc).unwrap(), payload);

        let bad = GeneratedDocument {
            content_base64: "!!!not base64".into(),
            ..doc
        };
        assert!(PdfPayload::from_generated(&bad).is_err());
    }
}
