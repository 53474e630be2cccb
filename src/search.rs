//! Query-time search pipeline.
//!
//! Composes the record store, OCR extractor, embedder and ranker:
//! load the active candidate pool, build a comparison text per record,
//! embed everything in one batch, rank by cosine similarity, then run the
//! fixed smaller fallback query against the other collection.

use crate::{
    config::SemanticConfig,
    extract::TextExtractor,
    normalize::normalize,
    records::{Collection, Record, RecordStore, StoreError},
    semantic::{rank, Embedder, EmbeddingError, EmbeddingModel},
    storage::StorageManager,
};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Hard cap on requested result count (the UI never offered more than 20).
pub const MAX_RESULTS: usize = 20;

/// Fixed K for the cross-collection fallback query.
pub const FALLBACK_RESULTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    /// Pipeline ran end to end.
    Ok,
    /// Embedder unavailable; results are empty, the caller should say so.
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredRecord {
    #[serde(flatten)]
    pub record: Record,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub primary: Vec<ScoredRecord>,
    pub secondary: Vec<ScoredRecord>,
    pub status: SearchStatus,
}

impl SearchOutcome {
    fn empty(status: SearchStatus) -> Self {
        Self {
            primary: vec![],
            secondary: vec![],
            status,
        }
    }
}

enum PipelineError {
    Store(StoreError),
    Embedding(EmbeddingError),
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        PipelineError::Store(err)
    }
}

impl From<EmbeddingError> for PipelineError {
    fn from(err: EmbeddingError) -> Self {
        PipelineError::Embedding(err)
    }
}

pub struct SearchService {
    store: Arc<dyn RecordStore>,
    screenshots: Arc<dyn StorageManager>,
    extractor: Arc<dyn TextExtractor>,

    semantic_config: SemanticConfig,
    base_path: PathBuf,
    /// Lazily-loaded embedding backend. Stays `None` after a failed load so
    /// the next query retries instead of wedging the service.
    embedder: Mutex<Option<Arc<dyn Embedder>>>,

    /// Comparison-text hash -> embedding. Records are immutable once created,
    /// so a hash hit is always current.
    vector_cache: Mutex<HashMap<u64, Vec<f32>>>,
}

impl SearchService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        screenshots: Arc<dyn StorageManager>,
        extractor: Arc<dyn TextExtractor>,
        semantic_config: SemanticConfig,
        base_path: PathBuf,
    ) -> Self {
        Self {
            store,
            screenshots,
            extractor,
            semantic_config,
            base_path,
            embedder: Mutex::new(None),
            vector_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Build the service around an already-constructed embedding backend.
    pub fn with_embedder(
        store: Arc<dyn RecordStore>,
        screenshots: Arc<dyn StorageManager>,
        extractor: Arc<dyn TextExtractor>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            store,
            screenshots,
            extractor,
            semantic_config: SemanticConfig::default(),
            base_path: PathBuf::new(),
            embedder: Mutex::new(Some(embedder)),
            vector_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Run a query against `collection`, returning ranked primary results
    /// plus the fixed-size fallback from the other collection.
    ///
    /// An empty query or an unavailable embedder yields an empty outcome,
    /// never an error; store failures propagate typed.
    pub fn search(
        &self,
        query: &str,
        collection: Collection,
        k: usize,
    ) -> Result<SearchOutcome, StoreError> {
        let k = k.clamp(1, MAX_RESULTS);

        let query = normalize(query);
        if query.is_empty() {
            return Ok(SearchOutcome::empty(SearchStatus::Ok));
        }

        let embedder = match self.ensure_embedder() {
            Some(embedder) => embedder,
            None => return Ok(SearchOutcome::empty(SearchStatus::Degraded)),
        };

        let primary = match self.search_collection(&embedder, &query, collection, k) {
            Ok(results) => results,
            Err(PipelineError::Store(err)) => return Err(err),
            Err(PipelineError::Embedding(err)) => {
                log::error!("search degraded, embedder failed: {err}");
                return Ok(SearchOutcome::empty(SearchStatus::Degraded));
            }
        };

        // the fallback only runs alongside a non-empty primary result set
        let secondary = if primary.is_empty() {
            vec![]
        } else {
            match self.search_collection(&embedder, &query, collection.other(), FALLBACK_RESULTS)
            {
                Ok(results) => results,
                Err(PipelineError::Store(err)) => return Err(err),
                Err(PipelineError::Embedding(err)) => {
                    log::error!("fallback search skipped, embedder failed: {err}");
                    vec![]
                }
            }
        };

        Ok(SearchOutcome {
            primary,
            secondary,
            status: SearchStatus::Ok,
        })
    }

    fn search_collection(
        &self,
        embedder: &Arc<dyn Embedder>,
        query: &str,
        collection: Collection,
        k: usize,
    ) -> Result<Vec<ScoredRecord>, PipelineError> {
        let records = self.store.list_active(collection)?;
        if records.is_empty() {
            return Ok(vec![]);
        }

        let texts: Vec<String> = records
            .iter()
            .map(|record| self.comparison_text(record))
            .collect();
        let hashes: Vec<u64> = texts.iter().map(|text| content_hash(text)).collect();

        // one batch per query: the normalized query first, then every
        // comparison text we have not embedded before
        let mut batch = vec![query.to_string()];
        let mut pending: Vec<u64> = vec![];
        {
            let cache = self.vector_cache.lock().unwrap();
            for (hash, text) in hashes.iter().zip(texts.iter()) {
                if !cache.contains_key(hash) && !pending.contains(hash) {
                    pending.push(*hash);
                    batch.push(text.clone());
                }
            }
        }

        let mut vectors = embedder.embed_batch(&batch)?.into_iter();
        let query_vector = vectors.next().ok_or_else(|| {
            EmbeddingError::EmbeddingFailed("embedder returned an empty batch".to_string())
        })?;

        let candidates: Vec<Vec<f32>> = {
            let mut cache = self.vector_cache.lock().unwrap();
            for (hash, vector) in pending.iter().zip(vectors) {
                cache.insert(*hash, vector);
            }

            hashes
                .iter()
                .map(|hash| cache.get(hash).cloned().unwrap_or_default())
                .collect()
        };

        let ranked = rank(&query_vector, &candidates, k);

        Ok(ranked
            .into_iter()
            .map(|(idx, score)| ScoredRecord {
                record: records[idx].clone(),
                score,
            })
            .collect())
    }

    /// Comparison text: normalized description plus, when the screenshot is
    /// present and readable, its normalized OCR text. Extraction failures
    /// never leave this function.
    fn comparison_text(&self, record: &Record) -> String {
        let mut text = normalize(&record.description);

        let Some(ref screenshot_ref) = record.screenshot_ref else {
            return text;
        };
        let Some(path) = self.screenshots.resolve(screenshot_ref) else {
            log::debug!("screenshot {screenshot_ref} missing, skipping ocr");
            return text;
        };

        match self.extractor.extract_text(&path) {
            Ok(ocr) => {
                let ocr = normalize(&ocr);
                if !ocr.is_empty() {
                    if !text.is_empty() {
                        text.push(' ');
                    }
                    text.push_str(&ocr);
                }
            }
            Err(err) => log::debug!("ocr failed for {screenshot_ref}: {err}"),
        }

        text
    }

    fn ensure_embedder(&self) -> Option<Arc<dyn Embedder>> {
        let mut slot = self.embedder.lock().unwrap();

        if let Some(ref embedder) = *slot {
            return Some(embedder.clone());
        }

        if !self.semantic_config.enabled {
            log::warn!("semantic search is disabled in config");
            return None;
        }

        log::info!(
            "loading embedding model '{}'",
            self.semantic_config.model
        );
        let timeout = Duration::from_secs(self.semantic_config.download_timeout_secs);
        match EmbeddingModel::new(
            &self.semantic_config.model,
            self.base_path.clone(),
            Some(timeout),
        ) {
            Ok(model) => {
                log::info!("embedding model ready ({} dimensions)", model.dimensions());
                let embedder: Arc<dyn Embedder> = Arc::new(model);
                *slot = Some(embedder.clone());
                Some(embedder)
            }
            Err(err) => {
                log::error!("embedding model unavailable: {err}");
                None
            }
        }
    }
}

fn content_hash(text: &str) -> u64 {
    use std::hash::{Hash, Hasher};

    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}
