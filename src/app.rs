//! Application service: wires the record store, screenshot storage, OCR
//! extractor and search pipeline together behind one object shared by the
//! CLI and the daemon.

use std::sync::{Arc, RwLock};

use crate::{
    auth::AuthContext,
    config::Config,
    eid::Eid,
    extract::{NullExtractor, TesseractExtractor, TextExtractor},
    images,
    records::{ArchivedRecord, BackendCsv, Collection, Record, RecordDraft, RecordStore, StoreError},
    search::{SearchOutcome, SearchService},
    storage::{BackendLocal, StorageManager},
};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("not authorized: curator access required")]
    NotAuthorized,

    #[error("screenshot is not a valid image")]
    InvalidScreenshot,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("io error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("base64: {0:?}")]
    Base64(#[from] base64::DecodeError),

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}

pub struct App {
    store: Arc<dyn RecordStore>,
    screenshots: Arc<dyn StorageManager>,
    search: SearchService,
    config: Arc<RwLock<Config>>,
}

impl App {
    pub fn new(config: Arc<RwLock<Config>>) -> anyhow::Result<Self> {
        let cfg = config.read().unwrap().clone();
        let base_path = cfg.base_path().to_path_buf();

        let store: Arc<dyn RecordStore> = Arc::new(BackendCsv::load(&base_path)?);
        let screenshots: Arc<dyn StorageManager> =
            Arc::new(BackendLocal::new(&cfg.uploads_dir())?);

        let extractor: Arc<dyn TextExtractor> = if cfg.ocr.enabled {
            Arc::new(TesseractExtractor::new(&cfg.ocr.command, &cfg.ocr.languages))
        } else {
            log::info!("ocr disabled, screenshots will not contribute to search");
            Arc::new(NullExtractor)
        };

        let search = SearchService::new(
            store.clone(),
            screenshots.clone(),
            extractor,
            cfg.semantic_search.clone(),
            base_path,
        );

        Ok(Self {
            store,
            screenshots,
            search,
            config,
        })
    }

    /// Store the screenshot, then create the record. A failed create cleans
    /// the uploaded blob back up so no orphans accumulate.
    pub fn create_record(
        &self,
        ctx: &AuthContext,
        collection: Collection,
        description: String,
        screenshot: Vec<u8>,
        original_link: String,
        additional_links: String,
    ) -> Result<Record, AppError> {
        if !ctx.can_curate() {
            return Err(AppError::NotAuthorized);
        }

        if !images::validate_screenshot(&screenshot) {
            return Err(AppError::InvalidScreenshot);
        }

        let ident = format!(
            "{}_{}.{}",
            collection,
            Eid::new(),
            images::screenshot_extension(&screenshot)
        );
        self.screenshots.write(&ident, &screenshot)?;

        let draft = RecordDraft {
            description,
            screenshot_ref: Some(ident.clone()),
            original_link,
            additional_links,
        };

        match self.store.create(collection, draft) {
            Ok(record) => {
                log::info!(
                    "created {collection} record #{} (curator: {})",
                    record.id,
                    ctx.username.as_deref().unwrap_or("unknown")
                );
                Ok(record)
            }
            Err(err) => {
                let _ = self.screenshots.delete(&ident);
                Err(err.into())
            }
        }
    }

    pub fn search(
        &self,
        query: &str,
        collection: Collection,
        k: usize,
    ) -> Result<SearchOutcome, AppError> {
        Ok(self.search.search(query, collection, k)?)
    }

    pub fn list_active(&self, collection: Collection) -> Result<Vec<Record>, AppError> {
        Ok(self.store.list_active(collection)?)
    }

    pub fn list_archived(
        &self,
        collection: Collection,
    ) -> Result<Vec<ArchivedRecord>, AppError> {
        Ok(self.store.list_archived(collection)?)
    }

    pub fn archive_record(
        &self,
        ctx: &AuthContext,
        collection: Collection,
        id: u64,
    ) -> Result<bool, AppError> {
        if !ctx.can_curate() {
            return Err(AppError::NotAuthorized);
        }

        let moved = self.store.archive(collection, id)?;
        if moved {
            log::info!("archived {collection} record #{id}");
        }
        Ok(moved)
    }

    pub fn restore_record(
        &self,
        ctx: &AuthContext,
        collection: Collection,
        id: u64,
    ) -> Result<bool, AppError> {
        if !ctx.can_curate() {
            return Err(AppError::NotAuthorized);
        }

        let restored = self.store.restore(collection, id)?;
        if restored {
            log::info!("restored {collection} record #{id}");
        }
        Ok(restored)
    }

    pub fn config(&self) -> Arc<RwLock<Config>> {
        self.config.clone()
    }

    pub fn screenshots(&self) -> Arc<dyn StorageManager> {
        self.screenshots.clone()
    }

    #[cfg(test)]
    pub fn with_components(
        store: Arc<dyn RecordStore>,
        screenshots: Arc<dyn StorageManager>,
        search: SearchService,
        config: Arc<RwLock<Config>>,
    ) -> Self {
        Self {
            store,
            screenshots,
            search,
            config,
        }
    }
}
