use crate::eid::Eid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
    sync::{Arc, RwLock},
};

/// One of the two independent record groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    News,
    Instructions,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::News => "news",
            Collection::Instructions => "instructions",
        }
    }

    /// The collection searched by the cross-collection fallback.
    pub fn other(&self) -> Collection {
        match self {
            Collection::News => Collection::Instructions,
            Collection::Instructions => Collection::News,
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Collection::News => "news.csv",
            Collection::Instructions => "instructions.csv",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "news" => Ok(Collection::News),
            "instructions" => Ok(Collection::Instructions),
            other => Err(format!(
                "unknown collection \"{other}\" (expected \"news\" or \"instructions\")"
            )),
        }
    }
}

#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,

    pub description: String,
    pub screenshot_ref: Option<String>,
    pub original_link: String,
    pub additional_links: String,

    pub created_at: DateTime<Utc>,
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// A soft-deleted record retained for restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedRecord {
    #[serde(flatten)]
    pub record: Record,
    pub deleted_at: DateTime<Utc>,
}

/// Curator submission. Screenshot, description and original link are all
/// required by the creation workflow.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RecordDraft {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_ref: Option<String>,
    pub original_link: String,
    #[serde(default)]
    pub additional_links: String,
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("required field is empty: {0}")]
    Validation(&'static str),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("database is corrupt: {0}")]
    Corrupt(String),
}

pub trait RecordStore: Send + Sync {
    fn create(&self, collection: Collection, draft: RecordDraft) -> Result<Record, StoreError>;
    fn list_active(&self, collection: Collection) -> Result<Vec<Record>, StoreError>;
    fn list_archived(&self, collection: Collection)
        -> Result<Vec<ArchivedRecord>, StoreError>;
    fn archive(&self, collection: Collection, id: u64) -> Result<bool, StoreError>;
    fn restore(&self, collection: Collection, id: u64) -> Result<bool, StoreError>;
}

const CSV_HEADERS: [&str; 7] = [
    "id",
    "description",
    "screenshot_ref",
    "original_link",
    "additional_links",
    "created_at",
    "deleted_at",
];

/// A row as persisted: the record plus its lifecycle marker. A row with
/// `deleted_at == None` is active, anything else is archived.
#[derive(Debug, Clone)]
struct StoredRecord {
    record: Record,
    deleted_at: Option<DateTime<Utc>>,
}

struct CollectionState {
    rows: Vec<StoredRecord>,
    /// Id high-water mark. Never decremented, so restored ids cannot collide
    /// with freshly assigned ones.
    next_id: u64,
    path: PathBuf,
}

/// CSV-backed record store. Both lifecycle states of a collection live in one
/// file so every archive/restore is a single atomic temp-file-and-rename.
pub struct BackendCsv {
    news: Arc<RwLock<CollectionState>>,
    instructions: Arc<RwLock<CollectionState>>,
}

impl BackendCsv {
    pub fn load(base_dir: &Path) -> Result<Self, StoreError> {
        Ok(BackendCsv {
            news: Arc::new(RwLock::new(Self::load_collection(
                base_dir,
                Collection::News,
            )?)),
            instructions: Arc::new(RwLock::new(Self::load_collection(
                base_dir,
                Collection::Instructions,
            )?)),
        })
    }

    fn load_collection(base_dir: &Path, collection: Collection) -> Result<CollectionState, StoreError> {
        let path = base_dir.join(collection.file_name());

        if let Err(err) = std::fs::metadata(&path) {
            match err.kind() {
                ErrorKind::NotFound => {
                    log::info!("creating new {collection} database at {}", path.display());
                    let mut csv_wrt = csv::Writer::from_path(&path)?;
                    csv_wrt.write_record(CSV_HEADERS)?;
                    csv_wrt.flush()?;
                }
                _ => Err(err)?,
            }
        }

        let mut csv_reader = csv::Reader::from_path(&path)?;

        let mut rows = vec![];
        let mut next_id: u64 = 1;
        for record in csv_reader.records() {
            let record = record?;
            let row = Self::parse_row(&record)?;

            if row.record.id >= next_id {
                next_id = row.record.id + 1;
            }
            rows.push(row);
        }

        Ok(CollectionState { rows, next_id, path })
    }

    fn parse_row(record: &csv::StringRecord) -> Result<StoredRecord, StoreError> {
        let field = |idx: usize| {
            record
                .get(idx)
                .ok_or_else(|| StoreError::Corrupt(format!("missing column {idx}")))
        };

        let id = field(0)?
            .parse::<u64>()
            .map_err(|err| StoreError::Corrupt(format!("bad record id: {err}")))?;
        let description = field(1)?.to_string();
        let screenshot_ref = field(2)?.to_string();
        let original_link = field(3)?.to_string();
        let additional_links = field(4)?.to_string();
        let created_at = parse_timestamp(field(5)?)?;
        let deleted_at = field(6)?;
        let deleted_at = if deleted_at.is_empty() {
            None
        } else {
            Some(parse_timestamp(deleted_at)?)
        };

        Ok(StoredRecord {
            record: Record {
                id,
                description,
                screenshot_ref: if screenshot_ref.is_empty() {
                    None
                } else {
                    Some(screenshot_ref)
                },
                original_link,
                additional_links,
                created_at,
            },
            deleted_at,
        })
    }

    /// Persist a collection atomically: write to a temp file, then rename
    /// over the live one.
    fn save(state: &CollectionState) -> Result<(), StoreError> {
        let temp_path = state.path.with_file_name(format!(
            "{}-{}",
            Eid::new(),
            state
                .path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        ));

        let mut csv_wrt = csv::Writer::from_path(&temp_path)?;
        csv_wrt.write_record(CSV_HEADERS)?;
        for row in state.rows.iter() {
            csv_wrt.write_record([
                &row.record.id.to_string(),
                &row.record.description,
                &row.record.screenshot_ref.clone().unwrap_or_default(),
                &row.record.original_link,
                &row.record.additional_links,
                &row.record.created_at.to_rfc3339(),
                &row
                    .deleted_at
                    .map(|ts| ts.to_rfc3339())
                    .unwrap_or_default(),
            ])?;
        }
        csv_wrt.flush()?;
        drop(csv_wrt);

        std::fs::rename(&temp_path, &state.path)?;
        Ok(())
    }

    fn state(&self, collection: Collection) -> &Arc<RwLock<CollectionState>> {
        match collection {
            Collection::News => &self.news,
            Collection::Instructions => &self.instructions,
        }
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| StoreError::Corrupt(format!("bad timestamp \"{raw}\": {err}")))
}

impl RecordStore for BackendCsv {
    fn create(&self, collection: Collection, draft: RecordDraft) -> Result<Record, StoreError> {
        if draft.description.trim().is_empty() {
            return Err(StoreError::Validation("description"));
        }
        if draft
            .screenshot_ref
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .is_empty()
        {
            return Err(StoreError::Validation("screenshot"));
        }
        if draft.original_link.trim().is_empty() {
            return Err(StoreError::Validation("original_link"));
        }

        let mut state = self.state(collection).write().unwrap();

        let record = Record {
            id: state.next_id,
            description: draft.description,
            screenshot_ref: draft.screenshot_ref,
            original_link: draft.original_link,
            additional_links: draft.additional_links,
            created_at: Utc::now(),
        };

        state.rows.push(StoredRecord {
            record: record.clone(),
            deleted_at: None,
        });

        if let Err(err) = Self::save(&state) {
            state.rows.pop();
            return Err(err);
        }
        state.next_id += 1;

        Ok(record)
    }

    fn list_active(&self, collection: Collection) -> Result<Vec<Record>, StoreError> {
        let state = self.state(collection).read().unwrap();

        let mut records = state
            .rows
            .iter()
            .filter(|row| row.deleted_at.is_none())
            .map(|row| row.record.clone())
            .collect::<Vec<_>>();

        // newest first for browse views; the search pipeline re-ranks anyway
        records.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        Ok(records)
    }

    fn list_archived(
        &self,
        collection: Collection,
    ) -> Result<Vec<ArchivedRecord>, StoreError> {
        let state = self.state(collection).read().unwrap();

        Ok(state
            .rows
            .iter()
            .filter_map(|row| {
                row.deleted_at.map(|deleted_at| ArchivedRecord {
                    record: row.record.clone(),
                    deleted_at,
                })
            })
            .collect())
    }

    fn archive(&self, collection: Collection, id: u64) -> Result<bool, StoreError> {
        let mut state = self.state(collection).write().unwrap();

        let idx = match state
            .rows
            .iter()
            .position(|row| row.record.id == id && row.deleted_at.is_none())
        {
            Some(idx) => idx,
            None => return Ok(false),
        };

        state.rows[idx].deleted_at = Some(Utc::now());

        if let Err(err) = Self::save(&state) {
            state.rows[idx].deleted_at = None;
            return Err(err);
        }

        Ok(true)
    }

    fn restore(&self, collection: Collection, id: u64) -> Result<bool, StoreError> {
        let mut state = self.state(collection).write().unwrap();

        let idx = match state
            .rows
            .iter()
            .position(|row| row.record.id == id && row.deleted_at.is_some())
        {
            Some(idx) => idx,
            None => return Ok(false),
        };

        let previous = state.rows[idx].deleted_at.take();

        if let Err(err) = Self::save(&state) {
            state.rows[idx].deleted_at = previous;
            return Err(err);
        }

        Ok(true)
    }
}
