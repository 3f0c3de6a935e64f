//! redb storage engine implementation.
//!
//! This module provides the primary document store for TrialDB using
//! [redb](https://docs.rs/redb), a pure Rust embedded key-value store.
//!
//! # Features
//!
//! - ACID transactions with MVCC
//! - Single-writer, multiple-reader concurrency
//! - Automatic crash recovery
//!
//! Each document write is its own write transaction. Links span two
//! documents and therefore two transactions.
//!
//! # File Layout
//!
//! When you open a database at `./trials.db`, redb creates:
//! - `./trials.db` - Main database file
//! - `./trials.db.lock` - Lock file for writer coordination (may not be visible)

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ::redb::{Database, Durability, ReadableTable, TableDefinition, WriteTransaction};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use super::schema::{
    DatabaseMetadata, CLINICAL_TESTS_TABLE, EXPERIMENTS_TABLE, METADATA_TABLE, SCHEMA_VERSION,
};
use super::DocumentStore;
use crate::clinical_test::ClinicalTest;
use crate::config::{Config, SyncMode};
use crate::error::{NotFoundError, Result, StorageError, TrialDBError};
use crate::experiment::Experiment;
use crate::search::{ClinicalTestFilter, ExperimentFilter};
use crate::types::{ClinicalTestId, ExperimentId};

/// Metadata key in the metadata table.
const METADATA_KEY: &str = "db_metadata";

/// Shape shared by both document tables.
type DocumentTable = TableDefinition<'static, &'static [u8; 16], &'static [u8]>;

/// redb document store.
///
/// This struct holds the redb database handle and cached metadata.
/// It implements [`DocumentStore`] for use with TrialDB.
///
/// # Thread Safety
///
/// `RedbStore` is `Send + Sync`. The database handle is shared with the
/// blocking tasks that run each transaction; redb handles internal
/// synchronization using MVCC for readers and exclusive locking for writers.
#[derive(Debug)]
pub struct RedbStore {
    /// The redb database handle.
    db: Arc<Database>,

    /// Cached database metadata.
    metadata: DatabaseMetadata,

    /// Path to the database file.
    path: PathBuf,

    /// Durability applied to every write transaction.
    sync_mode: SyncMode,
}

impl RedbStore {
    /// Opens or creates a database at the given path.
    ///
    /// If the database doesn't exist, it will be created and initialized.
    /// If it exists, the stored schema version is validated.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The database file is corrupted
    /// - The database is locked by another process
    /// - Schema version doesn't match
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use trialdb::{Config, storage::RedbStore};
    ///
    /// let store = RedbStore::open("./trials.db", &Config::default())?;
    /// ```
    #[instrument(skip(config), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        let path = path.as_ref();
        let db_exists = path.exists();

        debug!(db_exists = db_exists, "Opening storage engine");

        let db = Self::create_database(path)?;

        let metadata = if db_exists {
            Self::open_existing(&db)?
        } else {
            Self::initialize_new(&db)?
        };

        Ok(Self {
            db: Arc::new(db),
            metadata,
            path: path.to_path_buf(),
            sync_mode: config.sync_mode,
        })
    }

    /// Creates the redb database file, or opens it if present.
    fn create_database(path: &Path) -> Result<Database> {
        // redb doesn't expose a typed error variant for lock conflicts,
        // so we detect them via error message string matching.
        let db = Database::builder().create(path).map_err(|e| {
            if e.to_string().contains("locked") {
                StorageError::DatabaseLocked
            } else {
                StorageError::Redb(e.to_string())
            }
        })?;

        debug!("Database file opened successfully");
        Ok(db)
    }

    /// Initializes a new database with tables and metadata.
    fn initialize_new(db: &Database) -> Result<DatabaseMetadata> {
        info!("Initializing new database");

        let metadata = DatabaseMetadata::new();

        let write_txn = db.begin_write().map_err(StorageError::from)?;
        {
            let mut meta_table = write_txn.open_table(METADATA_TABLE)?;
            let metadata_bytes = bincode::serialize(&metadata)
                .map_err(|e| StorageError::serialization(e.to_string()))?;
            meta_table.insert(METADATA_KEY, metadata_bytes.as_slice())?;

            // Document tables are created on first open
            let _ = write_txn.open_table(EXPERIMENTS_TABLE)?;
            let _ = write_txn.open_table(CLINICAL_TESTS_TABLE)?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        info!(schema_version = SCHEMA_VERSION, "Database initialized");
        Ok(metadata)
    }

    /// Reads and validates the metadata of an existing database.
    fn open_existing(db: &Database) -> Result<DatabaseMetadata> {
        info!("Opening existing database");

        let read_txn = db.begin_read().map_err(StorageError::from)?;
        let mut metadata = {
            let meta_table = read_txn.open_table(METADATA_TABLE).map_err(|e| {
                StorageError::corrupted(format!("Cannot open metadata table: {}", e))
            })?;

            let metadata_bytes = meta_table
                .get(METADATA_KEY)
                .map_err(StorageError::from)?
                .ok_or_else(|| StorageError::corrupted("Missing database metadata"))?;

            bincode::deserialize::<DatabaseMetadata>(metadata_bytes.value())
                .map_err(|e| StorageError::corrupted(format!("Invalid metadata format: {}", e)))?
        };
        drop(read_txn);

        if !metadata.is_compatible() {
            warn!(
                expected = SCHEMA_VERSION,
                found = metadata.schema_version,
                "Schema version mismatch"
            );
            return Err(TrialDBError::Storage(StorageError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                found: metadata.schema_version,
            }));
        }

        metadata.touch();

        let write_txn = db.begin_write().map_err(StorageError::from)?;
        {
            let mut meta_table = write_txn.open_table(METADATA_TABLE)?;
            let metadata_bytes = bincode::serialize(&metadata)
                .map_err(|e| StorageError::serialization(e.to_string()))?;
            meta_table.insert(METADATA_KEY, metadata_bytes.as_slice())?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        info!(
            schema_version = metadata.schema_version,
            "Database opened successfully"
        );
        Ok(metadata)
    }

    /// Returns the database metadata.
    #[inline]
    pub fn metadata(&self) -> &DatabaseMetadata {
        &self.metadata
    }

    /// Returns a reference to the underlying redb database.
    #[inline]
    #[allow(dead_code)] // Used by storage tests that bypass the document API
    pub(crate) fn database(&self) -> &Database {
        &self.db
    }

    /// Runs `f` against the database on tokio's blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db)).await?
    }

    async fn put(&self, table: DocumentTable, key: [u8; 16], bytes: Vec<u8>) -> Result<()> {
        let sync_mode = self.sync_mode;
        self.blocking(move |db| {
            let write_txn = begin_write(db, sync_mode)?;
            {
                let mut t = write_txn.open_table(table)?;
                t.insert(&key, bytes.as_slice())?;
            }
            write_txn.commit().map_err(StorageError::from)?;
            Ok(())
        })
        .await
    }

    async fn fetch<T>(&self, table: DocumentTable, key: [u8; 16]) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.blocking(move |db| {
            let read_txn = db.begin_read().map_err(StorageError::from)?;
            let t = read_txn.open_table(table)?;
            match t.get(&key)? {
                Some(value) => {
                    let doc: T = bincode::deserialize(value.value())
                        .map_err(|e| StorageError::serialization(e.to_string()))?;
                    Ok(Some(doc))
                }
                None => Ok(None),
            }
        })
        .await
    }

    /// Deletes a key. Returns whether it existed.
    async fn delete(&self, table: DocumentTable, key: [u8; 16]) -> Result<bool> {
        let sync_mode = self.sync_mode;
        self.blocking(move |db| {
            let write_txn = begin_write(db, sync_mode)?;
            let existed;
            {
                let mut t = write_txn.open_table(table)?;
                existed = t.remove(&key)?.is_some();
            }
            write_txn.commit().map_err(StorageError::from)?;
            Ok(existed)
        })
        .await
    }

    async fn scan<T, P>(&self, table: DocumentTable, predicate: P) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send + 'static,
        P: Fn(&T) -> bool + Send + 'static,
    {
        self.blocking(move |db| {
            let read_txn = db.begin_read().map_err(StorageError::from)?;
            let t = read_txn.open_table(table)?;

            let mut docs = Vec::new();
            for result in t.iter()? {
                let (_, value) = result.map_err(StorageError::from)?;
                let doc: T = bincode::deserialize(value.value())
                    .map_err(|e| StorageError::serialization(e.to_string()))?;
                if predicate(&doc) {
                    docs.push(doc);
                }
            }
            Ok(docs)
        })
        .await
    }
}

/// Opens a write transaction with the configured durability.
fn begin_write(db: &Database, sync_mode: SyncMode) -> Result<WriteTransaction> {
    let mut write_txn = db.begin_write().map_err(StorageError::from)?;
    match sync_mode {
        SyncMode::Fast => write_txn.set_durability(Durability::Eventual),
        SyncMode::Normal => write_txn.set_durability(Durability::Immediate),
        SyncMode::Paranoid => {
            write_txn.set_durability(Durability::Immediate);
            write_txn.set_two_phase_commit(true);
        }
    }
    Ok(write_txn)
}

#[async_trait]
impl DocumentStore for RedbStore {
    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    async fn save_experiment(&self, experiment: &Experiment) -> Result<()> {
        let bytes = bincode::serialize(experiment)
            .map_err(|e| StorageError::serialization(e.to_string()))?;
        self.put(EXPERIMENTS_TABLE, *experiment.id.as_bytes(), bytes)
            .await?;

        debug!(
            id = %experiment.id,
            clinical_tests = experiment.clinical_test_ids.len(),
            "Experiment saved"
        );
        Ok(())
    }

    async fn get_experiment(&self, id: ExperimentId) -> Result<Option<Experiment>> {
        self.fetch(EXPERIMENTS_TABLE, *id.as_bytes()).await
    }

    async fn remove_experiment(&self, id: ExperimentId) -> Result<()> {
        if !self.delete(EXPERIMENTS_TABLE, *id.as_bytes()).await? {
            return Err(NotFoundError::experiment(id).into());
        }
        debug!(id = %id, "Experiment removed");
        Ok(())
    }

    async fn query_experiments(&self, filter: &ExperimentFilter) -> Result<Vec<Experiment>> {
        let filter = filter.clone();
        self.scan(EXPERIMENTS_TABLE, move |e: &Experiment| filter.matches(e))
            .await
    }

    async fn save_clinical_test(&self, clinical_test: &ClinicalTest) -> Result<()> {
        let bytes = bincode::serialize(clinical_test)
            .map_err(|e| StorageError::serialization(e.to_string()))?;
        self.put(CLINICAL_TESTS_TABLE, *clinical_test.id.as_bytes(), bytes)
            .await?;

        debug!(
            id = %clinical_test.id,
            experiments = clinical_test.experiment_ids.len(),
            "Clinical test saved"
        );
        Ok(())
    }

    async fn get_clinical_test(&self, id: ClinicalTestId) -> Result<Option<ClinicalTest>> {
        self.fetch(CLINICAL_TESTS_TABLE, *id.as_bytes()).await
    }

    async fn remove_clinical_test(&self, id: ClinicalTestId) -> Result<()> {
        if !self.delete(CLINICAL_TESTS_TABLE, *id.as_bytes()).await? {
            return Err(NotFoundError::clinical_test(id).into());
        }
        debug!(id = %id, "Clinical test removed");
        Ok(())
    }

    async fn query_clinical_tests(
        &self,
        filter: &ClinicalTestFilter,
    ) -> Result<Vec<ClinicalTest>> {
        let filter = filter.clone();
        self.scan(CLINICAL_TESTS_TABLE, move |c: &ClinicalTest| {
            filter.matches(c)
        })
        .await
    }
}

// RedbStore is auto Send + Sync: Arc<Database>, DatabaseMetadata, PathBuf
// and SyncMode are all Send + Sync.
