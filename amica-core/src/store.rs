//! Persona persistence — SQLite-backed profile storage plus an in-memory
//! store for tests.
//!
//! Each profile is serialised to JSON and stored in a BLOB column:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS persona_profiles (
//!     npc_id     TEXT PRIMARY KEY,
//!     data       BLOB NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     checksum   TEXT
//! );
//! ```
//!
//! WAL mode keeps reads cheap while turns are being written; JSON inside a
//! BLOB keeps the schema stable across profile-shape changes; an optional
//! CRC-32 checksum detects save corruption.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, info, warn};

use crate::config::PersistenceConfig;
use crate::error::{AmicaError, Result};
use crate::persona::{PersonaProfile, PROFILE_VERSION};
use crate::types::NpcId;

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// Storage backend for persona profiles.
pub trait PersonaStore: Send + Sync {
    /// Load a profile, or seed a fresh one when none exists.
    ///
    /// # Errors
    /// Returns an error on backend failure or an unreadable profile.
    fn load_or_seed(&self, npc_id: NpcId, name: &str) -> Result<PersonaProfile>;

    /// Save (upsert) a profile.
    ///
    /// # Errors
    /// Returns an error on backend failure.
    fn save(&self, profile: &PersonaProfile) -> Result<()>;

    /// Delete a profile. Returns `true` if one existed.
    ///
    /// # Errors
    /// Returns an error on backend failure.
    fn delete(&self, npc_id: NpcId) -> Result<bool>;

    /// All stored persona IDs.
    ///
    /// # Errors
    /// Returns an error on backend failure.
    fn list(&self) -> Result<Vec<NpcId>>;
}

fn check_version(profile: &PersonaProfile) -> Result<()> {
    if profile.version > PROFILE_VERSION {
        return Err(AmicaError::UnsupportedVersion {
            found: profile.version,
            supported: PROFILE_VERSION,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// HashMap-backed store for tests and the "memory" backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    profiles: RwLock<HashMap<NpcId, PersonaProfile>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersonaStore for MemoryStore {
    fn load_or_seed(&self, npc_id: NpcId, name: &str) -> Result<PersonaProfile> {
        if let Some(profile) = self.profiles.read().get(&npc_id) {
            check_version(profile)?;
            return Ok(profile.clone().migrated());
        }
        Ok(PersonaProfile::seed(npc_id, name))
    }

    fn save(&self, profile: &PersonaProfile) -> Result<()> {
        self.profiles.write().insert(profile.npc_id, profile.clone());
        Ok(())
    }

    fn delete(&self, npc_id: NpcId) -> Result<bool> {
        Ok(self.profiles.write().remove(&npc_id).is_some())
    }

    fn list(&self) -> Result<Vec<NpcId>> {
        Ok(self.profiles.read().keys().copied().collect())
    }
}

// ---------------------------------------------------------------------------
// CRC-32 checksum helper
// ---------------------------------------------------------------------------

fn crc32_hex(data: &[u8]) -> String {
    format!("{:08x}", crc32_compute(data))
}

/// Basic CRC-32 (ISO 3309 / ITU-T V.42) computation.
fn crc32_compute(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            if crc & 1 == 1 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// SQLite store
// ---------------------------------------------------------------------------

/// Handle to an open SQLite database that stores persona profiles.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    config: PersistenceConfig,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS persona_profiles (
    npc_id     TEXT PRIMARY KEY,
    data       BLOB NOT NULL,
    updated_at TEXT NOT NULL,
    checksum   TEXT
);";

impl SqliteStore {
    /// Open (or create) the database at `path`, creating the schema and
    /// enabling WAL mode when configured.
    ///
    /// # Errors
    /// Returns [`AmicaError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let existing = db_path.exists();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        let store = Self {
            conn: Mutex::new(conn),
            config: config.clone(),
            db_path,
        };

        // A pre-existing database gets checked and snapshotted before this
        // process writes to it; a fresh file has nothing worth keeping.
        if existing {
            if !store.integrity_check()? {
                warn!(
                    path = %store.db_path.display(),
                    "integrity check failed on existing database"
                );
            }
            if let Err(e) = store.create_rotating_backup() {
                warn!(
                    path = %store.db_path.display(),
                    error = %e,
                    "startup backup failed"
                );
            }
        }

        info!(
            path = %store.db_path.display(),
            wal = config.wal_mode,
            existing,
            "persona store opened"
        );
        Ok(store)
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// # Errors
    /// Returns [`AmicaError::Database`] on SQLite failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            config: config.clone(),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Path to the database file (or `:memory:`).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Run `PRAGMA integrity_check`; `Ok(false)` means corruption.
    ///
    /// # Errors
    /// Returns [`AmicaError::Database`] if the check itself fails.
    pub fn integrity_check(&self) -> Result<bool> {
        let result: String =
            self.conn
                .lock()
                .query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }

    /// Copy the database to `dest_path` with SQLite's online-backup API.
    /// Safe to call while the database is in use.
    ///
    /// # Errors
    /// Returns [`AmicaError::Database`] or [`AmicaError::Io`] on failure.
    pub fn backup<P: AsRef<Path>>(&self, dest_path: P) -> Result<()> {
        let start = Instant::now();
        let conn = self.conn.lock();
        let mut dest = Connection::open(dest_path.as_ref())?;
        let backup = rusqlite::backup::Backup::new(&conn, &mut dest)?;
        backup.run_to_completion(256, std::time::Duration::from_millis(50), None)?;
        info!(
            dest = %dest_path.as_ref().display(),
            elapsed_ms = start.elapsed().as_millis(),
            "database backup completed"
        );
        Ok(())
    }

    /// Create a numbered backup alongside the database file, keeping at
    /// most `config.backup_count`.
    ///
    /// # Errors
    /// Returns [`AmicaError::Database`] or [`AmicaError::Io`] on failure.
    pub fn create_rotating_backup(&self) -> Result<()> {
        if self.db_path.as_os_str() == ":memory:" {
            return Ok(());
        }
        let max = self.config.backup_count;
        if max == 0 {
            return Ok(());
        }

        // Rotate highest-numbered first so nothing is overwritten.
        for i in (1..max).rev() {
            let src = self.backup_path(i);
            let dst = self.backup_path(i + 1);
            if src.exists() {
                std::fs::rename(&src, &dst)?;
            }
        }
        let oldest = self.backup_path(max + 1);
        if oldest.exists() {
            std::fs::remove_file(&oldest)?;
        }
        self.backup(self.backup_path(1))?;
        Ok(())
    }

    fn backup_path(&self, n: u32) -> PathBuf {
        let mut p = self.db_path.clone();
        let ext = format!(
            "{}.bak.{n}",
            p.extension()
                .map_or(String::new(), |e| e.to_string_lossy().into_owned())
        );
        p.set_extension(ext);
        p
    }
}

impl PersonaStore for SqliteStore {
    fn load_or_seed(&self, npc_id: NpcId, name: &str) -> Result<PersonaProfile> {
        let start = Instant::now();
        let id_str = npc_id.to_string();
        let conn = self.conn.lock();

        let mut stmt = conn
            .prepare_cached("SELECT data, checksum FROM persona_profiles WHERE npc_id = ?1")?;
        let row: Option<(Vec<u8>, Option<String>)> = stmt
            .query_row(params![id_str], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;

        let Some((data, stored_checksum)) = row else {
            debug!(npc = %npc_id, "no stored profile, seeding");
            return Ok(PersonaProfile::seed(npc_id, name));
        };

        if self.config.checksum_enabled {
            if let Some(ref expected) = stored_checksum {
                let actual = crc32_hex(&data);
                if *expected != actual {
                    warn!(
                        npc = %npc_id,
                        expected = %expected,
                        actual = %actual,
                        "checksum mismatch, possible save corruption"
                    );
                }
            }
        }

        let profile: PersonaProfile =
            serde_json::from_slice(&data).map_err(|e| AmicaError::Serialization(e.to_string()))?;
        check_version(&profile)?;

        debug!(
            npc = %npc_id,
            elapsed_us = start.elapsed().as_micros(),
            "profile loaded"
        );
        Ok(profile.migrated())
    }

    fn save(&self, profile: &PersonaProfile) -> Result<()> {
        let start = Instant::now();
        let json =
            serde_json::to_vec(profile).map_err(|e| AmicaError::Serialization(e.to_string()))?;
        let checksum = self.config.checksum_enabled.then(|| crc32_hex(&json));
        let now = Utc::now().to_rfc3339();
        let id_str = profile.npc_id.to_string();

        self.conn.lock().execute(
            "INSERT INTO persona_profiles (npc_id, data, updated_at, checksum)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(npc_id) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at,
                checksum = excluded.checksum",
            params![id_str, json, now, checksum],
        )?;

        debug!(
            npc = %profile.npc_id,
            bytes = json.len(),
            interactions = profile.interaction_count,
            elapsed_us = start.elapsed().as_micros(),
            "profile saved"
        );
        Ok(())
    }

    fn delete(&self, npc_id: NpcId) -> Result<bool> {
        let deleted = self.conn.lock().execute(
            "DELETE FROM persona_profiles WHERE npc_id = ?1",
            params![npc_id.to_string()],
        )?;
        Ok(deleted > 0)
    }

    fn list(&self) -> Result<Vec<NpcId>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached("SELECT npc_id FROM persona_profiles")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut ids = Vec::new();
        for row in rows {
            let id_str = row?;
            if let Ok(uuid) = uuid::Uuid::parse_str(&id_str) {
                ids.push(NpcId(uuid));
            } else {
                warn!(id = %id_str, "skipping row with invalid UUID");
            }
        }
        Ok(ids)
    }
}

/// Extension trait that adds an `.optional()` combinator to `rusqlite::Result`.
trait OptionalExt<T> {
    /// Convert `QueryReturnedNoRows` into `Ok(None)`.
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfig;
    use crate::memory::{EpisodeEntry, Intensity};
    use crate::types::Mood;

    fn test_config() -> PersistenceConfig {
        PersistenceConfig::default()
    }

    fn sample_profile() -> PersonaProfile {
        let mut profile = PersonaProfile::seed(NpcId::new(), "Luna");
        profile.interaction_count = 7;
        profile.memory.push_episode(
            EpisodeEntry::new(
                "Parlato del lavoro nuovo".to_string(),
                "conversation",
                Mood::Tender,
                Intensity::Medium,
            ),
            &MemoryConfig::default(),
        );
        profile
    }

    #[test]
    fn sqlite_round_trip() {
        let store = SqliteStore::open_in_memory(&test_config()).expect("open");
        let profile = sample_profile();
        store.save(&profile).expect("save");

        let loaded = store
            .load_or_seed(profile.npc_id, "Luna")
            .expect("load");
        assert_eq!(loaded.interaction_count, 7);
        assert_eq!(loaded.memory.episodes.len(), 1);
        assert_eq!(loaded.identity.name, "Luna");
    }

    #[test]
    fn missing_profile_is_seeded() {
        let store = SqliteStore::open_in_memory(&test_config()).expect("open");
        let npc = NpcId::new();
        let profile = store.load_or_seed(npc, "Mara").expect("seed");
        assert_eq!(profile.npc_id, npc);
        assert_eq!(profile.identity.name, "Mara");
        assert_eq!(profile.interaction_count, 0);
    }

    #[test]
    fn upsert_overwrites() {
        let store = SqliteStore::open_in_memory(&test_config()).expect("open");
        let mut profile = sample_profile();
        store.save(&profile).expect("save1");
        profile.interaction_count = 20;
        store.save(&profile).expect("save2");

        let loaded = store.load_or_seed(profile.npc_id, "Luna").expect("load");
        assert_eq!(loaded.interaction_count, 20);
    }

    #[test]
    fn delete_and_list() {
        let store = SqliteStore::open_in_memory(&test_config()).expect("open");
        let a = sample_profile();
        let b = sample_profile();
        store.save(&a).expect("save a");
        store.save(&b).expect("save b");
        assert_eq!(store.list().expect("list").len(), 2);

        assert!(store.delete(a.npc_id).expect("delete"));
        assert!(!store.delete(a.npc_id).expect("delete again"));
        assert_eq!(store.list().expect("list").len(), 1);
    }

    #[test]
    fn future_version_is_rejected() {
        let store = SqliteStore::open_in_memory(&test_config()).expect("open");
        let mut profile = sample_profile();
        profile.version = PROFILE_VERSION + 1;
        store.save(&profile).expect("save");

        let err = store
            .load_or_seed(profile.npc_id, "Luna")
            .expect_err("future version must be rejected");
        assert!(matches!(err, AmicaError::UnsupportedVersion { .. }));
    }

    #[test]
    fn checksum_mismatch_still_loads() {
        let store = SqliteStore::open_in_memory(&test_config()).expect("open");
        let profile = sample_profile();
        store.save(&profile).expect("save");

        store
            .conn
            .lock()
            .execute(
                "UPDATE persona_profiles SET checksum = 'deadbeef' WHERE npc_id = ?1",
                params![profile.npc_id.to_string()],
            )
            .expect("corrupt checksum");

        // Warning is logged; data is still returned.
        let loaded = store.load_or_seed(profile.npc_id, "Luna").expect("load");
        assert_eq!(loaded.interaction_count, 7);
    }

    #[test]
    fn file_based_open_and_backup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("amica.db");
        let store = SqliteStore::open(&db_path, &test_config()).expect("open");
        let profile = sample_profile();
        store.save(&profile).expect("save");

        let backup_path = dir.path().join("amica_backup.db");
        store.backup(&backup_path).expect("backup");

        let restored = SqliteStore::open(&backup_path, &test_config()).expect("open backup");
        let loaded = restored.load_or_seed(profile.npc_id, "Luna").expect("load");
        assert_eq!(loaded.interaction_count, 7);
    }

    #[test]
    fn rotating_backup_keeps_at_most_n() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("amica.db");
        let store = SqliteStore::open(&db_path, &test_config()).expect("open");
        store.save(&sample_profile()).expect("save");

        store.create_rotating_backup().expect("backup 1");
        store.create_rotating_backup().expect("backup 2");
        store.create_rotating_backup().expect("backup 3");

        assert!(dir.path().join("amica.db.bak.1").exists());
        assert!(dir.path().join("amica.db.bak.2").exists());
        assert!(!dir.path().join("amica.db.bak.3").exists());
    }

    #[test]
    fn reopen_snapshots_the_existing_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("amica.db");
        let profile = sample_profile();
        {
            let store = SqliteStore::open(&db_path, &test_config()).expect("open");
            store.save(&profile).expect("save");
        }
        // A fresh file is not worth snapshotting.
        assert!(!dir.path().join("amica.db.bak.1").exists());

        let store = SqliteStore::open(&db_path, &test_config()).expect("reopen");
        assert!(dir.path().join("amica.db.bak.1").exists());
        let loaded = store.load_or_seed(profile.npc_id, "Luna").expect("load");
        assert_eq!(loaded.interaction_count, 7);
    }

    #[test]
    fn integrity_check_passes() {
        let store = SqliteStore::open_in_memory(&test_config()).expect("open");
        assert!(store.integrity_check().expect("check"));
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        let profile = sample_profile();
        store.save(&profile).expect("save");
        let loaded = store.load_or_seed(profile.npc_id, "Luna").expect("load");
        assert_eq!(loaded.interaction_count, 7);
        assert!(store.delete(profile.npc_id).expect("delete"));
        assert!(store.list().expect("list").is_empty());
    }

    #[test]
    fn crc32_known_vector() {
        // CRC-32 of "123456789" = 0xCBF43926
        assert_eq!(crc32_compute(b"123456789"), 0xCBF4_3926);
    }
}
