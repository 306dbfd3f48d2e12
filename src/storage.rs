use std::{collections::HashMap, fs, path::Path};

use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use sled::{Db, Tree};
use tracing::warn;

use crate::models::ReportNote;

const SETTINGS_TREE: &str = "settings";
const NOTES_TREE: &str = "report_notes";
const AUTH_TOKEN_KEY: &str = "auth_token";

/// Key/value persistence for user preferences.
pub trait SettingsStore: Send + Sync {
    fn load_setting(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn save_setting(&self, key: &str, value: &[u8]) -> Result<()>;
}

/// Opaque bearer credentials for the API session.
pub trait CredentialStore: Send + Sync {
    fn token(&self) -> Option<String>;
    fn store_token(&self, token: &str) -> Result<()>;
    fn clear_token(&self) -> Result<()>;
}

/// Local, per-report staff notes. Never sent to the API.
pub trait NoteStore: Send + Sync {
    fn load_notes(&self) -> Result<HashMap<i64, ReportNote>>;
    fn upsert_note(&self, report_id: i64, note: &ReportNote) -> Result<()>;
    fn remove_note(&self, report_id: i64) -> Result<()>;
}

fn encode_report_key(report_id: i64) -> [u8; 8] {
    report_id.to_be_bytes()
}

fn decode_report_key(bytes: &[u8]) -> Option<i64> {
    let buf: [u8; 8] = bytes.try_into().ok()?;
    Some(i64::from_be_bytes(buf))
}

/// Sets or clears the note for a report; an empty memo removes it.
pub fn save_note(store: &dyn NoteStore, report_id: i64, memo: &str) -> Result<Option<ReportNote>> {
    let trimmed = memo.trim();
    if trimmed.is_empty() {
        store.remove_note(report_id)?;
        return Ok(None);
    }
    let note = ReportNote {
        memo: trimmed.to_string(),
        updated_at: Utc::now(),
    };
    store.upsert_note(report_id, &note)?;
    Ok(Some(note))
}

pub struct LocalStore {
    db: Db,
    settings: Tree,
    notes: Tree,
}

impl LocalStore {
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create local store dir {:?}", dir))?;
        let path = dir.join("local.db");
        let db = sled::open(&path)
            .with_context(|| format!("failed to open local store at {:?}", path))?;
        let settings = db
            .open_tree(SETTINGS_TREE)
            .context("failed to open settings tree")?;
        let notes = db
            .open_tree(NOTES_TREE)
            .context("failed to open report notes tree")?;
        Ok(Self {
            db,
            settings,
            notes,
        })
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush().context("failed to flush local store")?;
        Ok(())
    }
}

impl SettingsStore for LocalStore {
    fn load_setting(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self
            .settings
            .get(key)
            .with_context(|| format!("failed to read setting {key}"))?;
        Ok(value.map(|v| v.to_vec()))
    }

    fn save_setting(&self, key: &str, value: &[u8]) -> Result<()> {
        self.settings
            .insert(key, value)
            .with_context(|| format!("failed to persist setting {key}"))?;
        self.settings
            .flush()
            .with_context(|| format!("failed to flush setting {key}"))?;
        Ok(())
    }
}

impl CredentialStore for LocalStore {
    fn token(&self) -> Option<String> {
        match self.settings.get(AUTH_TOKEN_KEY) {
            Ok(Some(value)) => String::from_utf8(value.to_vec()).ok(),
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, "failed to read stored credentials");
                None
            }
        }
    }

    fn store_token(&self, token: &str) -> Result<()> {
        self.save_setting(AUTH_TOKEN_KEY, token.as_bytes())
    }

    fn clear_token(&self) -> Result<()> {
        self.settings
            .remove(AUTH_TOKEN_KEY)
            .context("failed to clear stored credentials")?;
        self.settings
            .flush()
            .context("failed to flush credentials removal")?;
        Ok(())
    }
}

impl NoteStore for LocalStore {
    fn load_notes(&self) -> Result<HashMap<i64, ReportNote>> {
        let mut map = HashMap::new();
        for result in self.notes.iter() {
            let (key, value) = result.context("failed to iterate report notes")?;
            let Some(report_id) = decode_report_key(key.as_ref()) else {
                continue;
            };
            let note: ReportNote = serde_json::from_slice(&value)
                .with_context(|| format!("failed to deserialize note for report {}", report_id))?;
            map.insert(report_id, note);
        }
        Ok(map)
    }

    fn upsert_note(&self, report_id: i64, note: &ReportNote) -> Result<()> {
        let value = serde_json::to_vec(note)
            .with_context(|| format!("failed to serialize note for report {}", report_id))?;
        self.notes
            .insert(encode_report_key(report_id), value)
            .with_context(|| format!("failed to persist note for report {}", report_id))?;
        self.notes
            .flush()
            .with_context(|| format!("failed to flush note for report {}", report_id))?;
        Ok(())
    }

    fn remove_note(&self, report_id: i64) -> Result<()> {
        self.notes
            .remove(encode_report_key(report_id))
            .with_context(|| format!("failed to delete note for report {}", report_id))?;
        self.notes
            .flush()
            .with_context(|| format!("failed to flush notes while deleting report {}", report_id))?;
        Ok(())
    }
}

/// In-process store for ephemeral sessions and tests.
#[derive(Default)]
pub struct MemoryStore {
    settings: Mutex<HashMap<String, Vec<u8>>>,
    token: RwLock<Option<String>>,
    notes: Mutex<HashMap<i64, ReportNote>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        let store = Self::default();
        *store.token.write() = Some(token.to_string());
        store
    }
}

impl SettingsStore for MemoryStore {
    fn load_setting(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.settings.lock().get(key).cloned())
    }

    fn save_setting(&self, key: &str, value: &[u8]) -> Result<()> {
        self.settings.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

impl CredentialStore for MemoryStore {
    fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn store_token(&self, token: &str) -> Result<()> {
        *self.token.write() = Some(token.to_string());
        Ok(())
    }

    fn clear_token(&self) -> Result<()> {
        *self.token.write() = None;
        Ok(())
    }
}

impl NoteStore for MemoryStore {
    fn load_notes(&self) -> Result<HashMap<i64, ReportNote>> {
        Ok(self.notes.lock().clone())
    }

    fn upsert_note(&self, report_id: i64, note: &ReportNote) -> Result<()> {
        self.notes.lock().insert(report_id, note.clone());
        Ok(())
    }

    fn remove_note(&self, report_id: i64) -> Result<()> {
        self.notes.lock().remove(&report_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_keys_round_trip() {
        for id in [0_i64, 1, 42, i64::MAX] {
            assert_eq!(decode_report_key(&encode_report_key(id)), Some(id));
        }
        assert_eq!(decode_report_key(&[1, 2, 3]), None);
    }

    #[test]
    fn local_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = LocalStore::open(dir.path()).unwrap();
            store.store_token("secret-token").unwrap();
            store.save_setting("theme", br#"{"mode":"dark"}"#).unwrap();
            save_note(&store, 12, "  appeler le témoin  ").unwrap();
            save_note(&store, 13, "à vérifier").unwrap();
            store.flush().unwrap();
        }

        let store = LocalStore::open(dir.path()).unwrap();
        assert_eq!(store.token().as_deref(), Some("secret-token"));
        assert_eq!(
            store.load_setting("theme").unwrap().as_deref(),
            Some(&br#"{"mode":"dark"}"#[..])
        );
        let notes = store.load_notes().unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[&12].memo, "appeler le témoin");

        store.clear_token().unwrap();
        assert_eq!(store.token(), None);
    }

    #[test]
    fn empty_memo_removes_note() {
        let store = MemoryStore::new();
        assert!(save_note(&store, 5, "suivi").unwrap().is_some());
        assert!(save_note(&store, 5, "   ").unwrap().is_none());
        assert!(store.load_notes().unwrap().is_empty());
    }
}
