//! JSON-file deadline store
//!
//! All timers share one document, `{ "<key>": <record>, ... }`. Each write
//! goes to a sibling temp file that is then renamed over the original, so a
//! crash mid-write leaves the previous document intact.

use std::{
    fs,
    path::PathBuf,
    sync::Mutex,
};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{parse_record, DeadlineRecord, DeadlineStore};
use crate::{
    error::{CountdownError, Result},
    state::Deadline,
};

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Read the whole document
    ///
    /// A missing file or one that is not a JSON object reads as empty. Any
    /// other read failure is returned, so callers never write over a document
    /// they could not see.
    fn read_all(&self) -> Result<Map<String, Value>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => {
                warn!(
                    "Deadline store {} is not a JSON object, ignoring its contents",
                    self.path.display()
                );
                Ok(Map::new())
            }
        }
    }

    fn write_all(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let body = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;
        debug!("Wrote {} deadline(s) to {}", map.len(), self.path.display());
        Ok(())
    }

    fn update<F>(&self, updater: F) -> Result<()>
    where
        F: FnOnce(&mut Map<String, Value>) -> Result<()>,
    {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| CountdownError::LockPoisoned("file store"))?;
        let mut map = self.read_all()?;
        updater(&mut map)?;
        self.write_all(&map)
    }
}

impl DeadlineStore for FileStore {
    fn load(&self, key: &str) -> Option<Deadline> {
        let _guard = self.lock.lock().ok()?;
        let map = match self.read_all() {
            Ok(map) => map,
            Err(e) => {
                warn!("Failed to read deadline store {}: {}", self.path.display(), e);
                return None;
            }
        };
        let value = map.get(key)?;
        let deadline = parse_record(value);
        if deadline.is_none() {
            warn!("Ignoring unreadable deadline record for {}", key);
        }
        deadline
    }

    fn save(&self, key: &str, deadline: Deadline) -> Result<()> {
        let value = DeadlineRecord::from_deadline(deadline).to_value()?;
        self.update(|map| {
            map.insert(key.to_string(), value);
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|map| {
            map.remove(key);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::CountdownDuration;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use tempfile::TempDir;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn survives_reopening() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("deadlines.json");
        let duration = CountdownDuration::from_secs(7200).unwrap();

        let created = FileStore::new(&path).get_or_create("timerState", duration, t0());

        // A fresh instance stands in for a reload
        let reopened = FileStore::new(&path);
        let resumed = reopened.get_or_create("timerState", duration, t0() + Duration::seconds(10));

        assert_eq!(created, resumed);
    }

    #[test]
    fn creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/dir/deadlines.json");
        let store = FileStore::new(&path);

        store.save("t", Deadline::at(t0())).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("deadlines.json");
        fs::write(&path, "not json at all").unwrap();

        let store = FileStore::new(&path);
        assert_eq!(store.load("timerState"), None);

        let duration = CountdownDuration::from_secs(60).unwrap();
        let deadline = store.get_or_create("timerState", duration, t0());
        assert_eq!(store.load("timerState"), Some(deadline));
    }

    #[test]
    fn reads_epoch_millis_entries() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("deadlines.json");
        let at = t0() + Duration::hours(24);
        fs::write(
            &path,
            format!(r#"{{"countdownEndTime": "{}"}}"#, at.timestamp_millis()),
        )
        .unwrap();

        let store = FileStore::new(&path);
        assert_eq!(store.load("countdownEndTime"), Some(Deadline::at(at)));
    }

    #[test]
    fn remove_keeps_other_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("deadlines.json"));
        store.save("A", Deadline::at(t0())).unwrap();
        store.save("B", Deadline::at(t0() + Duration::hours(1))).unwrap();

        store.remove("A").unwrap();

        assert_eq!(store.load("A"), None);
        assert_eq!(store.load("B"), Some(Deadline::at(t0() + Duration::hours(1))));
    }

    #[test]
    fn unreadable_file_is_never_overwritten() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("deadlines.json");
        let original = [0xff, 0xfe, 0xfd, b'{', b'}'];
        fs::write(&path, original).unwrap();

        let store = FileStore::new(&path);
        assert_eq!(store.load("timerState"), None);
        assert!(matches!(
            store.save("timerState", Deadline::at(t0())),
            Err(CountdownError::Io(_))
        ));
        assert!(store.remove("countdownEndTime").is_err());

        // get_or_create still hands out a deadline for this mount
        let duration = CountdownDuration::from_secs(60).unwrap();
        let deadline = store.get_or_create("timerState", duration, t0());
        assert_eq!(deadline, Deadline::starting_at(t0(), duration));

        assert_eq!(fs::read(&path).unwrap(), original);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
