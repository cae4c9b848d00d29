//! JSON document store.
//!
//! Every logical key lives in its own `<key>.json` under one directory.
//! Loads never fail: a missing file is the default value and a corrupt one
//! is logged and replaced by the default. Saves go through a temporary file
//! and a rename.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classifier::ChatEvent;
use crate::event::RoomSnapshot;
use crate::settings::Settings;
use crate::trigger::Trigger;

/// Logical document names.
pub mod keys {
    pub const CHATLOG: &str = "chatlog";
    pub const CHAT_MEMBERS: &str = "chat_members";
    pub const LAST_SEEN: &str = "last_seen";
    pub const TRIGGERS: &str = "triggers";
    pub const FAVORITES: &str = "favorites";
    pub const HYPERLINKS: &str = "hyperlinks";
    pub const SETTINGS: &str = "settings";
}

/// Serialized size above which the chat log is trimmed.
pub const CHATLOG_LIMIT: usize = 1 << 30;

/// Errors emitted while reading or writing the store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage IO failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage JSON failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `$HOME/.config/telechat`, or a directory under the temp dir when
    /// `HOME` is unset.
    pub fn default_root() -> PathBuf {
        if let Ok(home) = std::env::var("HOME") {
            return Path::new(&home).join(".config").join("telechat");
        }

        std::env::temp_dir().join("telechat")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// Load `key`, `Ok(None)` when it was never saved.
    pub fn try_load<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, StorageError> {
        let data = match fs::read_to_string(self.path(key)) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(None);
            },
            Err(err) => return Err(err.into()),
        };

        Ok(Some(serde_json::from_str(&data)?))
    }

    /// Load `key`, falling back to the default on any failure.
    pub fn load<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.try_load(key) {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(err) => {
                warn!("ignoring unreadable {key}: {err}");
                T::default()
            },
        }
    }

    pub fn save<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        let payload = serde_json::to_string_pretty(value)?;
        write_atomic(&self.path(key), payload.as_bytes())?;
        debug!("[storage] saved {key}");
        Ok(())
    }

    pub fn settings(&self) -> Settings {
        self.load(keys::SETTINGS)
    }

    pub fn save_settings(
        &self,
        settings: &Settings,
    ) -> Result<(), StorageError> {
        self.save(keys::SETTINGS, settings)
    }

    pub fn triggers(&self) -> Vec<Trigger> {
        self.load(keys::TRIGGERS)
    }

    pub fn save_triggers(
        &self,
        triggers: &[Trigger],
    ) -> Result<(), StorageError> {
        self.save(keys::TRIGGERS, triggers)
    }

    pub fn favorites(&self) -> Vec<String> {
        self.load(keys::FAVORITES)
    }

    pub fn save_favorites(
        &self,
        favorites: &[String],
    ) -> Result<(), StorageError> {
        self.save(keys::FAVORITES, favorites)
    }

    /// Append one chat message to its sender's history.
    pub fn append_chat(&self, event: &ChatEvent) -> Result<(), StorageError> {
        let mut log: ChatLog = self.load(keys::CHATLOG);
        log.append(event);
        log.trim_to(CHATLOG_LIMIT)?;
        self.save(keys::CHATLOG, &log)
    }

    /// Remember links seen in chat, without duplicates.
    pub fn record_hyperlinks(
        &self,
        urls: &[String],
    ) -> Result<(), StorageError> {
        if urls.is_empty() {
            return Ok(());
        }

        let mut known: Vec<String> = self.load(keys::HYPERLINKS);
        let mut changed = false;
        for url in urls {
            if !known.contains(url) {
                known.push(url.clone());
                changed = true;
            }
        }
        if changed {
            self.save(keys::HYPERLINKS, &known)?;
        }
        Ok(())
    }

    /// Merge the visible members of `snapshot` into the member set and stamp
    /// their last-seen time.
    pub fn record_members(
        &self,
        snapshot: &RoomSnapshot,
        now: DateTime<Local>,
    ) -> Result<(), StorageError> {
        let stored: Vec<String> = self.load(keys::CHAT_MEMBERS);
        let mut members: BTreeSet<String> = stored.into_iter().collect();
        let mut last_seen: BTreeMap<String, DateTime<Local>> =
            self.load(keys::LAST_SEEN);

        for member in snapshot.visible_members() {
            members.insert(member.to_string());
            last_seen.insert(member.to_string(), now);
        }

        let members: Vec<String> = members.into_iter().collect();
        self.save(keys::CHAT_MEMBERS, &members)?;
        self.save(keys::LAST_SEEN, &last_seen)
    }
}

/// Per-sender chat history, oldest line first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatLog(pub BTreeMap<String, Vec<String>>);

impl ChatLog {
    pub fn append(&mut self, event: &ChatEvent) {
        self.0
            .entry(event.sender.clone())
            .or_default()
            .push(event.log_line());
    }

    pub fn serialized_len(&self) -> Result<usize, StorageError> {
        Ok(serde_json::to_vec(&self.0)?.len())
    }

    /// Evict oldest lines until the compact JSON form fits in `limit`.
    ///
    /// Each round visits the senders largest bucket first and drops one line
    /// from each, so heavy talkers lose history before quiet ones. Buckets
    /// that run empty are removed. Returns the number of evicted lines.
    pub fn trim_to(&mut self, limit: usize) -> Result<usize, StorageError> {
        let mut size = self.serialized_len()?;
        let mut evicted = 0;

        while size > limit && !self.0.is_empty() {
            let mut order: Vec<(String, usize)> = self
                .0
                .iter()
                .map(|(sender, lines)| (sender.clone(), lines.len()))
                .collect();
            order.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

            for (sender, _) in order {
                if size <= limit {
                    break;
                }
                let buckets = self.0.len();
                let Some(lines) = self.0.get_mut(&sender) else {
                    continue;
                };
                if !lines.is_empty() {
                    let line = lines.remove(0);
                    evicted += 1;
                    size -= encoded_len(&line)?;
                    if !lines.is_empty() {
                        // The comma that separated it from its neighbour.
                        size -= 1;
                        continue;
                    }
                }

                // `"sender":[]` plus the comma before the next entry.
                self.0.remove(&sender);
                size -= encoded_len(&sender)? + 3;
                if buckets > 1 {
                    size -= 1;
                }
            }
        }

        if evicted > 0 {
            debug!("[storage] trimmed {evicted} chat lines");
        }
        Ok(evicted)
    }
}

fn encoded_len(value: &str) -> Result<usize, StorageError> {
    Ok(serde_json::to_string(value)?.len())
}

fn write_atomic(path: &Path, payload: &[u8]) -> Result<(), std::io::Error> {
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, payload)?;
    fs::rename(tmp_path, path)?;
    Ok(())
}
