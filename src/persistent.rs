//!
//! src/persistent.rs
//!
//! Defines the track store: the whole catalogue lives in memory as a
//! mapping from identifier to track and is rewritten to its JSON file
//! after every mutation
//!

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, error, info};

use crate::config::CatalogConfig;
use crate::errors::CatalogError;
use crate::ids::{Clock, IdGenerator};
use crate::schema::{self, SchemaVersion};
use crate::types::{SortKey, Track, TrackFields, TrackId};

pub struct TrackStore {
    path: PathBuf,
    tracks: BTreeMap<TrackId, Track>,
    loaded_schema: SchemaVersion,
    pretty: bool,
    clock: Box<dyn Clock>,
    ids: Box<dyn IdGenerator>,
}

impl TrackStore {

    /// Opens the configured file, creating it when allowed and rewriting
    /// legacy shapes when asked to
    pub fn init(
        cfg: &CatalogConfig,
        clock: Box<dyn Clock>,
        ids: Box<dyn IdGenerator>,
    ) -> Result<Self, CatalogError> {
        if cfg.create_if_missing && !cfg.path.exists() {
            return Self::create(cfg, clock, ids);
        }

        let mut store = Self::open(cfg, clock, ids)?;
        if cfg.migrate_on_open && !store.loaded_schema.is_current() {
            store.migrate()?;
        }
        Ok( store )
    }

    /// Loads an existing file; a missing file is an error
    pub fn open(
        cfg: &CatalogConfig,
        clock: Box<dyn Clock>,
        mut ids: Box<dyn IdGenerator>,
    ) -> Result<Self, CatalogError> {
        let (tracks, loaded_schema) = Self::load(&cfg.path, clock.now(), &mut *ids)?;
        info!(
            path = %cfg.path.display(), count = tracks.len(),
            schema = loaded_schema.as_str(), "store.load"
        );

        Ok( Self {
            path: cfg.path.clone(),
            tracks,
            loaded_schema,
            pretty: cfg.pretty_json,
            clock,
            ids,
        })
    }

    /// Writes a new empty document; refuses to replace an existing file
    pub fn create(
        cfg: &CatalogConfig,
        clock: Box<dyn Clock>,
        ids: Box<dyn IdGenerator>,
    ) -> Result<Self, CatalogError> {
        let store = Self {
            path: cfg.path.clone(),
            tracks: BTreeMap::new(),
            loaded_schema: SchemaVersion::CURRENT,
            pretty: cfg.pretty_json,
            clock,
            ids,
        };
        store.write_document(false)?;
        info!(path = %store.path.display(), "store.create");
        Ok( store )
    }

    /// Reads and decodes the backing file without keeping it open
    pub fn load(
        path: &Path,
        now: i64,
        ids: &mut dyn IdGenerator,
    ) -> Result<(BTreeMap<TrackId, Track>, SchemaVersion), CatalogError> {
        let bytes = fs::read(path).map_err(|source| CatalogError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let doc: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| CatalogError::Parse(format!("{}: {e}", path.display())))?;

        schema::decode(doc, now, ids)
    }

    /// Serializes the whole mapping and replaces the backing file
    pub fn save(&self) -> Result<(), CatalogError> {
        self.write_document(true)?;
        info!(path = %self.path.display(), count = self.tracks.len(), "store.save");
        Ok(())
    }

    /// Rewrites a legacy-shaped file in the current shape
    pub fn migrate(&mut self) -> Result<(), CatalogError> {
        let from = self.loaded_schema;
        self.save()?;
        self.loaded_schema = SchemaVersion::CURRENT;
        info!(
            path = %self.path.display(), from = from.as_str(),
            to = SchemaVersion::CURRENT.as_str(), "store.migrate"
        );
        Ok(())
    }

    fn write_document(&self, overwrite: bool) -> Result<(), CatalogError> {
        let persist_err = |reason: String| CatalogError::Persist {
            path: self.path.clone(),
            reason,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = NamedTempFile::new_in(dir)
            .map_err(|e| persist_err(format!("tempfile in {}: {e}", dir.display())))?;

        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            let document = schema::encode(&self.tracks);
            let written = if self.pretty {
                serde_json::to_writer_pretty(&mut writer, &document)
            } else {
                serde_json::to_writer(&mut writer, &document)
            };
            written.map_err(|e| persist_err(format!("serialize json: {e}")))?;
            writer.write_all(b"\n")
                .and_then(|()| writer.flush())
                .map_err(|e| persist_err(format!("write: {e}")))?;
        }

        temp.as_file()
            .sync_all()
            .map_err(|e| persist_err(format!("sync: {e}")))?;

        if overwrite {
            temp.persist(&self.path).map_err(|e| persist_err(e.to_string()))?;
        } else {
            temp.persist_noclobber(&self.path).map_err(|e| persist_err(e.to_string()))?;
        }
        Ok(())
    }

    /// Inserts or overwrites a track and persists the store. Without an
    /// identifier a fresh one is drawn from the generator. A failed save
    /// puts the mapping back the way it was.
    pub fn add(
        &mut self,
        fields: TrackFields,
        id: Option<TrackId>,
    ) -> Result<TrackId, CatalogError> {
        let now = self.clock.now();
        let id = match id {
            Some(id) => id,
            None => self.ids.next_id(now, &self.tracks)?,
        };

        let previous = self.tracks.insert(id, Track { fields, id, last_change: now });

        if let Err(e) = self.save() {
            match previous {
                Some(track) => { self.tracks.insert(id, track); },
                None => { self.tracks.remove(&id); },
            }
            error!(id = %id, error = %e, "store.add.rollback");
            return Err(e);
        }

        info!(id = %id, replaced = previous.is_some(), "store.add");
        Ok(id)
    }

    /// Like `add` with an identifier, but only for tracks that exist
    pub fn update(&mut self, id: TrackId, fields: TrackFields) -> Result<(), CatalogError> {
        if !self.tracks.contains_key(&id) {
            return Err(CatalogError::NotFound(id));
        }
        self.add(fields, Some(id)).map(|_| ())
    }

    pub fn delete(&mut self, id: TrackId) -> Result<Track, CatalogError> {
        let removed = self.tracks.remove(&id).ok_or(CatalogError::NotFound(id))?;

        if let Err(e) = self.save() {
            self.tracks.insert(id, removed);
            error!(id = %id, error = %e, "store.delete.rollback");
            return Err(e);
        }

        info!(id = %id, "store.delete");
        Ok(removed)
    }

    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(&id)
    }

    pub fn contains(&self, id: TrackId) -> bool {
        self.tracks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Tracks keyed by identifier, in ascending identifier order
    #[cfg(test)]
    pub fn tracks(&self) -> &BTreeMap<TrackId, Track> {
        &self.tracks
    }

    pub fn sorted(&self, key: SortKey) -> Vec<&Track> {
        let mut all: Vec<&Track> = self.tracks.values().collect();
        all.sort_by(|a, b| key.compare(a, b));
        debug!(sort = key.as_str(), count = all.len(), "store.sorted");
        all
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn loaded_schema(&self) -> SchemaVersion {
        self.loaded_schema
    }
}
