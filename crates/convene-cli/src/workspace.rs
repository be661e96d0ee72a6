//! On-disk state shared by every command: engine config plus the event
//! registry snapshot at `<data_dir>/events.json`.
//!
//! Commands load, change and save the whole snapshot, so each one runs
//! while holding an exclusive advisory lock on `<data_dir>/events.lock`.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use convene_core::{data_dir, EngineConfig, EventRegistry, RegistrySnapshot};
use serde::Serialize;

/// Run `f` while holding the data directory's exclusive lock.
///
/// Blocks until any other `convene` process working on the same directory
/// has finished.
pub fn locked<T>(
    f: impl FnOnce() -> Result<T, Box<dyn std::error::Error>>,
) -> Result<T, Box<dyn std::error::Error>> {
    let path = data_dir()?.join("events.lock");
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&path)?;
    let mut lock = fd_lock::RwLock::new(file);
    let _guard = lock.write()?;
    tracing::trace!(path = %path.display(), "workspace lock acquired");
    f()
}

pub struct Workspace {
    pub config: EngineConfig,
    pub registry: EventRegistry,
    events_path: PathBuf,
}

impl Workspace {
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let config = EngineConfig::load()?;
        let events_path = data_dir()?.join("events.json");

        let snapshot = match std::fs::read_to_string(&events_path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => RegistrySnapshot::default(),
            Err(e) => return Err(e.into()),
        };
        let registry = EventRegistry::from_snapshot(config.optimizer.clone(), snapshot)?;

        Ok(Self {
            config,
            registry,
            events_path,
        })
    }

    /// Write the registry back, replacing the previous file in one rename.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_json::to_string_pretty(&self.registry.snapshot())?;
        let dir = self
            .events_path
            .parent()
            .ok_or("events file has no parent directory")?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(&self.events_path)?;
        tracing::debug!(path = %self.events_path.display(), "registry saved");
        Ok(())
    }

    pub fn print<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), Box<dyn std::error::Error>> {
        let json = if self.config.output.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        println!("{json}");
        Ok(())
    }
}
