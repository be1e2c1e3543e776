//! Directory-backed sink: staged in memory, durable on commit.

use sluice_domain::traits::{Relationship, Sink};
use sluice_domain::unit::{attr, mime};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors the directory sink can raise
#[derive(Debug, Error)]
pub enum SinkError {
    /// Filesystem error while flushing units
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Attribute sidecar failed to serialize
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One unit staged for commit
#[derive(Debug)]
struct StagedUnit {
    payload: Vec<u8>,
    attributes: BTreeMap<String, String>,
    source_uri: Option<String>,
}

/// Unit handle under construction
#[derive(Debug, Default)]
pub struct UnitDraft {
    payload: Vec<u8>,
    attributes: BTreeMap<String, String>,
    source_uri: Option<String>,
}

/// Sink that commits units as files in a directory
///
/// Transferred units stage in memory; `commit` writes each payload plus an
/// attribute sidecar, in transfer order, and `rollback` discards the stage
/// without touching the filesystem. That gives the run the transactional
/// contract the engine expects from its sink.
pub struct DirectorySink {
    dir: PathBuf,
    staged: Vec<StagedUnit>,
    flushed: usize,
}

impl DirectorySink {
    /// Sink committing into `dir`, created if missing
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            staged: Vec::new(),
            flushed: 0,
        })
    }

    /// Directory the sink commits into
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn unit_path(&self, sequence: usize, unit: &StagedUnit) -> PathBuf {
        let name = unit
            .attributes
            .get(attr::FILENAME)
            .or_else(|| unit.attributes.get(attr::UUID))
            .cloned()
            .unwrap_or_else(|| sequence.to_string());
        let extension = match unit.attributes.get(attr::MIME_TYPE).map(String::as_str) {
            Some(mime::CSV) => "csv",
            _ => "json",
        };
        // Colons from window-derived names are not portable filename
        // characters.
        let name = name.replace(':', "-");
        self.dir.join(format!("{:05}_{}.{}", sequence, name, extension))
    }
}

impl Sink for DirectorySink {
    type Error = SinkError;
    type Handle = UnitDraft;

    fn create(&mut self) -> Result<Self::Handle, Self::Error> {
        Ok(UnitDraft::default())
    }

    fn write(&mut self, handle: &mut Self::Handle, payload: &[u8]) -> Result<(), Self::Error> {
        handle.payload.extend_from_slice(payload);
        Ok(())
    }

    fn put_attributes(
        &mut self,
        handle: &mut Self::Handle,
        attributes: &BTreeMap<String, String>,
    ) -> Result<(), Self::Error> {
        handle
            .attributes
            .extend(attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    fn report_receive(
        &mut self,
        handle: &mut Self::Handle,
        source_uri: &str,
    ) -> Result<(), Self::Error> {
        handle.source_uri = Some(source_uri.to_string());
        Ok(())
    }

    fn transfer(
        &mut self,
        handle: Self::Handle,
        relationship: Relationship,
    ) -> Result<(), Self::Error> {
        if relationship == Relationship::Failure {
            warn!("Unit transferred to failure; it will not be committed");
            return Ok(());
        }
        self.staged.push(StagedUnit {
            payload: handle.payload,
            attributes: handle.attributes,
            source_uri: handle.source_uri,
        });
        Ok(())
    }

    fn commit(&mut self) -> Result<(), Self::Error> {
        let staged = std::mem::take(&mut self.staged);
        for unit in staged {
            let path = self.unit_path(self.flushed, &unit);
            std::fs::write(&path, &unit.payload)?;

            let mut sidecar = unit.attributes.clone();
            if let Some(source_uri) = &unit.source_uri {
                sidecar.insert("provenance.uri".to_string(), source_uri.clone());
            }
            std::fs::write(
                path.with_extension("attrs.json"),
                serde_json::to_string_pretty(&sidecar)?,
            )?;

            debug!(path = %path.display(), "Committed unit");
            self.flushed += 1;
        }
        info!(units = self.flushed, dir = %self.dir.display(), "Run committed");
        Ok(())
    }

    fn rollback(&mut self) {
        warn!(discarded = self.staged.len(), "Run rolled back; staged units discarded");
        self.staged.clear();
    }

    fn backoff(&mut self) {
        warn!("Host asked to back off before the next run");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage_one(sink: &mut DirectorySink, payload: &[u8], filename: Option<&str>) {
        let mut handle = sink.create().unwrap();
        sink.write(&mut handle, payload).unwrap();
        let mut attributes = BTreeMap::new();
        attributes.insert(attr::MIME_TYPE.to_string(), mime::JSON.to_string());
        if let Some(name) = filename {
            attributes.insert(attr::FILENAME.to_string(), name.to_string());
        }
        sink.put_attributes(&mut handle, &attributes).unwrap();
        sink.report_receive(&mut handle, "mongodb://localhost/cdp.users")
            .unwrap();
        sink.transfer(handle, Relationship::Success).unwrap();
    }

    #[test]
    fn test_commit_writes_payload_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path()).unwrap();

        stage_one(&mut sink, b"[{\"i\":1}]", Some("2024-01-01T00:00:00.000Z"));
        sink.commit().unwrap();

        let payload_path = dir.path().join("00000_2024-01-01T00-00-00.000Z.json");
        assert_eq!(std::fs::read(&payload_path).unwrap(), b"[{\"i\":1}]");

        let sidecar: BTreeMap<String, String> = serde_json::from_slice(
            &std::fs::read(payload_path.with_extension("attrs.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(
            sidecar.get("provenance.uri").unwrap(),
            "mongodb://localhost/cdp.users"
        );
    }

    #[test]
    fn test_rollback_leaves_directory_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path()).unwrap();

        stage_one(&mut sink, b"discarded", None);
        sink.rollback();
        sink.commit().unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_commit_preserves_transfer_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path()).unwrap();

        stage_one(&mut sink, b"first", Some("a"));
        stage_one(&mut sink, b"second", Some("b"));
        sink.commit().unwrap();

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| !n.ends_with("attrs.json"))
            .collect();
        names.sort();
        assert_eq!(names, vec!["00000_a.json", "00001_b.json"]);
    }
}
