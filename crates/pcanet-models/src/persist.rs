//! Versioned on-disk storage for trained models.
//!
//! A model file starts with a fixed header (magic bytes and a format version)
//! followed by the bincode payload. Incompatible files are rejected on load
//! instead of being decoded into garbage.
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bincode::Options;
use chrono::Utc;
use ndarray::ArrayView3;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::error::ModelError;
use crate::models::bagging::Bagging;
use crate::models::pipeline::PcaNetPipeline;

pub const MODEL_EXTENSION: &str = "pkl";
pub const MAGIC: [u8; 6] = *b"PCANET";
pub const FORMAT_VERSION: u32 = 1;

const PARTIAL_SUFFIX: &str = "partial";

static NAME_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error while accessing model file: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to (de)serialize model payload: {0}")]
    Serialization(#[from] bincode::Error),

    /// The file is not a model file written by this crate.
    #[error("Model file has invalid structure: {0}")]
    InvalidFormat(String),

    #[error("Model format version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// A trained model of either regime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum StoredModel {
    Pipeline(PcaNetPipeline),
    Ensemble(Bagging),
}

impl StoredModel {
    pub fn kind(&self) -> &'static str {
        match self {
            StoredModel::Pipeline(_) => "pipeline",
            StoredModel::Ensemble(_) => "ensemble",
        }
    }

    pub fn predict(&self, images: ArrayView3<f64>) -> Result<Vec<usize>, ModelError> {
        match self {
            StoredModel::Pipeline(model) => model.predict(images),
            StoredModel::Ensemble(model) => model.predict(images),
        }
    }
}

impl From<PcaNetPipeline> for StoredModel {
    fn from(model: PcaNetPipeline) -> Self {
        StoredModel::Pipeline(model)
    }
}

impl From<Bagging> for StoredModel {
    fn from(model: Bagging) -> Self {
        StoredModel::Ensemble(model)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    magic: [u8; 6],
    format_version: u32,
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_little_endian()
}

/// Fresh, content-opaque file name: lowercase hex SHA-256 of the current
/// wall-clock time plus a process-local counter, with the model extension.
pub fn model_filename() -> String {
    let now = Utc::now();
    let count = NAME_COUNTER.fetch_add(1, Ordering::Relaxed);
    let rendered = format!(
        "{}.{:09}#{}",
        now.timestamp(),
        now.timestamp_subsec_nanos(),
        count
    );
    format!("{:x}.{}", Sha256::digest(rendered.as_bytes()), MODEL_EXTENSION)
}

/// Write `model` to `path`.
///
/// The payload goes to a sibling `.partial` file first and is hard-linked
/// into place once synced, so `path` either does not exist or holds a
/// complete model. The link fails instead of replacing an existing `path`,
/// which also covers a file created between the check and the link. Fails
/// if `path` already exists or its directory is missing.
pub fn save_model(model: &StoredModel, path: &Path) -> Result<(), PersistError> {
    if path.exists() {
        return Err(already_exists(path));
    }
    let partial = partial_path(path);
    if let Err(e) = write_partial(model, &partial) {
        // nothing to clean up if create_new itself failed
        let collided =
            matches!(&e, PersistError::Io(err) if err.kind() == io::ErrorKind::AlreadyExists);
        if !collided {
            let _ = std::fs::remove_file(&partial);
        }
        return Err(e);
    }
    publish_partial(&partial, path)
}

/// Link a completed `.partial` file to `path` and drop the partial name,
/// whether or not the link succeeded.
fn publish_partial(partial: &Path, path: &Path) -> Result<(), PersistError> {
    let linked = std::fs::hard_link(partial, path);
    let _ = std::fs::remove_file(partial);
    match linked {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(already_exists(path)),
        Err(e) => Err(e.into()),
    }
}

fn already_exists(path: &Path) -> PersistError {
    PersistError::Io(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("{} already exists", path.display()),
    ))
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

fn write_partial(model: &StoredModel, partial: &Path) -> Result<(), PersistError> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(partial)?;
    let mut writer = BufWriter::new(file);
    let header = Header {
        magic: MAGIC,
        format_version: FORMAT_VERSION,
    };
    codec().serialize_into(&mut writer, &header)?;
    codec().serialize_into(&mut writer, model)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

/// Read a model written by [`save_model`].
pub fn load_model(path: &Path) -> Result<StoredModel, PersistError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let header: Header = codec().deserialize_from(&mut reader).map_err(|e| {
        PersistError::InvalidFormat(format!("unreadable header in {}: {e}", path.display()))
    })?;
    if header.magic != MAGIC {
        return Err(PersistError::InvalidFormat(format!(
            "{} is not a PCANet model file",
            path.display()
        )));
    }
    if header.format_version != FORMAT_VERSION {
        return Err(PersistError::VersionMismatch {
            expected: FORMAT_VERSION,
            found: header.format_version,
        });
    }
    Ok(codec().deserialize_from(&mut reader)?)
}

/// Directory that trained models are written to.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ModelStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Persist `model` under a fresh name and return that name.
    pub fn save(&self, model: &StoredModel) -> Result<String, PersistError> {
        let filename = model_filename();
        let path = self.path_for(&filename);
        save_model(model, &path)?;
        log::info!("Saved {} model to {}", model.kind(), path.display());
        Ok(filename)
    }

    /// Delete a model written by [`ModelStore::save`].
    pub fn remove(&self, filename: &str) -> Result<(), PersistError> {
        std::fs::remove_file(self.path_for(filename))?;
        Ok(())
    }

    pub fn load(&self, filename: &str) -> Result<StoredModel, PersistError> {
        load_model(&self.path_for(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransformerParams;
    use crate::models::pcanet::PcaNet;
    use crate::models::svm::LinearSvc;
    use std::collections::HashSet;

    fn unfitted_pipeline() -> StoredModel {
        StoredModel::Pipeline(PcaNetPipeline::new(
            PcaNet::new(TransformerParams::default()),
            LinearSvc::new(10.0),
        ))
    }

    #[test]
    fn filenames_are_distinct_hex_digests() {
        let names: HashSet<String> = (0..1000).map(|_| model_filename()).collect();
        assert_eq!(names.len(), 1000);
        for name in &names {
            let (digest, ext) = name.split_once('.').unwrap();
            assert_eq!(ext, "pkl");
            assert_eq!(digest.len(), 64);
            assert!(digest
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        }
    }

    #[test]
    fn store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        let model = unfitted_pipeline();

        let name = store.save(&model).unwrap();
        assert!(store.path_for(&name).is_file());
        assert!(!dir.path().join(format!("{name}.partial")).exists());
        assert_eq!(store.load(&name).unwrap(), model);

        store.remove(&name).unwrap();
        assert!(!store.path_for(&name).exists());
        assert!(store.remove(&name).is_err());
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("absent"));
        let err = store.save(&unfitted_pipeline()).unwrap_err();
        assert!(matches!(err, PersistError::Io(_)));
        assert!(!dir.path().join("absent").exists());
    }

    #[test]
    fn existing_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taken.pkl");
        std::fs::write(&path, b"keep").unwrap();
        let err = save_model(&unfitted_pipeline(), &path).unwrap_err();
        match err {
            PersistError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::AlreadyExists),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(std::fs::read(&path).unwrap(), b"keep");
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn file_created_after_the_check_is_not_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late.pkl");
        let partial = partial_path(&path);
        write_partial(&unfitted_pipeline(), &partial).unwrap();
        std::fs::write(&path, b"first").unwrap();

        let err = publish_partial(&partial, &path).unwrap_err();
        match err {
            PersistError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::AlreadyExists),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(std::fs::read(&path).unwrap(), b"first");
        assert!(!partial.exists());
    }

    #[test]
    fn foreign_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foreign.pkl");
        std::fs::write(&path, b"NOTAPCANETFILE").unwrap();
        assert!(matches!(
            load_model(&path),
            Err(PersistError::InvalidFormat(_))
        ));
    }

    #[test]
    fn newer_format_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.pkl");
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&99u32.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();
        assert!(matches!(
            load_model(&path),
            Err(PersistError::VersionMismatch {
                expected: 1,
                found: 99
            })
        ));
    }
}
