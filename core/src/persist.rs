use crate::model::{TrainedModel, SCHEMA_VERSION};
use crate::{Error, Result};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use serde::{Deserialize, Serialize};
use std::fs::create_dir_all;
use std::io::Write;
use std::path::Path;

const MAGIC: [u8; 8] = *b"REELMTCH";

/// Fixed prefix of every artifact, read before the body so version checks
/// never depend on the body layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactHeader {
    pub magic: [u8; 8],
    pub schema_version: u32,
    pub num_rows: u64,
    pub num_terms: u64,
}

impl ArtifactHeader {
    fn for_model(model: &TrainedModel) -> Self {
        Self {
            magic: MAGIC,
            schema_version: SCHEMA_VERSION,
            num_rows: model.num_rows() as u64,
            num_terms: model.vocabulary.len() as u64,
        }
    }
}

/// Write `model` to `path` as one unit: the bytes go to a temporary file in
/// the same directory which is then renamed over `path`.
pub fn save_model(model: &TrainedModel, path: &Path) -> Result<()> {
    save_with_header(model, &ArtifactHeader::for_model(model), path)
}

pub(crate) fn save_with_header(model: &TrainedModel, header: &ArtifactHeader, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent)?;
    }
    let mut bytes = bincode::serialize(header).map_err(|e| Error::Serialization(e.to_string()))?;
    bytes.extend(bincode::serialize(model).map_err(|e| Error::Serialization(e.to_string()))?);

    AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
        .write(|f| f.write_all(&bytes))
        .map_err(|e| match e {
            atomicwrites::Error::Internal(e) | atomicwrites::Error::User(e) => Error::Io(e),
        })?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), rows = header.num_rows, terms = header.num_terms, "saved model artifact");
    Ok(())
}

fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| Error::ArtifactMissing { path: path.to_path_buf(), reason: e.to_string() })
}

fn decode_header(path: &Path, reader: &mut &[u8]) -> Result<ArtifactHeader> {
    let header: ArtifactHeader = bincode::deserialize_from(&mut *reader)
        .map_err(|e| Error::CorruptArtifact { path: path.to_path_buf(), reason: format!("unreadable header: {e}") })?;
    if header.magic != MAGIC {
        return Err(Error::CorruptArtifact { path: path.to_path_buf(), reason: "not a model artifact".into() });
    }
    Ok(header)
}

/// Read only the header of the artifact at `path`.
pub fn read_header(path: &Path) -> Result<ArtifactHeader> {
    let bytes = read_artifact(path)?;
    decode_header(path, &mut bytes.as_slice())
}

/// Load and validate a model artifact. Nothing is returned unless the whole
/// artifact decodes and passes the structural checks.
pub fn load_model(path: &Path) -> Result<TrainedModel> {
    let bytes = read_artifact(path)?;
    let mut reader = bytes.as_slice();
    let header = decode_header(path, &mut reader)?;
    if header.schema_version != SCHEMA_VERSION {
        return Err(Error::VersionMismatch { path: path.to_path_buf(), found: header.schema_version, expected: SCHEMA_VERSION });
    }

    let corrupt = |reason: String| Error::CorruptArtifact { path: path.to_path_buf(), reason };
    let model: TrainedModel = bincode::deserialize(reader).map_err(|e| corrupt(format!("unreadable body: {e}")))?;
    if header.num_rows != model.num_rows() as u64 || header.num_terms != model.vocabulary.len() as u64 {
        return Err(corrupt(format!(
            "header declares {} rows and {} terms, body holds {} and {}",
            header.num_rows,
            header.num_terms,
            model.num_rows(),
            model.vocabulary.len()
        )));
    }
    model.check_structure().map_err(corrupt)?;

    tracing::info!(path = %path.display(), rows = model.num_rows(), terms = model.vocabulary.len(), "loaded model artifact");
    Ok(model)
}
