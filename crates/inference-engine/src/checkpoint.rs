//! Model Persistence

use crate::ModelError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Current on-disk format version
const FORMAT_VERSION: u32 = 1;

/// Versioned envelope around a serialized model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint<M> {
    pub version: u32,
    /// Unix milliseconds at save time
    pub created_at_ms: i64,
    pub model: M,
}

/// Write a model as a postcard-encoded checkpoint
pub fn save_checkpoint<M: Serialize>(model: &M, path: &Path) -> Result<(), ModelError> {
    let checkpoint = Checkpoint {
        version: FORMAT_VERSION,
        created_at_ms: chrono::Utc::now().timestamp_millis(),
        model,
    };
    let bytes = postcard::to_allocvec(&checkpoint).map_err(|e| ModelError::Serialization(e.to_string()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ModelError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, &bytes).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    info!("Model saved to {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// Read a checkpoint written by [`save_checkpoint`]
pub fn load_checkpoint<M: DeserializeOwned>(path: &Path) -> Result<Checkpoint<M>, ModelError> {
    let bytes = fs::read(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let checkpoint: Checkpoint<M> =
        postcard::from_bytes(&bytes).map_err(|e| ModelError::Serialization(e.to_string()))?;

    if checkpoint.version != FORMAT_VERSION {
        return Err(ModelError::Serialization(format!(
            "unsupported checkpoint version {} (expected {})",
            checkpoint.version, FORMAT_VERSION
        )));
    }

    info!("Model loaded from {}", path.display());
    Ok(checkpoint)
}
