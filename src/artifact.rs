//! Compiled contract artifacts (forge `out/` layout)

use std::{
    io,
    path::{Path, PathBuf},
};

use alloy::{hex, json_abi::JsonAbi, primitives::Bytes};
use serde::Deserialize;

use crate::error::{FrameworkError, Result};

/// Interface description and deployment bytecode of a compiled contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub abi: JsonAbi,
    /// Code to deploy the contract
    pub code: Bytes,
}

#[derive(Deserialize)]
struct ArtifactDocument {
    abi: JsonAbi,
    bytecode: BytecodeDocument,
}

#[derive(Deserialize)]
struct BytecodeDocument {
    object: String,
}

impl Artifact {
    /// Read `relative` (e.g. `Puzzle.sol/ChillRobotPuzzle.json`) under `artifacts_dir`.
    pub fn load(artifacts_dir: impl AsRef<Path>, relative: impl AsRef<Path>) -> Result<Self> {
        Self::read(artifacts_dir.as_ref().join(relative))
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => FrameworkError::NotFound {
                path: path.to_path_buf(),
            },
            _ => malformed(path, err),
        })?;
        Self::parse(&data, path)
    }

    /// Parse an artifact document already held in memory.
    pub fn from_json(data: &str) -> Result<Self> {
        Self::parse(data, Path::new("<memory>"))
    }

    fn parse(data: &str, path: &Path) -> Result<Self> {
        let doc: ArtifactDocument = serde_json::from_str(data).map_err(|err| malformed(path, err))?;
        let object = doc.bytecode.object.trim();
        let code = hex::decode(object.strip_prefix("0x").unwrap_or(object))
            .map_err(|err| malformed(path, err))?;
        if code.is_empty() {
            return Err(malformed(path, "empty bytecode"));
        }
        tracing::debug!(path = %path.display(), code_len = code.len(), "loaded artifact");
        Ok(Self {
            abi: doc.abi,
            code: code.into(),
        })
    }

    /// Deployment bytecode as a `0x`-prefixed hex string.
    pub fn bytecode_hex(&self) -> String {
        hex::encode_prefixed(&self.code)
    }
}

fn malformed(path: &Path, reason: impl ToString) -> FrameworkError {
    FrameworkError::MalformedArtifact {
        path: PathBuf::from(path),
        reason: reason.to_string(),
    }
}
