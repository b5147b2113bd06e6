use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::ArtifactError;

/// OpenZeppelin sources the token imports, relative to
/// `node_modules/@openzeppelin/contracts/`.
pub const OPENZEPPELIN_IMPORTS: &[&str] = &[
    "token/ERC20/ERC20.sol",
    "access/Ownable.sol",
    "token/ERC20/IERC20.sol",
    "token/ERC20/extensions/IERC20Metadata.sol",
    "utils/Context.sol",
    "interfaces/draft-IERC6093.sol",
];

const OPENZEPPELIN_PREFIX: &str = "@openzeppelin/contracts";

/// Locates a contract's source and compiler output inside a project laid out
/// as `contracts/`, `artifacts/` and `node_modules/`.
#[derive(Debug, Clone)]
pub struct ContractArtifacts {
    root: PathBuf,
    name: String,
}

/// Compiler input/output dump referenced by an artifact's debug file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub solc_long_version: String,
    pub input: Value,
    pub output: Value,
}

impl BuildInfo {
    /// `v0.8.24+commit.e11b9ed9`, the form explorer APIs expect.
    pub fn compiler_version(&self) -> String {
        format!("v{}", self.solc_long_version)
    }

    /// Metadata JSON string emitted for `contract` in `source_unit`.
    pub fn metadata(&self, source_unit: &str, contract: &str) -> Option<&str> {
        self.output
            .get("contracts")?
            .get(source_unit)?
            .get(contract)?
            .get("metadata")?
            .as_str()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugFile {
    build_info: String,
}

#[derive(Deserialize)]
struct ArtifactFile {
    bytecode: String,
}

impl ContractArtifacts {
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `contracts/<Name>.sol`
    pub fn source_unit(&self) -> String {
        format!("contracts/{}.sol", self.name)
    }

    /// `contracts/<Name>.sol:<Name>`
    pub fn fully_qualified_name(&self) -> String {
        format!("{}:{}", self.source_unit(), self.name)
    }

    pub fn source_path(&self) -> PathBuf {
        self.root.join("contracts").join(format!("{}.sol", self.name))
    }

    fn artifact_dir(&self) -> PathBuf {
        self.root
            .join("artifacts")
            .join("contracts")
            .join(format!("{}.sol", self.name))
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.artifact_dir().join(format!("{}.json", self.name))
    }

    pub fn debug_path(&self) -> PathBuf {
        self.artifact_dir().join(format!("{}.dbg.json", self.name))
    }

    pub fn openzeppelin_dir(&self) -> PathBuf {
        self.root
            .join("node_modules")
            .join("@openzeppelin")
            .join("contracts")
    }

    /// Raw Solidity source of the contract.
    pub fn read_source(&self) -> Result<String, ArtifactError> {
        read_text("Contract", &self.source_path())
    }

    /// Hex creation bytecode from the compiled artifact.
    pub fn creation_bytecode(&self) -> Result<String, ArtifactError> {
        let path = self.artifact_path();
        let artifact: ArtifactFile = read_json("Artifact", &path)?;
        let code = artifact.bytecode.trim();
        if code.is_empty() || code == "0x" {
            return Err(ArtifactError::MissingField {
                field: "bytecode".into(),
                path,
            });
        }
        Ok(code.to_string())
    }

    /// Build-info referenced by the debug file. Only the file name of the
    /// reference is used; it is resolved under `artifacts/build-info/`.
    pub fn build_info(&self) -> Result<BuildInfo, ArtifactError> {
        let debug_path = self.debug_path();
        let debug_file: DebugFile = read_json("Debug", &debug_path)?;
        let file_name = Path::new(&debug_file.build_info)
            .file_name()
            .ok_or_else(|| ArtifactError::MissingField {
                field: "buildInfo".into(),
                path: debug_path.clone(),
            })?;
        let path = self.root.join("artifacts").join("build-info").join(file_name);
        debug!(path = %path.display(), "reading build info");
        read_json("Build info", &path)
    }

    /// Compiler metadata JSON for this contract.
    pub fn metadata(&self, build_info: &BuildInfo) -> Result<String, ArtifactError> {
        build_info
            .metadata(&self.source_unit(), &self.name)
            .map(str::to_string)
            .ok_or_else(|| ArtifactError::MissingField {
                field: format!("output.contracts[{}][{}].metadata", self.source_unit(), self.name),
                path: self.debug_path(),
            })
    }

    /// Allow-listed OpenZeppelin sources present on disk, as
    /// `(import path, contents)` pairs. Absent files are skipped.
    pub fn openzeppelin_sources(&self) -> Vec<(String, String)> {
        let base = self.openzeppelin_dir();
        if !base.is_dir() {
            return Vec::new();
        }
        OPENZEPPELIN_IMPORTS
            .iter()
            .filter_map(|import| {
                let contents = std::fs::read_to_string(base.join(import)).ok()?;
                Some((format!("{OPENZEPPELIN_PREFIX}/{import}"), contents))
            })
            .collect()
    }
}

fn read_text(kind: &'static str, path: &Path) -> Result<String, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::NotFound {
            kind,
            path: path.to_path_buf(),
        });
    }
    std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: DeserializeOwned>(kind: &'static str, path: &Path) -> Result<T, ArtifactError> {
    let text = read_text(kind, path)?;
    serde_json::from_str(&text).map_err(|source| ArtifactError::Json {
        path: path.to_path_buf(),
        source,
    })
}
