//! Compiled artifact resolution.
//!
//! Artifacts are read from a Hardhat build output directory, where every
//! contract `Name` declared in `contracts/Name.sol` has its artifact stored at
//! `artifacts/contracts/Name.sol/Name.json`.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use alloy_core::{
    dyn_abi::{DynSolValue, JsonAbiExt, Specifier},
    json_abi::JsonAbi,
    primitives::Bytes,
};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::stages::CreationRequest;

/// Directory skipped when scanning for artifacts.
const BUILD_INFO_DIR: &str = "build-info";

/// Suffix of the debug files emitted next to each artifact.
const DEBUG_FILE_SUFFIX: &str = ".dbg.json";

/// Maximum edit distance for a name to be suggested on a failed lookup.
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Capability to resolve a compiled contract by name.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Resolve an artifact by bare contract name or fully qualified name
    /// (`contracts/Token.sol:Token`).
    async fn resolve(&self, name: &str) -> Result<CompiledArtifact>;
}

/// A compiled contract: its creation bytecode and its ABI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    pub contract_name: String,
    pub source_name: String,
    pub abi: JsonAbi,
    pub bytecode: Bytes,
}

impl CompiledArtifact {
    /// `<source name>:<contract name>`.
    pub fn fully_qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }

    /// Build the creation request for this contract.
    ///
    /// Constructor arguments are given in their textual form and coerced to the
    /// types declared by the constructor in the ABI.
    pub fn creation_request(&self, constructor_args: &[String]) -> Result<CreationRequest> {
        let encoded_args = self.encode_constructor_args(constructor_args)?;

        let mut init_code = Vec::with_capacity(self.bytecode.len() + encoded_args.len());
        init_code.extend_from_slice(&self.bytecode);
        init_code.extend_from_slice(&encoded_args);

        Ok(CreationRequest {
            contract_name: self.contract_name.clone(),
            init_code: init_code.into(),
        })
    }

    fn encode_constructor_args(&self, args: &[String]) -> Result<Vec<u8>> {
        let Some(constructor) = &self.abi.constructor else {
            if !args.is_empty() {
                anyhow::bail!(
                    "{} has no constructor but {} argument(s) were provided",
                    self.contract_name,
                    args.len()
                );
            }
            return Ok(Vec::new());
        };

        if constructor.inputs.len() != args.len() {
            anyhow::bail!(
                "{} constructor expects {} argument(s), got {}",
                self.contract_name,
                constructor.inputs.len(),
                args.len()
            );
        }

        let values = constructor
            .inputs
            .iter()
            .zip(args)
            .map(|(param, arg)| {
                let ty = param.resolve().with_context(|| {
                    format!("Unsupported constructor parameter type {}", param.ty)
                })?;
                ty.coerce_str(arg).with_context(|| {
                    format!(
                        "Invalid value '{}' for constructor parameter `{}` ({})",
                        arg, param.name, param.ty
                    )
                })
            })
            .collect::<Result<Vec<DynSolValue>>>()?;

        constructor
            .abi_encode_input(&values)
            .context("Failed to ABI-encode constructor arguments")
    }
}

/// On-disk Hardhat artifact format.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardhatArtifact {
    contract_name: String,
    source_name: String,
    abi: JsonAbi,
    bytecode: String,
    #[serde(default)]
    link_references: BTreeMap<String, BTreeMap<String, Value>>,
}

impl HardhatArtifact {
    fn into_compiled(self) -> Result<CompiledArtifact> {
        if !self.link_references.is_empty() {
            let libraries = self
                .link_references
                .iter()
                .flat_map(|(source, libs)| {
                    libs.keys().map(move |lib| format!("{}:{}", source, lib))
                })
                .collect::<Vec<_>>();
            anyhow::bail!(
                "{} requires unlinked libraries: {}",
                self.contract_name,
                libraries.join(", ")
            );
        }

        let code = self.bytecode.trim_start_matches("0x");
        if code.is_empty() {
            anyhow::bail!(
                "{} has no creation bytecode (is it abstract or an interface?)",
                self.contract_name
            );
        }

        let bytecode = hex::decode(code)
            .with_context(|| format!("Invalid bytecode in artifact for {}", self.contract_name))?;

        Ok(CompiledArtifact {
            contract_name: self.contract_name,
            source_name: self.source_name,
            abi: self.abi,
            bytecode: bytecode.into(),
        })
    }
}

/// [`ArtifactSource`] reading a Hardhat `artifacts/` directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read_artifact(path: &Path) -> Result<CompiledArtifact> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let artifact: HardhatArtifact = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse artifact {}", path.display()))?;
        artifact.into_compiled()
    }

    /// Collect every artifact file below the root, as `(contract name, path)`.
    fn artifact_files(&self) -> Result<Vec<(String, PathBuf)>> {
        if !self.root.is_dir() {
            anyhow::bail!(
                "Artifacts directory not found: {}. Compile the contracts first.",
                self.root.display()
            );
        }

        let mut found = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let entries = std::fs::read_dir(&dir)
                .with_context(|| format!("Failed to read directory {}", dir.display()))?;

            for entry in entries {
                let path = entry?.path();
                let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };

                if path.is_dir() {
                    if file_name != BUILD_INFO_DIR {
                        pending.push(path);
                    }
                    continue;
                }

                if file_name.ends_with(DEBUG_FILE_SUFFIX) {
                    continue;
                }

                if let Some(contract_name) = file_name.strip_suffix(".json") {
                    found.push((contract_name.to_string(), path));
                }
            }
        }

        found.sort();
        Ok(found)
    }

    fn resolve_fully_qualified(
        &self,
        source_name: &str,
        contract_name: &str,
    ) -> Result<CompiledArtifact> {
        let path = self
            .root
            .join(source_name)
            .join(format!("{}.json", contract_name));

        if !path.is_file() {
            anyhow::bail!(
                "Artifact for contract \"{}:{}\" not found",
                source_name,
                contract_name
            );
        }

        Self::read_artifact(&path)
    }

    fn resolve_bare(&self, name: &str) -> Result<CompiledArtifact> {
        let files = self.artifact_files()?;

        let matches = files
            .iter()
            .filter(|(contract_name, _)| contract_name == name)
            .map(|(_, path)| path)
            .collect::<Vec<_>>();

        match matches.as_slice() {
            [] => {
                let suggestions = suggest_names(name, files.iter().map(|(n, _)| n.as_str()));
                if suggestions.is_empty() {
                    anyhow::bail!("Artifact for contract \"{}\" not found", name);
                }
                anyhow::bail!(
                    "Artifact for contract \"{}\" not found. Did you mean: {}?",
                    name,
                    suggestions.join(", ")
                )
            }
            [path] => Self::read_artifact(path),
            paths => {
                let qualified = paths
                    .iter()
                    .map(|path| self.qualified_name_of(path, name))
                    .collect::<Vec<_>>();
                anyhow::bail!(
                    "There are multiple artifacts for contract \"{}\", please use a fully \
                     qualified name instead: {}",
                    name,
                    qualified.join(", ")
                )
            }
        }
    }

    fn qualified_name_of(&self, path: &Path, name: &str) -> String {
        let source = path
            .parent()
            .and_then(|parent| parent.strip_prefix(&self.root).ok())
            .map(|source| source.display().to_string())
            .unwrap_or_default();
        format!("{}:{}", source, name)
    }
}

#[async_trait::async_trait]
impl ArtifactSource for ArtifactStore {
    async fn resolve(&self, name: &str) -> Result<CompiledArtifact> {
        let artifact = match split_qualified_name(name) {
            (Some(source_name), contract_name) => {
                self.resolve_fully_qualified(source_name, contract_name)?
            }
            (None, _) => self.resolve_bare(name)?,
        };

        tracing::debug!(
            artifact = %artifact.fully_qualified_name(),
            bytecode_len = artifact.bytecode.len(),
            "Resolved artifact"
        );

        Ok(artifact)
    }
}

/// Split a `source:Contract` name into its source and contract parts.
pub(crate) fn split_qualified_name(name: &str) -> (Option<&str>, &str) {
    match name.rsplit_once(':') {
        Some((source_name, contract_name)) => (Some(source_name), contract_name),
        None => (None, name),
    }
}

/// Names within [`MAX_SUGGESTION_DISTANCE`] of `name`, closest first.
fn suggest_names<'a>(name: &str, candidates: impl Iterator<Item = &'a str>) -> Vec<String> {
    let target = name.to_lowercase();

    let mut scored = candidates
        .map(|candidate| (edit_distance(&target, &candidate.to_lowercase()), candidate))
        .filter(|(distance, _)| *distance <= MAX_SUGGESTION_DISTANCE)
        .collect::<Vec<_>>();
    scored.sort();

    let mut names = scored
        .into_iter()
        .map(|(_, candidate)| candidate.to_string())
        .collect::<Vec<_>>();
    names.dedup();
    names
}

/// Levenshtein distance.
fn edit_distance(a: &str, b: &str) -> usize {
    let b = b.chars().collect::<Vec<_>>();
    let mut previous = (0..=b.len()).collect::<Vec<_>>();

    for (i, ca) in a.chars().enumerate() {
        let mut current = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        previous = current;
    }

    previous[b.len()]
}
