use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::{Program, ProgramNode, ValueInfo, VarBinding};

/// Serialized hand-off from the front-end
#[derive(Debug, Deserialize)]
struct ProgramDocument {
    #[serde(default)]
    name: Option<String>,
    nodes: Vec<ProgramNode>,
    value_info: ValueInfo,
    #[serde(default)]
    var_binding: HashMap<String, String>,
}

/// A program ready for translation
#[derive(Debug, Clone)]
pub struct LoadedProgram {
    pub program: Program,
    pub value_info: ValueInfo,
    pub bindings: VarBinding,
}

/// Loads already-validated programs from JSON documents
pub struct ProgramLoader;

impl ProgramLoader {
    /// Load a program from a file path.
    ///
    /// A document without a `name` is named after the file stem.
    pub fn load_program(path: &Path) -> Result<LoadedProgram> {
        let mut file = File::open(path).map_err(|e| {
            Error::ModelLoadError(path.to_path_buf(), format!("Failed to open file: {}", e))
        })?;

        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer).map_err(|e| {
            Error::ModelLoadError(path.to_path_buf(), format!("Failed to read file: {}", e))
        })?;

        let fallback = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());

        Self::from_bytes(&buffer, &fallback).map_err(|e| match e {
            Error::JsonError(err) => {
                Error::ModelLoadError(path.to_path_buf(), format!("Invalid program document: {}", err))
            }
            other => other,
        })
    }

    /// Load a program from raw bytes
    pub fn from_bytes(data: &[u8], fallback_name: &str) -> Result<LoadedProgram> {
        let document: ProgramDocument = serde_json::from_slice(data)?;
        Self::convert_document(document, fallback_name)
    }

    /// Load a program from a JSON string
    pub fn from_str(text: &str, fallback_name: &str) -> Result<LoadedProgram> {
        Self::from_bytes(text.as_bytes(), fallback_name)
    }

    fn convert_document(document: ProgramDocument, fallback_name: &str) -> Result<LoadedProgram> {
        let name = document
            .name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| fallback_name.to_string());

        let bindings = VarBinding::with_seed(document.var_binding)?;
        let program = Program::new(&name, document.nodes);

        debug!(
            "Loaded program {} with {} nodes and {} tensors",
            program.name,
            program.len(),
            document.value_info.len()
        );

        Ok(LoadedProgram {
            program,
            value_info: document.value_info,
            bindings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attribute, DataType, Party};
    use std::io::Write;

    const DOCUMENT: &str = r#"{
        "name": "tiny",
        "nodes": [
            {"kind": "input", "name": "x", "shape": [1, 4], "data_type": "float", "party": "alice"},
            {"kind": "operator", "op_type": "LeakyRelu", "inputs": ["x"], "outputs": ["y"],
             "attributes": {"alpha": 0.2}},
            {"kind": "output", "name": "y", "shape": [1, 4], "data_type": "float", "party": "bob"}
        ],
        "value_info": {
            "x": {"data_type": "float", "shape": [1, 4]},
            "y": {"data_type": "float", "shape": [1, 4]}
        },
        "var_binding": {"x": "input0"}
    }"#;

    #[test]
    fn test_load_document() {
        let loaded = ProgramLoader::from_str(DOCUMENT, "unused").unwrap();
        assert_eq!(loaded.program.name, "tiny");
        assert_eq!(loaded.program.len(), 3);
        assert_eq!(loaded.value_info.shape("y").unwrap(), &[1, 4]);
        assert_eq!(loaded.bindings.get("x"), Some("input0"));

        let input = loaded.program.inputs().next().unwrap();
        assert_eq!(input.party, Party::Alice);
        assert_eq!(input.data_type, DataType::Float);

        let (_, op) = loaded.program.operators().next().unwrap();
        assert_eq!(op.attributes.get("alpha"), Some(&Attribute::Float(0.2)));
    }

    #[test]
    fn test_name_falls_back_to_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lenet.json");
        let mut file = File::create(&path).unwrap();
        file.write_all(br#"{"nodes": [], "value_info": {}}"#).unwrap();

        let loaded = ProgramLoader::load_program(&path).unwrap();
        assert_eq!(loaded.program.name, "lenet");
        assert!(loaded.bindings.is_empty());
    }

    #[test]
    fn test_invalid_document_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{\"nodes\": 3}").unwrap();

        assert!(matches!(
            ProgramLoader::load_program(&path),
            Err(Error::ModelLoadError(_, _))
        ));
        assert!(matches!(
            ProgramLoader::load_program(&dir.path().join("missing.json")),
            Err(Error::ModelLoadError(_, _))
        ));
    }

    #[test]
    fn test_duplicate_seed_identifiers_rejected() {
        let text = r#"{"nodes": [], "value_info": {}, "var_binding": {"a": "v", "b": "v"}}"#;
        assert!(matches!(
            ProgramLoader::from_str(text, "dup"),
            Err(Error::InvalidProgram(_))
        ));
    }
}
