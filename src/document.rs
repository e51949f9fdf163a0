use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{ManifestError, Result};

/// In-memory form of a loaded manifest file. Mappings keep insertion order.
pub type Document = serde_json::Value;

/// A document mapping node.
pub type Mapping = serde_json::Map<String, Document>;

const YAML_LOAD_SUFFIXES: &[&str] = &[".yml", ".yml.in", ".yaml", ".yaml.in"];
const JSON_LOAD_SUFFIXES: &[&str] = &[".json", ".json.in"];
const YAML_SAVE_SUFFIXES: &[&str] = &[".yml", ".yaml"];
const JSON_SAVE_SUFFIXES: &[&str] = &[".json"];

const JSON_INDENT: &[u8] = b"    ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Pick the parser for a file about to be read. `.in` templates are
    /// treated like the bare format.
    pub fn for_loading(path: &Path) -> Result<Self> {
        Self::detect(path, JSON_LOAD_SUFFIXES, YAML_LOAD_SUFFIXES)
    }

    /// Pick the writer for a target file. Only bare suffixes are accepted.
    pub fn for_saving(path: &Path) -> Result<Self> {
        Self::detect(path, JSON_SAVE_SUFFIXES, YAML_SAVE_SUFFIXES)
    }

    pub fn as_str(&self) -> &str {
        match self {
            DocumentFormat::Json => "JSON",
            DocumentFormat::Yaml => "YAML",
        }
    }

    fn detect(path: &Path, json: &[&str], yaml: &[&str]) -> Result<Self> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if yaml.iter().any(|suffix| file_name.ends_with(suffix)) {
            Ok(DocumentFormat::Yaml)
        } else if json.iter().any(|suffix| file_name.ends_with(suffix)) {
            Ok(DocumentFormat::Json)
        } else {
            Err(ManifestError::UnsupportedFormat(path.to_path_buf()))
        }
    }
}

pub fn load_document(path: &Path) -> Result<Document> {
    let format = DocumentFormat::for_loading(path)?;

    let content = fs::read_to_string(path).map_err(|e| ManifestError::io(path, e))?;

    let document = parse_document(&content, format).map_err(|message| ManifestError::Parse {
        path: path.to_path_buf(),
        format,
        message,
    })?;

    info!("Loaded {} document: {}", format.as_str(), path.display());
    Ok(document)
}

pub fn save_document(document: &Document, path: &Path) -> Result<()> {
    let format = DocumentFormat::for_saving(path)?;
    let content = render_document(document, format)?;

    fs::write(path, content).map_err(|e| ManifestError::io(path, e))?;

    info!("Saved {} document: {}", format.as_str(), path.display());
    Ok(())
}

pub fn parse_document(content: &str, format: DocumentFormat) -> std::result::Result<Document, String> {
    match format {
        DocumentFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        DocumentFormat::Yaml => {
            let mut value: serde_yaml::Value =
                serde_yaml::from_str(content).map_err(|e| e.to_string())?;
            // `<<: *anchor` is kept as a literal key unless merged explicitly
            value.apply_merge().map_err(|e| e.to_string())?;
            serde_json::to_value(value).map_err(|e| e.to_string())
        }
    }
}

/// Serialize a document the way `save_document` writes it.
pub fn render_document(document: &Document, format: DocumentFormat) -> Result<String> {
    let serialize_error = |message: String| ManifestError::Serialize { format, message };

    match format {
        DocumentFormat::Json => {
            let mut buffer = Vec::new();
            let formatter = serde_json::ser::PrettyFormatter::with_indent(JSON_INDENT);
            let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
            document
                .serialize(&mut serializer)
                .map_err(|e| serialize_error(e.to_string()))?;
            String::from_utf8(buffer).map_err(|e| serialize_error(e.to_string()))
        }
        DocumentFormat::Yaml => {
            serde_yaml::to_string(document).map_err(|e| serialize_error(e.to_string()))
        }
    }
}

/// Unwrap a document that must be a mapping.
pub fn into_mapping(document: Document, context: impl Into<String>) -> Result<Mapping> {
    match document {
        Document::Object(mapping) => Ok(mapping),
        _ => Err(ManifestError::shape(context, "a mapping")),
    }
}

/// Remove a boolean flag from a mapping, falling back to `default` when absent.
pub fn take_flag(mapping: &mut Mapping, key: &str, default: bool, context: &str) -> Result<bool> {
    let value = match mapping.shift_remove(key) {
        None => return Ok(default),
        Some(Document::Bool(value)) => Some(value),
        Some(Document::String(word)) => yaml11_bool(&word),
        Some(_) => None,
    };

    match value {
        Some(value) => {
            debug!("{}: {} = {}", context, key, value);
            Ok(value)
        }
        None => Err(ManifestError::shape(
            format!("{}: `{}`", context, key),
            "a boolean",
        )),
    }
}

/// Boolean words of YAML 1.1, which manifests written for PyYAML rely on.
fn yaml11_bool(word: &str) -> Option<bool> {
    match word {
        "yes" | "Yes" | "YES" | "true" | "True" | "TRUE" | "on" | "On" | "ON" => Some(true),
        "no" | "No" | "NO" | "false" | "False" | "FALSE" | "off" | "Off" | "OFF" => Some(false),
        _ => None,
    }
}

/// Borrow the sequence stored under `key`, failing if it is absent or not a sequence.
pub fn sequence_mut<'a>(
    mapping: &'a mut Mapping,
    key: &'static str,
    context: &str,
) -> Result<&'a mut Vec<Document>> {
    match mapping.get_mut(key) {
        Some(Document::Array(items)) => Ok(items),
        Some(_) => Err(ManifestError::shape(format!("{}: `{}`", context, key), "a sequence")),
        None => Err(ManifestError::missing_key(key, context)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_format_detection_for_loading() {
        let cases = [
            ("app.yml", DocumentFormat::Yaml),
            ("app.yml.in", DocumentFormat::Yaml),
            ("app.yaml", DocumentFormat::Yaml),
            ("dir/app.yaml.in", DocumentFormat::Yaml),
            ("app.json", DocumentFormat::Json),
            ("modules/app.json.in", DocumentFormat::Json),
        ];

        for (path, expected) in cases {
            assert_eq!(DocumentFormat::for_loading(Path::new(path)).unwrap(), expected, "{}", path);
        }
    }

    #[test]
    fn test_unsupported_formats() {
        for path in ["app.toml", "app.json.bak", "app", "app.in"] {
            let err = DocumentFormat::for_loading(Path::new(path)).unwrap_err();
            assert!(matches!(err, ManifestError::UnsupportedFormat(p) if p == PathBuf::from(path)));
        }

        // Templates can be read but not written
        assert!(DocumentFormat::for_saving(Path::new("out.json.in")).is_err());
        assert!(DocumentFormat::for_saving(Path::new("out.yaml.in")).is_err());
        assert_eq!(DocumentFormat::for_saving(Path::new("out.yml")).unwrap(), DocumentFormat::Yaml);
    }

    #[test]
    fn test_json_rendering_keeps_key_order() {
        let document = json!({"zeta": 1, "alpha": {"b": true, "a": null}});
        let rendered = render_document(&document, DocumentFormat::Json).unwrap();

        assert_eq!(
            rendered,
            "{\n    \"zeta\": 1,\n    \"alpha\": {\n        \"b\": true,\n        \"a\": null\n    }\n}"
        );
    }

    #[test]
    fn test_yaml_and_json_share_model() {
        let yaml = "app-id: org.example.App\nmodules:\n  - name: foo\n    sources:\n      - type: dir\n        path: foo\n";
        let from_yaml = parse_document(yaml, DocumentFormat::Yaml).unwrap();

        let from_json = json!({
            "app-id": "org.example.App",
            "modules": [{"name": "foo", "sources": [{"type": "dir", "path": "foo"}]}]
        });

        assert_eq!(from_yaml, from_json);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        let err = load_document(&path).unwrap_err();
        assert!(matches!(err, ManifestError::NotFound(p) if p == path));
    }

    #[test]
    fn test_load_malformed_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{\"modules\": [").unwrap();

        let err = load_document(&path).unwrap_err();
        assert!(matches!(err, ManifestError::Parse { format: DocumentFormat::Json, .. }));
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_save_then_load_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.yaml");
        let document = json!({"modules": [{"name": "foo", "cleanup": ["/include"]}]});

        save_document(&document, &path).unwrap();
        assert_eq!(load_document(&path).unwrap(), document);
    }

    #[test]
    fn test_take_flag() {
        let mut mapping = into_mapping(json!({"name": "foo", "x-multilib": false, "sources": []}), "test").unwrap();

        assert!(!take_flag(&mut mapping, "x-multilib", true, "foo").unwrap());
        assert!(!mapping.contains_key("x-multilib"));
        // Removal must not reorder the remaining keys
        assert_eq!(mapping.keys().collect::<Vec<_>>(), ["name", "sources"]);

        assert!(take_flag(&mut mapping, "x-multilib", true, "foo").unwrap());

        mapping.insert("x-multilib".to_string(), json!("maybe"));
        let err = take_flag(&mut mapping, "x-multilib", true, "foo").unwrap_err();
        assert!(matches!(err, ManifestError::UnexpectedShape { expected: "a boolean", .. }));
    }

    #[test]
    fn test_take_flag_yaml11_words() {
        let yaml = "x-multilib: no\nmodules:\n  - name: foo\n    x-multilib: On\n    sources: []\n";
        let mut holder = into_mapping(parse_document(yaml, DocumentFormat::Yaml).unwrap(), "test").unwrap();

        assert!(!take_flag(&mut holder, "x-multilib", true, "root").unwrap());

        let mut module = into_mapping(holder["modules"][0].clone(), "test").unwrap();
        assert!(take_flag(&mut module, "x-multilib", false, "foo").unwrap());
        assert!(!module.contains_key("x-multilib"));
    }

    #[test]
    fn test_yaml_merge_keys_are_applied() {
        let yaml = "\
x-common: &common
  buildsystem: meson
  config-opts: [-Ddocs=false]
modules:
  - name: foo
    <<: *common
    config-opts: [-Dtests=false]
    sources: []
";
        let document = parse_document(yaml, DocumentFormat::Yaml).unwrap();
        let module = &document["modules"][0];

        assert!(module.get("<<").is_none());
        assert_eq!(module["buildsystem"], "meson");
        // Keys written on the module win over merged ones
        assert_eq!(module["config-opts"], json!(["-Dtests=false"]));
        assert_eq!(module["name"], "foo");
    }

    #[test]
    fn test_sequence_mut_errors() {
        let mut mapping = into_mapping(json!({"modules": "foo.json"}), "test").unwrap();

        assert!(matches!(
            sequence_mut(&mut mapping, "modules", "root").unwrap_err(),
            ManifestError::UnexpectedShape { .. }
        ));
        assert!(matches!(
            sequence_mut(&mut mapping, "sources", "root").unwrap_err(),
            ManifestError::MissingKey { key: "sources", .. }
        ));
    }
}
