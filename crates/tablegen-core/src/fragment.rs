//! External schema fragments.
//!
//! `json` fields may describe their content with a reference to a JSON
//! Schema document. Resolvers return the document with every `$ref`
//! inlined; a `$ref` that re-enters a reference already being inlined is
//! left in place.

use crate::error::FragmentError;
use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::{Map, Value as Json};
use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Inlined fragments by reference.
pub type FragmentMap = HashMap<String, Json>;

/// Resolves fragment references to fully inlined documents.
#[async_trait]
pub trait FragmentResolver: Send + Sync {
    /// Resolve one reference.
    async fn resolve(&self, reference: &str) -> Result<Json, FragmentError>;
}

/// Resolve every reference concurrently. The first failure aborts the rest.
pub async fn resolve_all<R>(
    resolver: &R,
    references: &[&str],
) -> Result<FragmentMap, FragmentError>
where
    R: FragmentResolver + ?Sized,
{
    let loads = references.iter().map(|reference| async move {
        let document = resolver.resolve(reference).await?;
        Ok::<_, FragmentError>((reference.to_string(), document))
    });
    Ok(try_join_all(loads).await?.into_iter().collect())
}

/// Serves pre-inlined fragments from memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryFragmentResolver {
    fragments: FragmentMap,
}

impl MemoryFragmentResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fragment.
    pub fn with_fragment(mut self, reference: impl Into<String>, document: Json) -> Self {
        self.insert(reference, document);
        self
    }

    /// Add a fragment.
    pub fn insert(&mut self, reference: impl Into<String>, document: Json) {
        self.fragments.insert(reference.into(), document);
    }
}

#[async_trait]
impl FragmentResolver for MemoryFragmentResolver {
    async fn resolve(&self, reference: &str) -> Result<Json, FragmentError> {
        self.fragments
            .get(reference)
            .cloned()
            .ok_or_else(|| FragmentError::NotFound {
                reference: reference.to_string(),
            })
    }
}

/// Loads fragments from JSON files under a root directory.
///
/// References have the form `path/to/file.json[#/json/pointer]`. Inside a
/// document, `$ref`s may be local (`#/definitions/x`) or point to another
/// file relative to the referencing one (`other.json#/definitions/y`).
/// Absolute paths and paths climbing above the root are dangling.
#[derive(Debug, Clone)]
pub struct FileFragmentResolver {
    root: PathBuf,
}

impl FileFragmentResolver {
    /// Create a resolver rooted at a directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Load the entry file and every file reachable through `$ref`s.
    async fn load(
        &self,
        reference: &str,
        entry: &Path,
    ) -> Result<HashMap<PathBuf, Json>, FragmentError> {
        let mut documents = HashMap::new();
        let mut pending: Vec<(PathBuf, Option<String>)> = vec![(entry.to_path_buf(), None)];

        while let Some((file, via)) = pending.pop() {
            if documents.contains_key(&file) {
                continue;
            }

            let text = match tokio::fs::read_to_string(self.root.join(&file)).await {
                Ok(text) => text,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(match via {
                        Some(target) => dangling(reference, &target),
                        None => FragmentError::NotFound {
                            reference: reference.to_string(),
                        },
                    })
                }
                Err(source) => {
                    return Err(FragmentError::Io {
                        reference: reference.to_string(),
                        source,
                    })
                }
            };
            let document: Json =
                serde_json::from_str(&text).map_err(|source| FragmentError::Parse {
                    reference: reference.to_string(),
                    source,
                })?;

            let mut refs = Vec::new();
            collect_refs(&document, &mut refs);
            for target in refs {
                let (path, _) = split_ref(&target);
                if !path.is_empty() {
                    let next = sibling(&file, path).ok_or_else(|| dangling(reference, &target))?;
                    if !documents.contains_key(&next) {
                        pending.push((next, Some(target.clone())));
                    }
                }
            }

            documents.insert(file, document);
        }

        Ok(documents)
    }
}

#[async_trait]
impl FragmentResolver for FileFragmentResolver {
    async fn resolve(&self, reference: &str) -> Result<Json, FragmentError> {
        let (path, pointer) = split_ref(reference);
        let entry = normalize(Path::new(path)).ok_or_else(|| dangling(reference, path))?;
        let documents = self.load(reference, &entry).await?;

        debug!(reference, files = documents.len(), "Loaded fragment");

        let mut inliner = Inliner {
            reference,
            documents: &documents,
            stack: Vec::new(),
        };
        inliner.inline_target(&entry, pointer, reference)
    }
}

struct Inliner<'a> {
    reference: &'a str,
    documents: &'a HashMap<PathBuf, Json>,
    stack: Vec<(PathBuf, String)>,
}

impl Inliner<'_> {
    fn inline_target(
        &mut self,
        file: &Path,
        pointer: &str,
        target: &str,
    ) -> Result<Json, FragmentError> {
        let documents = self.documents;
        let value = documents
            .get(file)
            .and_then(|doc| doc.pointer(pointer))
            .ok_or_else(|| dangling(self.reference, target))?;

        self.stack.push((file.to_path_buf(), pointer.to_string()));
        let inlined = self.inline(value, file);
        self.stack.pop();
        inlined
    }

    fn inline(&mut self, value: &Json, file: &Path) -> Result<Json, FragmentError> {
        match value {
            Json::Object(map) => {
                if let Some(Json::String(target)) = map.get("$ref") {
                    let (path, pointer) = split_ref(target);
                    let target_file = if path.is_empty() {
                        file.to_path_buf()
                    } else {
                        sibling(file, path).ok_or_else(|| dangling(self.reference, target))?
                    };

                    let key = (target_file, pointer.to_string());
                    if self.stack.contains(&key) {
                        return Ok(value.clone());
                    }
                    return self.inline_target(&key.0, pointer, target);
                }

                let mut inlined = Map::with_capacity(map.len());
                for (key, child) in map {
                    inlined.insert(key.clone(), self.inline(child, file)?);
                }
                Ok(Json::Object(inlined))
            }
            Json::Array(items) => items
                .iter()
                .map(|item| self.inline(item, file))
                .collect::<Result<Vec<_>, _>>()
                .map(Json::Array),
            other => Ok(other.clone()),
        }
    }
}

fn collect_refs(value: &Json, refs: &mut Vec<String>) {
    match value {
        Json::Object(map) => {
            if let Some(Json::String(target)) = map.get("$ref") {
                refs.push(target.clone());
            }
            for child in map.values() {
                collect_refs(child, refs);
            }
        }
        Json::Array(items) => items.iter().for_each(|item| collect_refs(item, refs)),
        _ => {}
    }
}

/// Split `file#pointer`.
fn split_ref(reference: &str) -> (&str, &str) {
    reference.split_once('#').unwrap_or((reference, ""))
}

fn dangling(reference: &str, target: &str) -> FragmentError {
    FragmentError::DanglingRef {
        reference: reference.to_string(),
        target: target.to_string(),
    }
}

/// `relative` resolved against the directory of `file`.
fn sibling(file: &Path, relative: &str) -> Option<PathBuf> {
    normalize(&file.parent().unwrap_or_else(|| Path::new("")).join(relative))
}

/// Root-relative form of `path`, or `None` when it is absolute or leaves the
/// root.
fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::Normal(part) => out.push(part),
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, document: Json) {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, serde_json::to_string_pretty(&document).unwrap()).unwrap();
    }

    #[test]
    fn test_split_and_normalize() {
        assert_eq!(split_ref("a.json#/x"), ("a.json", "/x"));
        assert_eq!(split_ref("#/x"), ("", "/x"));
        assert_eq!(split_ref("a.json"), ("a.json", ""));
        assert_eq!(
            sibling(Path::new("db/person.json"), "../common/id.json"),
            Some(PathBuf::from("common/id.json"))
        );
        assert_eq!(
            sibling(Path::new("person.json"), "./address.json"),
            Some(PathBuf::from("address.json"))
        );
        assert_eq!(sibling(Path::new("person.json"), "../secret.json"), None);
        assert_eq!(sibling(Path::new("db/person.json"), "/etc/passwd"), None);
        assert_eq!(normalize(Path::new("/abs/x.json")), None);
    }

    #[tokio::test]
    async fn test_paths_outside_root_are_dangling() {
        let outer = TempDir::new().unwrap();
        write(&outer, "secret.json", json!({ "type": "string" }));
        write(&outer, "schemas/escape.json", json!({ "a": { "$ref": "../secret.json" } }));
        let absolute = outer.path().join("secret.json");
        let absolute = absolute.to_str().unwrap();
        write(&outer, "schemas/absolute.json", json!({ "a": { "$ref": absolute } }));
        let resolver = FileFragmentResolver::new(outer.path().join("schemas"));

        assert!(matches!(
            resolver.resolve("escape.json").await.unwrap_err(),
            FragmentError::DanglingRef { ref target, .. } if target == "../secret.json"
        ));
        assert!(matches!(
            resolver.resolve("absolute.json").await.unwrap_err(),
            FragmentError::DanglingRef { ref target, .. } if target == absolute
        ));
        assert!(matches!(
            resolver.resolve("../secret.json").await.unwrap_err(),
            FragmentError::DanglingRef { .. }
        ));
        assert!(matches!(
            resolver.resolve(absolute).await.unwrap_err(),
            FragmentError::DanglingRef { .. }
        ));
    }

    #[tokio::test]
    async fn test_memory_resolver() {
        let resolver =
            MemoryFragmentResolver::new().with_fragment("a", json!({ "type": "string" }));

        assert_eq!(resolver.resolve("a").await.unwrap(), json!({ "type": "string" }));
        assert!(matches!(
            resolver.resolve("b").await.unwrap_err(),
            FragmentError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_local_and_file_refs() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "address.json",
            json!({
                "type": "object",
                "properties": {
                    "street": { "$ref": "#/definitions/line" },
                    "point": { "$ref": "geo/latlng.json" }
                },
                "definitions": { "line": { "type": "string", "maxLength": 80 } }
            }),
        );
        write(
            &dir,
            "geo/latlng.json",
            json!({
                "type": "array",
                "items": { "$ref": "../number.json#/definitions/coordinate" }
            }),
        );
        write(
            &dir,
            "number.json",
            json!({ "definitions": { "coordinate": { "type": "number" } } }),
        );

        let resolver = FileFragmentResolver::new(dir.path());
        let document = resolver.resolve("address.json").await.unwrap();

        assert_eq!(
            document["properties"],
            json!({
                "street": { "type": "string", "maxLength": 80 },
                "point": { "type": "array", "items": { "type": "number" } }
            })
        );

        let line = resolver.resolve("address.json#/definitions/line").await.unwrap();
        assert_eq!(line, json!({ "type": "string", "maxLength": 80 }));
    }

    #[tokio::test]
    async fn test_circular_refs_left_in_place() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "tree.json",
            json!({
                "type": "object",
                "properties": {
                    "children": { "type": "array", "items": { "$ref": "#" } }
                }
            }),
        );

        let document = FileFragmentResolver::new(dir.path())
            .resolve("tree.json")
            .await
            .unwrap();
        assert_eq!(document["properties"]["children"]["items"], json!({ "$ref": "#" }));
    }

    #[tokio::test]
    async fn test_resolution_errors() {
        let dir = TempDir::new().unwrap();
        write(&dir, "dangling.json", json!({ "a": { "$ref": "#/definitions/missing" } }));
        write(&dir, "far.json", json!({ "a": { "$ref": "nowhere.json" } }));
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        let resolver = FileFragmentResolver::new(dir.path());

        assert!(matches!(
            resolver.resolve("dangling.json").await.unwrap_err(),
            FragmentError::DanglingRef { ref target, .. } if target == "#/definitions/missing"
        ));
        assert!(matches!(
            resolver.resolve("far.json").await.unwrap_err(),
            FragmentError::DanglingRef { ref target, .. } if target == "nowhere.json"
        ));
        assert!(matches!(
            resolver.resolve("missing.json").await.unwrap_err(),
            FragmentError::NotFound { .. }
        ));
        assert!(matches!(
            resolver.resolve("broken.json").await.unwrap_err(),
            FragmentError::Parse { .. }
        ));
    }

    #[tokio::test]
    async fn test_resolve_all() {
        let resolver = MemoryFragmentResolver::new()
            .with_fragment("a", json!(1))
            .with_fragment("b", json!(2));

        let fragments = resolve_all(&resolver, &["a", "b"]).await.unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments["b"], json!(2));

        assert!(resolve_all(&resolver, &["a", "c"]).await.is_err());
    }
}
