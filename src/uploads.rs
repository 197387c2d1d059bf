//! Upload-descriptor normalization.
//!
//! Raw descriptors arrive as a loosely-shaped tree of maps (the
//! flattened `$_FILES`-style convention). A leaf is a map carrying an
//! `error` key: scalar fields describe one file, while index-aligned
//! list fields (the parallel-array convention) describe several files
//! under one field name. Any map without an `error` key is a nested
//! group. The shape is decided once here and converted into a tagged
//! node tree of constructed upload values.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// File-backed content stream for an uploaded file.
///
/// A temporary path that cannot be opened yields a stream that is
/// immediately at end-of-file; reads never error. The error code on
/// the owning [`UploadedFile`] communicates failure to the caller.
#[derive(Debug)]
pub struct FileStream {
    file: Option<File>,
}

impl FileStream {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let file = File::open(path).ok();
        if file.is_none() {
            tracing::debug!(path = %path.display(), "upload temp path could not be opened");
        }
        Self { file }
    }

    /// Whether the underlying file handle was opened.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Read the remaining stream content.
    pub fn contents(&mut self) -> Vec<u8> {
        let mut buf = Vec::new();
        let _ = Read::read_to_end(self, &mut buf);
        buf
    }
}

impl Read for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.file {
            Some(file) => match file.read(buf) {
                Ok(n) => Ok(n),
                Err(err) => {
                    tracing::warn!(error = %err, "upload stream read failed, treating as end of file");
                    self.file = None;
                    Ok(0)
                }
            },
            None => Ok(0),
        }
    }
}

/// One uploaded file, converted from a scalar descriptor leaf.
#[derive(Debug)]
pub struct UploadedFile {
    stream: FileStream,
    size: Option<u64>,
    error: u8,
    client_filename: Option<String>,
    client_media_type: Option<String>,
}

impl UploadedFile {
    pub fn new(
        stream: FileStream,
        size: Option<u64>,
        error: u8,
        client_filename: Option<String>,
        client_media_type: Option<String>,
    ) -> Self {
        Self {
            stream,
            size,
            error,
            client_filename,
            client_media_type,
        }
    }

    /// Content stream; reading consumes it.
    #[inline]
    pub fn stream_mut(&mut self) -> &mut FileStream {
        &mut self.stream
    }

    /// Size the client claimed, if any.
    #[inline]
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Upload error code (0 = success).
    #[inline]
    pub fn error(&self) -> u8 {
        self.error
    }

    #[inline]
    pub fn client_filename(&self) -> Option<&str> {
        self.client_filename.as_deref()
    }

    #[inline]
    pub fn client_media_type(&self) -> Option<&str> {
        self.client_media_type.as_deref()
    }
}

/// Converted upload tree node.
#[derive(Debug)]
pub enum UploadNode {
    /// Single file.
    File(UploadedFile),
    /// Parallel-array leaf expanded by index.
    List(Vec<UploadNode>),
    /// Nested field group.
    Group(Vec<(String, UploadNode)>),
}

impl UploadNode {
    #[inline]
    pub fn as_file(&self) -> Option<&UploadedFile> {
        match self {
            UploadNode::File(file) => Some(file),
            _ => None,
        }
    }

    #[inline]
    pub fn as_file_mut(&mut self) -> Option<&mut UploadedFile> {
        match self {
            UploadNode::File(file) => Some(file),
            _ => None,
        }
    }

    #[inline]
    pub fn as_list(&self) -> Option<&[UploadNode]> {
        match self {
            UploadNode::List(items) => Some(items),
            _ => None,
        }
    }

    #[inline]
    pub fn as_group(&self) -> Option<&[(String, UploadNode)]> {
        match self {
            UploadNode::Group(entries) => Some(entries),
            _ => None,
        }
    }
}

/// Raw fields of a descriptor leaf before normalization. Each field
/// may hold a scalar or an index-aligned list.
#[derive(Debug, Deserialize)]
struct RawLeaf {
    #[serde(default)]
    name: Option<Value>,
    #[serde(default, rename = "type")]
    media_type: Option<Value>,
    #[serde(default)]
    tmp_name: Option<Value>,
    error: Value,
    #[serde(default)]
    size: Option<Value>,
}

/// Convert a raw descriptor tree into upload nodes.
///
/// `Value::Null` means no uploads and yields an empty tree. Field
/// order and nesting depth of the input are preserved.
pub(crate) fn from_descriptors(descriptors: Value) -> Result<Vec<(String, UploadNode)>> {
    match descriptors {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => convert_group(map),
        other => Err(Error::InvalidUploadDescriptor(format!(
            "descriptor root must be a map of field names, got {}",
            type_name(&other)
        ))),
    }
}

fn convert_group(map: Map<String, Value>) -> Result<Vec<(String, UploadNode)>> {
    let mut nodes = Vec::with_capacity(map.len());
    for (field, value) in map {
        match value {
            Value::Object(inner) if inner.contains_key("error") => {
                let node = convert_leaf(&field, inner)?;
                nodes.push((field, node));
            }
            Value::Object(inner) => {
                nodes.push((field, UploadNode::Group(convert_group(inner)?)));
            }
            _ => {
                tracing::debug!(field = %field, "skipping non-map upload descriptor entry");
            }
        }
    }
    Ok(nodes)
}

fn convert_leaf(field: &str, leaf: Map<String, Value>) -> Result<UploadNode> {
    let RawLeaf {
        name,
        media_type,
        tmp_name,
        error,
        size,
    } = serde_json::from_value(Value::Object(leaf))
        .map_err(|err| Error::InvalidUploadDescriptor(format!("field `{}`: {}", field, err)))?;

    if let Value::Array(errors) = error {
        // Parallel-array convention: one synthetic leaf per index of
        // the error list, fields picked from the aligned lists.
        let mut items = Vec::with_capacity(errors.len());
        for (idx, error) in errors.into_iter().enumerate() {
            let mut synthetic = Map::new();
            for (key, source) in [
                ("name", &name),
                ("type", &media_type),
                ("tmp_name", &tmp_name),
                ("size", &size),
            ] {
                if let Some(value) = index_into(source, idx) {
                    synthetic.insert(key.to_string(), value);
                }
            }
            synthetic.insert("error".to_string(), error);
            items.push(convert_leaf(field, synthetic)?);
        }
        return Ok(UploadNode::List(items));
    }

    let error_code = error_code(field, &error)?;
    let tmp_path = tmp_name.as_ref().and_then(string_cast).ok_or_else(|| {
        Error::InvalidUploadDescriptor(format!("field `{}`: missing or non-scalar tmp_name", field))
    })?;

    let file = UploadedFile::new(
        FileStream::open(&tmp_path),
        size.as_ref().map(|v| int_cast(v).max(0) as u64),
        error_code,
        name.as_ref().and_then(string_cast),
        media_type.as_ref().and_then(string_cast),
    );

    tracing::debug!(
        field = %field,
        tmp_name = %tmp_path,
        error = error_code,
        "converted upload descriptor leaf"
    );

    Ok(UploadNode::File(file))
}

/// Index into a parallel-array field; absent or too-short lists yield
/// nothing.
fn index_into(source: &Option<Value>, idx: usize) -> Option<Value> {
    source.as_ref()?.as_array()?.get(idx).cloned()
}

fn error_code(field: &str, error: &Value) -> Result<u8> {
    let code = match error {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    code.and_then(|c| u8::try_from(c).ok()).ok_or_else(|| {
        Error::InvalidUploadDescriptor(format!(
            "field `{}`: error must be an integer code or a list of codes",
            field
        ))
    })
}

/// String cast of a scalar descriptor value.
fn string_cast(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Integer cast: numbers truncate, numeric strings parse, anything
/// else is 0.
fn int_cast(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .unwrap_or_else(|| n.as_f64().map(|f| f as i64).unwrap_or(0)),
        Value::String(s) => s.trim().parse::<i64>().unwrap_or(0),
        Value::Bool(true) => 1,
        _ => 0,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn fixture(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_scalar_leaf() {
        let tmp = fixture(b"file contents");
        let tree = from_descriptors(json!({
            "avatar": {
                "name": "me.png",
                "type": "image/png",
                "tmp_name": tmp.path().to_str().unwrap(),
                "error": 0,
                "size": 13,
            }
        }))
        .unwrap();

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].0, "avatar");
        let (_, mut node) = tree.into_iter().next().unwrap();
        let UploadNode::File(file) = &mut node else {
            panic!("expected file leaf");
        };
        assert_eq!(file.client_filename(), Some("me.png"));
        assert_eq!(file.client_media_type(), Some("image/png"));
        assert_eq!(file.size(), Some(13));
        assert_eq!(file.error(), 0);
        assert!(file.stream_mut().is_open());
        assert_eq!(file.stream_mut().contents(), b"file contents");
    }

    #[test]
    fn test_optional_fields_absent() {
        let tree = from_descriptors(json!({
            "doc": {
                "tmp_name": "/nonexistent/upload",
                "error": 4,
            }
        }))
        .unwrap();

        let file = tree[0].1.as_file().unwrap();
        assert_eq!(file.client_filename(), None);
        assert_eq!(file.client_media_type(), None);
        assert_eq!(file.size(), None);
        assert_eq!(file.error(), 4);
    }

    #[test]
    fn test_unopenable_tmp_path_is_empty_stream() {
        let mut tree = from_descriptors(json!({
            "doc": {
                "name": "gone.txt",
                "tmp_name": "/nonexistent/upload",
                "error": 0,
                "size": 99,
            }
        }))
        .unwrap();

        let file = tree[0].1.as_file_mut().unwrap();
        assert!(!file.stream_mut().is_open());
        assert_eq!(file.stream_mut().contents(), b"");
        // Metadata survives even when the stream does not.
        assert_eq!(file.size(), Some(99));
    }

    #[test]
    fn test_parallel_array_leaf_expands_to_list() {
        let first = fixture(b"one");
        let second = fixture(b"two");
        let mut tree = from_descriptors(json!({
            "photos": {
                "name": ["a.jpg", "b.jpg"],
                "type": ["image/jpeg", "image/jpeg"],
                "tmp_name": [first.path().to_str().unwrap(), second.path().to_str().unwrap()],
                "error": [0, 0],
                "size": [3, 3],
            }
        }))
        .unwrap();

        let UploadNode::List(items) = &mut tree[0].1 else {
            panic!("expected list node");
        };
        assert_eq!(items.len(), 2);
        let first_file = items[0].as_file_mut().unwrap();
        assert_eq!(first_file.client_filename(), Some("a.jpg"));
        assert_eq!(first_file.stream_mut().contents(), b"one");
        let second_file = items[1].as_file_mut().unwrap();
        assert_eq!(second_file.client_filename(), Some("b.jpg"));
        assert_eq!(second_file.stream_mut().contents(), b"two");
    }

    #[test]
    fn test_nested_group_preserves_shape_and_order() {
        let tree = from_descriptors(json!({
            "form": {
                "inner": {
                    "tmp_name": "/nonexistent/a",
                    "error": 4,
                },
                "other": {
                    "tmp_name": "/nonexistent/b",
                    "error": 4,
                },
            }
        }))
        .unwrap();

        let group = tree[0].1.as_group().unwrap();
        assert_eq!(group.len(), 2);
        assert_eq!(group[0].0, "inner");
        assert_eq!(group[1].0, "other");
        assert!(group[0].1.as_file().is_some());
    }

    #[test]
    fn test_non_map_entry_is_skipped() {
        let tree = from_descriptors(json!({
            "stray": "not a descriptor",
            "real": {
                "tmp_name": "/nonexistent/c",
                "error": 4,
            }
        }))
        .unwrap();

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].0, "real");
    }

    #[test]
    fn test_empty_map_yields_empty_tree() {
        assert!(from_descriptors(json!({})).unwrap().is_empty());
        assert!(from_descriptors(Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_root_rejected() {
        let err = from_descriptors(json!(["not", "a", "map"])).unwrap_err();
        assert!(err.to_string().contains("descriptor root"));
    }

    #[test]
    fn test_invalid_error_shape_rejected() {
        let err = from_descriptors(json!({
            "bad": { "tmp_name": "/tmp/x", "error": {"nested": true} }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("error must be an integer"));

        let err = from_descriptors(json!({
            "bad": { "tmp_name": "/tmp/x", "error": "not-a-code" }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("error must be an integer"));
    }

    #[test]
    fn test_missing_tmp_name_rejected() {
        let err = from_descriptors(json!({
            "bad": { "name": "x.txt", "error": 0 }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("tmp_name"));
    }

    #[test]
    fn test_numeric_strings_cast() {
        let tree = from_descriptors(json!({
            "doc": {
                "name": 123,
                "tmp_name": "/nonexistent/d",
                "error": "0",
                "size": "42",
            }
        }))
        .unwrap();

        let file = tree[0].1.as_file().unwrap();
        assert_eq!(file.client_filename(), Some("123"));
        assert_eq!(file.error(), 0);
        assert_eq!(file.size(), Some(42));
    }

    #[test]
    fn test_out_of_range_error_code_rejected() {
        let err = from_descriptors(json!({
            "bad": { "tmp_name": "/tmp/x", "error": 4096 }
        }))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidUploadDescriptor(_)));
    }
}
