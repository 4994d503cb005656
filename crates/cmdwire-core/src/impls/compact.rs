//! CompactSchema - 開発・テスト用の最小 TypeResolver
//!
//! フラットな struct だけを扱う。フィールドは宣言順にそのまま並べる。
//!
//! | FieldKind | encoding                         |
//! |-----------|----------------------------------|
//! | Uint      | varint                           |
//! | String    | varint(byte 長) + UTF-8          |
//! | Bool      | 1 byte（0 / 1）                  |
//!
//! decode は body を全部読み切る必要がある（余りはエラー）。

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::codec::{CodecError, read_varint, write_varint};
use crate::domain::qualify;
use crate::error::DispatchError;
use crate::ports::{RequestType, TypeHandle, TypeResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Uint,
    String,
    Bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDef {
    name: String,
    fields: Vec<(String, FieldKind)>,
}

impl StructDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push((name.into(), kind));
        self
    }
}

/// 完全修飾名付きの struct 定義
struct CompactStruct {
    fq_name: String,
    fields: Vec<(String, FieldKind)>,
}

impl RequestType for CompactStruct {
    fn name(&self) -> &str {
        &self.fq_name
    }

    fn encode(&self, value: &Value, buf: &mut Vec<u8>) -> Result<(), CodecError> {
        let object = value
            .as_object()
            .ok_or_else(|| CodecError::NotAnObject(self.fq_name.clone()))?;

        for (field, kind) in &self.fields {
            let v = object.get(field);
            match kind {
                FieldKind::Uint => {
                    let n = v
                        .and_then(Value::as_u64)
                        .ok_or_else(|| invalid(field, "uint"))?;
                    write_varint(n, buf);
                }
                FieldKind::String => {
                    let s = v
                        .and_then(Value::as_str)
                        .ok_or_else(|| invalid(field, "string"))?;
                    write_varint(s.len() as u64, buf);
                    buf.extend_from_slice(s.as_bytes());
                }
                FieldKind::Bool => {
                    let b = v
                        .and_then(Value::as_bool)
                        .ok_or_else(|| invalid(field, "bool"))?;
                    buf.push(u8::from(b));
                }
            }
        }
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        let mut rest = bytes;
        let mut object = Map::new();

        for (field, kind) in &self.fields {
            let value = match kind {
                FieldKind::Uint => {
                    let (n, used) = read_varint(rest)?;
                    rest = &rest[used..];
                    Value::from(n)
                }
                FieldKind::String => {
                    let (len, used) = read_varint(rest)?;
                    rest = &rest[used..];
                    let len = usize::try_from(len).map_err(|_| CodecError::UnexpectedEof)?;
                    if rest.len() < len {
                        return Err(CodecError::UnexpectedEof);
                    }
                    let (raw, tail) = rest.split_at(len);
                    rest = tail;
                    let s = std::str::from_utf8(raw)
                        .map_err(|_| CodecError::InvalidUtf8(field.clone()))?;
                    Value::from(s)
                }
                FieldKind::Bool => {
                    let (&b, tail) = rest.split_first().ok_or(CodecError::UnexpectedEof)?;
                    rest = tail;
                    match b {
                        0 => Value::Bool(false),
                        1 => Value::Bool(true),
                        _ => return Err(invalid(field, "bool")),
                    }
                }
            };
            object.insert(field.clone(), value);
        }

        if !rest.is_empty() {
            return Err(CodecError::TrailingBytes(rest.len()));
        }
        Ok(Value::Object(object))
    }
}

fn invalid(field: &str, expected: &'static str) -> CodecError {
    CodecError::InvalidField {
        field: field.to_string(),
        expected,
    }
}

/// CompactSchema は struct 定義を名前で引ける TypeResolver
///
/// 同じ名前には常に同じ `Arc` を返すので、TypeHandle の同一性が保たれる。
#[derive(Default)]
pub struct CompactSchema {
    types: HashMap<String, Arc<dyn RequestType>>,
}

impl CompactSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace(&mut self, name: impl Into<String>) -> SchemaNamespace<'_> {
        SchemaNamespace {
            schema: self,
            name: name.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn define(&mut self, fq_name: String, def: StructDef) -> Result<(), DispatchError> {
        if self.types.contains_key(&fq_name) {
            return Err(DispatchError::Configuration(format!(
                "request type already defined: {fq_name}"
            )));
        }
        let request_type = CompactStruct {
            fq_name: fq_name.clone(),
            fields: def.fields,
        };
        self.types.insert(fq_name, Arc::new(request_type));
        Ok(())
    }
}

impl TypeResolver for CompactSchema {
    fn resolve(&self, type_name: &str) -> Option<TypeHandle> {
        self.types.get(type_name).cloned().map(TypeHandle::new)
    }
}

pub struct SchemaNamespace<'a> {
    schema: &'a mut CompactSchema,
    name: String,
}

impl SchemaNamespace<'_> {
    /// `@<namespace>/<def.name>` として定義
    pub fn register(&mut self, def: StructDef) -> Result<(), DispatchError> {
        let fq_name = qualify(&self.name, &def.name);
        self.schema.define(fq_name, def)
    }
}
