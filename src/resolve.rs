//! Value resolvers: the pluggable annotation kinds.
//!
//! Each resolver owns one annotation kind (`"default"`, `"env"`, `"json"`).
//! The walker hands it the placeholder-expanded annotation and the resolver
//! answers with a candidate value, or `None` when the annotation is present
//! but cannot be satisfied right now (an unset environment variable, a
//! document path that selects nothing) — that signal is what lets later
//! resolvers in the chain act as fallbacks.

use std::env;

use serde_json::Value;

use crate::schema::FieldDescriptor;
use crate::{TagError, TagErrorKind};

/// A resolver's candidate value, before coercion into the destination field.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolved {
    /// Raw text, parsed according to the destination kind.
    Str(String),
    /// An already-typed document value, coerced by kind compatibility.
    Typed(Value),
}

/// One annotation kind in the resolver chain.
pub trait TagResolver {
    /// Annotation kind name this resolver consumes.
    fn kind(&self) -> &'static str;

    /// Turns an expanded annotation into a candidate value.
    ///
    /// `struct_path` is this resolver's structural path accumulated over the
    /// enclosing records (see [`TagResolver::descend`]); only document-backed
    /// resolvers care about it. `None` means "not applicable, try the next
    /// resolver in the chain".
    fn resolve(
        &self,
        tag: &str,
        field: &FieldDescriptor,
        struct_path: &str,
    ) -> Result<Option<Resolved>, TagError>;

    /// Computes the structural path for a nested record field.
    ///
    /// Called by the walker before it recurses, with this resolver's current
    /// prefix and the record field's expanded annotation for this kind. An
    /// annotation starting with `$` resets the prefix, an empty annotation
    /// appends the field name, anything else appends the annotation.
    fn descend(&self, prefix: &str, tag: &str, field_name: &str) -> String {
        if tag.starts_with('$') {
            tag.to_owned()
        } else if tag.is_empty() {
            format!("{prefix}.{field_name}")
        } else {
            format!("{prefix}.{tag}")
        }
    }
}

/// Resolves `default` annotations: the annotation itself is the value.
#[derive(Debug)]
pub struct LiteralResolver;

impl TagResolver for LiteralResolver {
    fn kind(&self) -> &'static str {
        "default"
    }

    fn resolve(
        &self,
        tag: &str,
        _field: &FieldDescriptor,
        _struct_path: &str,
    ) -> Result<Option<Resolved>, TagError> {
        Ok(Some(Resolved::Str(tag.to_owned())))
    }
}

/// Resolves `env` annotations: the annotation names an environment variable.
#[derive(Debug)]
pub struct EnvResolver;

impl TagResolver for EnvResolver {
    fn kind(&self) -> &'static str {
        "env"
    }

    fn resolve(
        &self,
        tag: &str,
        _field: &FieldDescriptor,
        _struct_path: &str,
    ) -> Result<Option<Resolved>, TagError> {
        match env::var(tag) {
            Ok(value) => Ok(Some(Resolved::Str(value))),
            Err(_) => Ok(None),
        }
    }
}

/// Resolves `json` annotations against a parsed document.
///
/// Construction selects a sub-document via a root path; annotations are then
/// addressed inside that sub-document. An annotation starting with `$` is
/// used as-is, anything else is joined onto the structural path accumulated
/// over the enclosing records.
#[derive(Debug)]
pub struct JsonResolver {
    root: Value,
}

impl JsonResolver {
    /// Selects `root_path` inside `document` and captures that sub-tree.
    ///
    /// Fails with [`TagErrorKind::PathNotFound`] when the document is null or
    /// the path selects nothing.
    pub fn new(document: &Value, root_path: &str) -> Result<Self, TagError> {
        match lookup(document, root_path) {
            Some(root) if !root.is_null() => Ok(JsonResolver { root: root.clone() }),
            _ => Err(TagErrorKind::PathNotFound {
                path: root_path.to_owned(),
            }
            .into()),
        }
    }
}

impl TagResolver for JsonResolver {
    fn kind(&self) -> &'static str {
        "json"
    }

    fn resolve(
        &self,
        tag: &str,
        _field: &FieldDescriptor,
        struct_path: &str,
    ) -> Result<Option<Resolved>, TagError> {
        let path = if tag.starts_with('$') {
            tag.to_owned()
        } else {
            format!("{struct_path}.{tag}")
        };
        match lookup(&self.root, &path) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) => Ok(Some(Resolved::Str(text.clone()))),
            Some(value) => Ok(Some(Resolved::Typed(value.clone()))),
        }
    }
}

/// Looks a restricted `$.name.name[index]` path up in a parsed document.
///
/// Supported segments are `.name` and `[index]` only — no wildcards, no
/// filters. Returns `None` for syntactically invalid paths as well as for
/// paths that fall off the document.
pub(crate) fn lookup<'v>(document: &'v Value, path: &str) -> Option<&'v Value> {
    let mut rest = path.strip_prefix('$')?;
    let mut current = document;
    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix('.') {
            let end = tail.find(['.', '[']).unwrap_or(tail.len());
            let (name, tail) = tail.split_at(end);
            if name.is_empty() {
                return None;
            }
            current = current.get(name)?;
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix('[') {
            let (index, tail) = tail.split_once(']')?;
            let index: usize = index.parse().ok()?;
            current = current.get(index)?;
            rest = tail;
        } else {
            return None;
        }
    }
    Some(current)
}
