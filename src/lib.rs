#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

use std::collections::HashMap;
use std::error::Error;
use std::fmt::{self, Display};
use std::num::IntErrorKind;

use serde_json::Value;

mod expand;
mod resolve;
mod schema;

pub use expand::expand_str;
pub use resolve::{EnvResolver, JsonResolver, LiteralResolver, Resolved, TagResolver};
pub use schema::{FieldDescriptor, FieldKind, FieldMut, FieldSlot, Record};

/// Error type for annotation resolution and record filling.
#[derive(Debug)]
pub struct TagError {
    kind: TagErrorKind,
}

impl TagError {
    /// Returns a reference to the error kind for detailed error inspection.
    pub fn kind(&self) -> &TagErrorKind {
        &self.kind
    }
}

impl Display for TagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = &self.kind;
        write!(f, "{kind}")
    }
}
impl Error for TagError {}

impl<K: Into<TagErrorKind>> From<K> for TagError {
    fn from(value: K) -> Self {
        let kind = value.into();
        TagError { kind }
    }
}

/// Detailed classification of filling errors.
///
/// Every failure is fail-fast: it aborts the whole `fill` call, and fields
/// written before it keep their new values.
#[derive(Debug)]
#[non_exhaustive]
pub enum TagErrorKind {
    /// A `${` with no matching `}` at or after it.
    MalformedPlaceholder {
        /// The string being expanded.
        text: String,
    },
    /// A document path selected nothing at resolver construction time.
    PathNotFound {
        /// The unresolvable path.
        path: String,
    },
    /// Value exceeds the signed destination's width.
    IntegerOverflow {
        /// Traversal path of the destination field.
        path: String,
    },
    /// Value exceeds the unsigned destination's width.
    UnsignedOverflow {
        /// Traversal path of the destination field.
        path: String,
    },
    /// Value exceeds the float destination's precision.
    FloatOverflow {
        /// Traversal path of the destination field.
        path: String,
    },
    /// The destination kind has no coercion rule for the resolved value.
    UnsupportedFieldType {
        /// Traversal path of the destination field.
        path: String,
    },
    /// A sequence destination received an element that is not a string.
    IncompatibleSequenceElement {
        /// Traversal path of the destination field.
        path: String,
    },
    /// Malformed numeric or boolean literal.
    ParseFailure {
        /// Traversal path of the destination field.
        path: String,
        /// The underlying parse error.
        message: String,
    },
    /// A resolver produced a value for a field the record does not expose
    /// mutably.
    FieldNotMutable {
        /// Traversal path of the field.
        path: String,
    },
}

impl Display for TagErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagErrorKind::MalformedPlaceholder { text } => {
                write!(f, "malformed placeholder in '{text}': no closing brace")
            }
            TagErrorKind::PathNotFound { path } => {
                write!(f, "document path '{path}' selects nothing")
            }
            TagErrorKind::IntegerOverflow { path } => {
                write!(f, "integer value overflows field at {path}")
            }
            TagErrorKind::UnsignedOverflow { path } => {
                write!(f, "unsigned value overflows field at {path}")
            }
            TagErrorKind::FloatOverflow { path } => {
                write!(f, "float value overflows field at {path}")
            }
            TagErrorKind::UnsupportedFieldType { path } => {
                write!(f, "no coercion rule for field at {path}")
            }
            TagErrorKind::IncompatibleSequenceElement { path } => {
                write!(f, "sequence element for field at {path} is not a string")
            }
            TagErrorKind::ParseFailure { path, message } => {
                write!(f, "cannot parse value for field at {path}: {message}")
            }
            TagErrorKind::FieldNotMutable { path } => {
                write!(f, "field at {path} is not mutable")
            }
        }
    }
}

type Result<T> = std::result::Result<T, TagError>;

const ROOT_PATH: &str = "$";

/// Owns the dictionary and the ordered resolver chain, and runs fill passes.
///
/// Resolvers are consulted in registration order per field and the first one
/// that produces a value wins, so registration order is precedence order.
/// The dictionary supplies `${KEY}` substitution values with priority over
/// environment variables and can be edited between fill passes.
///
/// One fill pass runs at a time: the processor performs no locking, so
/// sharing it across threads (or mutating the dictionary mid-fill) needs
/// external synchronization.
pub struct TagProcessor {
    dictionary: HashMap<String, String>,
    resolvers: Vec<Box<dyn TagResolver>>,
}

impl fmt::Debug for TagProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The chain holds trait objects; their kind names are the useful part.
        let kinds: Vec<&str> = self.resolvers.iter().map(|r| r.kind()).collect();
        f.debug_struct("TagProcessor")
            .field("dictionary", &self.dictionary)
            .field("resolvers", &kinds)
            .finish()
    }
}

impl Default for TagProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl TagProcessor {
    /// Creates a processor with an empty dictionary and no resolvers.
    pub fn new() -> Self {
        TagProcessor {
            dictionary: HashMap::new(),
            resolvers: Vec::new(),
        }
    }

    /// Creates a processor resolving `default` annotations only.
    pub fn defaults() -> Self {
        let mut processor = Self::new();
        processor.add_resolver(Box::new(LiteralResolver));
        processor
    }

    /// Creates a processor resolving `env` annotations only.
    pub fn env() -> Self {
        let mut processor = Self::new();
        processor.add_resolver(Box::new(EnvResolver));
        processor
    }

    /// Creates the configuration chain: json, then env, then default.
    ///
    /// `root_path` selects the sub-document that `json` annotations address;
    /// see [`JsonResolver::new`] for the failure modes.
    pub fn configuration(document: &Value, root_path: &str) -> Result<Self> {
        let mut processor = Self::new();
        processor.add_resolver(Box::new(JsonResolver::new(document, root_path)?));
        processor.add_resolver(Box::new(EnvResolver));
        processor.add_resolver(Box::new(LiteralResolver));
        Ok(processor)
    }

    /// Appends a resolver to the chain. Order is significant.
    pub fn add_resolver(&mut self, resolver: Box<dyn TagResolver>) {
        self.resolvers.push(resolver);
    }

    /// Sets a dictionary entry.
    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.dictionary.insert(key.into(), value.into());
    }

    /// Looks a dictionary entry up.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.dictionary.get(key).map(String::as_str)
    }

    /// Removes a dictionary entry.
    pub fn remove_value(&mut self, key: &str) {
        self.dictionary.remove(key);
    }

    /// Replaces the whole dictionary.
    pub fn set_dictionary(&mut self, dictionary: HashMap<String, String>) {
        self.dictionary = dictionary;
    }

    /// Returns the dictionary.
    pub fn dictionary(&self) -> &HashMap<String, String> {
        &self.dictionary
    }

    /// Fills `record`'s fields from their annotations, depth-first.
    ///
    /// `exclusions` lists traversal paths (`$.Outer.Inner`) to skip; matching
    /// is exact, and skipping a nested record skips its whole subtree.
    /// Fields with no annotation, and fields whose annotations no resolver
    /// can satisfy, are left untouched. Errors abort the pass immediately:
    /// fields already written stay written.
    pub fn fill(&self, record: &mut dyn Record, exclusions: Option<&[&str]>) -> Result<()> {
        log::trace!("filling record with {} resolvers", self.resolvers.len());
        let mut prefixes = vec![ROOT_PATH.to_owned(); self.resolvers.len()];
        self.fill_record(record, ROOT_PATH, exclusions, &mut prefixes)
    }

    fn fill_record(
        &self,
        record: &mut dyn Record,
        path: &str,
        exclusions: Option<&[&str]>,
        prefixes: &mut Vec<String>,
    ) -> Result<()> {
        for (index, field) in record.fields().iter().enumerate() {
            let curr_path = format!("{path}.{}", field.name);
            if exclusions.is_some_and(|list| list.contains(&curr_path.as_str())) {
                log::trace!("skipping excluded field {curr_path}");
                continue;
            }
            if field.kind == FieldKind::Record {
                let saved = prefixes.clone();
                for (i, resolver) in self.resolvers.iter().enumerate() {
                    let tag = expand_str(field.annotation(resolver.kind()), &self.dictionary)?;
                    prefixes[i] = resolver.descend(&prefixes[i], &tag, field.name);
                }
                if let Some(FieldMut::Record(nested)) = record.field_mut(index) {
                    self.fill_record(nested, &curr_path, exclusions, prefixes)?;
                }
                *prefixes = saved;
            } else {
                self.fill_field(record, index, field, &curr_path, prefixes)?;
            }
        }
        Ok(())
    }

    fn fill_field(
        &self,
        record: &mut dyn Record,
        index: usize,
        field: &FieldDescriptor,
        path: &str,
        prefixes: &[String],
    ) -> Result<()> {
        for (i, resolver) in self.resolvers.iter().enumerate() {
            let raw = field.annotation(resolver.kind());
            if raw.is_empty() {
                continue;
            }
            let tag = expand_str(raw, &self.dictionary)?;
            let Some(value) = resolver.resolve(&tag, field, &prefixes[i])? else {
                continue;
            };
            log::trace!("resolver '{}' supplies {path}", resolver.kind());
            let Some(slot) = record.field_mut(index) else {
                return Err(TagErrorKind::FieldNotMutable {
                    path: path.to_owned(),
                }
                .into());
            };
            return write_value(slot, value, path);
        }
        Ok(())
    }
}

fn write_value(slot: FieldMut<'_>, value: Resolved, path: &str) -> Result<()> {
    match value {
        Resolved::Str(text) => write_text(slot, &text, path),
        Resolved::Typed(value) => write_typed(slot, &value, path),
    }
}

fn write_text(slot: FieldMut<'_>, text: &str, path: &str) -> Result<()> {
    match slot {
        FieldMut::String(dest) => *dest = text.to_owned(),
        FieldMut::I8(dest) => *dest = parse_signed(text, path)?,
        FieldMut::I16(dest) => *dest = parse_signed(text, path)?,
        FieldMut::I32(dest) => *dest = parse_signed(text, path)?,
        FieldMut::I64(dest) => *dest = parse_signed(text, path)?,
        FieldMut::U8(dest) => *dest = parse_unsigned(text, path)?,
        FieldMut::U16(dest) => *dest = parse_unsigned(text, path)?,
        FieldMut::U32(dest) => *dest = parse_unsigned(text, path)?,
        FieldMut::U64(dest) => *dest = parse_unsigned(text, path)?,
        FieldMut::F32(dest) => *dest = narrow_float(parse_float(text, path)?, path)?,
        FieldMut::F64(dest) => *dest = parse_float(text, path)?,
        FieldMut::Bool(dest) => *dest = parse_bool(text, path)?,
        FieldMut::StringSeq(dest) => *dest = text.split(',').map(str::to_owned).collect(),
        FieldMut::Record(_) => {
            return Err(TagErrorKind::UnsupportedFieldType {
                path: path.to_owned(),
            }
            .into());
        }
    }
    Ok(())
}

fn write_typed(slot: FieldMut<'_>, value: &Value, path: &str) -> Result<()> {
    match slot {
        FieldMut::I8(dest) => *dest = typed_signed(value, path)?,
        FieldMut::I16(dest) => *dest = typed_signed(value, path)?,
        FieldMut::I32(dest) => *dest = typed_signed(value, path)?,
        FieldMut::I64(dest) => *dest = typed_signed(value, path)?,
        FieldMut::U8(dest) => *dest = typed_unsigned(value, path)?,
        FieldMut::U16(dest) => *dest = typed_unsigned(value, path)?,
        FieldMut::U32(dest) => *dest = typed_unsigned(value, path)?,
        FieldMut::U64(dest) => *dest = typed_unsigned(value, path)?,
        FieldMut::F32(dest) => *dest = narrow_float(typed_float(value, path)?, path)?,
        FieldMut::F64(dest) => *dest = typed_float(value, path)?,
        FieldMut::Bool(dest) => match value {
            Value::Bool(flag) => *dest = *flag,
            _ => {
                return Err(TagErrorKind::UnsupportedFieldType {
                    path: path.to_owned(),
                }
                .into());
            }
        },
        FieldMut::StringSeq(dest) => *dest = typed_sequence(value, path)?,
        FieldMut::String(_) | FieldMut::Record(_) => {
            return Err(TagErrorKind::UnsupportedFieldType {
                path: path.to_owned(),
            }
            .into());
        }
    }
    Ok(())
}

fn parse_signed<T: TryFrom<i64>>(text: &str, path: &str) -> Result<T> {
    let wide = text.parse::<i64>().map_err(|err| -> TagError {
        match err.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => TagErrorKind::IntegerOverflow {
                path: path.to_owned(),
            }
            .into(),
            _ => TagErrorKind::ParseFailure {
                path: path.to_owned(),
                message: err.to_string(),
            }
            .into(),
        }
    })?;
    T::try_from(wide).map_err(|_| {
        TagErrorKind::IntegerOverflow {
            path: path.to_owned(),
        }
        .into()
    })
}

fn parse_unsigned<T: TryFrom<u64>>(text: &str, path: &str) -> Result<T> {
    let wide = text.parse::<u64>().map_err(|err| -> TagError {
        match err.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                TagErrorKind::UnsignedOverflow {
                    path: path.to_owned(),
                }
                .into()
            }
            _ => TagErrorKind::ParseFailure {
                path: path.to_owned(),
                message: err.to_string(),
            }
            .into(),
        }
    })?;
    T::try_from(wide).map_err(|_| {
        TagErrorKind::UnsignedOverflow {
            path: path.to_owned(),
        }
        .into()
    })
}

fn parse_float(text: &str, path: &str) -> Result<f64> {
    let value = text
        .parse::<f64>()
        .map_err(|err| TagErrorKind::ParseFailure {
            path: path.to_owned(),
            message: err.to_string(),
        })?;
    // `parse` maps out-of-range literals to infinity rather than failing.
    if value.is_infinite() {
        return Err(TagErrorKind::FloatOverflow {
            path: path.to_owned(),
        }
        .into());
    }
    Ok(value)
}

fn narrow_float(value: f64, path: &str) -> Result<f32> {
    let narrowed = value as f32;
    if narrowed.is_infinite() && value.is_finite() {
        return Err(TagErrorKind::FloatOverflow {
            path: path.to_owned(),
        }
        .into());
    }
    Ok(narrowed)
}

fn parse_bool(text: &str, path: &str) -> Result<bool> {
    match text {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(TagErrorKind::ParseFailure {
            path: path.to_owned(),
            message: format!("invalid boolean literal '{text}'"),
        }
        .into()),
    }
}

// Any JSON number widens to i128 so one range check covers every integer
// destination. Floats truncate toward zero.
fn widen_number(number: &serde_json::Number) -> i128 {
    if let Some(n) = number.as_i64() {
        n as i128
    } else if let Some(n) = number.as_u64() {
        n as i128
    } else {
        number.as_f64().unwrap_or_default() as i128
    }
}

fn typed_signed<T: TryFrom<i128>>(value: &Value, path: &str) -> Result<T> {
    let Value::Number(number) = value else {
        return Err(TagErrorKind::UnsupportedFieldType {
            path: path.to_owned(),
        }
        .into());
    };
    T::try_from(widen_number(number)).map_err(|_| {
        TagErrorKind::IntegerOverflow {
            path: path.to_owned(),
        }
        .into()
    })
}

fn typed_unsigned<T: TryFrom<i128>>(value: &Value, path: &str) -> Result<T> {
    let Value::Number(number) = value else {
        return Err(TagErrorKind::UnsupportedFieldType {
            path: path.to_owned(),
        }
        .into());
    };
    T::try_from(widen_number(number)).map_err(|_| {
        TagErrorKind::UnsignedOverflow {
            path: path.to_owned(),
        }
        .into()
    })
}

fn typed_float(value: &Value, path: &str) -> Result<f64> {
    match value.as_f64() {
        Some(number) => Ok(number),
        None => Err(TagErrorKind::UnsupportedFieldType {
            path: path.to_owned(),
        }
        .into()),
    }
}

fn typed_sequence(value: &Value, path: &str) -> Result<Vec<String>> {
    let Value::Array(items) = value else {
        return Err(TagErrorKind::UnsupportedFieldType {
            path: path.to_owned(),
        }
        .into());
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(text) => Ok(text.clone()),
            _ => Err(TagErrorKind::IncompatibleSequenceElement {
                path: path.to_owned(),
            }
            .into()),
        })
        .collect()
}
