//! Schema-driven field tables.
//!
//! The walker never inspects types directly; it operates over a static
//! per-record table of [`FieldDescriptor`]s plus indexed mutable access to
//! the corresponding fields. The [`record!`] macro generates both from a
//! struct definition, but [`Record`] can also be implemented by hand, for
//! example to expose only part of a struct.

/// Static type classification of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// 8-bit signed integer.
    I8,
    /// 16-bit signed integer.
    I16,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit unsigned integer.
    U32,
    /// 64-bit unsigned integer.
    U64,
    /// Single-precision float.
    F32,
    /// Double-precision float.
    F64,
    /// Boolean.
    Bool,
    /// Owned string.
    String,
    /// Sequence of strings.
    StringSeq,
    /// Nested record; the walker recurses instead of resolving a value.
    Record,
}

/// Structural metadata for one field of a [`Record`].
#[derive(Clone, Copy, Debug)]
pub struct FieldDescriptor {
    /// Field name as it appears in traversal paths.
    pub name: &'static str,
    /// Static type classification.
    pub kind: FieldKind,
    /// `(resolver kind, raw annotation)` pairs attached to this field.
    pub annotations: &'static [(&'static str, &'static str)],
}

impl FieldDescriptor {
    /// Raw annotation string for a resolver kind, `""` when absent.
    pub fn annotation(&self, kind: &str) -> &'static str {
        self.annotations
            .iter()
            .find(|(name, _)| *name == kind)
            .map_or("", |(_, tag)| *tag)
    }
}

/// Mutable view of a single record field.
pub enum FieldMut<'a> {
    /// 8-bit signed integer field.
    I8(&'a mut i8),
    /// 16-bit signed integer field.
    I16(&'a mut i16),
    /// 32-bit signed integer field.
    I32(&'a mut i32),
    /// 64-bit signed integer field.
    I64(&'a mut i64),
    /// 8-bit unsigned integer field.
    U8(&'a mut u8),
    /// 16-bit unsigned integer field.
    U16(&'a mut u16),
    /// 32-bit unsigned integer field.
    U32(&'a mut u32),
    /// 64-bit unsigned integer field.
    U64(&'a mut u64),
    /// Single-precision float field.
    F32(&'a mut f32),
    /// Double-precision float field.
    F64(&'a mut f64),
    /// Boolean field.
    Bool(&'a mut bool),
    /// String field.
    String(&'a mut String),
    /// Sequence-of-strings field.
    StringSeq(&'a mut Vec<String>),
    /// Nested record field.
    Record(&'a mut dyn Record),
}

/// A structure whose fields can be filled from annotations.
///
/// Descriptors must be listed in declaration order, and `field_mut(i)` must
/// hand out the field described by `fields()[i]`. Returning `None` marks a
/// field that is listed in the table but not externally mutable: the walker
/// skips it unless a resolver actually produces a value for it.
pub trait Record {
    /// Static field table in declaration order.
    fn fields(&self) -> &'static [FieldDescriptor];

    /// Mutable access to the field at `index`, or `None` if the field (or an
    /// out-of-range index) cannot be written.
    fn field_mut(&mut self, index: usize) -> Option<FieldMut<'_>>;
}

/// Maps a Rust type to its [`FieldKind`] and [`FieldMut`] variant.
///
/// Implemented for every supported scalar type; the [`record!`] macro
/// implements it for each generated record so nested records compose.
pub trait FieldSlot {
    /// Field kind of this type.
    const KIND: FieldKind;

    /// Mutable view of this value.
    fn slot(&mut self) -> FieldMut<'_>;
}

macro_rules! scalar_slot {
    ($($ty:ty => $kind:ident),+ $(,)?) => {$(
        impl FieldSlot for $ty {
            const KIND: FieldKind = FieldKind::$kind;

            fn slot(&mut self) -> FieldMut<'_> {
                FieldMut::$kind(self)
            }
        }
    )+};
}

scalar_slot! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    bool => Bool,
    String => String,
    Vec<String> => StringSeq,
}

/// Defines a struct together with its [`Record`] and [`FieldSlot`] impls.
///
/// Fields may carry one `#[tag(kind = "annotation", ...)]` pseudo-attribute
/// listing their annotations; the attribute is consumed by the macro and
/// never reaches the compiler. Field types must implement [`FieldSlot`],
/// which includes every record type previously defined through this macro.
///
/// ```
/// use tagfill::record;
///
/// record! {
///     #[derive(Default, Debug)]
///     pub struct Endpoint {
///         #[tag(env = "ENDPOINT_HOST", default = "localhost")]
///         pub host: String,
///         #[tag(default = "8080")]
///         pub port: u16,
///     }
/// }
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[tag($($akind:ident = $atag:literal),+ $(,)?)])?
                $fvis:vis $field:ident : $fty:ty
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $($fvis $field: $fty,)+
        }

        impl $crate::Record for $name {
            fn fields(&self) -> &'static [$crate::FieldDescriptor] {
                static FIELDS: &[$crate::FieldDescriptor] = &[
                    $($crate::FieldDescriptor {
                        name: stringify!($field),
                        kind: <$fty as $crate::FieldSlot>::KIND,
                        annotations: &[$($((stringify!($akind), $atag)),+)?],
                    },)+
                ];
                FIELDS
            }

            fn field_mut(&mut self, index: usize) -> Option<$crate::FieldMut<'_>> {
                let mut current = 0usize;
                $(
                    if index == current {
                        return Some($crate::FieldSlot::slot(&mut self.$field));
                    }
                    current += 1;
                )+
                let _ = current;
                None
            }
        }

        impl $crate::FieldSlot for $name {
            const KIND: $crate::FieldKind = $crate::FieldKind::Record;

            fn slot(&mut self) -> $crate::FieldMut<'_> {
                $crate::FieldMut::Record(self)
            }
        }
    };
}
