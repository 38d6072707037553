use core::any::Any;
use core::fmt;

use super::Shape;

/// Returns mutable access to one field of the struct behind `parent`.
pub type FieldGetMutFn = fn(parent: &mut dyn Any) -> Option<&mut dyn Any>;

bitflags::bitflags! {
    /// Flags set on a [`Field`] by `#[derive(Bind)]`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FieldFlags: u8 {
        /// Never bound: `#[form(skip)]` or `#[form(rename = "-")]`.
        const SKIP = 1 << 0;

        /// Embedded struct whose fields are addressed as if they were
        /// declared on the parent: `#[form(flatten)]`.
        const FLATTEN = 1 << 1;

        /// Must be present in the input: `#[form(required)]`.
        const REQUIRED = 1 << 2;

        /// Declared without `pub`. Private fields are never bound.
        const PRIVATE = 1 << 3;
    }
}

/// Describes a named field of a struct.
#[derive(Clone, Copy)]
pub struct Field {
    /// identifier of the field as declared in Rust (without `r#`)
    pub name: &'static str,

    /// external key set with `#[form(rename = "...")]`
    pub rename: Option<&'static str>,

    /// shape of the field's type
    ///
    /// the layer of indirection allows for self-referential types
    pub shape: fn() -> &'static Shape,

    /// flags set via the derive macro
    pub flags: FieldFlags,

    /// accessor for the field on a live parent value
    pub get_mut: FieldGetMutFn,

    /// doc comments
    pub doc: &'static [&'static str],
}

impl Field {
    /// Returns the shape of the field's type
    #[inline]
    pub fn shape(&self) -> &'static Shape {
        (self.shape)()
    }

    /// The key this field is addressed by in form input.
    #[inline]
    pub fn effective_name(&self) -> &'static str {
        self.rename.unwrap_or(self.name)
    }

    /// Returns `true` if the field is excluded from binding.
    #[inline]
    pub fn is_skipped(&self) -> bool {
        self.flags.contains(FieldFlags::SKIP)
    }

    /// Returns `true` if the field's own fields are promoted onto the parent.
    #[inline]
    pub fn is_flattened(&self) -> bool {
        self.flags.contains(FieldFlags::FLATTEN)
    }

    /// Returns `true` if the field must be present in the input.
    #[inline]
    pub fn is_required(&self) -> bool {
        self.flags.contains(FieldFlags::REQUIRED)
    }

    /// Returns `true` if the field was declared without `pub`.
    #[inline]
    pub fn is_private(&self) -> bool {
        self.flags.contains(FieldFlags::PRIVATE)
    }

    /// Returns `true` if a value can ever be written to this field.
    #[inline]
    pub fn is_bindable(&self) -> bool {
        !self.flags.intersects(FieldFlags::SKIP.union(FieldFlags::PRIVATE))
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("rename", &self.rename)
            .field("shape", &format_args!("{}", self.shape()))
            .field("flags", &self.flags)
            .finish()
    }
}

/// Definition for structs with named fields.
#[derive(Clone, Copy, Debug)]
pub struct StructType {
    /// all fields, in declaration order
    pub fields: &'static [Field],
}

impl StructType {
    /// Finds a directly declared, bindable field by its external key.
    ///
    /// Fields promoted from flattened structs are not considered.
    pub fn field_by_key(&self, key: &str) -> Option<(usize, &'static Field)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, field)| {
                field.is_bindable() && !field.is_flattened() && field.effective_name() == key
            })
    }

    /// Iterates over flattened fields along with their position.
    pub fn flattened(&self) -> impl Iterator<Item = (usize, &'static Field)> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, field)| field.is_flattened() && !field.is_skipped())
    }
}
