use alloc::boxed::Box;
use alloc::string::ToString;
use core::any::Any;
use core::fmt;
use core::str::FromStr;

use super::{ParseError, Shape, StructType};

/// What kind of value a [`Shape`] describes.
#[derive(Clone, Copy)]
pub enum Def {
    /// A leaf value parsed from a single string.
    Scalar(ScalarDef),

    /// A struct with named fields.
    Struct(StructType),

    /// An ordered, growable sequence (`Vec<T>`).
    List(ListDef),

    /// A value that may be unset (`Option<T>`).
    Option(OptionDef),

    /// An owning pointer that is always set (`Box<T>`).
    Pointer(PointerDef),

    /// An atomic value with no generic string conversion.
    Opaque,
}

impl Def {
    /// A short, human-readable name for the kind of definition.
    pub const fn kind(&self) -> &'static str {
        match self {
            Def::Scalar(_) => "scalar",
            Def::Struct(_) => "struct",
            Def::List(_) => "list",
            Def::Option(_) => "option",
            Def::Pointer(_) => "pointer",
            Def::Opaque => "opaque",
        }
    }
}

impl fmt::Debug for Def {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Parses a string and stores the result into the value behind `target`.
pub type ParseFn = fn(raw: &str, target: &mut dyn Any) -> Result<(), ParseError>;

/// Resets the value behind `target` to its default.
pub type DefaultInPlaceFn = fn(target: &mut dyn Any);

/// Definition for scalar leaves.
#[derive(Clone, Copy)]
pub struct ScalarDef {
    /// Parses one raw string into the value.
    pub parse: ParseFn,

    /// Resets the value to its default.
    pub default_in_place: DefaultInPlaceFn,
}

impl ScalarDef {
    /// A definition backed by `T`'s [`FromStr`] and [`Default`] impls.
    pub const fn of<T>() -> Self
    where
        T: FromStr + Default + 'static,
        T::Err: fmt::Display,
    {
        Self {
            parse: parse_from_str::<T>,
            default_in_place: default_in_place::<T>,
        }
    }
}

fn parse_from_str<T>(raw: &str, target: &mut dyn Any) -> Result<(), ParseError>
where
    T: FromStr + 'static,
    T::Err: fmt::Display,
{
    let slot = target
        .downcast_mut::<T>()
        .ok_or_else(ParseError::type_mismatch)?;
    *slot = raw
        .parse::<T>()
        .map_err(|err| ParseError::new(err.to_string()))?;
    Ok(())
}

fn default_in_place<T: Default + 'static>(target: &mut dyn Any) {
    if let Some(slot) = target.downcast_mut::<T>() {
        *slot = T::default();
    }
}

/// Virtual table for a list.
///
/// Every function returns `None` (or does nothing) when handed a value of
/// the wrong type.
#[derive(Clone, Copy)]
pub struct ListVTable {
    /// Number of elements.
    pub len: fn(list: &dyn Any) -> Option<usize>,

    /// Grows or shrinks the list to `len`, filling new slots with defaults.
    /// Existing elements below `len` keep their positions.
    pub resize: fn(list: &mut dyn Any, len: usize),

    /// Mutable access to the element at `index`.
    pub get_mut: fn(list: &mut dyn Any, index: usize) -> Option<&mut dyn Any>,

    /// Moves the contents out, leaving an empty list behind.
    pub take: fn(list: &mut dyn Any) -> Option<Box<dyn Any>>,

    /// Puts back contents previously returned by `take`.
    pub restore: fn(list: &mut dyn Any, previous: Box<dyn Any>),
}

/// Definition for lists.
#[derive(Clone, Copy)]
pub struct ListDef {
    /// vtable for interacting with the list
    pub vtable: ListVTable,

    /// shape of the items in the list
    pub t: &'static Shape,
}

impl ListDef {
    /// Returns the shape of the items in the list
    pub const fn t(&self) -> &'static Shape {
        self.t
    }
}

/// Virtual table for an optional value.
#[derive(Clone, Copy)]
pub struct OptionVTable {
    /// Returns `true` if the option holds a value.
    pub is_some: fn(option: &dyn Any) -> bool,

    /// Returns the inner value, inserting a default one first if unset.
    pub get_or_insert_default: fn(option: &mut dyn Any) -> Option<&mut dyn Any>,

    /// Clears the option.
    pub set_none: fn(option: &mut dyn Any),
}

/// Definition for optional values.
#[derive(Clone, Copy)]
pub struct OptionDef {
    /// vtable for interacting with the option
    pub vtable: OptionVTable,

    /// shape of the inner type
    pub t: &'static Shape,
}

impl OptionDef {
    /// Returns the shape of the inner type
    pub const fn t(&self) -> &'static Shape {
        self.t
    }
}

/// Virtual table for an owning pointer.
#[derive(Clone, Copy)]
pub struct PointerVTable {
    /// Mutable access to the pointee.
    pub borrow_mut: fn(pointer: &mut dyn Any) -> Option<&mut dyn Any>,
}

/// Definition for owning pointers.
#[derive(Clone, Copy)]
pub struct PointerDef {
    /// vtable for interacting with the pointer
    pub vtable: PointerVTable,

    /// shape of the pointee
    pub pointee: &'static Shape,
}

impl PointerDef {
    /// Returns the shape of the pointee
    pub const fn pointee(&self) -> &'static Shape {
        self.pointee
    }
}
