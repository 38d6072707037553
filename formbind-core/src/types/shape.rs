use core::any::TypeId;
use core::fmt;
use core::str::FromStr;

use super::{Def, ScalarDef, StructType};

/// Describes a bindable type: its identity, what kind of value it is, and
/// how to reach into a live instance of it.
///
/// Shapes are built in `const` context and live for the whole program, so
/// they can be compared, cached and handed around as `&'static Shape`.
#[derive(Clone, Copy)]
pub struct Shape {
    /// Returns the [`TypeId`] of the described type.
    ///
    /// Stored as a function since `TypeId::of` is not usable as a constant value.
    pub id: fn() -> TypeId,

    /// Name of the type, without generic parameters (`"Vec"`, `"BlogPost"`).
    pub type_identifier: &'static str,

    /// What kind of value this is.
    pub def: Def,

    /// Doc comments
    pub doc: &'static [&'static str],
}

impl Shape {
    /// Returns the function used as [`Shape::id`] for `T`.
    pub const fn id_of<T: 'static>() -> fn() -> TypeId {
        TypeId::of::<T>
    }

    /// Builds the shape of a leaf type parsed with [`FromStr`].
    pub const fn scalar<T>(type_identifier: &'static str) -> Shape
    where
        T: FromStr + Default + 'static,
        T::Err: fmt::Display,
    {
        Shape {
            id: Self::id_of::<T>(),
            type_identifier,
            def: Def::Scalar(ScalarDef::of::<T>()),
            doc: &[],
        }
    }

    /// Builds the shape of an atomic type with no generic string conversion.
    ///
    /// Opaque leaves are only filled by a registered converter or, for file
    /// handles, by the file-aware decoder.
    pub const fn opaque<T: 'static>(type_identifier: &'static str) -> Shape {
        Shape {
            id: Self::id_of::<T>(),
            type_identifier,
            def: Def::Opaque,
            doc: &[],
        }
    }

    /// The [`TypeId`] of the described type.
    #[inline]
    pub fn id(&self) -> TypeId {
        (self.id)()
    }

    /// Returns `true` if this shape describes `T`.
    #[inline]
    pub fn is_type<T: 'static>(&self) -> bool {
        self.id() == TypeId::of::<T>()
    }

    /// Returns the struct definition, if this shape is a struct.
    pub const fn as_struct(&self) -> Option<&StructType> {
        match &self.def {
            Def::Struct(st) => Some(st),
            _ => None,
        }
    }

    /// Returns `true` if this shape is a struct.
    pub const fn is_struct(&self) -> bool {
        matches!(self.def, Def::Struct(_))
    }

    /// Returns `true` if this shape is a list.
    pub const fn is_list(&self) -> bool {
        matches!(self.def, Def::List(_))
    }

    /// Returns `true` if this shape is opaque.
    pub const fn is_opaque(&self) -> bool {
        matches!(self.def, Def::Opaque)
    }

    /// Follows options and boxes down to the shape they wrap.
    ///
    /// `Option<Box<Person>>` peels to `Person`; any other shape returns itself.
    pub fn peel(&'static self) -> &'static Shape {
        let mut shape = self;
        loop {
            match shape.def {
                Def::Option(od) => shape = od.t(),
                Def::Pointer(pd) => shape = pd.pointee(),
                _ => return shape,
            }
        }
    }

    /// Like [`Shape::peel`], but stops at options.
    pub fn peel_pointers(&'static self) -> &'static Shape {
        let mut shape = self;
        while let Def::Pointer(pd) = shape.def {
            shape = pd.pointee();
        }
        shape
    }
}

impl PartialEq for Shape {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Shape {}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.def {
            Def::Option(od) => write!(f, "{}<{}>", self.type_identifier, od.t()),
            Def::Pointer(pd) => write!(f, "{}<{}>", self.type_identifier, pd.pointee()),
            Def::List(ld) => write!(f, "{}<{}>", self.type_identifier, ld.t()),
            _ => f.write_str(self.type_identifier),
        }
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("type", &format_args!("{self}"))
            .field("def", &self.def)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::Bind;

    #[test]
    fn display_nests_generic_parameters() {
        assert_eq!(<Vec<Option<i32>>>::SHAPE.to_string(), "Vec<Option<i32>>");
        assert_eq!(<Option<Box<String>>>::SHAPE.to_string(), "Option<Box<String>>");
        assert_eq!(u8::SHAPE.to_string(), "u8");
    }

    #[test]
    fn peel_goes_through_options_and_boxes() {
        let shape = <Option<Box<Option<u16>>>>::SHAPE;
        assert!(shape.peel().is_type::<u16>());
        assert!(<Box<Option<u16>>>::SHAPE.peel_pointers().is_type::<Option<u16>>());
        assert!(<Vec<u16>>::SHAPE.peel().is_list());
    }

    #[test]
    fn shapes_compare_by_type() {
        assert_eq!(i32::SHAPE, i32::SHAPE);
        assert_ne!(i32::SHAPE, i64::SHAPE);
        assert!(String::SHAPE.is_type::<String>());
    }
}
