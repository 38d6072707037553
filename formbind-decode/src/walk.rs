use alloc::string::ToString;
use core::any::Any;

use formbind_core::{Def, ListDef, Shape};
use formbind_path::{Path, PathStep};
use tracing::trace;

use crate::FieldError;

/// Default upper bound on list indices accepted from input.
pub const DEFAULT_MAX_LEN: usize = 10_000;

/// Where a value is being stored, for error reporting.
#[derive(Debug, Clone, Copy)]
pub struct LeafContext<'a> {
    /// The input key.
    pub key: &'a str,
    /// Position of the value among the key's values, for list fields.
    pub index: Option<usize>,
}

/// Stores input values of one kind (text, uploaded files, …) into leaves.
///
/// The [`Walker`] does the navigation; an `Assign` only decides which value
/// a single-valued field gets and how it lands in the target.
pub trait Assign {
    /// One input value.
    type Value;

    /// Picks the value for a field that holds a single value.
    fn pick<'v>(&self, values: &'v [Self::Value]) -> Option<&'v Self::Value>;

    /// Returns `true` if `value` counts as "no value".
    fn is_blank(&self, _value: &Self::Value) -> bool {
        false
    }

    /// Returns `true` if this strategy builds `shape` as a whole, even if it
    /// is a list or an option.
    fn claims(&self, _shape: &'static Shape) -> bool {
        false
    }

    /// Stores `value` into `target`, whose type is described by `shape`.
    fn store(
        &self,
        cx: LeafContext<'_>,
        target: &mut dyn Any,
        shape: &'static Shape,
        value: &Self::Value,
    ) -> Result<(), FieldError>;
}

/// Applies values to a live value along a resolved [`Path`].
///
/// Missing options and boxes on the way are allocated, lists grow to reach
/// the requested index, and existing elements keep their contents.
pub struct Walker<'a, A: ?Sized> {
    leaf: &'a A,
    zero_empty: bool,
    max_len: usize,
}

impl<'a, A: Assign + ?Sized> Walker<'a, A> {
    /// Creates a walker storing leaves through `leaf`.
    pub fn new(leaf: &'a A) -> Self {
        Self {
            leaf,
            zero_empty: false,
            max_len: DEFAULT_MAX_LEN,
        }
    }

    /// When set, blank values reset their field instead of being skipped.
    pub fn zero_empty(mut self, zero_empty: bool) -> Self {
        self.zero_empty = zero_empty;
        self
    }

    /// Rejects list indices at or above `max_len`.
    pub fn max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Applies `values` for `key` to `root` along `path`.
    ///
    /// Does nothing if `root` is not of the type `path` was resolved against,
    /// if a step cannot be taken, or if the values would leave the leaf
    /// untouched anyway (blank input without `zero_empty`). In that last case
    /// no option is allocated and no list grows.
    pub fn assign(
        &self,
        root: &mut dyn Any,
        path: &Path,
        key: &str,
        values: &[A::Value],
    ) -> Result<(), FieldError> {
        if (*root).type_id() != path.shape.id() {
            trace!(key, shape = %path.shape, "root does not match the path, skipping");
            return Ok(());
        }
        if let Some(leaf_shape) = path.leaf_shape()
            && self.leaves_untouched(leaf_shape, values)
        {
            trace!(key, "blank value, skipping");
            return Ok(());
        }
        self.walk(root, path.shape, &path.steps, key, values)
    }

    /// Returns `true` if assigning `values` to a leaf of `shape` would not
    /// change it.
    fn leaves_untouched(&self, shape: &'static Shape, values: &[A::Value]) -> bool {
        if self.zero_empty || self.is_list_leaf(shape) {
            return false;
        }
        self.leaf
            .pick(values)
            .is_none_or(|value| self.leaf.is_blank(value))
    }

    fn is_list_leaf(&self, shape: &'static Shape) -> bool {
        let inner = shape.peel();
        inner.is_list() && !self.leaf.claims(inner) && !self.leaf.claims(shape)
    }

    fn walk(
        &self,
        target: &mut dyn Any,
        shape: &'static Shape,
        steps: &[PathStep],
        key: &str,
        values: &[A::Value],
    ) -> Result<(), FieldError> {
        let Some((step, rest)) = steps.split_first() else {
            return self.assign_leaf(target, shape, key, values);
        };
        let Some((target, shape)) = deref_alloc(target, shape) else {
            return Ok(());
        };

        match (*step, shape.def) {
            (PathStep::Field(index), Def::Struct(st)) => {
                let Some(field) = st.fields.get(index as usize) else {
                    return Ok(());
                };
                if field.is_skipped() || (field.is_private() && !field.is_flattened()) {
                    trace!(key, field = field.name, "field is not settable");
                    return Ok(());
                }
                let Some(next) = (field.get_mut)(target) else {
                    return Ok(());
                };
                self.walk(next, field.shape(), rest, key, values)
            }
            (PathStep::Index(index), Def::List(ld)) => {
                let index = index as usize;
                if index >= self.max_len {
                    return Err(FieldError::IndexOutOfRange {
                        key: key.to_string(),
                        index,
                        max_len: self.max_len,
                    });
                }
                let Some(element) = grow_to(target, &ld, index) else {
                    return Ok(());
                };
                self.walk(element, ld.t(), rest, key, values)
            }
            _ => Ok(()),
        }
    }

    fn assign_leaf(
        &self,
        target: &mut dyn Any,
        shape: &'static Shape,
        key: &str,
        values: &[A::Value],
    ) -> Result<(), FieldError> {
        if let Def::List(ld) = shape.peel().def
            && self.is_list_leaf(shape)
        {
            return self.assign_list(target, shape, &ld, key, values);
        }

        let Some(value) = self.leaf.pick(values) else {
            return Ok(());
        };
        if self.leaf.is_blank(value) {
            if self.zero_empty {
                trace!(key, "blank value, resetting");
                reset(target, shape);
            }
            return Ok(());
        }
        self.store_value(LeafContext { key, index: None }, target, shape, value)
    }

    /// Reaches the list through options and boxes, then replaces it. An
    /// option that had to be allocated is cleared again if that fails.
    fn assign_list(
        &self,
        target: &mut dyn Any,
        shape: &'static Shape,
        ld: &ListDef,
        key: &str,
        values: &[A::Value],
    ) -> Result<(), FieldError> {
        match shape.def {
            Def::Option(od) => {
                let was_some = (od.vtable.is_some)(target);
                let Some(inner) = (od.vtable.get_or_insert_default)(target) else {
                    return Ok(());
                };
                let replaced = self.assign_list(inner, od.t(), ld, key, values);
                if replaced.is_err() && !was_some {
                    (od.vtable.set_none)(target);
                }
                replaced
            }
            Def::Pointer(pd) => {
                let Some(inner) = (pd.vtable.borrow_mut)(target) else {
                    return Ok(());
                };
                self.assign_list(inner, pd.pointee(), ld, key, values)
            }
            _ => self.replace_list(target, ld, key, values),
        }
    }

    /// Replaces the whole list with one element per value. On failure the
    /// previous contents are put back.
    fn replace_list(
        &self,
        list: &mut dyn Any,
        ld: &ListDef,
        key: &str,
        values: &[A::Value],
    ) -> Result<(), FieldError> {
        let Some(previous) = (ld.vtable.take)(list) else {
            return Ok(());
        };

        let mut len = 0;
        for (index, value) in values.iter().enumerate() {
            let blank = self.leaf.is_blank(value);
            if blank && !self.zero_empty {
                continue;
            }
            (ld.vtable.resize)(list, len + 1);
            if !blank {
                let cx = LeafContext {
                    key,
                    index: Some(index),
                };
                let stored = match (ld.vtable.get_mut)(list, len) {
                    Some(slot) => self.store_value(cx, slot, ld.t(), value),
                    None => Ok(()),
                };
                if let Err(err) = stored {
                    trace!(key, index, "element failed, keeping the previous list");
                    (ld.vtable.restore)(list, previous);
                    return Err(err);
                }
            }
            len += 1;
        }
        Ok(())
    }

    /// Stores one value, looking through options and boxes. An option that
    /// had to be allocated is cleared again if the store fails.
    fn store_value(
        &self,
        cx: LeafContext<'_>,
        target: &mut dyn Any,
        shape: &'static Shape,
        value: &A::Value,
    ) -> Result<(), FieldError> {
        if self.leaf.claims(shape) {
            return self.leaf.store(cx, target, shape, value);
        }
        match shape.def {
            Def::Option(od) => {
                let was_some = (od.vtable.is_some)(target);
                let Some(inner) = (od.vtable.get_or_insert_default)(target) else {
                    return Ok(());
                };
                let stored = self.store_value(cx, inner, od.t(), value);
                if stored.is_err() && !was_some {
                    (od.vtable.set_none)(target);
                }
                stored
            }
            Def::Pointer(pd) => {
                let Some(inner) = (pd.vtable.borrow_mut)(target) else {
                    return Ok(());
                };
                self.store_value(cx, inner, pd.pointee(), value)
            }
            _ => self.leaf.store(cx, target, shape, value),
        }
    }
}

/// Looks through options and boxes, allocating unset options.
fn deref_alloc<'t>(
    mut target: &'t mut dyn Any,
    mut shape: &'static Shape,
) -> Option<(&'t mut dyn Any, &'static Shape)> {
    loop {
        match shape.def {
            Def::Option(od) => {
                target = (od.vtable.get_or_insert_default)(target)?;
                shape = od.t();
            }
            Def::Pointer(pd) => {
                target = (pd.vtable.borrow_mut)(target)?;
                shape = pd.pointee();
            }
            _ => return Some((target, shape)),
        }
    }
}

/// Grows the list to hold `index` and returns that element.
fn grow_to<'t>(list: &'t mut dyn Any, ld: &ListDef, index: usize) -> Option<&'t mut dyn Any> {
    let len = (ld.vtable.len)(list)?;
    if len <= index {
        trace!(from = len, to = index + 1, "growing list");
        (ld.vtable.resize)(list, index + 1);
    }
    (ld.vtable.get_mut)(list, index)
}

/// Puts a field back to its empty state.
fn reset(target: &mut dyn Any, shape: &'static Shape) {
    match shape.def {
        Def::Scalar(sd) => (sd.default_in_place)(target),
        Def::Option(od) => (od.vtable.set_none)(target),
        Def::List(ld) => (ld.vtable.resize)(target, 0),
        Def::Pointer(pd) => {
            if let Some(inner) = (pd.vtable.borrow_mut)(target) {
                reset(inner, pd.pointee());
            }
        }
        Def::Struct(_) | Def::Opaque => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use formbind_core::{Bind, ParseError};
    use formbind_path::parse_path;

    /// Stores the number of characters of the last value.
    struct CharCount;

    impl Assign for CharCount {
        type Value = &'static str;

        fn pick<'v>(&self, values: &'v [&'static str]) -> Option<&'v &'static str> {
            values.last()
        }

        fn is_blank(&self, value: &&'static str) -> bool {
            value.is_empty()
        }

        fn store(
            &self,
            cx: LeafContext<'_>,
            target: &mut dyn Any,
            shape: &'static Shape,
            value: &&'static str,
        ) -> Result<(), FieldError> {
            let Some(slot) = target.downcast_mut::<usize>() else {
                return Err(FieldError::Unsupported {
                    key: cx.key.to_string(),
                    expected: "a count",
                    shape,
                });
            };
            if value.starts_with('!') {
                return Err(FieldError::Conversion(crate::ConversionError {
                    key: cx.key.to_string(),
                    value: value.to_string(),
                    index: cx.index,
                    shape,
                    source: ParseError::new("bang"),
                }));
            }
            *slot = value.chars().count();
            Ok(())
        }
    }

    #[test]
    fn lists_grow_and_options_allocate() {
        let walker = Walker::new(&CharCount);
        let mut root: Vec<Option<Box<usize>>> = vec![Some(Box::new(1))];
        let path = parse_path("2", <Vec<Option<Box<usize>>>>::SHAPE).unwrap();

        walker.assign(&mut root, &path, "2", &["a", "abc"]).unwrap();
        assert_eq!(root, [Some(Box::new(1)), None, Some(Box::new(3))]);
    }

    #[test]
    fn failed_store_clears_fresh_options_only() {
        let walker = Walker::new(&CharCount);
        let path = parse_path("0", <Vec<Option<usize>>>::SHAPE).unwrap();

        let mut root: Vec<Option<usize>> = Vec::new();
        assert!(walker.assign(&mut root, &path, "0", &["!"]).is_err());
        assert_eq!(root, [None]);

        let mut root: Vec<Option<usize>> = vec![Some(5)];
        assert!(walker.assign(&mut root, &path, "0", &["!"]).is_err());
        assert_eq!(root, [Some(5)]);
    }

    #[test]
    fn mismatched_root_is_ignored() {
        let walker = Walker::new(&CharCount);
        let path = parse_path("0", <Vec<usize>>::SHAPE).unwrap();
        let mut other = String::from("untouched");
        walker.assign(&mut other, &path, "0", &["abc"]).unwrap();
        assert_eq!(other, "untouched");
    }

    #[test]
    fn index_limit() {
        let walker = Walker::new(&CharCount).max_len(3);
        let path = parse_path("3", <Vec<usize>>::SHAPE).unwrap();
        let mut root = Vec::<usize>::new();
        let err = walker.assign(&mut root, &path, "3", &["x"]).unwrap_err();
        assert!(matches!(
            err,
            FieldError::IndexOutOfRange {
                index: 3,
                max_len: 3,
                ..
            }
        ));
        assert!(root.is_empty());
    }

    #[test]
    fn nested_lists_replace_inner_list() {
        let walker = Walker::new(&CharCount);
        let path = parse_path("1", <Vec<Vec<usize>>>::SHAPE).unwrap();
        let mut root: Vec<Vec<usize>> = vec![vec![9], vec![9, 9, 9]];
        walker.assign(&mut root, &path, "1", &["ab", "", "c"]).unwrap();
        assert_eq!(root, [vec![9], vec![2, 1]]);

        let walker = walker.zero_empty(true);
        walker.assign(&mut root, &path, "1", &["ab", "", "c"]).unwrap();
        assert_eq!(root, [vec![9], vec![2, 0, 1]]);

        let err = walker.assign(&mut root, &path, "1", &["a", "!"]).unwrap_err();
        assert!(matches!(err, FieldError::Conversion(ref e) if e.index == Some(1)));
        assert_eq!(root, [vec![9], vec![2, 0, 1]]);
    }

    #[test]
    fn blank_values_allocate_nothing() {
        let walker = Walker::new(&CharCount);
        let path = parse_path("4", <Vec<Option<usize>>>::SHAPE).unwrap();
        let mut root: Vec<Option<usize>> = Vec::new();
        walker.assign(&mut root, &path, "4", &[""]).unwrap();
        assert!(root.is_empty());

        let walker = walker.zero_empty(true);
        walker.assign(&mut root, &path, "4", &[""]).unwrap();
        assert_eq!(root, [None, None, None, None, None]);
    }

    #[test]
    fn failed_list_under_option_is_cleared() {
        let walker = Walker::new(&CharCount);
        let path = parse_path("0", <Vec<Option<Vec<usize>>>>::SHAPE).unwrap();

        let mut root: Vec<Option<Vec<usize>>> = vec![None];
        assert!(walker.assign(&mut root, &path, "0", &["a", "!"]).is_err());
        assert_eq!(root, [None]);

        let mut root: Vec<Option<Vec<usize>>> = vec![Some(vec![7])];
        assert!(walker.assign(&mut root, &path, "0", &["a", "!"]).is_err());
        assert_eq!(root, [Some(vec![7])]);
    }
}
