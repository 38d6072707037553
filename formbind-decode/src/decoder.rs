use alloc::string::{String, ToString};
use core::any::Any;
use core::fmt;

use formbind_core::{Bind, Shape};
use formbind_path::PathCache;
use tracing::{debug, trace};

use crate::required::required_keys;
use crate::{
    Assign, ConversionError, Converters, DEFAULT_MAX_LEN, DecodeError, FieldError, LeafContext,
    MultiError, Values, Walker,
};

/// Fills structs from [`Values`].
///
/// A decoder holds no per-call state: configure it once and share it.
///
/// ```
/// use formbind::Bind;
/// use formbind_decode::{Decoder, Values};
///
/// #[derive(Debug, Default, Bind)]
/// pub struct Login {
///     #[form(required)]
///     pub user: String,
///     pub remember: bool,
/// }
///
/// let mut decoder = Decoder::new();
/// decoder.ignore_unknown_keys(true);
///
/// let mut login = Login::default();
/// let values = Values::from_urlencoded("user=ann&remember=on&csrf=abc");
/// decoder.decode(&mut login, &values).unwrap();
/// assert_eq!(login.user, "ann");
/// assert!(login.remember);
///
/// let err = decoder.decode(&mut Login::default(), &Values::new()).unwrap_err();
/// assert_eq!(err.to_string(), r#"required field "user" is missing"#);
/// ```
#[derive(Clone)]
pub struct Decoder {
    converters: Converters,
    cache: &'static PathCache,
    ignore_unknown_keys: bool,
    zero_empty: bool,
    max_len: usize,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    /// A decoder with the built-in converters, reporting unknown keys.
    pub fn new() -> Self {
        Self {
            converters: Converters::new(),
            cache: PathCache::global(),
            ignore_unknown_keys: false,
            zero_empty: false,
            max_len: DEFAULT_MAX_LEN,
        }
    }

    /// When set, keys that match no field are skipped instead of reported.
    pub fn ignore_unknown_keys(&mut self, ignore: bool) -> &mut Self {
        self.ignore_unknown_keys = ignore;
        self
    }

    /// When set, an empty value resets its field to the default instead of
    /// leaving it untouched.
    pub fn zero_empty(&mut self, zero: bool) -> &mut Self {
        self.zero_empty = zero;
        self
    }

    /// Rejects list indices at or above `max_len`, so input cannot make a
    /// list grow without bound. Defaults to [`DEFAULT_MAX_LEN`].
    pub fn max_len(&mut self, max_len: usize) -> &mut Self {
        self.max_len = max_len;
        self
    }

    /// Registers a converter for fields of type `T`.
    pub fn register_converter<T, E, F>(&mut self, convert: F) -> &mut Self
    where
        T: 'static,
        E: fmt::Display,
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
    {
        self.converters.register(convert);
        self
    }

    /// Uses `cache` instead of [`PathCache::global`].
    pub fn with_path_cache(&mut self, cache: &'static PathCache) -> &mut Self {
        self.cache = cache;
        self
    }

    /// The registered converters.
    pub fn converters(&self) -> &Converters {
        &self.converters
    }

    /// The cache keys are resolved through.
    pub fn path_cache(&self) -> &'static PathCache {
        self.cache
    }

    /// Decodes `values` into `target`.
    ///
    /// Every key is attempted. A key that fails does not store its value
    /// and is reported in [`DecodeError::Fields`]; all other keys are
    /// applied regardless. Options allocated and list slots grown on the way
    /// to a failed nested key may remain, so `rows.3.n=x` can still
    /// leave `rows` with four elements. If `T` is not a struct, nothing
    /// is touched.
    pub fn decode<T: Bind>(&self, target: &mut T, values: &Values) -> Result<(), DecodeError> {
        let shape = T::SHAPE;
        if !shape.is_struct() {
            return Err(DecodeError::NotAStruct { shape });
        }
        debug!(%shape, keys = values.len(), "decoding");

        let mut errors = MultiError::new();
        let leaf = TextLeaf::new(&self.converters);
        self.decode_entries(target, shape, values, &leaf, &mut errors);
        self.check_required(shape, |key| values.has_value_under(key), &mut errors);
        errors.into_result()
    }

    /// Resolves and applies each `(key, values)` entry through `leaf`,
    /// recording failures in `errors`.
    ///
    /// This is the building block for inputs other than text, such as
    /// uploaded files.
    pub fn decode_entries<'v, A, I>(
        &self,
        target: &mut dyn Any,
        shape: &'static Shape,
        entries: I,
        leaf: &A,
        errors: &mut MultiError,
    ) where
        A: Assign + ?Sized,
        A::Value: 'v,
        I: IntoIterator<Item = (&'v str, &'v [A::Value])>,
    {
        let walker = Walker::new(leaf)
            .zero_empty(self.zero_empty)
            .max_len(self.max_len);

        for (key, values) in entries {
            let path = match self.cache.resolve(key, shape) {
                Ok(path) => path,
                Err(_) if self.ignore_unknown_keys => {
                    trace!(key, "ignoring unknown key");
                    continue;
                }
                Err(err) => {
                    errors.insert(key, FieldError::UnknownField(err));
                    continue;
                }
            };
            trace!(key, %path, "assigning");
            if let Err(err) = walker.assign(target, &path, key, values) {
                debug!(key, %err, "field failed");
                errors.insert(key, err);
            }
        }
    }

    /// Reports every required field of `shape` for which `is_present`
    /// returns `false`, unless an error is already recorded for its key.
    pub fn check_required(
        &self,
        shape: &'static Shape,
        is_present: impl Fn(&str) -> bool,
        errors: &mut MultiError,
    ) {
        for key in required_keys(shape) {
            if is_present(key.as_str()) || errors.contains_key(&key) {
                continue;
            }
            errors.insert(key.clone(), FieldError::MissingRequired { key });
        }
    }
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("converters", &self.converters)
            .field("ignore_unknown_keys", &self.ignore_unknown_keys)
            .field("zero_empty", &self.zero_empty)
            .field("max_len", &self.max_len)
            .finish_non_exhaustive()
    }
}

/// Stores raw strings through [`Converters`].
///
/// Single-valued fields take the first value. Empty strings are blank.
#[derive(Debug, Clone, Copy)]
pub struct TextLeaf<'a> {
    converters: &'a Converters,
}

impl<'a> TextLeaf<'a> {
    /// Converts through `converters`.
    pub fn new(converters: &'a Converters) -> Self {
        Self { converters }
    }
}

impl Assign for TextLeaf<'_> {
    type Value = String;

    fn pick<'v>(&self, values: &'v [String]) -> Option<&'v String> {
        values.first()
    }

    fn is_blank(&self, value: &String) -> bool {
        value.is_empty()
    }

    fn claims(&self, shape: &'static Shape) -> bool {
        self.converters.has_custom(shape)
    }

    fn store(
        &self,
        cx: LeafContext<'_>,
        target: &mut dyn Any,
        shape: &'static Shape,
        value: &String,
    ) -> Result<(), FieldError> {
        match self.converters.convert(shape, value, target) {
            Some(Ok(())) => Ok(()),
            Some(Err(source)) => Err(FieldError::Conversion(ConversionError {
                key: cx.key.to_string(),
                value: value.clone(),
                index: cx.index,
                shape,
                source,
            })),
            None => Err(FieldError::NoConverter {
                key: cx.key.to_string(),
                shape,
            }),
        }
    }
}
