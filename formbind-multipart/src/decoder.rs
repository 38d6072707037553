use alloc::string::ToString;
use core::any::Any;
use core::ops::{Deref, DerefMut};

use formbind_core::{Bind, Shape};
use formbind_decode::{Assign, DecodeError, Decoder, FieldError, LeafContext, MultiError};
use tracing::debug;

use crate::{FileHeader, MultipartForm};

/// Stores uploads into [`FileHeader`] fields.
///
/// A single field keeps the last upload under its key; a list field keeps
/// all of them in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLeaf;

impl Assign for FileLeaf {
    type Value = FileHeader;

    fn pick<'v>(&self, values: &'v [FileHeader]) -> Option<&'v FileHeader> {
        values.last()
    }

    fn store(
        &self,
        cx: LeafContext<'_>,
        target: &mut dyn Any,
        shape: &'static Shape,
        value: &FileHeader,
    ) -> Result<(), FieldError> {
        let Some(slot) = target.downcast_mut::<FileHeader>() else {
            return Err(FieldError::Unsupported {
                key: cx.key.to_string(),
                expected: "a file",
                shape,
            });
        };
        *slot = value.clone();
        Ok(())
    }
}

/// Decodes a [`MultipartForm`]: text parts like [`Decoder`], then files.
///
/// Derefs to the wrapped [`Decoder`], so both halves share one
/// configuration.
#[derive(Debug, Clone, Default)]
pub struct MultipartDecoder {
    decoder: Decoder,
}

impl MultipartDecoder {
    /// A decoder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes the text and file parts of `form` into `target`.
    ///
    /// Errors from both halves are returned together. If `T` is not a
    /// struct, nothing is touched and the files are not looked at.
    pub fn decode<T: Bind>(&self, target: &mut T, form: &MultipartForm) -> Result<(), DecodeError> {
        let mut errors = match self.decoder.decode(target, &form.value) {
            Ok(()) => MultiError::new(),
            Err(DecodeError::Fields(errors)) => errors,
            Err(fatal) => return Err(fatal),
        };

        // An upload satisfies a required field
        errors.retain(|key, err| {
            !matches!(err, FieldError::MissingRequired { .. }) || !form.has_file_under(key)
        });

        debug!(files = form.file.len(), "decoding uploads");
        let entries = form
            .file
            .iter()
            .map(|(key, files)| (key.as_str(), files.as_slice()));
        self.decoder
            .decode_entries(target, T::SHAPE, entries, &FileLeaf, &mut errors);
        errors.into_result()
    }
}

impl From<Decoder> for MultipartDecoder {
    fn from(decoder: Decoder) -> Self {
        Self { decoder }
    }
}

impl Deref for MultipartDecoder {
    type Target = Decoder;

    fn deref(&self) -> &Decoder {
        &self.decoder
    }
}

impl DerefMut for MultipartDecoder {
    fn deref_mut(&mut self) -> &mut Decoder {
        &mut self.decoder
    }
}
