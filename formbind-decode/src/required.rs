use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use formbind_core::Shape;

/// Dotted keys of every required field reachable from `shape`.
///
/// Descends through nested structs, boxes and flattened fields. Fields
/// behind an option or inside a list are only required once present, so
/// they are not listed.
pub(crate) fn required_keys(shape: &'static Shape) -> Vec<String> {
    let mut keys = Vec::new();
    collect(shape, "", &mut keys);
    keys
}

fn collect(shape: &'static Shape, prefix: &str, keys: &mut Vec<String>) {
    let Some(st) = shape.peel_pointers().as_struct() else {
        return;
    };
    for field in st.fields {
        if field.is_skipped() {
            continue;
        }
        if field.is_flattened() {
            collect(field.shape(), prefix, keys);
            continue;
        }
        if field.is_private() {
            continue;
        }

        let key = if prefix.is_empty() {
            field.effective_name().to_string()
        } else {
            format!("{prefix}.{}", field.effective_name())
        };
        collect(field.shape(), &key, keys);
        if field.is_required() {
            keys.push(key);
        }
    }
}
