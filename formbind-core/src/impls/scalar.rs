use alloc::format;
use alloc::string::String;
use core::any::Any;

use crate::{Bind, Def, ParseError, ScalarDef, Shape};

macro_rules! impl_bind_for_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Bind for $ty {
                const SHAPE: &'static Shape = &const { Shape::scalar::<$ty>(stringify!($ty)) };
            }
        )*
    };
}

impl_bind_for_scalar!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, char, String,
);

impl Bind for bool {
    const SHAPE: &'static Shape = &const {
        Shape {
            def: Def::Scalar(ScalarDef {
                parse: parse_bool,
                ..ScalarDef::of::<bool>()
            }),
            ..Shape::scalar::<bool>("bool")
        }
    };
}

/// Accepts the spellings HTML forms and query strings use for booleans,
/// including the `on` a checked checkbox submits.
fn parse_bool(raw: &str, target: &mut dyn Any) -> Result<(), ParseError> {
    let value = match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" | "on" | "ON" | "On" => true,
        "0" | "f" | "F" | "false" | "FALSE" | "False" | "off" | "OFF" | "Off" => false,
        _ => return Err(ParseError::new(format!("invalid boolean {raw:?}"))),
    };
    let slot = target
        .downcast_mut::<bool>()
        .ok_or_else(ParseError::type_mismatch)?;
    *slot = value;
    Ok(())
}

impl Bind for () {
    const SHAPE: &'static Shape = &const { Shape::opaque::<()>("()") };
}

#[cfg(test)]
mod tests {
    use crate::{Bind, Def};

    fn parse<T: Bind + Default>(raw: &str) -> Result<T, String> {
        let Def::Scalar(sd) = T::SHAPE.def else {
            panic!("{} is not a scalar", T::SHAPE);
        };
        let mut value = T::default();
        (sd.parse)(raw, &mut value).map_err(|err| err.to_string())?;
        Ok(value)
    }

    #[test]
    fn integers_and_floats() {
        assert_eq!(parse::<i32>("-42"), Ok(-42));
        assert_eq!(parse::<u8>("255"), Ok(255));
        assert_eq!(parse::<f64>("2.5"), Ok(2.5));
        assert!(parse::<u8>("256").is_err());
        assert!(parse::<i32>("").is_err());
    }

    #[test]
    fn booleans_accept_form_spellings() {
        for raw in ["1", "t", "TRUE", "True", "on"] {
            assert_eq!(parse::<bool>(raw), Ok(true), "{raw}");
        }
        for raw in ["0", "F", "false", "off"] {
            assert_eq!(parse::<bool>(raw), Ok(false), "{raw}");
        }
        insta::assert_snapshot!(parse::<bool>("yes").unwrap_err(), @r#"invalid boolean "yes""#);
    }

    #[test]
    fn strings_and_chars() {
        assert_eq!(parse::<String>("hello"), Ok("hello".to_string()));
        assert_eq!(parse::<char>("x"), Ok('x'));
        assert!(parse::<char>("xy").is_err());
    }

    #[test]
    fn default_in_place_resets() {
        let Def::Scalar(sd) = u32::SHAPE.def else {
            unreachable!()
        };
        let mut value = 7u32;
        (sd.default_in_place)(&mut value);
        assert_eq!(value, 0);
    }

    #[test]
    fn parse_rejects_mismatched_target() {
        let Def::Scalar(sd) = u32::SHAPE.def else {
            unreachable!()
        };
        let mut wrong = String::new();
        assert!((sd.parse)("1", &mut wrong).is_err());
    }
}
