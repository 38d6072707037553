use core::any::Any;

use crate::{Bind, Def, OptionDef, OptionVTable, Shape};

impl<T: Bind + Default> Bind for Option<T> {
    const SHAPE: &'static Shape = &const {
        Shape {
            id: Shape::id_of::<Self>(),
            type_identifier: "Option",
            def: Def::Option(OptionDef {
                vtable: OptionVTable {
                    is_some: |option| {
                        option
                            .downcast_ref::<Self>()
                            .is_some_and(|option| option.is_some())
                    },
                    get_or_insert_default: |option| {
                        let option = option.downcast_mut::<Self>()?;
                        Some(option.get_or_insert_with(T::default) as &mut dyn Any)
                    },
                    set_none: |option| {
                        if let Some(option) = option.downcast_mut::<Self>() {
                            *option = None;
                        }
                    },
                },
                t: T::SHAPE,
            }),
            doc: &[],
        }
    };
}
