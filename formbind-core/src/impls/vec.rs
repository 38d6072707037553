use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::Any;

use crate::{Bind, Def, ListDef, ListVTable, Shape};

impl<T: Bind + Default> Bind for Vec<T> {
    const SHAPE: &'static Shape = &const {
        Shape {
            id: Shape::id_of::<Self>(),
            type_identifier: "Vec",
            def: Def::List(ListDef {
                vtable: ListVTable {
                    len: |list| list.downcast_ref::<Self>().map(Vec::len),
                    resize: |list, len| {
                        if let Some(list) = list.downcast_mut::<Self>() {
                            list.resize_with(len, T::default);
                        }
                    },
                    get_mut: |list, index| {
                        let list = list.downcast_mut::<Self>()?;
                        list.get_mut(index).map(|item| item as &mut dyn Any)
                    },
                    take: |list| {
                        let list = list.downcast_mut::<Self>()?;
                        Some(Box::new(core::mem::take(list)) as Box<dyn Any>)
                    },
                    restore: |list, previous| {
                        if let (Some(list), Ok(previous)) =
                            (list.downcast_mut::<Self>(), previous.downcast::<Self>())
                        {
                            *list = *previous;
                        }
                    },
                },
                t: T::SHAPE,
            }),
            doc: &[],
        }
    };
}
