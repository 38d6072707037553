use alloc::boxed::Box;
use core::any::Any;

use crate::{Bind, Def, PointerDef, PointerVTable, Shape};

impl<T: Bind> Bind for Box<T> {
    const SHAPE: &'static Shape = &const {
        Shape {
            id: Shape::id_of::<Self>(),
            type_identifier: "Box",
            def: Def::Pointer(PointerDef {
                vtable: PointerVTable {
                    borrow_mut: |pointer| {
                        let boxed = pointer.downcast_mut::<Self>()?;
                        Some(&mut **boxed as &mut dyn Any)
                    },
                },
                pointee: T::SHAPE,
            }),
            doc: &[],
        }
    };
}
