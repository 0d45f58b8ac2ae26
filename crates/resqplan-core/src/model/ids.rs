macro_rules! define_id_type {
    ($name:ident) => {
        /// Dense handle assigned in creation order.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            pub fn inner(self) -> u32 {
                self.0
            }

            pub fn new(value: u32) -> Self {
                Self(value)
            }

            pub(crate) fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

define_id_type!(VariableId);
define_id_type!(ConstraintId);
