//! Macros for parameter builder helpers

#[macro_export]
macro_rules! params_builder {
    ($name:ident { $($field:ident: $ty:ty),* $(,)? }) => {
        paste::paste! {
            impl $name {
                /// Create parameters with default values
                #[must_use]
                pub fn new() -> Self {
                    Self {
                        $($field: Default::default(),)*
                    }
                }

                $( #[must_use]
                pub fn [<with_ $field>](mut self, value: $ty) -> Self {
                    self.$field = value;
                    self
                } )*
            }

            impl Default for $name {
                fn default() -> Self {
                    Self::new()
                }
            }
        }
    };
}
