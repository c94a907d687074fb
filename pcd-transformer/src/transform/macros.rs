macro_rules! preview_of {
    ($xyz:ident) => {
        $crate::transform::Preview::Coordinates($xyz)
    };
    ($xyz:ident, unsupported) => {{
        let _ = $xyz;
        $crate::transform::Preview::Unsupported
    }};
}

/// Declares operations whose body is one statement over the point's fields.
///
/// Every field is read from the command line in declaration order. Passing `unsupported`
/// after the decompression layers marks an operation that writes coordinates from a
/// non-geometric source and therefore cannot take part in offset adjustment.
macro_rules! operations {
    ($(
        $(#[$meta:meta])*
        $ty:ident($flag:literal, $req:expr $(, $preview:ident)?) { $($field:ident: $fty:ty),* $(,)? }
        |$op:ident, $point:ident, $cx:ident| $body:block
    )*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone)]
            pub struct $ty {
                $(pub $field: $fty,)*
            }

            impl $ty {
                pub const FLAG: &'static str = $flag;

                #[allow(unused_variables)]
                pub fn parse(
                    args: &mut $crate::arguments::Arguments<'_>,
                ) -> Result<Self, $crate::error::ParseError> {
                    Ok(Self {
                        $($field: args.value(stringify!($field))?,)*
                    })
                }
            }

            impl $crate::transform::Operation for $ty {
                fn name(&self) -> &'static str {
                    $flag
                }

                fn command_text(&self) -> String {
                    #[allow(unused_mut)]
                    let mut text = format!("-{}", $flag);
                    $(
                        text.push(' ');
                        text.push_str(&self.$field.to_string());
                    )*
                    text
                }

                #[allow(unused_variables)]
                fn apply(
                    &mut self,
                    $point: &mut pcd_core::pointcloud::point::Point,
                    $cx: &mut $crate::transform::OperationContext<'_>,
                ) {
                    let $op = &*self;
                    $body
                }

                fn preview(&self, xyz: [f64; 3]) -> $crate::transform::Preview {
                    preview_of!(xyz $(, $preview)?)
                }

                fn decompression_requirements(&self) -> $crate::decompress::Decompress {
                    $req
                }
            }
        )*

        pub(crate) fn parse_table(
            flag: &str,
            args: &mut $crate::arguments::Arguments<'_>,
        ) -> Option<Result<Box<dyn $crate::transform::Operation>, $crate::error::ParseError>> {
            let operation: Result<Box<dyn $crate::transform::Operation>, _> = match flag {
                $($flag => $ty::parse(args).map(|op| Box::new(op) as _),)*
                _ => return None,
            };
            Some(operation)
        }
    };
}

/// Declares operations that map real coordinates to real coordinates.
///
/// The same formula drives both the per-point update and the bounding box preview.
macro_rules! coordinate_operations {
    ($(
        $(#[$meta:meta])*
        $ty:ident($flag:literal, $req:expr) { $($field:ident: $fty:ty),* $(,)? }
        |$op:ident, [$x:ident, $y:ident, $z:ident]| $body:expr;
    )*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone)]
            pub struct $ty {
                $(pub $field: $fty,)*
            }

            impl $ty {
                pub const FLAG: &'static str = $flag;

                #[allow(unused_variables)]
                pub fn parse(
                    args: &mut $crate::arguments::Arguments<'_>,
                ) -> Result<Self, $crate::error::ParseError> {
                    Ok(Self {
                        $($field: args.value(stringify!($field))?,)*
                    })
                }

                #[allow(unused_variables)]
                pub fn transform(&self, [$x, $y, $z]: [f64; 3]) -> [f64; 3] {
                    let $op = self;
                    $body
                }
            }

            impl $crate::transform::Operation for $ty {
                fn name(&self) -> &'static str {
                    $flag
                }

                fn command_text(&self) -> String {
                    #[allow(unused_mut)]
                    let mut text = format!("-{}", $flag);
                    $(
                        text.push(' ');
                        text.push_str(&self.$field.to_string());
                    )*
                    text
                }

                fn apply(
                    &mut self,
                    point: &mut pcd_core::pointcloud::point::Point,
                    cx: &mut $crate::transform::OperationContext<'_>,
                ) {
                    cx.map_coordinates(point, |xyz| self.transform(xyz));
                }

                fn preview(&self, xyz: [f64; 3]) -> $crate::transform::Preview {
                    $crate::transform::Preview::Coordinates(self.transform(xyz))
                }

                fn moves_coordinates(&self) -> bool {
                    true
                }

                fn decompression_requirements(&self) -> $crate::decompress::Decompress {
                    $req
                }
            }
        )*

        pub(crate) fn parse_table(
            flag: &str,
            args: &mut $crate::arguments::Arguments<'_>,
        ) -> Option<Result<Box<dyn $crate::transform::Operation>, $crate::error::ParseError>> {
            let operation: Result<Box<dyn $crate::transform::Operation>, _> = match flag {
                $($flag => $ty::parse(args).map(|op| Box::new(op) as _),)*
                _ => return None,
            };
            Some(operation)
        }
    };
}
