//! Macro for string-backed enums
//!
//! Persisted and wire-level enums (provenance, webhook resource states) are
//! stored as lowercase strings. The macro generates `as_str`, `Display` and a
//! case-insensitive `FromStr` from a single variant table.
//!
//! # Example
//!
//! ```rust
//! use cadence_domain::impl_str_enum;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Color {
//!     Red,
//!     Blue,
//! }
//!
//! impl_str_enum!(Color {
//!     Red => "red",
//!     Blue => "blue",
//! });
//!
//! assert_eq!("RED".parse::<Color>(), Ok(Color::Red));
//! assert_eq!(Color::Blue.as_str(), "blue");
//! ```

/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum.
#[macro_export]
macro_rules! impl_str_enum {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical lowercase representation.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
