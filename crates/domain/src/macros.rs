//! Macro for implementing Display and FromStr for small tag enums
//!
//! Settings such as the bucket resolution or the engine status are plain tag
//! enums that travel through config files, environment variables and log
//! lines. This macro provides both conversions from a single mapping table,
//! with case-insensitive parsing.
//!
//! # Example
//!
//! ```rust
//! use tally_domain::impl_tag_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Direction {
//!     Up,
//!     Down,
//! }
//!
//! impl_tag_conversions!(Direction {
//!     Up => "up",
//!     Down => "down",
//! });
//!
//! assert_eq!(Direction::Up.to_string(), "up");
//! assert_eq!("DOWN".parse::<Direction>(), Ok(Direction::Down));
//! ```

/// Implements Display and FromStr traits for tag enums
///
/// This macro generates:
/// - Display trait: converts enum variants to their lowercase strings
/// - FromStr trait: parses case-insensitive strings to enum variants
#[macro_export]
macro_rules! impl_tag_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl ::std::str::FromStr for $enum_name {
            type Err = ::std::string::String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => ::std::result::Result::Ok(Self::$variant),)+
                    _ => ::std::result::Result::Err(::std::format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
