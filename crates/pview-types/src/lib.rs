//! Validated primitives shared by the patient list crates.
//!
//! Page numbers and page lengths are 1-based positive integers everywhere in the list core,
//! and identifiers read from UI events must carry at least one non-whitespace character.
//! These wrappers enforce that once at the boundary so the rest of the code can rely on it.

use std::fmt;
use std::num::NonZeroU32;

/// Errors that can occur when creating validated types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TypesError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// A page number or page length was zero
    #[error("{0} must be a positive integer")]
    NotPositive(&'static str),
    /// A numeric field could not be parsed
    #[error("{field} is not a valid integer: '{input}'")]
    NotANumber { field: &'static str, input: String },
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction. Column ids and
/// person ids taken from UI events use this type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText`, or `Err(TypesError::Empty)` for blank input.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TypesError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypesError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

macro_rules! positive_u32 {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(NonZeroU32);

        impl $name {
            /// The smallest valid value, 1.
            pub const MIN: $name = $name(NonZeroU32::MIN);

            /// Wraps a constant. Zero fails const evaluation, so use this only in `const` items.
            pub const fn from_const(value: u32) -> Self {
                match NonZeroU32::new(value) {
                    Some(value) => $name(value),
                    None => panic!(concat!($label, " constant must be positive")),
                }
            }

            /// Wraps `value`, rejecting zero.
            pub fn new(value: u32) -> Result<Self, TypesError> {
                NonZeroU32::new(value)
                    .map(Self)
                    .ok_or(TypesError::NotPositive($label))
            }

            /// Parses a decimal string as it arrives from a UI event.
            pub fn parse(input: &str) -> Result<Self, TypesError> {
                let trimmed = input.trim();
                let value = trimmed
                    .parse::<u32>()
                    .map_err(|_| TypesError::NotANumber {
                        field: $label,
                        input: trimmed.to_owned(),
                    })?;
                Self::new(value)
            }

            pub const fn get(self) -> u32 {
                self.0.get()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<u32> for $name {
            type Error = TypesError;

            fn try_from(value: u32) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> Self {
                value.get()
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_u32(self.get())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let value = u32::deserialize(deserializer)?;
                $name::new(value).map_err(serde::de::Error::custom)
            }
        }
    };
}

positive_u32!(
    /// A 1-based absolute page index.
    PageNumber,
    "page"
);

positive_u32!(
    /// Number of rows requested per page.
    PageLength,
    "length"
);

impl PageNumber {
    /// The first page.
    pub const FIRST: PageNumber = PageNumber::MIN;
}
