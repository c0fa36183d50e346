//! Unit types standing for one fixed protocol string.
//!
//! ```
//! use x402_types::lit_str;
//!
//! lit_str!(UptoScheme, "upto");
//!
//! assert!(UptoScheme::matches("upto"));
//! assert!(!UptoScheme::matches("Upto"));
//! assert_eq!(serde_json::to_string(&UptoScheme).unwrap(), "\"upto\"");
//! assert!(serde_json::from_str::<UptoScheme>("\"exact\"").is_err());
//! ```

/// Declares a unit struct that (de)serializes as exactly `$val`.
///
/// Scheme names are declared this way, so a scheme payload can never be
/// tagged with the wrong scheme.
#[macro_export]
macro_rules! lit_str {
    ($struct_name:ident, $val:expr) => {
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct $struct_name;

        impl $struct_name {
            pub const VALUE: &'static str = $val;

            /// Case-sensitive comparison against the literal.
            pub fn matches(s: &str) -> bool {
                s == Self::VALUE
            }
        }

        impl serde::Serialize for $struct_name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(Self::VALUE)
            }
        }

        impl<'de> serde::Deserialize<'de> for $struct_name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = <String as serde::Deserialize>::deserialize(deserializer)?;
                if Self::matches(&s) {
                    Ok($struct_name)
                } else {
                    Err(<D::Error as serde::de::Error>::invalid_value(
                        serde::de::Unexpected::Str(&s),
                        &Self::VALUE,
                    ))
                }
            }
        }

        impl std::fmt::Display for $struct_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(Self::VALUE)
            }
        }
    };
}
