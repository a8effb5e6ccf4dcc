//! Helper for enumerated wizard choices
//!
//! Every selectable field (use type, foundation, occupancy, ...) is a plain
//! enum with a stable snake_case key (used in YAML and `--set key=value`)
//! and a human label (used in prompts and tables). Parsing accepts either.

/// Declare a choice enum with serde keys, labels, `Display` and `FromStr`
#[macro_export]
macro_rules! choice_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident ($what:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => ($key:literal, $label:literal) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        $vis enum $name {
            $( $(#[$vmeta])* #[serde(rename = $key)] $variant ),+
        }

        impl $name {
            /// Every variant in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Stable key used in files and on the command line
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $key),+
                }
            }

            /// Human-readable label
            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = $crate::entities::choice::normalize_key(s);
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| {
                        v.as_str() == wanted
                            || $crate::entities::choice::normalize_key(v.label()) == wanted
                    })
                    .ok_or_else(|| {
                        let keys: Vec<&str> = $name::ALL.iter().map(|v| v.as_str()).collect();
                        format!("unknown {} '{}' (expected one of: {})", $what, s, keys.join(", "))
                    })
            }
        }
    };
}

/// Normalize free text into a choice key (`"Single-Family Home"` → `single_family_home`)
pub fn normalize_key(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .replace('-', "_")
        .replace(' ', "_")
}

#[cfg(test)]
mod tests {
    crate::choice_enum! {
        enum Flavor ("flavor") {
            Plain => ("plain", "Plain"),
            DoubleChoc => ("double_choc", "Double Chocolate"),
        }
    }

    #[test]
    fn test_parse_by_key_or_label() {
        assert_eq!("plain".parse::<Flavor>().unwrap(), Flavor::Plain);
        assert_eq!("double-choc".parse::<Flavor>().unwrap(), Flavor::DoubleChoc);
        assert_eq!("Double Chocolate".parse::<Flavor>().unwrap(), Flavor::DoubleChoc);
    }

    #[test]
    fn test_unknown_lists_keys() {
        let err = "mint".parse::<Flavor>().unwrap_err();
        assert!(err.contains("unknown flavor 'mint'"));
        assert!(err.contains("plain, double_choc"));
    }

    #[test]
    fn test_serde_uses_key() {
        let json = serde_json::to_string(&Flavor::DoubleChoc).unwrap();
        assert_eq!(json, "\"double_choc\"");
    }
}
