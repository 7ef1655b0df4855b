//! Newtype IDs for type-safe entity references.
//!
//! Every identifier in this system is assigned by an external collaborator
//! (the catalog, the Order Store, the payment gateway) and is opaque to us,
//! so the wrappers hold strings. Use the `define_id!` macro to create
//! wrappers that prevent accidentally mixing IDs from different entity types.

/// Errors that can occur when constructing an ID.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The input string is empty or only whitespace.
    #[error("identifier cannot be empty")]
    Empty,
}

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - A validating `parse()` that rejects blank input, and `as_str()`
/// - `Display`, `FromStr` and `AsRef<str>` implementations
///
/// # Example
///
/// ```rust
/// # use counsel_core::define_id;
/// define_id!(TemplateId);
/// define_id!(InvoiceId);
///
/// let template_id = TemplateId::parse("t1").unwrap();
/// assert_eq!(template_id.as_str(), "t1");
///
/// // These are different types, so this won't compile:
/// // let _: InvoiceId = template_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Parse an ID, trimming surrounding whitespace.
            ///
            /// # Errors
            ///
            /// Returns [`IdError::Empty`]($crate::IdError::Empty) if the
            /// trimmed input is empty.
            pub fn parse(id: &str) -> ::core::result::Result<Self, $crate::IdError> {
                let trimmed = id.trim();
                if trimmed.is_empty() {
                    return Err($crate::IdError::Empty);
                }
                Ok(Self(trimmed.to_owned()))
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::IdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Catalog item (template or bespoke service option)
define_id!(ItemId);
// Order Store record
define_id!(OrderId);
// Gateway-issued order token scoping one payment attempt
define_id!(GatewayOrderId);
// Gateway-issued payment identifier
define_id!(PaymentId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims() {
        let id = ItemId::parse("  t1 ").unwrap();
        assert_eq!(id.as_str(), "t1");
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert_eq!(OrderId::parse("   "), Err(IdError::Empty));
        assert_eq!(OrderId::parse(""), Err(IdError::Empty));
    }

    #[test]
    fn test_serde_transparent() {
        let id = GatewayOrderId::parse("order_Nx12").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"order_Nx12\"");
        let back: GatewayOrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
