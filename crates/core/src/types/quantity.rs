//! Line item quantity.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// A positive item quantity.
///
/// A cart line never holds zero units: lowering a quantity clamps at one,
/// and deleting a line is a separate, explicit operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// A quantity of one.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Create a quantity, returning `None` for zero.
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        match NonZeroU32::new(value) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// The quantity as a plain integer.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Apply a signed change, clamping the result to `1..=u32::MAX`.
    #[must_use]
    pub fn adjusted(self, delta: i64) -> Self {
        let next = i64::from(self.get()).saturating_add(delta);
        let clamped = next.clamp(1, i64::from(u32::MAX));
        u32::try_from(clamped)
            .ok()
            .and_then(Self::new)
            .unwrap_or(Self::ONE)
    }

    /// Add another quantity, saturating at `u32::MAX`.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.get()))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_not_a_quantity() {
        assert!(Quantity::new(0).is_none());
    }

    #[test]
    fn test_decrement_clamps_at_one() {
        assert_eq!(Quantity::ONE.adjusted(-1), Quantity::ONE);
        assert_eq!(Quantity::new(3).unwrap().adjusted(-10), Quantity::ONE);
    }

    #[test]
    fn test_increment() {
        assert_eq!(Quantity::ONE.adjusted(2).get(), 3);
    }

    #[test]
    fn test_deserialize_rejects_zero() {
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert_eq!(serde_json::from_str::<Quantity>("2").unwrap().get(), 2);
    }
}
