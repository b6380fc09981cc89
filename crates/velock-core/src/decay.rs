//! Linear voting-power decay curves.
//!
//! A [`DecayFunction`] represents `power(t) = max(0, bias - slope * t)` with
//! the curve anchored at absolute time zero: `slope = principal / max_lock_duration`
//! and `bias = slope * expiry`. Anchoring at zero instead of at the lock's
//! start keeps curves additive, so an aggregate of many locks is a single
//! `{bias, slope}` pair.
//!
//! All arithmetic is integer-only. Additions saturate and subtractions clamp
//! at zero; ledger-level caps keep real values far from both bounds.

use std::ops::{Add, AddAssign, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::types::{Amount, Timestamp};

/// A linearly decaying voting-power curve.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DecayFunction {
    /// Value of the curve projected back to `t = 0`.
    pub bias: Amount,
    /// Decay per second.
    pub slope: Amount,
}

impl DecayFunction {
    /// The zero curve.
    pub const ZERO: Self = Self { bias: 0, slope: 0 };

    /// Curve for `principal` locked until `expiry`.
    ///
    /// # Examples
    ///
    /// ```
    /// use velock_core::DecayFunction;
    /// let f = DecayFunction::for_lock(1_000_000, 400, 1_000);
    /// assert_eq!(f.slope, 1_000);
    /// assert_eq!(f.bias, 400_000);
    /// assert_eq!(f.evaluate(400), 0);
    /// assert_eq!(f.evaluate(300), 100_000);
    /// ```
    pub fn for_lock(principal: Amount, expiry: Timestamp, max_lock_duration: u64) -> Self {
        let slope = principal / Amount::from(max_lock_duration.max(1));
        Self::expiring(slope, expiry)
    }

    /// Curve with the given `slope` that reaches zero exactly at `at`.
    pub fn expiring(slope: Amount, at: Timestamp) -> Self {
        Self {
            bias: slope.saturating_mul(Amount::from(at)),
            slope,
        }
    }

    /// Voting power at time `t`, clamped at zero.
    pub fn evaluate(&self, t: Timestamp) -> Amount {
        self.bias
            .saturating_sub(self.slope.saturating_mul(Amount::from(t)))
    }

    /// Linear superposition of two curves.
    pub fn combine(self, other: Self) -> Self {
        Self {
            bias: self.bias.saturating_add(other.bias),
            slope: self.slope.saturating_add(other.slope),
        }
    }

    /// Remove `other` from this curve, componentwise, clamped at zero.
    ///
    /// Magnitudes are unsigned, so negation is expressed as subtraction.
    pub fn subtract(self, other: Self) -> Self {
        Self {
            bias: self.bias.saturating_sub(other.bias),
            slope: self.slope.saturating_sub(other.slope),
        }
    }

    /// Whether both components are zero.
    pub fn is_zero(&self) -> bool {
        self.bias == 0 && self.slope == 0
    }
}

impl Add for DecayFunction {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.combine(rhs)
    }
}

impl Sub for DecayFunction {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.subtract(rhs)
    }
}

impl AddAssign for DecayFunction {
    fn add_assign(&mut self, rhs: Self) {
        *self = self.combine(rhs);
    }
}

impl SubAssign for DecayFunction {
    fn sub_assign(&mut self, rhs: Self) {
        *self = self.subtract(rhs);
    }
}
