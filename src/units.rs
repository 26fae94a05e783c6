//! Unit helpers for simulated time.
//!
//! The simulation advances in whole seconds, but lifetimes spanning millions
//! of seconds are easier to read in hours or days. These traits allow any
//! quantity expressed in seconds to be converted to another time unit with
//! the dimension checked at compile time.

use qtty::{Quantity, Second, Unit};

/// A duration in simulated seconds.
pub type Seconds = Quantity<Second>;

/// Marker trait for units that share the same physical dimension.
///
/// This trait is automatically implemented for any pair of units where
/// `From::Dim == To::Dim`, enabling compile-time checked conversions.
///
/// # Example
///
/// ```ignore
/// use qtty::{Second, Hour};
/// use wrsn_qcharge::units::SameDim;
///
/// fn accepts_same_dim<From, To>()
/// where
///     From: SameDim<To>,
/// {}
///
/// accepts_same_dim::<Second, Hour>(); // OK
/// ```
pub trait SameDim<To: Unit>: Unit<Dim = To::Dim> {}

impl<From, To> SameDim<To> for From
where
    From: Unit,
    To: Unit<Dim = From::Dim>,
{
}

/// Converts a quantity from one unit to another unit of the same dimension.
///
/// # Example
///
/// ```ignore
/// use qtty::{Quantity, Second, Day};
/// use wrsn_qcharge::units::convert;
///
/// let lifetime = Quantity::<Second>::new(172800.0);
/// let days: Quantity<Day> = convert(lifetime);
/// assert!((days.value() - 2.0).abs() < 1e-12);
/// ```
#[inline]
pub const fn convert<From, To>(q: Quantity<From>) -> Quantity<To>
where
    From: SameDim<To>,
    To: Unit,
{
    q.to_const::<To>()
}

/// Wraps a raw number of seconds.
#[inline]
pub fn seconds(value: f64) -> Seconds {
    Quantity::new(value)
}
