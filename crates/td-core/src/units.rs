// td-core/src/units.rs

use core::fmt;
use core::marker::PhantomData;
use core::ops::{Add, Neg, Sub};

use uom::si::f64::{
    Acceleration as UomAcceleration, Angle as UomAngle,
    AngularAcceleration as UomAngularAcceleration, AngularVelocity as UomAngularVelocity,
    Frequency as UomFrequency, Length as UomLength, Ratio as UomRatio, Time as UomTime,
    Velocity as UomVelocity,
};

use crate::numeric::Real;

// Public canonical unit types (SI, f64)
pub type Accel = UomAcceleration;
pub type Angle = UomAngle;
pub type AngularAccel = UomAngularAcceleration;
pub type AngularVelocity = UomAngularVelocity;
pub type Frequency = UomFrequency;
pub type Length = UomLength;
pub type Ratio = UomRatio;
pub type Time = UomTime;
pub type Velocity = UomVelocity;

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

#[inline]
pub fn ms(v: f64) -> Time {
    use uom::si::time::millisecond;
    Time::new::<millisecond>(v)
}

#[inline]
pub fn mps(v: f64) -> Velocity {
    use uom::si::velocity::meter_per_second;
    Velocity::new::<meter_per_second>(v)
}

#[inline]
pub fn mps2(v: f64) -> Accel {
    use uom::si::acceleration::meter_per_second_squared;
    Accel::new::<meter_per_second_squared>(v)
}

#[inline]
pub fn rad(v: f64) -> Angle {
    use uom::si::angle::radian;
    Angle::new::<radian>(v)
}

#[inline]
pub fn deg(v: f64) -> Angle {
    use uom::si::angle::degree;
    Angle::new::<degree>(v)
}

#[inline]
pub fn radps(v: f64) -> AngularVelocity {
    use uom::si::angular_velocity::radian_per_second;
    AngularVelocity::new::<radian_per_second>(v)
}

#[inline]
pub fn dps(v: f64) -> AngularVelocity {
    use uom::si::angular_velocity::degree_per_second;
    AngularVelocity::new::<degree_per_second>(v)
}

#[inline]
pub fn hz(v: f64) -> Frequency {
    use uom::si::frequency::hertz;
    Frequency::new::<hertz>(v)
}

#[inline]
pub fn unitless(v: f64) -> Ratio {
    use uom::si::ratio::ratio;
    Ratio::new::<ratio>(v)
}

#[inline]
pub fn percent(v: f64) -> Ratio {
    use uom::si::ratio::percent;
    Ratio::new::<percent>(v)
}

/// Typed scalar with standard arithmetic and access to its SI base value.
///
/// Signal graphs are generic over this trait; anything that is not plain
/// same-unit addition goes through `base_value`/`from_base`.
pub trait Scalar:
    Copy
    + fmt::Debug
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Neg<Output = Self>
    + 'static
{
    /// Value expressed in the SI base unit.
    fn base_value(self) -> Real;

    /// Build from a value in the SI base unit.
    fn from_base(value: Real) -> Self;

    fn zero() -> Self {
        Self::from_base(0.0)
    }

    fn magnitude(self) -> Self {
        Self::from_base(self.base_value().abs())
    }

    fn scale(self, k: Real) -> Self {
        Self::from_base(self.base_value() * k)
    }

    /// -1, 0 or 1.
    fn sign(self) -> Real {
        let v = self.base_value();
        if v > 0.0 {
            1.0
        } else if v < 0.0 {
            -1.0
        } else {
            0.0
        }
    }
}

impl Scalar for f64 {
    fn base_value(self) -> Real {
        self
    }

    fn from_base(value: Real) -> Self {
        value
    }
}

macro_rules! impl_scalar {
    ($($ty:ty => $unit:path;)*) => {
        $(
            impl Scalar for $ty {
                #[inline]
                fn base_value(self) -> Real {
                    self.value
                }

                #[inline]
                fn from_base(value: Real) -> Self {
                    <$ty>::new::<$unit>(value)
                }
            }
        )*
    };
}

impl_scalar! {
    Accel => uom::si::acceleration::meter_per_second_squared;
    Angle => uom::si::angle::radian;
    AngularAccel => uom::si::angular_acceleration::radian_per_second_squared;
    AngularVelocity => uom::si::angular_velocity::radian_per_second;
    Frequency => uom::si::frequency::hertz;
    Length => uom::si::length::meter;
    Ratio => uom::si::ratio::ratio;
    Time => uom::si::time::second;
    Velocity => uom::si::velocity::meter_per_second;
}

/// `T`·s for base quantities without a named uom quantity (length·time,
/// angle·time). Only ever produced by integrating a `T` over time.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct TimeIntegral<T> {
    value: Real,
    unit: PhantomData<fn() -> T>,
}

impl<T> TimeIntegral<T> {
    pub fn value(&self) -> Real {
        self.value
    }
}

impl<T> Add for TimeIntegral<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            value: self.value + rhs.value,
            unit: PhantomData,
        }
    }
}

impl<T> Sub for TimeIntegral<T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            value: self.value - rhs.value,
            unit: PhantomData,
        }
    }
}

impl<T> Neg for TimeIntegral<T> {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            value: -self.value,
            unit: PhantomData,
        }
    }
}

impl<T: Scalar> Scalar for TimeIntegral<T> {
    fn base_value(self) -> Real {
        self.value
    }

    fn from_base(value: Real) -> Self {
        Self {
            value,
            unit: PhantomData,
        }
    }
}

/// Differentiation and integration over a time step.
pub trait TimeCalculus: Scalar {
    /// `Self` per second.
    type Rate: Scalar;
    /// `Self` times seconds.
    type Integral: Scalar;

    fn per(self, dt: Time) -> Self::Rate {
        Self::Rate::from_base(self.base_value() / dt.base_value())
    }

    fn times(self, dt: Time) -> Self::Integral {
        Self::Integral::from_base(self.base_value() * dt.base_value())
    }
}

macro_rules! time_calculus {
    ($($ty:ty => rate: $rate:ty, integral: $integral:ty;)*) => {
        $(
            impl TimeCalculus for $ty {
                type Rate = $rate;
                type Integral = $integral;
            }
        )*
    };
}

time_calculus! {
    f64 => rate: f64, integral: f64;
    Ratio => rate: Frequency, integral: Time;
    Length => rate: Velocity, integral: TimeIntegral<Length>;
    Velocity => rate: Accel, integral: Length;
    Angle => rate: AngularVelocity, integral: TimeIntegral<Angle>;
    AngularVelocity => rate: AngularAccel, integral: Angle;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_smoke() {
        let _l = m(2.0);
        let _dt = s(0.1);
        let _v = mps(1.5);
        let _a = mps2(0.5);
        let _w = dps(90.0);
        let _r = percent(50.0);
        let _f = hz(50.0);
    }

    #[test]
    fn base_values_are_si() {
        assert!((ms(20.0).base_value() - 0.02).abs() < 1e-12);
        assert!((percent(50.0).base_value() - 0.5).abs() < 1e-12);
        assert!((deg(180.0).base_value() - core::f64::consts::PI).abs() < 1e-12);
        assert!((dps(180.0).base_value() - core::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn calculus_maps_to_named_quantities() {
        let v: Velocity = m(5.0).per(s(2.0));
        assert!((v.base_value() - 2.5).abs() < 1e-12);

        let d: Length = mps(2.0).times(s(3.0));
        assert!((d.base_value() - 6.0).abs() < 1e-12);

        let th: Angle = radps(0.5).times(s(2.0));
        assert!((th.base_value() - 1.0).abs() < 1e-12);

        let absement: TimeIntegral<Length> = m(2.0).times(s(0.5));
        assert!((absement.value() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn scalar_helpers() {
        assert_eq!(m(-3.0).magnitude().base_value(), 3.0);
        assert_eq!(m(-3.0).sign(), -1.0);
        assert_eq!(Length::zero().sign(), 0.0);
        assert_eq!(m(2.0).scale(0.5).base_value(), 1.0);
    }
}
