//! PID control law over typed quantities.
//!
//! Gains are expressed as "fraction of full output per unit of the term",
//! so a proportional gain of 100% per 10 m yields 50% output at 5 m error.
//! The law itself performs no clamping and no anti-windup; callers clamp.

use std::fmt;
use std::marker::PhantomData;

use td_core::{Ratio, Real, Scalar, TimeCalculus, ensure_finite, unitless};
use td_signal::{PeriodicSignal, Signal};

use crate::error::ControlResult;

/// Output ratio per unit of `U`.
pub struct Gain<U> {
    per_base_unit: Real,
    unit: PhantomData<fn() -> U>,
}

impl<U> Clone for Gain<U> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<U> Copy for Gain<U> {}

impl<U> PartialEq for Gain<U> {
    fn eq(&self, other: &Self) -> bool {
        self.per_base_unit == other.per_base_unit
    }
}

impl<U> fmt::Debug for Gain<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gain({} per base unit)", self.per_base_unit)
    }
}

impl<U: Scalar> Gain<U> {
    /// `output` of full scale for every `per` of the term.
    ///
    /// A zero `per` produces a non-finite gain, rejected by
    /// [`PidConfig::validate`].
    pub fn new(output: Ratio, per: U) -> Self {
        Self::from_base(output.value / per.base_value())
    }

    /// Gain from a raw output-per-SI-base-unit value.
    pub fn from_base(per_base_unit: Real) -> Self {
        Self {
            per_base_unit,
            unit: PhantomData,
        }
    }

    pub fn zero() -> Self {
        Self::from_base(0.0)
    }

    pub fn per_base_unit(&self) -> Real {
        self.per_base_unit
    }

    pub fn apply(&self, term: U) -> Ratio {
        unitless(self.per_base_unit * term.base_value())
    }
}

/// Gain set for one PID loop over quantity `T`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PidConfig<T: TimeCalculus> {
    pub kp: Gain<T>,
    pub ki: Gain<T::Integral>,
    pub kd: Gain<T::Rate>,
    /// Applied to the target, not the error.
    pub kf: Option<Gain<T>>,
}

impl<T: TimeCalculus> PidConfig<T> {
    pub fn proportional(kp: Gain<T>) -> Self {
        Self {
            kp,
            ki: Gain::zero(),
            kd: Gain::zero(),
            kf: None,
        }
    }

    /// All gains zero.
    pub fn zero() -> Self {
        Self::proportional(Gain::zero())
    }

    pub fn with_integral(mut self, ki: Gain<T::Integral>) -> Self {
        self.ki = ki;
        self
    }

    pub fn with_derivative(mut self, kd: Gain<T::Rate>) -> Self {
        self.kd = kd;
        self
    }

    pub fn with_feedforward(mut self, kf: Gain<T>) -> Self {
        self.kf = Some(kf);
        self
    }

    /// Combine the four terms into one output.
    pub fn output(&self, error: T, integral: T::Integral, derivative: T::Rate, target: T) -> Ratio {
        let feedback = self.kp.apply(error) + self.ki.apply(integral) + self.kd.apply(derivative);
        match self.kf {
            Some(kf) => feedback + kf.apply(target),
            None => feedback,
        }
    }

    pub fn validate(&self) -> ControlResult<()> {
        ensure_finite(self.kp.per_base_unit(), "kp")?;
        ensure_finite(self.ki.per_base_unit(), "ki")?;
        ensure_finite(self.kd.per_base_unit(), "kd")?;
        if let Some(kf) = self.kf {
            ensure_finite(kf.per_base_unit(), "kf")?;
        }
        Ok(())
    }
}

/// PID controller node driving `measurement` towards `target`.
///
/// The error node feeds the proportional, integral and derivative branches
/// and is evaluated once per tick. Gains are read from `config` on every
/// tick, so a variable config signal hot-reloads them; a constant one keeps
/// them fixed for the lifetime of the controller.
pub fn pid<T: TimeCalculus>(
    measurement: &PeriodicSignal<T>,
    target: &PeriodicSignal<T>,
    config: &Signal<PidConfig<T>>,
) -> PeriodicSignal<Ratio> {
    let error = target.zip(measurement).map(|(target, measured)| target - measured);
    let config = config.clone();
    error
        .zip(&error.integral())
        .zip(&error.derivative())
        .zip(target)
        .map(move |(((e, i), d), t)| config.get().output(e, i, d, t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use td_core::{Length, m, percent, s};
    use td_signal::{TickToken, Var};

    #[test]
    fn gain_maps_term_to_ratio() {
        let kp: Gain<Length> = Gain::new(percent(100.0), m(10.0));
        assert!((kp.apply(m(5.0)).value - 0.5).abs() < 1e-12);
        assert_eq!(Gain::<Length>::zero().apply(m(5.0)).value, 0.0);
    }

    #[test]
    fn zero_per_is_rejected_by_validate() {
        let config = PidConfig::proportional(Gain::new(percent(100.0), m(0.0)));
        assert!(config.validate().is_err());
    }

    #[test]
    fn proportional_only() {
        let position = Var::new(m(0.0));
        let config = PidConfig::proportional(Gain::new(percent(100.0), m(10.0)));
        let out = pid(
            &position.signal().to_periodic(),
            &PeriodicSignal::constant(m(5.0)),
            &Signal::constant(config),
        );

        assert!((out.current_value(s(0.02), TickToken::mint()).value - 0.5).abs() < 1e-12);
        position.set(m(2.5));
        assert!((out.current_value(s(0.02), TickToken::mint()).value - 0.25).abs() < 1e-12);
        position.set(m(5.0));
        assert!(out.current_value(s(0.02), TickToken::mint()).value.abs() < 1e-12);
    }

    #[test]
    fn integral_term_accumulates() {
        let config = PidConfig::<f64>::zero().with_integral(Gain::from_base(1.0));
        let out = pid(
            &PeriodicSignal::constant(0.0),
            &PeriodicSignal::constant(2.0),
            &Signal::constant(config),
        );
        let first = out.current_value(s(0.5), TickToken::mint()).value;
        let second = out.current_value(s(0.5), TickToken::mint()).value;
        assert!((first - 1.0).abs() < 1e-12);
        assert!((second - 2.0).abs() < 1e-12);
    }

    #[test]
    fn derivative_term_sees_error_rate() {
        let measured = Var::new(0.0);
        let config = PidConfig::<f64>::zero().with_derivative(Gain::from_base(1.0));
        let out = pid(
            &measured.signal().to_periodic(),
            &PeriodicSignal::constant(0.0),
            &Signal::constant(config),
        );
        assert_eq!(out.current_value(s(0.1), TickToken::mint()).value, 0.0);
        measured.set(1.0);
        // error went from 0 to -1 over 0.1 s
        assert!((out.current_value(s(0.1), TickToken::mint()).value + 10.0).abs() < 1e-9);
    }

    #[test]
    fn gains_reload_between_ticks() {
        let gains = Var::new(PidConfig::proportional(Gain::<f64>::from_base(1.0)));
        let out = pid(
            &PeriodicSignal::constant(0.0),
            &PeriodicSignal::constant(1.0),
            &gains.signal(),
        );
        assert_eq!(out.current_value(s(0.01), TickToken::mint()).value, 1.0);
        gains.set(PidConfig::proportional(Gain::from_base(0.5)));
        assert_eq!(out.current_value(s(0.01), TickToken::mint()).value, 0.5);
    }
}
