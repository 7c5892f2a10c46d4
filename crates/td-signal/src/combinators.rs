//! Derived periodic nodes: map, zip, windows, folds and time calculus.

use std::collections::VecDeque;

use td_core::{Scalar, Time, TimeCalculus};

use crate::periodic::PeriodicSignal;

impl<T: Clone + 'static> PeriodicSignal<T> {
    /// Node recomputing `f(value)` every tick.
    pub fn map<U: Clone + 'static>(&self, f: impl Fn(T) -> U + 'static) -> PeriodicSignal<U> {
        let parent = self.clone();
        PeriodicSignal::from_parts(
            vec![self.as_source()],
            Box::new(move |dt, token| f(parent.current_value(dt, token))),
            None,
        )
    }

    /// Node recomputing `f(value, dt)` every tick.
    pub fn map_with_dt<U: Clone + 'static>(
        &self,
        f: impl Fn(T, Time) -> U + 'static,
    ) -> PeriodicSignal<U> {
        let parent = self.clone();
        PeriodicSignal::from_parts(
            vec![self.as_source()],
            Box::new(move |dt, token| f(parent.current_value(dt, token), dt)),
            None,
        )
    }

    /// Tuple node. Both parents are read with the same token, so an ancestor
    /// shared by `self` and `other` is computed once.
    pub fn zip<U: Clone + 'static>(&self, other: &PeriodicSignal<U>) -> PeriodicSignal<(T, U)> {
        let (a, b) = (self.clone(), other.clone());
        PeriodicSignal::from_parts(
            vec![self.as_source(), other.as_source()],
            Box::new(move |dt, token| (a.current_value(dt, token), b.current_value(dt, token))),
            None,
        )
    }

    /// Fixed-length FIFO of the most recent values, oldest first.
    ///
    /// The window starts filled with `filler`; each tick drops the oldest
    /// entry and appends the newest.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    pub fn sliding(&self, size: usize, filler: T) -> PeriodicSignal<VecDeque<T>> {
        assert!(size > 0, "sliding window size must be positive");
        let parent = self.clone();
        let mut window: VecDeque<T> = std::iter::repeat_n(filler, size).collect();
        PeriodicSignal::from_parts(
            vec![self.as_source()],
            Box::new(move |dt, token| {
                let newest = parent.current_value(dt, token);
                window.pop_front();
                window.push_back(newest);
                window.clone()
            }),
            None,
        )
    }

    /// Running left fold. The accumulator lives inside the node.
    pub fn scan_left<U: Clone + 'static>(
        &self,
        initial: U,
        mut f: impl FnMut(U, T, Time) -> U + 'static,
    ) -> PeriodicSignal<U> {
        let parent = self.clone();
        let mut acc = initial;
        PeriodicSignal::from_parts(
            vec![self.as_source()],
            Box::new(move |dt, token| {
                acc = f(acc.clone(), parent.current_value(dt, token), dt);
                acc.clone()
            }),
            None,
        )
    }

    /// Node passing values through and running `check` after every fresh
    /// computation. Memo hits do not re-run the check.
    pub fn with_check(&self, check: impl Fn(&T) + 'static) -> PeriodicSignal<T> {
        let parent = self.clone();
        PeriodicSignal::from_parts(
            vec![self.as_source()],
            Box::new(move |dt, token| parent.current_value(dt, token)),
            Some(Box::new(check)),
        )
    }
}

impl<T: TimeCalculus> PeriodicSignal<T> {
    /// Rate of change between the two most recent samples.
    ///
    /// Zero until two real samples have been seen, and for non-positive `dt`.
    pub fn derivative(&self) -> PeriodicSignal<T::Rate> {
        self.map(Some)
            .sliding(2, None)
            .map_with_dt(|window, dt| match (window.front(), window.back()) {
                (Some(Some(oldest)), Some(Some(newest))) if dt.base_value() > 0.0 => {
                    (*newest - *oldest).per(dt)
                }
                _ => <T::Rate as Scalar>::zero(),
            })
    }

    /// Rectangular integral: the first sample seeds `sample * dt`, later
    /// samples add `sample * dt`.
    pub fn integral(&self) -> PeriodicSignal<T::Integral> {
        self.scan_left(None, |total: Option<T::Integral>, sample: T, dt| {
            let step = sample.times(dt);
            Some(match total {
                Some(total) => total + step,
                None => step,
            })
        })
        .map(|total| total.unwrap_or_else(<T::Integral as Scalar>::zero))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use td_core::{Length, Velocity, m, s};

    use super::PeriodicSignal;
    use crate::signal::{Signal, Var};
    use crate::token::TickToken;

    #[test]
    fn shared_ancestor_computed_once_per_tick() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let ancestor = Signal::variable(move || {
            counter.set(counter.get() + 1);
            2.0
        })
        .to_periodic();

        let left = ancestor.map(|v| v + 1.0);
        let right = ancestor.map(|v| v * 10.0);
        let both = left.zip(&right);

        let token = TickToken::mint();
        assert_eq!(both.current_value(s(0.02), token), (3.0, 20.0));
        assert_eq!(calls.get(), 1);

        both.current_value(s(0.02), TickToken::mint());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn sliding_window_drops_oldest() {
        let input = Var::new(1);
        let window = input.signal().to_periodic().sliding(3, 0);

        assert_eq!(
            window.current_value(s(0.01), TickToken::mint()),
            vec![0, 0, 1]
        );
        input.set(2);
        window.current_value(s(0.01), TickToken::mint());
        input.set(3);
        window.current_value(s(0.01), TickToken::mint());
        input.set(4);
        assert_eq!(
            window.current_value(s(0.01), TickToken::mint()),
            vec![2, 3, 4]
        );
    }

    #[test]
    fn scan_left_keeps_state_in_node() {
        let sum = PeriodicSignal::constant(2).scan_left(10, |acc, v, _| acc + v);
        assert_eq!(sum.current_value(s(0.01), TickToken::mint()), 12);
        assert_eq!(sum.current_value(s(0.01), TickToken::mint()), 14);
    }

    #[test]
    fn derivative_zero_until_two_samples() {
        let position = Var::new(m(0.0));
        let velocity = position.signal().to_periodic().derivative();
        let dt = s(0.5);

        let first: Velocity = velocity.current_value(dt, TickToken::mint());
        assert_eq!(first.value, 0.0);

        position.set(m(1.0));
        let second = velocity.current_value(dt, TickToken::mint());
        assert!((second.value - 2.0).abs() < 1e-12);
    }

    #[test]
    fn derivative_of_constant_is_zero() {
        let d = PeriodicSignal::constant(m(3.0)).derivative();
        for _ in 0..5 {
            assert_eq!(d.current_value(s(0.02), TickToken::mint()).value, 0.0);
        }
    }

    #[test]
    fn integral_first_sample_is_sample_times_dt() {
        let i = PeriodicSignal::constant(4.0_f64).integral();
        assert!((i.current_value(s(0.5), TickToken::mint()) - 2.0).abs() < 1e-12);
        assert!((i.current_value(s(0.5), TickToken::mint()) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn check_runs_on_fresh_values_only() {
        let seen = Rc::new(Cell::new(0));
        let hits = Rc::clone(&seen);
        let checked = PeriodicSignal::constant(m(1.0)).with_check(move |v: &Length| {
            assert_eq!(v.value, 1.0);
            hits.set(hits.get() + 1);
        });

        let token = TickToken::mint();
        checked.current_value(s(0.01), token);
        checked.current_value(s(0.01), token);
        assert_eq!(seen.get(), 1);

        checked.current_value(s(0.01), TickToken::mint());
        assert_eq!(seen.get(), 2);
    }
}
