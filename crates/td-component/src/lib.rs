//! Periodic components for TickDrive.
//!
//! A [`Component`] owns a clock subscription and exactly one active
//! controller graph. Every tick it evaluates the controller, records the
//! output, and applies it through an [`Actuator`]. Controllers are swapped
//! with [`Component::set_controller`] between ticks.
//!
//! Clocks are external collaborators behind the [`Clock`] trait:
//! [`ManualClock`] for simulation and tests, [`RealTimeClock`] for running
//! against wall time.

pub mod clock;
pub mod component;
pub mod error;
pub mod metrics;
pub mod sampled;

pub use clock::{Clock, ManualClock, RealTimeClock, Subscription, TickCallback};
pub use component::{Actuator, Component};
pub use error::{ComponentError, ComponentResult};
pub use metrics::{TickObserver, TickStats, Timer};
pub use sampled::{SampleClock, SampleConfig};
