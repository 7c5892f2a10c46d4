//! Fixed-period components that drive one controller graph at a time.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use td_core::{IdAllocator, OwnerId, Time};
use td_signal::{PeriodicSignal, Signal, TickToken};
use tracing::{debug, error, warn};

use crate::clock::{Clock, Subscription};
use crate::error::ComponentResult;
use crate::metrics::{TickObserver, Timer};
use crate::sampled::SampleConfig;

static OWNERS: IdAllocator = IdAllocator::new();

/// The effectful boundary: apply a computed value to hardware.
pub trait Actuator<T> {
    fn apply(&mut self, value: &T);
}

impl<T, F: FnMut(&T)> Actuator<T> for F {
    fn apply(&mut self, value: &T) {
        self(value)
    }
}

struct ComponentCore<T> {
    name: String,
    owner: OwnerId,
    config: SampleConfig,
    default: PeriodicSignal<T>,
    /// `None` while the default controller is active.
    active: RefCell<Option<PeriodicSignal<T>>>,
    last_output: Rc<RefCell<Option<T>>>,
    actuator: RefCell<Box<dyn Actuator<T>>>,
    observer: RefCell<Option<Rc<dyn TickObserver>>>,
    _subscription: Subscription,
}

/// A periodically ticked holder of one active controller.
///
/// Each tick evaluates the active controller with a fresh [`TickToken`],
/// records the value as the last output, and hands it to the actuator. The
/// component is the tick-source owner of whichever controller is active.
///
/// Cloning yields another handle to the same component. The clock
/// subscription is cancelled once the last handle is dropped.
pub struct Component<T> {
    core: Rc<ComponentCore<T>>,
}

impl<T> Clone for Component<T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T: Clone + 'static> Component<T> {
    /// Create a component ticking every `period` on `clock`.
    ///
    /// The default controller is attached immediately and stays available for
    /// [`reset_to_default`](Self::reset_to_default).
    pub fn new(
        name: impl Into<String>,
        period: Duration,
        default_controller: PeriodicSignal<T>,
        actuator: impl Actuator<T> + 'static,
        clock: &dyn Clock,
    ) -> ComponentResult<Self> {
        let config = SampleConfig::new(period)?;
        let owner = OWNERS.allocate();
        default_controller.attach_tick_source(owner)?;

        let name = name.into();
        debug!(component = %name, %owner, period_ms = period.as_millis() as u64, "component created");

        let core = Rc::new_cyclic(|weak: &Weak<ComponentCore<T>>| {
            let weak = weak.clone();
            let subscription = clock.subscribe(
                config,
                Box::new(move |dt| {
                    if let Some(core) = weak.upgrade() {
                        core.tick(dt);
                    }
                }),
            );
            ComponentCore {
                name,
                owner,
                config,
                default: default_controller,
                active: RefCell::new(None),
                last_output: Rc::new(RefCell::new(None)),
                actuator: RefCell::new(Box::new(actuator)),
                observer: RefCell::new(None),
                _subscription: subscription,
            }
        });
        Ok(Self { core })
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Tick-source owner id this component claims controllers with.
    pub fn owner_id(&self) -> OwnerId {
        self.core.owner
    }

    pub fn period(&self) -> Duration {
        self.core.config.period
    }

    pub fn default_controller(&self) -> PeriodicSignal<T> {
        self.core.default.clone()
    }

    /// Controller evaluated on the next tick.
    pub fn active_controller(&self) -> PeriodicSignal<T> {
        self.core.active_controller()
    }

    pub fn is_active(&self, controller: &PeriodicSignal<T>) -> bool {
        self.core.active_controller().ptr_eq(controller)
    }

    /// Replace the active controller.
    ///
    /// The current controller is detached and `controller` attached before
    /// the swap. If attaching fails the previous controller is restored and
    /// the error returned; the component keeps running what it ran before.
    pub fn set_controller(&self, controller: PeriodicSignal<T>) -> ComponentResult<()> {
        self.core.set_controller(controller)
    }

    pub fn reset_to_default(&self) -> ComponentResult<()> {
        self.core.set_controller(self.core.default.clone())
    }

    /// Restore the default controller if `controller` is still the active one.
    ///
    /// Returns `true` if a reset happened.
    pub fn release(&self, controller: &PeriodicSignal<T>) -> ComponentResult<bool> {
        if controller.ptr_eq(&self.core.default) || !self.is_active(controller) {
            return Ok(false);
        }
        self.reset_to_default()?;
        Ok(true)
    }

    /// The value applied on the most recent tick, `None` before the first.
    pub fn last_output(&self) -> Signal<Option<T>> {
        let cell = Rc::clone(&self.core.last_output);
        Signal::variable(move || cell.borrow().clone())
    }

    pub fn set_observer(&self, observer: Rc<dyn TickObserver>) {
        *self.core.observer.borrow_mut() = Some(observer);
    }

    /// Run one tick with elapsed time `dt`, outside the clock.
    pub fn tick(&self, dt: Time) {
        self.core.tick(dt);
    }
}

impl<T: Clone + 'static> ComponentCore<T> {
    fn active_controller(&self) -> PeriodicSignal<T> {
        self.active
            .borrow()
            .clone()
            .unwrap_or_else(|| self.default.clone())
    }

    fn set_controller(&self, controller: PeriodicSignal<T>) -> ComponentResult<()> {
        let current = self.active_controller();
        if current.ptr_eq(&controller) {
            return Ok(());
        }

        current.detach_tick_source(self.owner);
        if let Err(err) = controller.attach_tick_source(self.owner) {
            if let Err(restore) = current.attach_tick_source(self.owner) {
                error!(component = %self.name, "failed to restore previous controller: {restore}");
            }
            return Err(err.into());
        }

        let installed = controller.id();
        *self.active.borrow_mut() = if controller.ptr_eq(&self.default) {
            None
        } else {
            Some(controller)
        };
        debug!(component = %self.name, from = %current.id(), to = %installed, "controller swapped");
        Ok(())
    }

    fn tick(&self, dt: Time) {
        let timer = Timer::start("component tick");

        let controller = self.active_controller();
        let value = controller.current_value(dt, TickToken::mint());
        *self.last_output.borrow_mut() = Some(value.clone());
        self.actuator.borrow_mut().apply(&value);

        let busy = timer.stop_and_trace();
        let observer = self.observer.borrow().clone();
        if let Some(observer) = &observer {
            observer.on_tick(&self.name, busy);
        }
        if busy > self.config.period {
            warn!(
                component = %self.name,
                busy_us = busy.as_micros() as u64,
                period_us = self.config.period.as_micros() as u64,
                "tick overran its period"
            );
            if let Some(observer) = &observer {
                observer.on_overrun(&self.name, busy, self.config.period);
            }
        }
    }
}

impl<T> fmt::Debug for Component<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.core.name)
            .field("owner", &self.core.owner)
            .field("period", &self.core.config.period)
            .finish()
    }
}
