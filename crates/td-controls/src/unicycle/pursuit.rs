//! Pure-pursuit path following.
//!
//! The robot's pose is dead-reckoned from its velocity signals. Every tick
//! the follower finds the point on the path one lookahead distance ahead,
//! steers along the arc through it, and reports the remaining error to the
//! final waypoint on each axis.

use td_core::{Angle, Length, Ratio, Real, Scalar, clamp_symmetric, m, rad, unitless};
use td_signal::{PeriodicSignal, Signal};
use tracing::debug;

use crate::error::{ControlError, ControlResult};

use super::{UnicycleHardware, UnicycleProperties, UnicycleSignal};

/// A point in the field frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: Length,
    pub y: Length,
}

impl Point {
    pub fn new(x: Length, y: Length) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self::new(m(0.0), m(0.0))
    }

    fn xy(self) -> (Real, Real) {
        (self.x.base_value(), self.y.base_value())
    }

    fn from_xy(x: Real, y: Real) -> Self {
        Self::new(m(x), m(y))
    }

    pub fn distance_to(self, other: Point) -> Length {
        let (ax, ay) = self.xy();
        let (bx, by) = other.xy();
        m((bx - ax).hypot(by - ay))
    }
}

/// Position plus heading; heading zero points along +x.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Point,
    pub heading: Angle,
}

impl Pose {
    pub fn new(position: Point, heading: Angle) -> Self {
        Self { position, heading }
    }
}

/// Remaining error to the final waypoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisError {
    pub x: Length,
    pub y: Length,
}

impl AxisError {
    /// True when every axis is within `tolerance`.
    pub fn within(&self, tolerance: Length) -> bool {
        self.x.magnitude() <= tolerance && self.y.magnitude() <= tolerance
    }
}

/// Dead-reckoned pose, integrating forward and turn velocity from `start`.
///
/// The heading is advanced first and the position then moves along the new
/// heading.
pub fn xy_position(hardware: &impl UnicycleHardware, start: Pose) -> PeriodicSignal<Pose> {
    hardware
        .forward_velocity()
        .zip(&hardware.turn_velocity())
        .to_periodic()
        .scan_left(start, |pose, (v, w), dt| {
            let dt = dt.base_value();
            let heading = pose.heading.base_value() + w.base_value() * dt;
            let step = v.base_value() * dt;
            let (x, y) = pose.position.xy();
            Pose::new(
                Point::from_xy(x + step * heading.cos(), y + step * heading.sin()),
                rad(heading),
            )
        })
}

/// Point on `path` one `lookahead` ahead of `position`.
///
/// Only segments from `*segment` onwards are searched, and `*segment` only
/// moves forward, so the follower never turns back to an earlier part of a
/// path that crosses itself. When no segment crosses the lookahead circle
/// the follower aims at the final waypoint if it is within reach, otherwise
/// at the closest point on the remaining path.
pub fn lookahead_point(
    path: &[Point],
    segment: &mut usize,
    position: Point,
    lookahead: Length,
) -> Option<Point> {
    let last = *path.last()?;
    if path.len() == 1 {
        return Some(last);
    }
    let radius = lookahead.base_value();
    let (px, py) = position.xy();

    let mut found = None;
    for i in *segment..path.len() - 1 {
        let ((ax, ay), (bx, by)) = (path[i].xy(), path[i + 1].xy());
        if let Some(t) = circle_crossing((ax - px, ay - py), (bx - ax, by - ay), radius) {
            found = Some((i, Point::from_xy(ax + t * (bx - ax), ay + t * (by - ay))));
        }
    }
    if let Some((i, point)) = found {
        *segment = i;
        return Some(point);
    }

    if position.distance_to(last) <= lookahead {
        return Some(last);
    }
    (*segment..path.len() - 1)
        .map(|i| closest_on_segment(path[i], path[i + 1], position))
        .min_by(|a, b| {
            let (da, db) = (position.distance_to(*a), position.distance_to(*b));
            da.base_value().total_cmp(&db.base_value())
        })
}

/// Parameter `t` in `[0, 1]` where segment `a + t·d` leaves a circle of
/// `radius` around the origin; `f` is `a` relative to the centre. Entry
/// crossings lie behind the robot and are ignored.
fn circle_crossing(f: (Real, Real), d: (Real, Real), radius: Real) -> Option<Real> {
    let a = d.0 * d.0 + d.1 * d.1;
    if a <= Real::EPSILON {
        return None;
    }
    let b = 2.0 * (f.0 * d.0 + f.1 * d.1);
    let c = f.0 * f.0 + f.1 * f.1 - radius * radius;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let exit = (-b + disc.sqrt()) / (2.0 * a);
    (0.0..=1.0).contains(&exit).then_some(exit)
}

fn closest_on_segment(a: Point, b: Point, p: Point) -> Point {
    let ((ax, ay), (bx, by), (px, py)) = (a.xy(), b.xy(), p.xy());
    let (dx, dy) = (bx - ax, by - ay);
    let len2 = dx * dx + dy * dy;
    if len2 <= Real::EPSILON {
        return a;
    }
    let t = (((px - ax) * dx + (py - ay) * dy) / len2).clamp(0.0, 1.0);
    Point::from_xy(ax + t * dx, ay + t * dy)
}

/// Path length from `point` (lying on segment `segment`) to the end of `path`.
fn length_to_end(path: &[Point], segment: usize, point: Point) -> Length {
    let rest: Real = path
        .windows(2)
        .skip(segment + 1)
        .map(|pair| pair[0].distance_to(pair[1]).base_value())
        .sum();
    let to_segment_end = path
        .get(segment + 1)
        .map_or(0.0, |end| point.distance_to(*end).base_value());
    m(to_segment_end + rest)
}

/// Signed curvature of the arc from `pose` through `target`; positive turns
/// left.
pub fn curvature(pose: Pose, target: Point) -> Real {
    let (px, py) = pose.position.xy();
    let (tx, ty) = target.xy();
    let (dx, dy) = (tx - px, ty - py);
    let d2 = dx * dx + dy * dy;
    if d2 <= Real::EPSILON {
        return 0.0;
    }
    let h = pose.heading.base_value();
    let lateral = -h.sin() * dx + h.cos() * dy;
    2.0 * lateral / d2
}

/// Pure-pursuit follower output.
pub struct PursuitControl {
    pub control: PeriodicSignal<UnicycleSignal>,
    pub error: PeriodicSignal<AxisError>,
    pub pose: PeriodicSignal<Pose>,
}

#[derive(Clone)]
struct PursuitState {
    segment: usize,
    target: Point,
    remaining: Length,
}

/// Follow `waypoints` starting from `start`.
///
/// Forward output comes from the forward-position proportional gain applied
/// to the remaining path length; turn output converts the commanded forward
/// speed and the arc curvature into a turn rate, as a fraction of the max
/// turn velocity. Both are clamped to `max_output`.
pub fn pure_pursuit_control(
    hardware: &impl UnicycleHardware,
    properties: &Signal<UnicycleProperties>,
    waypoints: &[Point],
    start: Pose,
    max_output: Ratio,
) -> ControlResult<PursuitControl> {
    let Some(&goal) = waypoints.last() else {
        return Err(ControlError::InvalidArg {
            what: "pure pursuit needs at least one waypoint",
        });
    };
    let limit = max_output.base_value();
    if !(limit.is_finite() && limit > 0.0) {
        return Err(ControlError::InvalidArg {
            what: "max output must be positive",
        });
    }

    let path: Vec<Point> = std::iter::once(start.position)
        .chain(waypoints.iter().copied())
        .collect();
    let pose = xy_position(hardware, start);
    debug!(waypoints = waypoints.len(), "pure pursuit armed");

    let lookahead = properties.map(|p| p.default_lookahead);
    let initial = PursuitState {
        segment: 0,
        target: start.position,
        remaining: length_to_end(&path, 0, start.position),
    };
    let state = pose.scan_left(initial, move |mut state, pose, _| {
        let mut segment = state.segment;
        if let Some(target) = lookahead_point(&path, &mut segment, pose.position, lookahead.get()) {
            state.segment = segment;
            state.target = target;
            state.remaining = pose.position.distance_to(target) + length_to_end(&path, segment, target);
        }
        state
    });

    let properties = properties.clone();
    let control = pose.zip(&state).map(move |(pose, state)| {
        let props = properties.get();
        let forward = props.forward_position_gains.kp.apply(state.remaining).base_value();
        let forward = clamp_symmetric(forward, limit);
        let turn_rate = forward
            * props.max_forward_velocity.base_value()
            * curvature(pose, state.target);
        let turn = clamp_symmetric(turn_rate / props.max_turn_velocity.base_value(), limit);
        UnicycleSignal::new(unitless(forward), unitless(turn))
    });
    let error = pose.map(move |pose| AxisError {
        x: goal.x - pose.position.x,
        y: goal.y - pose.position.y,
    });

    Ok(PursuitControl {
        control,
        error,
        pose,
    })
}
