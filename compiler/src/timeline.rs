// timeline.rs — Tick geometry helpers for interval editing
//
// Pure create / move / resize operations an interactive timeline calls while
// the author drags intervals around. Positions coming from the UI may be
// fractional; they are rounded to whole ticks (halves toward +∞).
//
// Preconditions: none; inverted inputs are swapped, out-of-range ticks clamped.
// Postconditions: every result satisfies `bounds.min_tick ≤ start ≤ end ≤ bounds.max_tick`
//   (when the input range fits the bounds) and fields other than the
//   endpoints are carried over unchanged. Moves keep the duration exactly
//   over the whole `i64` range.
// Failure modes: none.
// Side effects: none.

use serde::{Deserialize, Serialize};

use crate::model::IntervalInstance;

// ── Bounds ─────────────────────────────────────────────────────────────────

/// Inclusive tick range the timeline allows. `max_tick: None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Bounds {
    pub min_tick: i64,
    pub max_tick: Option<i64>,
}

impl Default for Bounds {
    fn default() -> Self {
        Bounds {
            min_tick: 0,
            max_tick: None,
        }
    }
}

impl Bounds {
    pub fn new(min_tick: i64, max_tick: i64) -> Self {
        Bounds {
            min_tick,
            max_tick: Some(max_tick),
        }
    }

    pub fn clamp(&self, tick: i64) -> i64 {
        let t = tick.max(self.min_tick);
        match self.max_tick {
            Some(max) => t.min(max),
            None => t,
        }
    }

    /// Upper edge; unbounded ends at `i64::MAX`.
    pub fn max_or_top(&self) -> i64 {
        self.max_tick.unwrap_or(i64::MAX)
    }

    /// Ticks between the edges. Wider than `i64` so the full range fits.
    pub fn span(&self) -> i128 {
        i128::from(self.max_or_top()) - i128::from(self.min_tick)
    }
}

/// Round a UI position to a whole tick.
pub fn normalize_tick(t: f64) -> i64 {
    (t + 0.5).floor() as i64
}

// ── Interval-like values ───────────────────────────────────────────────────

/// Anything with a start and an end tick.
pub trait Timed: Sized {
    /// Lowest tick the type can store.
    const MIN_TICK: i64 = i64::MIN;

    fn start_tick(&self) -> i64;
    fn end_tick(&self) -> i64;
    /// A copy with new endpoints and every other field unchanged.
    fn with_ticks(&self, start: i64, end: i64) -> Self;

    /// Endpoints ordered so that start ≤ end.
    fn ordered(&self) -> (i64, i64) {
        let (s, e) = (self.start_tick(), self.end_tick());
        if s <= e {
            (s, e)
        } else {
            (e, s)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickRange {
    pub start: i64,
    pub end: i64,
}

impl Timed for TickRange {
    fn start_tick(&self) -> i64 {
        self.start
    }

    fn end_tick(&self) -> i64 {
        self.end
    }

    fn with_ticks(&self, start: i64, end: i64) -> Self {
        TickRange { start, end }
    }
}

impl Timed for IntervalInstance {
    const MIN_TICK: i64 = 0;

    fn start_tick(&self) -> i64 {
        i64::try_from(self.start).unwrap_or(i64::MAX)
    }

    fn end_tick(&self) -> i64 {
        i64::try_from(self.end).unwrap_or(i64::MAX)
    }

    /// Callers stay at or above `MIN_TICK`; anything below still floors at 0.
    fn with_ticks(&self, start: i64, end: i64) -> Self {
        IntervalInstance {
            start: u64::try_from(start).unwrap_or(0),
            end: u64::try_from(end).unwrap_or(0),
            ..self.clone()
        }
    }
}

// ── Operations ─────────────────────────────────────────────────────────────

/// New range from two UI positions: rounded, swapped if inverted, clamped.
pub fn create_interval(start: f64, end: f64, bounds: Bounds) -> TickRange {
    let (s, e) = order(normalize_tick(start), normalize_tick(end));
    let (s, e) = order(bounds.clamp(s), bounds.clamp(e));
    TickRange { start: s, end: e }
}

/// Shift by `delta` ticks keeping the duration. A move past an edge stops at
/// that edge; a range longer than the bounds collapses to the bounds. The lower
/// edge is never below what `T` can store.
pub fn move_interval<T: Timed>(interval: &T, delta: f64, bounds: Bounds) -> T {
    let bounds = storable::<T>(bounds);
    let (start, end) = interval.ordered();
    let duration = i128::from(end) - i128::from(start);
    let top = bounds.max_or_top();

    if duration > bounds.span() {
        return interval.with_ticks(bounds.min_tick, top.max(bounds.min_tick));
    }

    let moved_start = (i128::from(start) + i128::from(normalize_tick(delta)))
        .min(i128::from(top) - duration)
        .max(i128::from(bounds.min_tick));
    interval.with_ticks(narrow(moved_start), narrow(moved_start + duration))
}

/// Drag the start handle. Never moves past the end.
pub fn resize_start<T: Timed>(interval: &T, new_start: f64, bounds: Bounds) -> T {
    let bounds = storable::<T>(bounds);
    let (_, end) = interval.ordered();
    let s = bounds.clamp(normalize_tick(new_start)).min(end);
    interval.with_ticks(s, end)
}

/// Drag the end handle. Never moves before the start.
pub fn resize_end<T: Timed>(interval: &T, new_end: f64, bounds: Bounds) -> T {
    let bounds = storable::<T>(bounds);
    let (start, _) = interval.ordered();
    let e = bounds.clamp(normalize_tick(new_end)).max(start);
    interval.with_ticks(start, e)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    Start,
    End,
}

pub fn resize_interval<T: Timed>(interval: &T, edge: Edge, new_tick: f64, bounds: Bounds) -> T {
    match edge {
        Edge::Start => resize_start(interval, new_tick, bounds),
        Edge::End => resize_end(interval, new_tick, bounds),
    }
}

/// `bounds` with its lower edge raised to `T::MIN_TICK`.
fn storable<T: Timed>(bounds: Bounds) -> Bounds {
    Bounds {
        min_tick: bounds.min_tick.max(T::MIN_TICK),
        ..bounds
    }
}

fn narrow(t: i128) -> i64 {
    i64::try_from(t).unwrap_or(if t < 0 { i64::MIN } else { i64::MAX })
}

fn order(a: i64, b: i64) -> (i64, i64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
