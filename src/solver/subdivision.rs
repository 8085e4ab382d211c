//! Adaptive timestep subdivision.
//!
//! A frame's `dt` is split into sub-steps. Each candidate sub-step is
//! accepted when one full step and two half steps agree to within the
//! error threshold; otherwise the candidate is halved.

use log::debug;

use super::{DEFAULT_ERROR_THRESHOLD, DEFAULT_MAX_SUBDIVISION_DEPTH, DEFAULT_MIN_DT};
use crate::error::Result;

/// A state that can be advanced through time.
pub trait Steppable: Sized + Clone {
    /// Advance by `dt`, returning the new state.
    fn update(&self, dt: f64) -> Result<Self>;

    /// Distance between the characteristic quantities of two states.
    fn distance(&self, other: &Self) -> f64;

    /// States without history do not depend on the step size.
    fn needs_subdivision(&self) -> bool {
        true
    }
}

/// One accepted sub-step: the state reached and the time it covered.
#[derive(Debug, Clone, PartialEq)]
pub struct SubStep<S> {
    pub state: S,
    pub dt: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubdivisionResult<S> {
    pub steps: Vec<SubStep<S>>,
}

impl<S> SubdivisionResult<S> {
    pub fn final_state(&self) -> Option<&S> {
        self.steps.last().map(|step| &step.state)
    }

    pub fn total_time(&self) -> f64 {
        self.steps.iter().map(|step| step.dt).sum()
    }

    /// Time-weighted mean of `f` over the sub-steps. Zero when empty.
    pub fn time_average(&self, f: impl Fn(&S) -> f64) -> f64 {
        let total = self.total_time();
        if total <= 0.0 {
            return 0.0;
        }
        self.steps
            .iter()
            .map(|step| step.dt * f(&step.state))
            .sum::<f64>()
            / total
    }
}

/// Step-doubling driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimestepSubdivisions {
    pub error_threshold: f64,
    pub min_dt: f64,
    pub max_depth: usize,
}

impl Default for TimestepSubdivisions {
    fn default() -> Self {
        Self::new(
            DEFAULT_ERROR_THRESHOLD,
            DEFAULT_MIN_DT,
            DEFAULT_MAX_SUBDIVISION_DEPTH,
        )
    }
}

impl TimestepSubdivisions {
    pub fn new(error_threshold: f64, min_dt: f64, max_depth: usize) -> Self {
        Self {
            error_threshold,
            min_dt,
            max_depth,
        }
    }

    /// Advance `initial` by exactly `total_dt`.
    pub fn step<S: Steppable>(&self, initial: &S, total_dt: f64) -> Result<SubdivisionResult<S>> {
        let mut steps = Vec::new();
        if !(total_dt > 0.0) {
            return Ok(SubdivisionResult { steps });
        }

        let mut state = initial.clone();
        let mut elapsed = 0.0;
        let mut last_dt = total_dt;

        while elapsed < total_dt {
            let remaining = total_dt - elapsed;
            let (mut dt, mut next) = if state.needs_subdivision() {
                self.get_timestep(&state, (last_dt * 2.0).min(remaining))?
            } else {
                (remaining, state.update(remaining)?)
            };

            // Take the rest of the frame rather than leave a sliver behind
            if dt >= remaining || remaining - dt < self.min_dt * 0.5 {
                if dt != remaining {
                    dt = remaining;
                    next = state.update(dt)?;
                }
                elapsed = total_dt;
            } else {
                elapsed += dt;
            }

            last_dt = dt;
            steps.push(SubStep {
                state: next.clone(),
                dt,
            });
            state = next;
        }

        debug!("subdivided {total_dt} s into {} steps", steps.len());
        Ok(SubdivisionResult { steps })
    }

    /// Largest step at or below `seed` that passes the step-doubling test,
    /// along with the state it reaches.
    fn get_timestep<S: Steppable>(&self, state: &S, seed: f64) -> Result<(f64, S)> {
        let mut dt = seed;
        let mut depth = 0;
        loop {
            if dt <= self.min_dt {
                return Ok((self.min_dt, state.update(self.min_dt)?));
            }

            let full = state.update(dt)?;
            if depth >= self.max_depth {
                debug!("subdivision depth {depth} reached at dt = {dt}");
                return Ok((dt, full));
            }

            let half = state.update(dt * 0.5)?.update(dt * 0.5)?;
            if full.distance(&half) < self.error_threshold {
                return Ok((dt, full));
            }

            dt *= 0.5;
            depth += 1;
        }
    }
}
