//! Process-wide settings shared by every [`System`](crate::System).
//!
//! Both values are atomics; a change is seen by every system, including ones
//! created before it.

use std::{
    fmt,
    str::FromStr,
    sync::atomic::{AtomicBool, Ordering},
};

static GRAVITY_UP: AtomicBool = AtomicBool::new(false);
static ATOMIZATION: AtomicBool = AtomicBool::new(true);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GravityDirection {
    Up,
    #[default]
    Down,
}

impl GravityDirection {
    /// Sign of the gravity force along the absolute `z` axis.
    pub const fn sign(&self) -> f64 {
        match self {
            GravityDirection::Up => 1.0,
            GravityDirection::Down => -1.0,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            GravityDirection::Up => "up",
            GravityDirection::Down => "down",
        }
    }
}

impl fmt::Display for GravityDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GravityDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(GravityDirection::Up),
            "down" => Ok(GravityDirection::Down),
            _ => Err(format!("gravity direction must be 'up' or 'down', got '{s}'")),
        }
    }
}

pub fn gravity_direction() -> GravityDirection {
    if GRAVITY_UP.load(Ordering::Relaxed) {
        GravityDirection::Up
    } else {
        GravityDirection::Down
    }
}

pub fn set_gravity_direction(direction: GravityDirection) {
    tracing::debug!(%direction, "gravity direction set");
    GRAVITY_UP.store(direction == GravityDirection::Up, Ordering::Relaxed);
}

/// Whether compiled evaluators share common subexpressions by default.
pub fn atomization_state() -> bool {
    ATOMIZATION.load(Ordering::Relaxed)
}

pub fn set_atomization_state(enabled: bool) {
    tracing::debug!(enabled, "atomization state set");
    ATOMIZATION.store(enabled, Ordering::Relaxed);
}
