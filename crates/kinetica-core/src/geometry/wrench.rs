use super::{Point, Solid, Vector3D};
use crate::{expr::Expr, symbol::Symbol};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrenchKind {
    Constraint,
    Constitutive,
    External,
    Inertia,
    Gravity,
    /// Kinematic twist: angular velocity in the force slot and point
    /// velocity in the moment slot.
    Twist,
    /// Sum of wrenches of different kinds.
    Composite,
}

impl WrenchKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            WrenchKind::Constraint => "Constraint",
            WrenchKind::Constitutive => "Constitutive",
            WrenchKind::External => "External",
            WrenchKind::Inertia => "Inertia",
            WrenchKind::Gravity => "Gravity",
            WrenchKind::Twist => "Twist",
            WrenchKind::Composite => "Composite",
        }
    }
}

impl fmt::Display for WrenchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WrenchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "constraint" => Ok(WrenchKind::Constraint),
            "constitutive" => Ok(WrenchKind::Constitutive),
            "external" => Ok(WrenchKind::External),
            "inertia" => Ok(WrenchKind::Inertia),
            "gravity" => Ok(WrenchKind::Gravity),
            "twist" => Ok(WrenchKind::Twist),
            "composite" => Ok(WrenchKind::Composite),
            _ => Err(format!("unknown wrench kind '{s}'")),
        }
    }
}

/// Force and moment acting on `solid`, with the moment taken about `point`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Wrench3D {
    force: Vector3D,
    moment: Vector3D,
    point: Point,
    solid: Solid,
    kind: WrenchKind,
}

impl Wrench3D {
    pub fn new(
        force: Vector3D,
        moment: Vector3D,
        point: Point,
        solid: Solid,
        kind: WrenchKind,
    ) -> Self {
        Self {
            force,
            moment,
            point,
            solid,
            kind,
        }
    }

    pub fn force(&self) -> &Vector3D {
        &self.force
    }

    pub fn moment(&self) -> &Vector3D {
        &self.moment
    }

    pub fn point(&self) -> &Point {
        &self.point
    }

    pub fn solid(&self) -> &Solid {
        &self.solid
    }

    pub fn kind(&self) -> WrenchKind {
        self.kind
    }

    pub(crate) fn with_parts(&self, force: Vector3D, moment: Vector3D, point: Point) -> Self {
        Self {
            force,
            moment,
            point,
            solid: self.solid.clone(),
            kind: self.kind,
        }
    }

    pub(crate) fn with_kind(mut self, kind: WrenchKind) -> Self {
        self.kind = kind;
        self
    }

    /// Applies `f` to every component of force and moment.
    pub fn map(&self, mut f: impl FnMut(&Expr) -> Expr) -> Self {
        let force = self.force.map(&mut f);
        let moment = self.moment.map(&mut f);
        self.with_parts(force, moment, self.point.clone())
    }

    pub fn scale(&self, factor: &Expr) -> Self {
        self.map(|c| c * factor)
    }

    pub fn subs(&self, old: &Expr, new: &Expr) -> Self {
        self.map(|c| c.subs(old, new))
    }

    pub fn diff(&self, var: &Symbol) -> Self {
        self.map(|c| c.diff(var))
    }
}

impl std::ops::Neg for &Wrench3D {
    type Output = Wrench3D;

    fn neg(self) -> Wrench3D {
        self.map(|c| -c)
    }
}

impl fmt::Display for Wrench3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} wrench on {} at {}: force {}, moment {}",
            self.kind, self.solid, self.point, self.force, self.moment
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_parse_case_insensitively() {
        assert_eq!("Constitutive".parse::<WrenchKind>(), Ok(WrenchKind::Constitutive));
        assert_eq!("external".parse::<WrenchKind>(), Ok(WrenchKind::External));
        assert!("spring".parse::<WrenchKind>().is_err());
        for kind in [WrenchKind::Inertia, WrenchKind::Twist, WrenchKind::Composite] {
            assert_eq!(kind.as_str().parse::<WrenchKind>(), Ok(kind));
        }
    }
}
