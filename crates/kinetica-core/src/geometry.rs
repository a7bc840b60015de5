// Geometric entities and the per-system arenas that own them

use crate::{
    error::{EntityKind, Error, Result},
    expr::Expr,
    matrix::Matrix,
    symbol::{Symbol, SystemId},
};
use rustc_hash::FxHashMap;
use std::{fmt, sync::Arc};

pub mod drawing;
pub mod vector;
pub mod wrench;

pub use drawing::{Drawing3D, DrawingKind};
pub use vector::{IntoComponents, Tensor3D, Vector3D};
pub use wrench::{Wrench3D, WrenchKind};

macro_rules! entity_handle {
    ($(#[$meta:meta])* $handle:ident, $id:ident, $data:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $id(pub(crate) usize);

        impl $id {
            pub fn index(&self) -> usize {
                self.0
            }
        }

        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $handle(Arc<$data>);

        impl $handle {
            pub fn id(&self) -> $id {
                self.0.id
            }

            pub fn name(&self) -> &str {
                &self.0.name
            }

            pub fn owner(&self) -> SystemId {
                self.0.owner
            }
        }

        impl PartialEq for $handle {
            fn eq(&self, other: &Self) -> bool {
                self.0.owner == other.0.owner && self.0.id == other.0.id
            }
        }

        impl Eq for $handle {}

        impl std::hash::Hash for $handle {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                self.0.owner.hash(state);
                self.0.id.hash(state);
            }
        }

        impl fmt::Display for $handle {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0.name)
            }
        }
    };
}

#[derive(Debug)]
struct BaseData {
    id: BaseId,
    owner: SystemId,
    name: String,
    previous: Option<BaseId>,
    axis: [f64; 3],
    angle: Expr,
}

entity_handle!(
    /// Orientation frame, rotated by `angle` about `axis` from its previous base.
    Base,
    BaseId,
    BaseData
);

impl Base {
    pub fn previous(&self) -> Option<BaseId> {
        self.0.previous
    }

    pub fn has_previous(&self) -> bool {
        self.0.previous.is_some()
    }

    pub fn rotation_tupla(&self) -> [f64; 3] {
        self.0.axis
    }

    pub fn rotation_angle(&self) -> &Expr {
        &self.0.angle
    }
}

#[derive(Debug)]
struct PointData {
    id: PointId,
    owner: SystemId,
    name: String,
    previous: Option<PointId>,
    position: Option<Vector3D>,
}

entity_handle!(
    /// Location given by a position vector from its previous point.
    Point,
    PointId,
    PointData
);

impl Point {
    pub fn previous(&self) -> Option<PointId> {
        self.0.previous
    }

    pub fn has_previous(&self) -> bool {
        self.0.previous.is_some()
    }

    /// Vector from the previous point to this one; `None` for roots.
    pub fn position_vector(&self) -> Option<&Vector3D> {
        self.0.position.as_ref()
    }
}

#[derive(Debug)]
struct FrameData {
    id: FrameId,
    owner: SystemId,
    name: String,
    point: Point,
    base: Base,
    scale: f64,
}

entity_handle!(Frame, FrameId, FrameData);

impl Frame {
    pub fn point(&self) -> &Point {
        &self.0.point
    }

    pub fn base(&self) -> &Base {
        &self.0.base
    }

    pub fn scale(&self) -> f64 {
        self.0.scale
    }
}

#[derive(Debug)]
struct SolidData {
    id: SolidId,
    owner: SystemId,
    name: String,
    point: Point,
    base: Base,
    mass: Symbol,
    cm: Vector3D,
    inertia: Tensor3D,
    g: Point,
}

entity_handle!(
    /// Rigid body attached to `point` and `base`.
    ///
    /// `cm` locates the centre of mass from `point`; `inertia` is taken about
    /// the centre of mass, in the solid base.
    Solid,
    SolidId,
    SolidData
);

impl Solid {
    pub fn point(&self) -> &Point {
        &self.0.point
    }

    pub fn base(&self) -> &Base {
        &self.0.base
    }

    pub fn mass(&self) -> &Symbol {
        &self.0.mass
    }

    pub fn cm(&self) -> &Vector3D {
        &self.0.cm
    }

    pub fn inertia(&self) -> &Tensor3D {
        &self.0.inertia
    }

    /// The centre-of-mass point registered together with the solid.
    pub fn g(&self) -> &Point {
        &self.0.g
    }
}

/// Entity argument given either by name or by value.
#[derive(Debug, Clone, Copy)]
pub enum Ref<'a, T> {
    Name(&'a str),
    Entity(&'a T),
}

impl<'a, T> From<&'a str> for Ref<'a, T> {
    fn from(name: &'a str) -> Self {
        Ref::Name(name)
    }
}

impl<'a, T> From<&'a String> for Ref<'a, T> {
    fn from(name: &'a String) -> Self {
        Ref::Name(name)
    }
}

macro_rules! entity_ref {
    ($($ty:ty),*) => {$(
        impl<'a> From<&'a $ty> for Ref<'a, $ty> {
            fn from(entity: &'a $ty) -> Self {
                Ref::Entity(entity)
            }
        }
    )*};
}

entity_ref!(
    Base, Point, Frame, Solid, Vector3D, Tensor3D, Matrix, Wrench3D, Drawing3D
);

/// Insertion-ordered storage with a name index.
#[derive(Debug)]
pub(crate) struct Arena<T> {
    items: Vec<T>,
    by_name: FxHashMap<String, usize>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            by_name: FxHashMap::default(),
        }
    }
}

impl<T> Arena<T> {
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub(crate) fn find(&self, name: &str) -> Option<&T> {
        self.index_of(name).and_then(|i| self.items.get(i))
    }

    pub(crate) fn push(&mut self, name: &str, item: T) -> usize {
        let index = self.items.len();
        self.items.push(item);
        self.by_name.insert(name.to_string(), index);
        index
    }

    pub(crate) fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        let index = self.index_of(name)?;
        self.items.get_mut(index)
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

/// Every geometric entity of one system.
#[derive(Debug)]
pub struct EntityGraph {
    owner: SystemId,
    pub(crate) bases: Arena<Base>,
    pub(crate) points: Arena<Point>,
    pub(crate) frames: Arena<Frame>,
    pub(crate) solids: Arena<Solid>,
    pub(crate) vectors: Arena<Vector3D>,
    pub(crate) tensors: Arena<Tensor3D>,
    pub(crate) matrices: Arena<Matrix>,
    pub(crate) wrenches: Arena<Wrench3D>,
    pub(crate) drawings: Arena<Drawing3D>,
}

impl EntityGraph {
    pub fn new(owner: SystemId) -> Self {
        Self {
            owner,
            bases: Arena::default(),
            points: Arena::default(),
            frames: Arena::default(),
            solids: Arena::default(),
            vectors: Arena::default(),
            tensors: Arena::default(),
            matrices: Arena::default(),
            wrenches: Arena::default(),
            drawings: Arena::default(),
        }
    }

    pub fn owner(&self) -> SystemId {
        self.owner
    }

    pub fn base_by_id(&self, id: BaseId) -> &Base {
        &self.bases.items[id.0]
    }

    pub fn point_by_id(&self, id: PointId) -> &Point {
        &self.points.items[id.0]
    }

    pub(crate) fn add_base(
        &mut self,
        name: &str,
        previous: Option<BaseId>,
        axis: [f64; 3],
        angle: Expr,
    ) -> Base {
        let base = Base(Arc::new(BaseData {
            id: BaseId(self.bases.len()),
            owner: self.owner,
            name: name.to_string(),
            previous,
            axis,
            angle,
        }));
        self.bases.push(name, base.clone());
        base
    }

    pub(crate) fn add_point(
        &mut self,
        name: &str,
        previous: Option<PointId>,
        position: Option<Vector3D>,
    ) -> Point {
        let point = Point(Arc::new(PointData {
            id: PointId(self.points.len()),
            owner: self.owner,
            name: name.to_string(),
            previous,
            position,
        }));
        self.points.push(name, point.clone());
        point
    }

    pub(crate) fn add_frame(&mut self, name: &str, point: Point, base: Base, scale: f64) -> Frame {
        let frame = Frame(Arc::new(FrameData {
            id: FrameId(self.frames.len()),
            owner: self.owner,
            name: name.to_string(),
            point,
            base,
            scale,
        }));
        self.frames.push(name, frame.clone());
        frame
    }

    /// Replaces the stored frame with a copy placed at `point`.
    pub(crate) fn move_frame(&mut self, frame: &Frame, point: Point) -> Frame {
        let moved = Frame(Arc::new(FrameData {
            id: frame.0.id,
            owner: self.owner,
            name: frame.0.name.clone(),
            point,
            base: frame.0.base.clone(),
            scale: frame.0.scale,
        }));
        if let Some(slot) = self.frames.get_mut(frame.name()) {
            *slot = moved.clone();
        }
        moved
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn add_solid(
        &mut self,
        name: &str,
        point: Point,
        base: Base,
        mass: Symbol,
        cm: Vector3D,
        inertia: Tensor3D,
        g: Point,
    ) -> Solid {
        let solid = Solid(Arc::new(SolidData {
            id: SolidId(self.solids.len()),
            owner: self.owner,
            name: name.to_string(),
            point,
            base,
            mass,
            cm,
            inertia,
            g,
        }));
        self.solids.push(name, solid.clone());
        solid
    }

    fn owned<T: Clone>(
        &self,
        arena: &Arena<T>,
        kind: EntityKind,
        r: Ref<'_, T>,
        id_of: impl Fn(&T) -> (SystemId, usize, &str),
    ) -> Result<T> {
        match r {
            Ref::Name(name) => arena.find(name).cloned().ok_or_else(|| Error::lookup(kind, name)),
            Ref::Entity(entity) => {
                // The stored item wins over the caller's handle, which may
                // predate a mutation such as a frame move.
                let (owner, index, name) = id_of(entity);
                let stored = (owner == self.owner).then(|| arena.get(index)).flatten();
                stored.cloned().ok_or_else(|| Error::lookup(kind, name))
            }
        }
    }

    pub fn base(&self, r: Ref<'_, Base>) -> Result<Base> {
        self.owned(&self.bases, EntityKind::Base, r, |b| (b.owner(), b.id().0, b.name()))
    }

    pub fn point(&self, r: Ref<'_, Point>) -> Result<Point> {
        self.owned(&self.points, EntityKind::Point, r, |p| (p.owner(), p.id().0, p.name()))
    }

    pub fn frame(&self, r: Ref<'_, Frame>) -> Result<Frame> {
        self.owned(&self.frames, EntityKind::Frame, r, |f| (f.owner(), f.id().0, f.name()))
    }

    pub fn solid(&self, r: Ref<'_, Solid>) -> Result<Solid> {
        self.owned(&self.solids, EntityKind::Solid, r, |s| (s.owner(), s.id().0, s.name()))
    }

    fn value<T: Clone>(arena: &Arena<T>, kind: EntityKind, r: Ref<'_, T>) -> Result<T> {
        match r {
            Ref::Name(name) => arena.find(name).cloned().ok_or_else(|| Error::lookup(kind, name)),
            Ref::Entity(entity) => Ok(entity.clone()),
        }
    }

    pub fn vector(&self, r: Ref<'_, Vector3D>) -> Result<Vector3D> {
        let v = Self::value(&self.vectors, EntityKind::Vector, r)?;
        self.check_base(v.base())?;
        Ok(v)
    }

    pub fn tensor(&self, r: Ref<'_, Tensor3D>) -> Result<Tensor3D> {
        let t = Self::value(&self.tensors, EntityKind::Tensor, r)?;
        self.check_base(t.base())?;
        Ok(t)
    }

    pub fn matrix(&self, r: Ref<'_, Matrix>) -> Result<Matrix> {
        Self::value(&self.matrices, EntityKind::Matrix, r)
    }

    pub fn wrench(&self, r: Ref<'_, Wrench3D>) -> Result<Wrench3D> {
        let w = Self::value(&self.wrenches, EntityKind::Wrench, r)?;
        self.solid(Ref::Entity(w.solid()))?;
        Ok(w)
    }

    pub(crate) fn check_base(&self, base: &Base) -> Result<()> {
        self.base(Ref::Entity(base)).map(drop)
    }

    /// Fails with `DuplicateName` if `name` is taken within `kind`.
    pub(crate) fn check_free(&self, kind: EntityKind, name: &str) -> Result<()> {
        crate::symbol::check_identifier(name)?;
        let taken = match kind {
            EntityKind::Base => self.bases.contains(name),
            EntityKind::Point => self.points.contains(name),
            EntityKind::Frame => self.frames.contains(name),
            EntityKind::Solid => self.solids.contains(name),
            EntityKind::Vector => self.vectors.contains(name),
            EntityKind::Tensor => self.tensors.contains(name),
            EntityKind::Matrix => self.matrices.contains(name),
            EntityKind::Wrench => self.wrenches.contains(name),
            EntityKind::Drawing => self.drawings.contains(name),
            EntityKind::Symbol => false,
        };
        if taken {
            Err(Error::duplicate(kind, name))
        } else {
            Ok(())
        }
    }

    /// Bases from `id` up to its root, `id` first.
    pub fn base_ancestry(&self, id: BaseId) -> Vec<BaseId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(prev) = self.base_by_id(current).previous() {
            chain.push(prev);
            current = prev;
        }
        chain
    }

    /// Points from `id` up to its root, `id` first.
    pub fn point_ancestry(&self, id: PointId) -> Vec<PointId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(prev) = self.point_by_id(current).previous() {
            chain.push(prev);
            current = prev;
        }
        chain
    }
}

/// Nearest common element of two root-ward chains, if any.
pub(crate) fn common_ancestor<T: PartialEq + Copy>(a: &[T], b: &[T]) -> Option<T> {
    a.iter().copied().find(|x| b.contains(x))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> EntityGraph {
        let mut g = EntityGraph::new(SystemId::next());
        let xyz = g.add_base("xyz", None, [0.0, 0.0, 1.0], Expr::zero());
        let b1 = g.add_base("b1", Some(xyz.id()), [0.0, 0.0, 1.0], Expr::one());
        g.add_base("b2", Some(b1.id()), [1.0, 0.0, 0.0], Expr::one());
        g.add_base("c1", Some(xyz.id()), [0.0, 1.0, 0.0], Expr::one());
        g.add_base("other", None, [0.0, 0.0, 1.0], Expr::zero());
        g
    }

    #[test]
    fn ancestry_walks_to_root() {
        let g = graph();
        let b2 = g.base(Ref::Name("b2")).unwrap();
        let names: Vec<_> = g
            .base_ancestry(b2.id())
            .into_iter()
            .map(|id| g.base_by_id(id).name().to_string())
            .collect();
        assert_eq!(names, ["b2", "b1", "xyz"]);
    }

    #[test]
    fn common_ancestor_of_branches() {
        let g = graph();
        let b2 = g.base(Ref::Name("b2")).unwrap().id();
        let c1 = g.base(Ref::Name("c1")).unwrap().id();
        let other = g.base(Ref::Name("other")).unwrap().id();
        assert_eq!(
            common_ancestor(&g.base_ancestry(b2), &g.base_ancestry(c1)),
            Some(BaseId(0))
        );
        assert_eq!(
            common_ancestor(&g.base_ancestry(b2), &g.base_ancestry(other)),
            None
        );
    }

    #[test]
    fn lookups_check_names_and_owners() {
        let g = graph();
        assert!(matches!(
            g.base(Ref::Name("nope")),
            Err(Error::NameLookup {
                kind: EntityKind::Base,
                ..
            })
        ));

        let foreign = graph();
        let b1 = foreign.base(Ref::Name("b1")).unwrap();
        assert!(g.base(Ref::Entity(&b1)).is_err());
        assert!(foreign.base((&b1).into()).is_ok());
        assert!(matches!(
            g.check_free(EntityKind::Base, "b1"),
            Err(Error::DuplicateName { .. })
        ));
        assert!(g.check_free(EntityKind::Point, "b1").is_ok());
    }
}
