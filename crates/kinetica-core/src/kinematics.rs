// Derivation engine: rotations, positions, velocities and wrenches over the entity graph

mod calculus;
mod dynamics;
mod position;
mod rotation;
mod velocity;

use crate::{
    error::{EntityKind, Error, Result},
    geometry::common_ancestor,
};

/// Walks two root-ward chains and returns the shared element nearest to both.
fn nearest_common<T: PartialEq + Copy>(
    a: &[T],
    b: &[T],
    kind: EntityKind,
    names: impl FnOnce() -> (String, String),
) -> Result<T> {
    common_ancestor(a, b).ok_or_else(|| {
        let (from, to) = names();
        Error::GraphConnectivity { kind, from, to }
    })
}

/// Chain elements from `start` (inclusive) up to `stop` (exclusive).
fn chain_until<T: PartialEq + Copy>(chain: &[T], stop: T) -> &[T] {
    let end = chain.iter().position(|x| *x == stop).unwrap_or(chain.len());
    &chain[..end]
}
