//! Geometry helpers shared by the point-to-point elements.

use crate::error::{ForceError, ForceResult};
use mb_core::{BodyId, Real, SpatialVec, Transform, Vec3, origin};
use mb_matter::Matter;
use mb_state::{Stage, State, StateError};
use std::sync::OnceLock;

/// Two body-fixed stations re-expressed in Ground.
#[derive(Clone, Copy, Debug)]
pub struct StationPair {
    /// Station 1 measured from body 1's origin, in Ground.
    pub s1_g: Vec3,
    /// Station 2 measured from body 2's origin, in Ground.
    pub s2_g: Vec3,
    /// Vector from station 1 to station 2, in Ground.
    pub r_g: Vec3,
}

impl StationPair {
    pub fn locate(
        state: &State,
        matter: &dyn Matter,
        (body1, station1): (BodyId, &Vec3),
        (body2, station2): (BodyId, &Vec3),
    ) -> ForceResult<Self> {
        let x_gb1: Transform = matter.body_transform(state, body1)?;
        let x_gb2: Transform = matter.body_transform(state, body2)?;
        let s1_g = x_gb1.rotation * station1;
        let s2_g = x_gb2.rotation * station2;
        let p1_g = origin(&x_gb1) + s1_g;
        let p2_g = origin(&x_gb2) + s2_g;
        Ok(Self {
            s1_g,
            s2_g,
            r_g: p2_g - p1_g,
        })
    }

    pub fn distance(&self) -> Real {
        self.r_g.norm()
    }

    /// Separation and unit direction from station 1 toward station 2.
    ///
    /// Coincident stations have no direction; so do separations too small
    /// or too large to normalize reliably.
    pub fn direction(&self, what: &'static str) -> ForceResult<(Real, Vec3)> {
        let d = self.distance();
        if !d.is_normal() {
            return Err(ForceError::DegenerateGeometry { what });
        }
        Ok((d, self.r_g / d))
    }

    /// Spatial force on body 1 for a force `f1_g` acting at station 1.
    pub fn on_body1(&self, f1_g: Vec3) -> SpatialVec {
        SpatialVec::new(self.s1_g.cross(&f1_g), f1_g)
    }

    /// Spatial force on body 2 for a force `f2_g` acting at station 2.
    pub fn on_body2(&self, f2_g: Vec3) -> SpatialVec {
        SpatialVec::new(self.s2_g.cross(&f2_g), f2_g)
    }
}

/// Record the per-state slots an element allocated while realizing
/// Topology. Every state must hand out the same slots.
pub(crate) fn bind_slots<S: Copy + PartialEq>(cell: &OnceLock<S>, slots: S, what: &'static str) -> ForceResult<()> {
    match cell.get() {
        Some(existing) if *existing != slots => Err(mb_core::MbError::Invariant { what }.into()),
        Some(_) => Ok(()),
        None => {
            let _ = cell.set(slots);
            Ok(())
        }
    }
}

/// Slots recorded by `bind_slots`, or a stage error naming `what`.
pub(crate) fn bound_slots<S: Copy>(cell: &OnceLock<S>, state: &State, what: &'static str) -> ForceResult<S> {
    cell.get().copied().ok_or_else(|| {
        StateError::StageTooLow {
            what,
            required: Stage::Topology,
            current: state.stage(),
        }
        .into()
    })
}
