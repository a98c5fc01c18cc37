use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::{event::EventIdentity, label::{ObjectKind, ObjectLabel}};

/// Per-object quantities
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Transverse momentum
    Pt,
    /// Pseudorapidity
    Eta,
    /// Azimuthal angle
    Phi,
    Energy,
    Mass,
    /// Electric charge in units of the elementary charge
    Charge,
}

impl Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pt => "pt",
            Self::Eta => "eta",
            Self::Phi => "phi",
            Self::Energy => "energy",
            Self::Mass => "mass",
            Self::Charge => "charge",
        };
        f.write_str(name)
    }
}

/// Quantities of an ordered pair of objects
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PairField {
    /// Invariant mass
    Mass,
    /// Transverse mass
    TransverseMass,
    /// Distance in the (η, φ) plane
    DeltaR,
    /// Azimuthal separation, in [0, π]
    DeltaPhi,
}

impl Display for PairField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mass => "mass",
            Self::TransverseMass => "transverse_mass",
            Self::DeltaR => "delta_r",
            Self::DeltaPhi => "delta_phi",
        };
        f.write_str(name)
    }
}

/// Read access to the kinematics of the objects in one event
pub trait KinematicStore {
    /// Whether objects of the given kind carry the given field
    fn provides(kind: ObjectKind, field: Field) -> bool
    where
        Self: Sized;

    /// Whether the pair quantity `field` exists for objects of kinds `a`
    /// and `b`
    fn provides_pair(a: ObjectKind, b: ObjectKind, field: PairField) -> bool
    where
        Self: Sized;

    /// Value of `field` for the object `label`
    ///
    /// `None` if there is no such object in the event.
    fn value(&self, label: &ObjectLabel, field: Field) -> Option<f64>;

    /// Value of a pair quantity
    ///
    /// Implementations may assume that `a` and `b` are in canonical
    /// order, see [crate::label::ordered_pair].
    fn pair_value(
        &self,
        a: &ObjectLabel,
        b: &ObjectLabel,
        field: PairField,
    ) -> Option<f64>;
}

/// One row of the input: an event in a given final-state category
pub trait EventRecord: KinematicStore {
    fn identity(&self) -> EventIdentity;

    fn category(&self) -> &str;
}
