use std::fmt::{self, Display};

use particle_id::ParticleID;
use serde::{Deserialize, Serialize};

use crate::{
    label::{category_from_counts, labels_from_counts, ObjectKind, ObjectLabel, VISIBLE_KINDS},
    store::{EventRecord, Field, KinematicStore, PairField},
    util,
};

/// Identifies a physical collision event across all inputs
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize,
)]
pub struct EventIdentity {
    /// Run number
    pub run: u32,
    /// Luminosity section
    pub lumi: u32,
    /// Event number
    pub event: u64,
}

impl EventIdentity {
    pub const fn new(run: u32, lumi: u32, event: u64) -> Self {
        Self { run, lumi, event }
    }
}

impl Display for EventIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.run, self.lumi, self.event)
    }
}

/// A reconstructed final-state object
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PhysicsObject {
    /// Particle type
    pub id: ParticleID,
    /// Four-momentum [E, px, py, pz]
    pub p: [f64; 4],
}

impl PhysicsObject {
    pub fn charge(&self) -> f64 {
        match ObjectKind::from_particle_id(self.id) {
            // particles have positive PDG ids and negative charge
            Some(kind) if kind.is_lepton() => -(self.id.id().signum() as f64),
            _ => 0.,
        }
    }
}

/// Final-state objects of one event
///
/// Objects of each kind are labelled in order of decreasing transverse
/// momentum.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FinalStateEvent {
    /// Event identity
    pub id: EventIdentity,
    /// Final-state category, e.g. "eem"
    pub category: String,
    /// Labelled objects, in the order given by [crate::label::enumerate]
    pub objects: Vec<(ObjectLabel, PhysicsObject)>,
    /// Missing transverse momentum [px, py]
    pub missing_pt: Option<[f64; 2]>,
}

impl FinalStateEvent {
    pub fn labels(&self) -> impl Iterator<Item = &ObjectLabel> {
        self.objects.iter().map(|(l, _)| l)
    }

    pub fn object(&self, label: &ObjectLabel) -> Option<&PhysicsObject> {
        self.objects.iter().find(|(l, _)| l == label).map(|(_, o)| o)
    }

    // four-momentum, with missing energy as a massless transverse vector
    fn momentum(&self, label: &ObjectLabel) -> Option<[f64; 4]> {
        if label.kind() == ObjectKind::MissingEnergy {
            let [px, py] = self.missing_pt?;
            Some([px.hypot(py), px, py, 0.])
        } else {
            self.object(label).map(|o| o.p)
        }
    }
}

impl KinematicStore for FinalStateEvent {
    fn provides(kind: ObjectKind, field: Field) -> bool {
        match kind {
            ObjectKind::MissingEnergy => matches!(field, Field::Pt | Field::Phi),
            _ => true,
        }
    }

    fn provides_pair(a: ObjectKind, b: ObjectKind, field: PairField) -> bool {
        let met = ObjectKind::MissingEnergy;
        match field {
            PairField::DeltaR => a != met && b != met,
            _ => true,
        }
    }

    fn value(&self, label: &ObjectLabel, field: Field) -> Option<f64> {
        if !Self::provides(label.kind(), field) {
            return None;
        }
        let p = self.momentum(label)?;
        let value = match field {
            Field::Pt => util::pt(&p),
            Field::Eta => util::eta(&p),
            Field::Phi => util::phi(&p),
            Field::Energy => p[0],
            Field::Mass => util::mass(&p),
            Field::Charge => self.object(label)?.charge(),
        };
        Some(value)
    }

    fn pair_value(
        &self,
        a: &ObjectLabel,
        b: &ObjectLabel,
        field: PairField,
    ) -> Option<f64> {
        if !Self::provides_pair(a.kind(), b.kind(), field) {
            return None;
        }
        let p = self.momentum(a)?;
        let q = self.momentum(b)?;
        let value = match field {
            PairField::Mass => util::mass(&util::add(&p, &q)),
            PairField::TransverseMass => util::transverse_mass(
                util::pt(&p),
                util::phi(&p),
                util::pt(&q),
                util::phi(&q),
            ),
            PairField::DeltaPhi => {
                util::delta_phi(util::phi(&p), util::phi(&q))
            }
            PairField::DeltaR => {
                util::delta_r(
                    util::eta(&p),
                    util::phi(&p),
                    util::eta(&q),
                    util::phi(&q),
                )
            }
        };
        Some(value)
    }
}

impl EventRecord for FinalStateEvent {
    fn identity(&self) -> EventIdentity {
        self.id
    }

    fn category(&self) -> &str {
        &self.category
    }
}

/// Assemble a [FinalStateEvent] from reconstructed particles
#[derive(Clone, Debug, Default)]
pub struct EventBuilder {
    id: EventIdentity,
    particles: Vec<PhysicsObject>,
    missing_pt: Option<[f64; 2]>,
}

impl EventBuilder {
    pub fn new(id: EventIdentity) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Add a particle
    ///
    /// Particles that are not final-state objects, e.g. neutrinos,
    /// are ignored and `false` is returned.
    pub fn add_object(&mut self, id: ParticleID, p: [f64; 4]) -> bool {
        if ObjectKind::from_particle_id(id).is_none() {
            return false;
        }
        self.particles.push(PhysicsObject { id, p });
        true
    }

    pub fn missing_pt(&mut self, pt: [f64; 2]) -> &mut Self {
        self.missing_pt = Some(pt);
        self
    }

    pub fn build(self) -> FinalStateEvent {
        let mut by_kind: [Vec<PhysicsObject>; VISIBLE_KINDS.len()] = Default::default();
        for particle in self.particles {
            let pos = ObjectKind::from_particle_id(particle.id)
                .and_then(|k| k.position());
            if let Some(pos) = pos {
                by_kind[pos].push(particle)
            }
        }
        let mut counts = [0; VISIBLE_KINDS.len()];
        for (count, objects) in counts.iter_mut().zip(by_kind.iter_mut()) {
            objects.sort_by(|a, b| util::pt(&b.p).total_cmp(&util::pt(&a.p)));
            *count = objects.len() as u32;
        }
        let labels = labels_from_counts(&counts);
        let objects = labels
            .into_iter()
            .zip(by_kind.into_iter().flatten())
            .collect();
        FinalStateEvent {
            id: self.id,
            category: category_from_counts(&counts),
            objects,
            missing_pt: self.missing_pt,
        }
    }
}
