use std::{
    cmp::Ordering,
    fmt::{self, Display},
    str::FromStr,
};

use particle_id::{
    sm_elementary_particles::{electron, muon, photon, tau},
    ParticleID,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kinds of final-state objects
///
/// The declaration order is the canonical order used when enumerating
/// the objects of a final-state category.
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize,
)]
pub enum ObjectKind {
    Electron,
    Muon,
    Tau,
    Photon,
    Jet,
    /// Missing transverse energy, at most one per event
    MissingEnergy,
}

/// Visible object kinds in canonical enumeration order
pub const VISIBLE_KINDS: [ObjectKind; 5] = [
    ObjectKind::Electron,
    ObjectKind::Muon,
    ObjectKind::Tau,
    ObjectKind::Photon,
    ObjectKind::Jet,
];

pub(crate) const PID_JET: ParticleID = ParticleID::new(81);

impl ObjectKind {
    /// Short tag used in category strings and labels
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Electron => "e",
            Self::Muon => "m",
            Self::Tau => "t",
            Self::Photon => "g",
            Self::Jet => "j",
            Self::MissingEnergy => "met",
        }
    }

    /// Kind denoted by one letter of a category string
    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            'e' => Some(Self::Electron),
            'm' => Some(Self::Muon),
            't' => Some(Self::Tau),
            'g' => Some(Self::Photon),
            'j' => Some(Self::Jet),
            _ => None,
        }
    }

    /// Charged leptons
    pub fn is_lepton(self) -> bool {
        matches!(self, Self::Electron | Self::Muon | Self::Tau)
    }

    /// Classify a particle by its PDG id
    ///
    /// Returns `None` for particles that are not final-state objects,
    /// e.g. neutrinos or partons.
    pub fn from_particle_id(id: ParticleID) -> Option<Self> {
        let abs = ParticleID::new(id.id().abs());
        if abs == electron {
            Some(Self::Electron)
        } else if abs == muon {
            Some(Self::Muon)
        } else if abs == tau {
            Some(Self::Tau)
        } else if abs == photon {
            Some(Self::Photon)
        } else if abs == PID_JET {
            Some(Self::Jet)
        } else {
            None
        }
    }

    pub(crate) fn position(self) -> Option<usize> {
        VISIBLE_KINDS.iter().position(|k| *k == self)
    }
}

impl Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One concrete object in an event, e.g. "electron #2"
///
/// Labels are ordered by [canonical_order].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ObjectLabel {
    kind: ObjectKind,
    index: Option<u32>,
}

impl ObjectLabel {
    /// Label of an object that is unique in its event
    pub const fn single(kind: ObjectKind) -> Self {
        Self { kind, index: None }
    }

    /// Label of the `index`-th object of its kind, counting from 1
    pub const fn indexed(kind: ObjectKind, index: u32) -> Self {
        Self { kind, index: Some(index) }
    }

    /// The missing-energy pseudo-object
    pub const fn missing_energy() -> Self {
        Self::single(ObjectKind::MissingEnergy)
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn index(&self) -> Option<u32> {
        self.index
    }
}

impl Ord for ObjectLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind
            .tag()
            .cmp(other.kind.tag())
            .then_with(|| {
                self.index.unwrap_or(1).cmp(&other.index.unwrap_or(1))
            })
            .then_with(|| self.index.is_some().cmp(&other.index.is_some()))
    }
}

impl PartialOrd for ObjectLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Whether `a` comes before `b` in the canonical label order
///
/// Labels are ordered by kind tag first and by instance index second,
/// where a missing index counts as 1. This is a strict total order.
pub fn canonical_order(a: &ObjectLabel, b: &ObjectLabel) -> bool {
    a < b
}

/// The two labels, in canonical order
pub fn ordered_pair(a: ObjectLabel, b: ObjectLabel) -> (ObjectLabel, ObjectLabel) {
    if canonical_order(&b, &a) {
        (b, a)
    } else {
        (a, b)
    }
}

impl Display for ObjectLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(n) => write!(f, "{}{n}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Unknown object label: {0}")]
pub struct UnknownLabel(pub String);

impl FromStr for ObjectLabel {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ObjectKind::MissingEnergy.tag() {
            return Ok(Self::missing_energy());
        }
        let mut chars = s.chars();
        let kind = chars
            .next()
            .and_then(ObjectKind::from_letter)
            .ok_or_else(|| UnknownLabel(s.to_owned()))?;
        let rest = chars.as_str();
        if rest.is_empty() {
            return Ok(Self::single(kind));
        }
        match rest.parse() {
            Ok(n) if n > 0 => Ok(Self::indexed(kind, n)),
            _ => Err(UnknownLabel(s.to_owned())),
        }
    }
}

/// Object labels present in a final-state category
///
/// A kind occurring once in `category` yields a single unsuffixed
/// label, a kind occurring `n > 1` times yields labels suffixed `1..=n`.
/// The result follows the canonical kind order, irrespective of the
/// order of letters in `category`. Unknown letters are ignored.
pub fn enumerate(category: &str) -> Vec<ObjectLabel> {
    let mut counts = [0u32; VISIBLE_KINDS.len()];
    for kind in category.chars().filter_map(ObjectKind::from_letter) {
        if let Some(pos) = kind.position() {
            counts[pos] += 1;
        }
    }
    labels_from_counts(&counts)
}

pub(crate) fn labels_from_counts(
    counts: &[u32; VISIBLE_KINDS.len()],
) -> Vec<ObjectLabel> {
    let mut labels = Vec::with_capacity(counts.iter().sum::<u32>() as usize);
    for (kind, &n) in VISIBLE_KINDS.iter().zip(counts) {
        match n {
            0 => {}
            1 => labels.push(ObjectLabel::single(*kind)),
            n => labels.extend((1..=n).map(|i| ObjectLabel::indexed(*kind, i))),
        }
    }
    labels
}

/// Category string listing `counts[i]` objects of `VISIBLE_KINDS[i]`
pub(crate) fn category_from_counts(counts: &[u32; VISIBLE_KINDS.len()]) -> String {
    let mut category = String::new();
    for (kind, &n) in VISIBLE_KINDS.iter().zip(counts) {
        for _ in 0..n {
            category.push_str(kind.tag());
        }
    }
    category
}
