use std::{
    fmt::{self, Display},
    ops::Deref,
    str::FromStr,
};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::label::{canonical_order, ObjectKind, ObjectLabel};

/// A slot in a composite candidate
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    /// Exactly this kind of object
    Kind(ObjectKind),
    /// Any charged lepton
    Lepton,
    /// Any visible object
    Visible,
    /// The missing-energy pseudo-object
    MissingEnergy,
}

impl Role {
    /// Whether `label` can fill this role
    pub fn accepts(&self, label: &ObjectLabel) -> bool {
        let kind = label.kind();
        match self {
            Self::Kind(k) => *k == kind,
            Self::Lepton => kind.is_lepton(),
            Self::Visible => kind != ObjectKind::MissingEnergy,
            Self::MissingEnergy => kind == ObjectKind::MissingEnergy,
        }
    }

    /// Object kinds that can fill this role
    pub fn kinds(&self) -> Vec<ObjectKind> {
        crate::label::VISIBLE_KINDS
            .into_iter()
            .chain([ObjectKind::MissingEnergy])
            .filter(|k| self.accepts(&ObjectLabel::single(*k)))
            .collect()
    }
}

#[derive(Debug, Clone, Error)]
#[error("Unknown role token: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "met" => Ok(Self::MissingEnergy),
            "l" | "lepton" => Ok(Self::Lepton),
            "*" | "any" => Ok(Self::Visible),
            _ => {
                let mut chars = s.chars();
                match (chars.next().and_then(ObjectKind::from_letter), chars.next()) {
                    (Some(kind), None) => Ok(Self::Kind(kind)),
                    _ => Err(UnknownRole(s.to_owned())),
                }
            }
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kind(kind) => Display::fmt(kind, f),
            Self::Lepton => f.write_str("l"),
            Self::Visible => f.write_str("*"),
            Self::MissingEnergy => f.write_str("met"),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.to_string()
    }
}

/// The shape of a composite candidate as an ordered list of roles
///
/// Roles with the same token are interchangeable: a candidate filling
/// them is only generated once, with its labels in canonical order.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ObjectDefinition {
    roles: Vec<Role>,
}

impl ObjectDefinition {
    pub fn new(roles: Vec<Role>) -> Self {
        Self { roles }
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Generate all candidates that can be built from `labels`
    ///
    /// See [generate].
    pub fn candidates<'a>(
        &'a self,
        labels: &'a [ObjectLabel],
    ) -> impl Iterator<Item = CandidateAssignment> + 'a {
        generate(self, labels)
    }

    fn visible_roles(&self) -> Vec<Role> {
        self.roles
            .iter()
            .copied()
            .filter(|r| *r != Role::MissingEnergy)
            .collect()
    }

    // assemble the full assignment, inserting missing energy at its slots
    fn fill(&self, visible: Vec<ObjectLabel>) -> CandidateAssignment {
        let mut visible = visible.into_iter();
        let labels = self
            .roles
            .iter()
            .filter_map(|role| match role {
                Role::MissingEnergy => Some(ObjectLabel::missing_energy()),
                _ => visible.next(),
            })
            .collect();
        CandidateAssignment(labels)
    }
}

impl FromStr for ObjectDefinition {
    type Err = UnknownRole;

    /// Parse a comma-separated list of role tokens, e.g. `"l,l"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let roles = s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(Role::from_str)
            .collect::<Result<_, _>>()?;
        Ok(Self { roles })
    }
}

impl Display for ObjectDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.roles.iter().join(","))
    }
}

/// Concrete objects filling the roles of an [ObjectDefinition]
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct CandidateAssignment(Vec<ObjectLabel>);

impl CandidateAssignment {
    pub fn new(labels: Vec<ObjectLabel>) -> Self {
        Self(labels)
    }

    pub fn into_inner(self) -> Vec<ObjectLabel> {
        self.0
    }
}

impl Deref for CandidateAssignment {
    type Target = [ObjectLabel];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for CandidateAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.iter().join(", "))
    }
}

/// Generate all candidates for `definition` from the given labels
///
/// Each visible role is filled by a distinct label it accepts. Roles
/// with identical tokens only receive labels in canonical order, so
/// every unordered choice appears exactly once. Missing-energy roles
/// are never permuted and are always filled by the missing-energy
/// label. If there are too few compatible labels the sequence is empty.
pub fn generate<'a>(
    definition: &'a ObjectDefinition,
    labels: &'a [ObjectLabel],
) -> impl Iterator<Item = CandidateAssignment> + 'a {
    let roles = definition.visible_roles();
    let nvisible = roles.len();
    let labels = labels
        .iter()
        .copied()
        .filter(|l| l.kind() != ObjectKind::MissingEnergy);
    labels
        .permutations(nvisible)
        .filter(move |_| !definition.is_empty())
        .filter(move |perm| is_canonical_fill(&roles, perm))
        .map(move |perm| definition.fill(perm))
}

fn is_canonical_fill(roles: &[Role], labels: &[ObjectLabel]) -> bool {
    debug_assert_eq!(roles.len(), labels.len());
    if !roles.iter().zip(labels).all(|(r, l)| r.accepts(l)) {
        return false;
    }
    for i in 0..roles.len() {
        for j in (i + 1)..roles.len() {
            if roles[i] == roles[j] && !canonical_order(&labels[i], &labels[j]) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::enumerate;

    fn def(s: &str) -> ObjectDefinition {
        s.parse().unwrap()
    }

    fn to_strings(candidates: impl Iterator<Item = CandidateAssignment>) -> Vec<String> {
        candidates.map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_symmetric_pair() {
        let labels = enumerate("eem");
        let pairs = to_strings(generate(&def("l,l"), &labels));
        assert_eq!(pairs, ["(e1, e2)", "(e1, m)", "(e2, m)"]);
    }

    #[test]
    fn test_pair_count() {
        for n in 0..7usize {
            let category = "j".repeat(n);
            let labels = enumerate(&category);
            let pairs: Vec<_> = generate(&def("j,j"), &labels).collect();
            assert_eq!(pairs.len(), n * n.saturating_sub(1) / 2);
            let mut seen = ahash::AHashSet::new();
            for pair in &pairs {
                let mut sorted = pair.to_vec();
                sorted.sort();
                assert!(seen.insert(sorted));
            }
        }
    }

    #[test]
    fn test_asymmetric_roles() {
        let labels = enumerate("eemm");
        let pairs = to_strings(generate(&def("e,m"), &labels));
        assert_eq!(pairs, ["(e1, m1)", "(e1, m2)", "(e2, m1)", "(e2, m2)"]);

        // distinct tokens are not symmetric even if they accept the same labels
        let pairs = to_strings(generate(&def("l,*"), &enumerate("em")));
        assert_eq!(pairs, ["(e, m)", "(m, e)"]);
    }

    #[test]
    fn test_missing_energy() {
        let labels = enumerate("em");
        let pairs = to_strings(generate(&def("l,met"), &labels));
        assert_eq!(pairs, ["(e, met)", "(m, met)"]);

        let pairs = to_strings(generate(&def("met,m"), &labels));
        assert_eq!(pairs, ["(met, m)"]);

        let pairs = to_strings(generate(&def("met"), &[]));
        assert_eq!(pairs, ["(met)"]);
    }

    #[test]
    fn test_no_candidate() {
        let labels = enumerate("e");
        assert_eq!(generate(&def("l,l"), &labels).count(), 0);
        assert_eq!(generate(&def("t"), &labels).count(), 0);
        assert_eq!(generate(&ObjectDefinition::default(), &labels).count(), 0);
    }

    #[test]
    fn test_parse_definition() {
        let d = def("l, met");
        assert_eq!(d.roles(), [Role::Lepton, Role::MissingEnergy]);
        assert_eq!(d.to_string(), "l,met");
        assert!("l,q".parse::<ObjectDefinition>().is_err());
        assert!("ee".parse::<ObjectDefinition>().is_err());
        let d: ObjectDefinition = serde_json::from_str(r#"["e", "e", "*"]"#).unwrap();
        assert_eq!(d.roles(), [Role::Kind(ObjectKind::Electron), Role::Kind(ObjectKind::Electron), Role::Visible]);
    }

    #[test]
    fn test_role_kinds() {
        assert_eq!(Role::Lepton.kinds(), [ObjectKind::Electron, ObjectKind::Muon, ObjectKind::Tau]);
        assert_eq!(Role::MissingEnergy.kinds(), [ObjectKind::MissingEnergy]);
        assert_eq!(Role::Visible.kinds().len(), 5);
    }
}
