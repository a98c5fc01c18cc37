use std::{
    cmp::Ordering,
    fmt::{self, Display},
};

use itertools::Itertools;
use noisy_float::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ordered metrics used to pick the best candidate, lower is better
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct RankingKey(Vec<N64>);

impl RankingKey {
    pub fn new(values: Vec<N64>) -> Self {
        Self(values)
    }

    /// Key from raw values, `None` if any of them is NaN
    pub fn try_from_f64(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        values
            .into_iter()
            .map(N64::try_new)
            .collect::<Option<_>>()
            .map(Self)
    }

    /// The key without any metrics
    ///
    /// Used by analyses that only keep the first candidate passing a veto.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }

    pub fn values(&self) -> &[N64] {
        &self.0
    }
}

impl From<Vec<N64>> for RankingKey {
    fn from(values: Vec<N64>) -> Self {
        Self(values)
    }
}

impl Display for RankingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.iter().join(", "))
    }
}

/// Two ranking keys of different length were compared
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
#[error("Cannot compare ranking keys of arity {current} and {candidate}")]
pub struct ArityMismatch {
    pub current: usize,
    pub candidate: usize,
}

/// Decides whether a candidate replaces the current best one
pub trait Ranker {
    /// Whether `candidate` beats `current`
    ///
    /// An absent `current` must always be beaten. A key never beats an
    /// identical key, except for empty keys under
    /// [EmptyKeyPolicy::Loses].
    fn better(
        &self,
        current: Option<&RankingKey>,
        candidate: &RankingKey,
    ) -> Result<bool, ArityMismatch>;
}

impl<F> Ranker for F
where
    F: Fn(Option<&RankingKey>, &RankingKey) -> Result<bool, ArityMismatch>,
{
    fn better(
        &self,
        current: Option<&RankingKey>,
        candidate: &RankingKey,
    ) -> Result<bool, ArityMismatch> {
        self(current, candidate)
    }
}

/// What happens when the current best candidate has an empty key
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyKeyPolicy {
    /// The current candidate stays, the first one seen is kept
    #[default]
    Wins,
    /// Any new candidate replaces it, the last one seen is kept
    ///
    /// This is the only case in which a key beats an identical key.
    Loses,
}

/// Lexicographic comparison of ranking keys
///
/// The first differing component decides and the lower value wins. On
/// equal keys the current candidate is kept.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Lexicographic {
    empty_key: EmptyKeyPolicy,
}

impl Lexicographic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_empty_key_policy(mut self, policy: EmptyKeyPolicy) -> Self {
        self.empty_key = policy;
        self
    }

    pub fn empty_key_policy(&self) -> EmptyKeyPolicy {
        self.empty_key
    }
}

impl Ranker for Lexicographic {
    fn better(
        &self,
        current: Option<&RankingKey>,
        candidate: &RankingKey,
    ) -> Result<bool, ArityMismatch> {
        let Some(current) = current else {
            return Ok(true);
        };
        if current.arity() != candidate.arity() {
            return Err(ArityMismatch {
                current: current.arity(),
                candidate: candidate.arity(),
            });
        }
        if current.arity() == 0 {
            return Ok(self.empty_key == EmptyKeyPolicy::Loses);
        }
        let ordering = current
            .values()
            .iter()
            .zip(candidate.values())
            .map(|(c, n)| n.cmp(c))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal);
        Ok(ordering == Ordering::Less)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(values: &[f64]) -> RankingKey {
        RankingKey::try_from_f64(values.iter().copied()).unwrap()
    }

    #[test]
    fn test_absent_current() {
        let ranker = Lexicographic::new();
        assert!(ranker.better(None, &key(&[5.])).unwrap());
        assert!(ranker.better(None, &RankingKey::empty()).unwrap());
    }

    #[test]
    fn test_lexicographic() {
        let ranker = Lexicographic::new();
        let current = key(&[1., 10.]);
        assert!(ranker.better(Some(&current), &key(&[0.5, 100.])).unwrap());
        assert!(!ranker.better(Some(&current), &key(&[2., 0.])).unwrap());
        assert!(ranker.better(Some(&current), &key(&[1., 9.])).unwrap());
        assert!(!ranker.better(Some(&current), &key(&[1., 11.])).unwrap());
        assert!(ranker.better(Some(&current), &key(&[1., -20.])).unwrap());
    }

    #[test]
    fn test_identical_key_never_replaces() {
        let ranker = Lexicographic::new();
        for values in [&[5.][..], &[0., -1.], &[2.1876, 3., 4.]] {
            let k = key(values);
            assert!(!ranker.better(Some(&k), &k).unwrap());
        }
        let empty = RankingKey::empty();
        assert!(!ranker.better(Some(&empty), &empty).unwrap());
    }

    #[test]
    fn test_empty_key_policy() {
        let empty = RankingKey::empty();
        let keep = Lexicographic::new().with_empty_key_policy(EmptyKeyPolicy::Wins);
        assert!(!keep.better(Some(&empty), &empty).unwrap());
        let replace = Lexicographic::new().with_empty_key_policy(EmptyKeyPolicy::Loses);
        assert!(replace.better(Some(&empty), &empty).unwrap());
    }

    #[test]
    fn test_arity_mismatch() {
        let ranker = Lexicographic::new();
        let err = ranker
            .better(Some(&key(&[1., 2.])), &key(&[1.]))
            .unwrap_err();
        assert_eq!(err, ArityMismatch { current: 2, candidate: 1 });
        assert!(ranker.better(Some(&RankingKey::empty()), &key(&[1.])).is_err());
    }

    #[test]
    fn test_nan_key() {
        assert!(RankingKey::try_from_f64([1., f64::NAN]).is_none());
        assert_eq!(key(&[1., 2.]).to_string(), "[1, 2]");
    }

    #[test]
    fn test_closure_ranker() {
        // higher wins, ties replace
        let ranker = |current: Option<&RankingKey>, candidate: &RankingKey| {
            Ok::<_, ArityMismatch>(current.map_or(true, |c| candidate >= c))
        };
        assert!(ranker.better(Some(&key(&[1.])), &key(&[2.])).unwrap());
        assert!(ranker.better(Some(&key(&[1.])), &key(&[1.])).unwrap());
        assert!(!ranker.better(Some(&key(&[1.])), &key(&[0.])).unwrap());
    }
}
