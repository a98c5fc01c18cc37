use ahash::AHashMap;

use crate::{
    cut::CutState,
    definition::CandidateAssignment,
    error::{Error, Result},
    label::{ordered_pair, ObjectLabel},
    rank::RankingKey,
    store::{Field, KinematicStore, PairField},
};

type IdPredicate<E> = Box<dyn Fn(&E, &ObjectLabel) -> bool>;

/// Reference to an identification predicate in an [IdPredicateSet]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct IdHandle(usize);

/// Named object identification predicates, e.g. "tight electron"
pub struct IdPredicateSet<E> {
    names: Vec<String>,
    predicates: Vec<IdPredicate<E>>,
}

impl<E> Default for IdPredicateSet<E> {
    fn default() -> Self {
        Self {
            names: Vec::new(),
            predicates: Vec::new(),
        }
    }
}

impl<E> IdPredicateSet<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a predicate
    ///
    /// A predicate with the same name is replaced.
    pub fn insert<F>(&mut self, name: impl Into<String>, predicate: F) -> IdHandle
    where
        F: Fn(&E, &ObjectLabel) -> bool + 'static,
    {
        let name = name.into();
        if let Some(pos) = self.names.iter().position(|n| *n == name) {
            self.predicates[pos] = Box::new(predicate);
            return IdHandle(pos);
        }
        self.names.push(name);
        self.predicates.push(Box::new(predicate));
        IdHandle(self.predicates.len() - 1)
    }

    pub fn handle(&self, name: &str) -> Result<IdHandle> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(IdHandle)
            .ok_or_else(|| Error::UnknownIdPredicate(name.to_owned()))
    }

    pub fn name(&self, handle: IdHandle) -> Option<&str> {
        self.names.get(handle.0).map(|n| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    fn eval(&self, handle: IdHandle, event: &E, label: &ObjectLabel) -> bool {
        self.predicates
            .get(handle.0)
            .map(|p| p(event, label))
            .unwrap_or(false)
    }
}

/// Evaluation state of a single event
///
/// Created when an event is picked up and dropped once it has been
/// processed. Identification results and memoised quantities are shared
/// between all candidates and cut sequences of the event.
pub struct EventContext<'e, E> {
    event: &'e E,
    ids: &'e IdPredicateSet<E>,
    candidate: CandidateAssignment,
    selection: Option<CutState>,
    key: Option<RankingKey>,
    id_cache: AHashMap<(IdHandle, ObjectLabel), bool>,
    memo: AHashMap<(&'static str, CandidateAssignment), f64>,
    flags: AHashMap<(&'static str, CandidateAssignment), bool>,
}

impl<'e, E> EventContext<'e, E> {
    pub fn new(event: &'e E, ids: &'e IdPredicateSet<E>) -> Self {
        Self {
            event,
            ids,
            candidate: CandidateAssignment::default(),
            selection: None,
            key: None,
            id_cache: AHashMap::new(),
            memo: AHashMap::new(),
            flags: AHashMap::new(),
        }
    }

    pub fn event(&self) -> &'e E {
        self.event
    }

    /// The candidate currently under evaluation
    pub fn candidate(&self) -> &CandidateAssignment {
        &self.candidate
    }

    /// Label filling the role at position `role` of the current candidate
    pub fn role(&self, role: usize) -> Option<&ObjectLabel> {
        self.candidate.get(role)
    }

    /// Switch to a new candidate, keeping the per-event caches
    pub fn bind(&mut self, candidate: CandidateAssignment) {
        self.candidate = candidate;
        self.selection = None;
        self.key = None;
    }

    /// Outcome of the selection for the current candidate, if evaluated
    pub fn selection(&self) -> Option<CutState> {
        self.selection
    }

    pub(crate) fn set_selection(&mut self, state: CutState) {
        self.selection = Some(state);
    }

    /// Ranking key of the current candidate, once it has been computed
    pub fn ranking_key(&self) -> Option<&RankingKey> {
        self.key.as_ref()
    }

    pub(crate) fn set_ranking_key(&mut self, key: RankingKey) {
        self.key = Some(key);
    }

    /// Whether `label` passes the identification predicate `id`
    ///
    /// Each (predicate, label) pair is evaluated at most once per event.
    pub fn passes_id(&mut self, id: IdHandle, label: &ObjectLabel) -> bool {
        let (event, ids) = (self.event, self.ids);
        *self
            .id_cache
            .entry((id, *label))
            .or_insert_with(|| ids.eval(id, event, label))
    }

    /// Whether all objects of the current candidate pass `id`
    ///
    /// Missing energy is not subject to identification.
    pub fn candidate_passes_id(&mut self, id: IdHandle) -> bool {
        let labels = self.candidate.clone();
        labels
            .iter()
            .filter(|l| l.kind() != crate::label::ObjectKind::MissingEnergy)
            .all(|l| self.passes_id(id, l))
    }

    /// Compute a quantity of the current candidate once per event
    pub fn memoize<F>(&mut self, name: &'static str, compute: F) -> f64
    where
        F: FnOnce(&E, &CandidateAssignment) -> f64,
    {
        let key = (name, self.candidate.clone());
        if let Some(value) = self.memo.get(&key) {
            return *value;
        }
        let value = compute(self.event, &self.candidate);
        self.memo.insert(key, value);
        value
    }

    /// Boolean variant of [EventContext::memoize]
    ///
    /// Flags and values are cached separately and may share names.
    pub fn memoize_flag<F>(&mut self, name: &'static str, compute: F) -> bool
    where
        F: FnOnce(&E, &CandidateAssignment) -> bool,
    {
        let key = (name, self.candidate.clone());
        if let Some(flag) = self.flags.get(&key) {
            return *flag;
        }
        let flag = compute(self.event, &self.candidate);
        self.flags.insert(key, flag);
        flag
    }
}

impl<'e, E: KinematicStore> EventContext<'e, E> {
    /// Value of `field` for the object at position `role` of the candidate
    pub fn value(&self, role: usize, field: Field) -> Option<f64> {
        let label = self.role(role)?;
        self.event.value(label, field)
    }

    /// Pair quantity for the objects at positions `a` and `b`
    ///
    /// The pair is looked up in canonical order.
    pub fn pair_value(&self, a: usize, b: usize, field: PairField) -> Option<f64> {
        let (a, b) = ordered_pair(*self.role(a)?, *self.role(b)?);
        self.event.pair_value(&a, &b, field)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::label::enumerate;

    #[test]
    fn test_id_memoised() {
        let calls = Rc::new(Cell::new(0));
        let mut ids = IdPredicateSet::<()>::new();
        let counter = calls.clone();
        let tight = ids.insert("tight", move |_, label: &ObjectLabel| {
            counter.set(counter.get() + 1);
            label.index() != Some(2)
        });
        assert_eq!(ids.handle("tight").unwrap(), tight);
        assert!(ids.handle("loose").is_err());

        let labels = enumerate("eem");
        let mut ctx = EventContext::new(&(), &ids);
        ctx.bind(CandidateAssignment::new(vec![labels[0], labels[1]]));
        assert!(!ctx.candidate_passes_id(tight));
        ctx.bind(CandidateAssignment::new(vec![labels[0], labels[2]]));
        assert!(ctx.candidate_passes_id(tight));
        assert!(!ctx.passes_id(tight, &labels[1]));
        assert_eq!(calls.get(), 3);

        // new event, fresh cache
        let mut ctx = EventContext::new(&(), &ids);
        assert!(ctx.passes_id(tight, &labels[0]));
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn test_replace_id() {
        let mut ids = IdPredicateSet::<()>::new();
        let first = ids.insert("id", |_, _| false);
        let second = ids.insert("id", |_, _| true);
        assert_eq!(first, second);
        assert_eq!(ids.len(), 1);
        assert_eq!(ids.name(first), Some("id"));
        let label = enumerate("e")[0];
        assert!(EventContext::new(&(), &ids).passes_id(first, &label));
    }

    #[test]
    fn test_memoize() {
        let ids = IdPredicateSet::<u32>::new();
        let mut ctx = EventContext::new(&7, &ids);
        let labels = enumerate("mm");
        ctx.bind(CandidateAssignment::new(labels.clone()));
        assert_eq!(ctx.memoize("x", |ev, _| *ev as f64), 7.);
        assert_eq!(ctx.memoize("x", |_, _| panic!("recomputed")), 7.);
        assert!(ctx.memoize_flag("f", |_, c| c.len() == 2));
        assert!(ctx.memoize_flag("f", |_, _| false));

        // a different candidate has its own entries
        ctx.bind(CandidateAssignment::new(vec![labels[1]]));
        assert!(!ctx.memoize_flag("f", |_, c| c.len() == 2));
    }

    #[test]
    fn test_flag_and_value_share_name() {
        let ids = IdPredicateSet::<u32>::new();
        let mut ctx = EventContext::new(&7, &ids);
        ctx.bind(CandidateAssignment::new(enumerate("e")));
        assert_eq!(ctx.memoize("pass", |ev, _| *ev as f64), 7.);
        assert!(!ctx.memoize_flag("pass", |_, _| false));
        assert_eq!(ctx.memoize("pass", |_, _| panic!("recomputed")), 7.);
        assert!(!ctx.memoize_flag("pass", |_, _| panic!("recomputed")));
    }

    #[test]
    fn test_ranking_key_reset_on_bind() {
        let ids = IdPredicateSet::<()>::new();
        let mut ctx = EventContext::new(&(), &ids);
        let labels = enumerate("mm");
        ctx.bind(CandidateAssignment::new(labels.clone()));
        assert!(ctx.ranking_key().is_none());
        ctx.set_ranking_key(RankingKey::empty());
        assert_eq!(ctx.ranking_key(), Some(&RankingKey::empty()));
        ctx.bind(CandidateAssignment::new(vec![labels[0]]));
        assert!(ctx.ranking_key().is_none());
    }
}
