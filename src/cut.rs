use std::fmt::{self, Display};

use log::trace;

use crate::context::EventContext;

type Predicate<E> = Box<dyn Fn(&mut EventContext<'_, E>) -> bool>;

/// A named selection predicate
pub struct Cut<E> {
    label: String,
    predicate: Predicate<E>,
}

impl<E> Cut<E> {
    pub fn new<F>(label: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&mut EventContext<'_, E>) -> bool + 'static,
    {
        Self {
            label: label.into(),
            predicate: Box::new(predicate),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl<E> fmt::Debug for Cut<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cut").field("label", &self.label).finish()
    }
}

/// Ordered list of cuts, as configured by an analysis
pub struct CutList<E> {
    name: String,
    cuts: Vec<Cut<E>>,
}

impl<E> CutList<E> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cuts: Vec::new(),
        }
    }

    /// Append a cut
    pub fn cut<F>(mut self, label: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&mut EventContext<'_, E>) -> bool + 'static,
    {
        self.push(Cut::new(label, predicate));
        self
    }

    pub fn push(&mut self, cut: Cut<E>) {
        self.cuts.push(cut)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.cuts.iter().map(|c| c.label())
    }

    /// A fresh, unevaluated sequence of these cuts
    pub fn sequence(&self) -> CutSequence<'_, E> {
        CutSequence::new(&self.name, &self.cuts)
    }
}

/// Progress of a [CutSequence]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CutState {
    Unevaluated,
    /// The cut with this index is being evaluated
    Running(usize),
    /// All cuts passed
    Passed,
    /// The cut with this index failed, later cuts were not evaluated
    FailedAt(usize),
}

impl CutState {
    pub fn passed(&self) -> bool {
        *self == Self::Passed
    }

    /// Number of cuts passed out of `ncuts`
    pub fn progress(&self, ncuts: usize) -> usize {
        match self {
            Self::Passed => ncuts,
            Self::FailedAt(n) | Self::Running(n) => *n,
            Self::Unevaluated => 0,
        }
    }
}

/// One evaluation of a list of cuts for one candidate
///
/// Cuts are evaluated in order until the first one fails. Later cuts
/// can rely on all earlier ones having passed. A sequence can only be
/// evaluated once.
pub struct CutSequence<'a, E> {
    name: &'a str,
    cuts: &'a [Cut<E>],
    state: CutState,
}

impl<'a, E> CutSequence<'a, E> {
    pub fn new(name: &'a str, cuts: &'a [Cut<E>]) -> Self {
        Self {
            name,
            cuts,
            state: CutState::Unevaluated,
        }
    }

    pub fn state(&self) -> CutState {
        self.state
    }

    pub fn evaluate(mut self, ctx: &mut EventContext<'_, E>) -> CutState {
        debug_assert_eq!(self.state, CutState::Unevaluated);
        for (n, cut) in self.cuts.iter().enumerate() {
            self.state = CutState::Running(n);
            trace!("{}: evaluating cut {n} ({})", self.name, cut.label);
            if !(cut.predicate)(&mut *ctx) {
                trace!("{}: {} failed for {}", self.name, cut.label, ctx.candidate());
                self.state = CutState::FailedAt(n);
                return self.state;
            }
        }
        self.state = CutState::Passed;
        self.state
    }
}

/// Number of events surviving each cut of a [CutList]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CutFlow {
    labels: Vec<String>,
    counts: Vec<u64>,
    total: u64,
}

impl CutFlow {
    pub fn new<E>(cuts: &CutList<E>) -> Self {
        let labels: Vec<_> = cuts.labels().map(|l| l.to_owned()).collect();
        Self {
            counts: vec![0; labels.len()],
            labels,
            total: 0,
        }
    }

    /// Record an event that passed the first `npassed` cuts
    pub fn record(&mut self, npassed: usize) {
        self.total += 1;
        for count in self.counts.iter_mut().take(npassed) {
            *count += 1;
        }
    }

    /// Number of recorded events
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of recorded events that passed all cuts
    pub fn passed(&self) -> u64 {
        self.counts.last().copied().unwrap_or(self.total)
    }

    /// Number of events passing the cut with index `n`
    pub fn count(&self, n: usize) -> Option<u64> {
        self.counts.get(n).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.labels
            .iter()
            .map(|l| l.as_str())
            .zip(self.counts.iter().copied())
    }
}

impl Display for CutFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<24} {}", "total", self.total)?;
        for (label, count) in self.iter() {
            writeln!(f, "{label:<24} {count}")?;
        }
        Ok(())
    }
}
