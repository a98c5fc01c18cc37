use std::convert::Infallible;

use ahash::{AHashMap, AHashSet};
use log::{debug, warn};

use crate::{
    definition::CandidateAssignment,
    error::{Error, Result},
    event::EventIdentity,
    rank::{Ranker, RankingKey},
};

/// Receives finished output rows
pub trait Sink<R> {
    type Error: std::error::Error + Send + Sync + 'static;

    fn commit(&mut self, row: R) -> std::result::Result<(), Self::Error>;
}

impl<R> Sink<R> for Vec<R> {
    type Error = Infallible;

    fn commit(&mut self, row: R) -> std::result::Result<(), Self::Error> {
        self.push(row);
        Ok(())
    }
}

/// Best candidate seen so far for one event
#[derive(Clone, Debug, PartialEq)]
pub struct BestCandidate<R> {
    pub key: RankingKey,
    pub assignment: CandidateAssignment,
    pub row: R,
}

/// Outcome of committing one partition
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlushSummary {
    /// Number of rows handed to the sink
    pub committed: usize,
    /// Events that had already been written in an earlier partition
    pub duplicates: Vec<EventIdentity>,
}

/// Keeps the best candidate per event and writes each event at most once
///
/// Candidates are collected per input partition. When a partition is
/// flushed, the best candidate of each event is committed, unless the
/// event was already written while flushing an earlier partition. The
/// set of written events is kept for the whole run.
pub struct EventDeduplicator<R> {
    ranker: Box<dyn Ranker>,
    best: AHashMap<EventIdentity, BestCandidate<R>>,
    pending: Vec<EventIdentity>,
    written: AHashSet<EventIdentity>,
}

impl<R> EventDeduplicator<R> {
    pub fn new(ranker: impl Ranker + 'static) -> Self {
        Self::with_boxed_ranker(Box::new(ranker))
    }

    pub fn with_boxed_ranker(ranker: Box<dyn Ranker>) -> Self {
        Self {
            ranker,
            best: AHashMap::new(),
            pending: Vec::new(),
            written: AHashSet::new(),
        }
    }

    /// Offer a candidate for event `id`
    ///
    /// The candidate replaces the currently best one if there is none
    /// or if the ranker prefers it. Returns whether it was accepted.
    pub fn consider(
        &mut self,
        id: EventIdentity,
        key: RankingKey,
        assignment: CandidateAssignment,
        row: R,
    ) -> Result<bool> {
        let current = self.best.get(&id);
        let better = self
            .ranker
            .better(current.map(|c| &c.key), &key)
            .map_err(|err| Error::MalformedRankingKey {
                id,
                current: err.current,
                candidate: err.candidate,
            })?;
        if !better {
            return Ok(false);
        }
        debug!("Event {id}: new best candidate {assignment} with key {key}");
        let old = self.best.insert(
            id,
            BestCandidate {
                key,
                assignment,
                row,
            },
        );
        if old.is_none() {
            self.pending.push(id);
        }
        Ok(true)
    }

    /// Best candidate for `id` in the current partition
    pub fn best(&self, id: &EventIdentity) -> Option<&BestCandidate<R>> {
        self.best.get(id)
    }

    /// Number of events waiting to be written
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Whether event `id` has been committed to the sink
    pub fn is_written(&self, id: &EventIdentity) -> bool {
        self.written.contains(id)
    }

    /// Number of events committed so far
    pub fn written(&self) -> usize {
        self.written.len()
    }

    /// Commit the best candidates of the current partition
    ///
    /// Rows are committed in the order in which their events were first
    /// seen. An event that was already written is reported as a
    /// duplicate and its new row is dropped.
    ///
    /// If the sink fails, the failing event is not marked as written and
    /// the remaining candidates of the partition are discarded.
    pub fn flush_partition<S: Sink<R>>(&mut self, sink: &mut S) -> Result<FlushSummary> {
        let mut summary = FlushSummary::default();
        for id in std::mem::take(&mut self.pending) {
            let Some(best) = self.best.remove(&id) else {
                continue;
            };
            if self.written.contains(&id) {
                warn!(
                    "Event {id} was already written for an earlier partition, dropping candidate {}",
                    best.assignment
                );
                summary.duplicates.push(id);
                continue;
            }
            if let Err(err) = sink.commit(best.row) {
                self.discard_partition();
                return Err(Error::Sink(Box::new(err)));
            }
            self.written.insert(id);
            summary.committed += 1;
        }
        self.best.clear();
        Ok(summary)
    }

    /// Drop all candidates of the current partition without writing them
    pub fn discard_partition(&mut self) {
        if !self.pending.is_empty() {
            debug!("Discarding {} pending events", self.pending.len());
        }
        self.best.clear();
        self.pending.clear();
    }
}
