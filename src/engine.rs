use std::cmp::max;

use log::{debug, info, trace};

use crate::{
    config::AnalysisSettings,
    context::{EventContext, IdHandle, IdPredicateSet},
    cut::{CutFlow, CutList},
    dedup::{EventDeduplicator, FlushSummary, Sink},
    definition::{CandidateAssignment, ObjectDefinition},
    error::Result,
    event::EventIdentity,
    fields::{FieldRef, FieldTable, PairRef},
    label::{self, ObjectLabel},
    rank::{Lexicographic, Ranker, RankingKey},
    store::{EventRecord, Field, PairField},
};

type KeyBuilder<E> = Box<dyn Fn(&mut EventContext<'_, E>) -> Option<RankingKey>>;

/// Turns a selected candidate into an output row
pub trait RowProjector<E> {
    type Row;

    fn project(
        &mut self,
        id: EventIdentity,
        candidate: &CandidateAssignment,
        auxiliary: &[CandidateAssignment],
        ctx: &mut EventContext<'_, E>,
    ) -> Self::Row;
}

impl<E, R, F> RowProjector<E> for F
where
    F: FnMut(
        EventIdentity,
        &CandidateAssignment,
        &[CandidateAssignment],
        &mut EventContext<'_, E>,
    ) -> R,
{
    type Row = R;

    fn project(
        &mut self,
        id: EventIdentity,
        candidate: &CandidateAssignment,
        auxiliary: &[CandidateAssignment],
        ctx: &mut EventContext<'_, E>,
    ) -> Self::Row {
        self(id, candidate, auxiliary, ctx)
    }
}

/// Everything that distinguishes one analysis from another
///
/// Construct with an [AnalysisBuilder].
pub struct Analysis<E> {
    name: String,
    categories: Vec<String>,
    definition: ObjectDefinition,
    auxiliary: Vec<ObjectDefinition>,
    preselection: CutList<E>,
    selection: CutList<E>,
    ranking: Option<KeyBuilder<E>>,
    ranker: Box<dyn Ranker>,
    ids: IdPredicateSet<E>,
}

impl<E> Analysis<E> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &ObjectDefinition {
        &self.definition
    }

    pub fn preselection(&self) -> &CutList<E> {
        &self.preselection
    }

    pub fn selection(&self) -> &CutList<E> {
        &self.selection
    }

    // `None` vetoes the candidate
    fn ranking_key(&self, ctx: &mut EventContext<'_, E>) -> Option<RankingKey> {
        match &self.ranking {
            Some(ranking) => ranking(ctx),
            None => Some(RankingKey::empty()),
        }
    }

    /// Whether events in `category` are processed
    pub fn accepts_category(&self, category: &str) -> bool {
        self.categories.is_empty() || self.categories.iter().any(|c| c == category)
    }

    // all assignments of the auxiliary definitions to objects not in `candidate`
    fn auxiliary_assignments(
        &self,
        labels: &[ObjectLabel],
        candidate: &CandidateAssignment,
    ) -> Vec<CandidateAssignment> {
        if self.auxiliary.is_empty() {
            return Vec::new();
        }
        let unused: Vec<_> = labels
            .iter()
            .copied()
            .filter(|l| !candidate.contains(l))
            .collect();
        self.auxiliary
            .iter()
            .flat_map(|def| def.candidates(&unused).collect::<Vec<_>>())
            .collect()
    }
}

/// Configure an [Analysis]
pub struct AnalysisBuilder<E> {
    name: String,
    categories: Vec<String>,
    definition: ObjectDefinition,
    auxiliary: Vec<ObjectDefinition>,
    fields: FieldTable<E>,
    preselection: CutList<E>,
    selection: CutList<E>,
    ranking: Option<KeyBuilder<E>>,
    ranker: Option<Box<dyn Ranker>>,
    ids: IdPredicateSet<E>,
}

impl<E: EventRecord> AnalysisBuilder<E> {
    pub fn new(name: impl Into<String>, definition: ObjectDefinition) -> Self {
        Self {
            name: name.into(),
            categories: Vec::new(),
            fields: FieldTable::new(definition.clone()),
            definition,
            auxiliary: Vec::new(),
            preselection: CutList::new("preselection"),
            selection: CutList::new("selection"),
            ranking: None,
            ranker: None,
            ids: IdPredicateSet::new(),
        }
    }

    /// Start from settings read from a configuration file
    ///
    /// Fails if the event store cannot provide one of the required
    /// fields.
    pub fn from_settings(settings: &AnalysisSettings) -> Result<Self> {
        let mut builder = Self::new(&settings.name, settings.definition.clone());
        for (role, field) in &settings.required_fields {
            builder.field(*role, *field)?;
        }
        builder
            .categories(settings.categories.clone())
            .ranker(Lexicographic::new().with_empty_key_policy(settings.empty_key_policy));
        for aux in &settings.auxiliary {
            builder.auxiliary(aux.clone());
        }
        Ok(builder)
    }

    /// Restrict processing to the given categories
    pub fn categories(&mut self, categories: Vec<String>) -> &mut Self {
        self.categories = categories;
        self
    }

    pub fn auxiliary(&mut self, definition: ObjectDefinition) -> &mut Self {
        self.auxiliary.push(definition);
        self
    }

    /// Register an object identification predicate
    pub fn id<F>(&mut self, name: impl Into<String>, predicate: F) -> IdHandle
    where
        F: Fn(&E, &ObjectLabel) -> bool + 'static,
    {
        self.ids.insert(name, predicate)
    }

    /// Look up a previously registered identification predicate
    pub fn id_handle(&self, name: &str) -> Result<IdHandle> {
        self.ids.handle(name)
    }

    /// Validated accessor for a quantity of the candidate
    pub fn field(&self, role: usize, field: Field) -> Result<FieldRef> {
        self.fields.resolve(role, field)
    }

    /// Validated accessor for a pair quantity of the candidate
    pub fn pair_field(&self, a: usize, b: usize, field: PairField) -> Result<PairRef> {
        self.fields.resolve_pair(a, b, field)
    }

    /// Loose cuts every candidate has to pass
    pub fn preselection(&mut self, cuts: CutList<E>) -> &mut Self {
        self.preselection = cuts;
        self
    }

    /// Tight cuts, their outcome is available to the row projector
    pub fn selection(&mut self, cuts: CutList<E>) -> &mut Self {
        self.selection = cuts;
        self
    }

    /// Function computing the ranking key of the current candidate
    ///
    /// Returning `None` vetoes the candidate. Without a ranking function
    /// every candidate gets an empty key.
    pub fn ranking<F>(&mut self, ranking: F) -> &mut Self
    where
        F: Fn(&mut EventContext<'_, E>) -> Option<RankingKey> + 'static,
    {
        self.ranking = Some(Box::new(ranking));
        self
    }

    /// How ranking keys are compared, lexicographically by default
    pub fn ranker(&mut self, ranker: impl Ranker + 'static) -> &mut Self {
        self.ranker = Some(Box::new(ranker));
        self
    }

    pub fn build(self) -> Analysis<E> {
        Analysis {
            name: self.name,
            categories: self.categories,
            definition: self.definition,
            auxiliary: self.auxiliary,
            preselection: self.preselection,
            selection: self.selection,
            ranking: self.ranking,
            ranker: self
                .ranker
                .unwrap_or_else(|| Box::new(Lexicographic::new())),
            ids: self.ids,
        }
    }
}

/// One input partition, e.g. one input file
///
/// Events are grouped by final-state category.
#[derive(Clone, Debug, Default)]
pub struct Partition<E> {
    name: String,
    categories: Vec<(String, Vec<E>)>,
}

impl<E> Partition<E> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            categories: Vec::new(),
        }
    }

    /// Add the events of one category
    pub fn with_category(mut self, category: impl Into<String>, events: Vec<E>) -> Self {
        self.categories.push((category.into(), events));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &[E])> {
        self.categories
            .iter()
            .map(|(c, events)| (c.as_str(), events.as_slice()))
    }
}

impl<E: EventRecord> Partition<E> {
    /// Group events by the category they report
    pub fn from_events(name: impl Into<String>, events: impl IntoIterator<Item = E>) -> Self {
        let mut partition = Self::new(name);
        for event in events {
            let pos = partition
                .categories
                .iter()
                .position(|(c, _)| c == event.category());
            match pos {
                Some(pos) => partition.categories[pos].1.push(event),
                None => partition
                    .categories
                    .push((event.category().to_owned(), vec![event])),
            }
        }
        partition
    }
}

/// Statistics of a run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub partitions: usize,
    /// Event rows processed, counting each category separately
    pub events: u64,
    /// Generated candidates
    pub candidates: u64,
    /// Candidates that passed the preselection and were ranked
    pub ranked: u64,
    /// Rows committed to the sink
    pub committed: usize,
    /// Events rejected because they had already been written
    pub duplicates: Vec<EventIdentity>,
}

/// Selects the best candidate of each event across all partitions
pub struct Engine<E, P: RowProjector<E>> {
    analysis: Analysis<E>,
    projector: P,
    dedup: EventDeduplicator<P::Row>,
    preselection_flow: CutFlow,
    selection_flow: CutFlow,
    summary: RunSummary,
}

impl<E: EventRecord, P: RowProjector<E>> Engine<E, P> {
    pub fn new(mut analysis: Analysis<E>, projector: P) -> Self {
        let ranker = std::mem::replace(&mut analysis.ranker, Box::new(Lexicographic::new()));
        Self {
            preselection_flow: CutFlow::new(&analysis.preselection),
            selection_flow: CutFlow::new(&analysis.selection),
            dedup: EventDeduplicator::with_boxed_ranker(ranker),
            analysis,
            projector,
            summary: RunSummary::default(),
        }
    }

    pub fn analysis(&self) -> &Analysis<E> {
        &self.analysis
    }

    pub fn preselection_flow(&self) -> &CutFlow {
        &self.preselection_flow
    }

    pub fn selection_flow(&self) -> &CutFlow {
        &self.selection_flow
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Process all partitions in order, committing after each of them
    pub fn run<I, S>(&mut self, partitions: I, sink: &mut S) -> Result<RunSummary>
    where
        I: IntoIterator<Item = Partition<E>>,
        S: Sink<P::Row>,
    {
        info!("Running analysis {}", self.analysis.name);
        for partition in partitions {
            self.process_partition(&partition, sink)?;
        }
        info!(
            "{}: {} events, {} rows written, {} duplicates",
            self.analysis.name,
            self.summary.events,
            self.summary.committed,
            self.summary.duplicates.len()
        );
        Ok(self.summary.clone())
    }

    /// Process one partition and commit its best candidates
    pub fn process_partition<S: Sink<P::Row>>(
        &mut self,
        partition: &Partition<E>,
        sink: &mut S,
    ) -> Result<FlushSummary> {
        debug!("Processing partition {}", partition.name);
        for (category, events) in partition.categories() {
            if !self.analysis.accepts_category(category) {
                debug!("Skipping category {category}");
                continue;
            }
            let labels = label::enumerate(category);
            for event in events {
                if let Err(err) = self.process_event(event, &labels) {
                    self.dedup.discard_partition();
                    return Err(err);
                }
            }
            debug!("{}: {} events in category {category}", partition.name, events.len());
        }
        let flush = self.dedup.flush_partition(sink)?;
        info!(
            "{}: committed {} events, {} duplicates",
            partition.name,
            flush.committed,
            flush.duplicates.len()
        );
        self.summary.partitions += 1;
        self.summary.committed += flush.committed;
        self.summary.duplicates.extend_from_slice(&flush.duplicates);
        Ok(flush)
    }

    fn process_event(&mut self, event: &E, labels: &[ObjectLabel]) -> Result<()> {
        let Self {
            analysis,
            projector,
            dedup,
            preselection_flow,
            selection_flow,
            summary,
        } = self;
        let id = event.identity();
        summary.events += 1;
        let mut ctx = EventContext::new(event, &analysis.ids);
        let mut preselected = 0;
        let mut selected = 0;
        let mut any_preselected = false;
        for candidate in analysis.definition.candidates(labels) {
            summary.candidates += 1;
            ctx.bind(candidate.clone());
            let state = analysis.preselection.sequence().evaluate(&mut ctx);
            preselected = max(preselected, state.progress(analysis.preselection.len()));
            if !state.passed() {
                continue;
            }
            any_preselected = true;
            let state = analysis.selection.sequence().evaluate(&mut ctx);
            selected = max(selected, state.progress(analysis.selection.len()));
            ctx.set_selection(state);
            let Some(key) = analysis.ranking_key(&mut ctx) else {
                trace!("Event {id}: candidate {candidate} vetoed");
                continue;
            };
            summary.ranked += 1;
            ctx.set_ranking_key(key.clone());
            let auxiliary = analysis.auxiliary_assignments(labels, &candidate);
            let row = projector.project(id, &candidate, &auxiliary, &mut ctx);
            dedup.consider(id, key, candidate, row)?;
        }
        preselection_flow.record(preselected);
        if any_preselected {
            selection_flow.record(selected);
        }
        Ok(())
    }
}
