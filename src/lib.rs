//! Candidate assembly, ranking and deduplication for final-state objects
//!
//! For each event, all assignments of reconstructed objects to the roles
//! of an [definition::ObjectDefinition] are generated. Each candidate
//! runs through a preselection and a selection [cut::CutList], the
//! survivors are ranked, and the best candidate of each event is written
//! exactly once, even if the event appears in several input partitions.
pub mod config;
pub mod context;
pub mod cut;
pub mod dedup;
pub mod definition;
pub mod engine;
pub mod error;
pub mod event;
pub mod fields;
pub mod label;
pub mod rank;
pub mod store;
mod util;

pub mod prelude {
    pub use crate::config::AnalysisSettings;
    pub use crate::context::{EventContext, IdHandle};
    pub use crate::cut::{CutFlow, CutList, CutState};
    pub use crate::dedup::{EventDeduplicator, FlushSummary, Sink};
    pub use crate::definition::{CandidateAssignment, ObjectDefinition, Role};
    pub use crate::engine::{
        Analysis, AnalysisBuilder, Engine, Partition, RowProjector, RunSummary,
    };
    pub use crate::error::{Error, Result};
    pub use crate::event::{EventBuilder, EventIdentity, FinalStateEvent};
    pub use crate::label::{ObjectKind, ObjectLabel};
    pub use crate::rank::{EmptyKeyPolicy, Lexicographic, Ranker, RankingKey};
    pub use crate::store::{EventRecord, Field, KinematicStore, PairField};
}
