//! taskcoach-core: task orchestration, structured-output extraction,
//! quiz grading and mastery tracking.
//!
//! The pipeline is driven by [`orchestrator::Orchestrator`]; generation
//! backends plug in through [`traits::LlmProvider`] and persistence through
//! [`traits::DurableStore`].

pub mod error;
pub mod extract;
pub mod generation;
pub mod grader;
pub mod help;
pub mod mastery;
pub mod model;
pub mod normalizer;
pub mod orchestrator;
pub mod quiz;
pub mod recommend;
pub mod store;
pub mod traits;
pub mod verify;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{ExtractError, GenerationError, StoreError};
pub use generation::{GenerationSettings, Generator};
pub use mastery::MasteryTracker;
pub use orchestrator::{Orchestrator, ProcessOutcome, SubmitOutcome};
