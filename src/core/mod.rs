pub mod eligibility;
pub mod etl;
pub mod extractor;
pub mod imex_assigner;
pub mod imex_central;
pub mod miscore;
pub mod spoke;

pub use crate::domain::ports::{InteractionStore, MiScoreCalculator, Pipeline, PublicationRegistry, Storage};
pub use crate::utils::error::Result;
