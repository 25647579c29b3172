pub mod active_set;
pub mod batch;
pub mod registry;
pub mod staged;

pub use active_set::ActiveSet;
pub use batch::{Batch, BatchRegistration, Cooperative};
pub use registry::{CollateralBook, CollateralRegistry};
pub use staged::{Milestone, StagedProject, StagedProjectParams};
