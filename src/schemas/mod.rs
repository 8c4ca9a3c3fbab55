mod job;
mod project;
mod refs;

pub use job::{Job, JobPipeline};
pub use project::{Project, ProjectParameters, DEFAULT_REFS_REGEXP};
pub use refs::{ProjectRef, ProjectRefKey, ProjectRefKind, ProjectsRefs, MERGE_REQUEST_REF_PREFIX};
