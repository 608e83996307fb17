pub mod pipeline;
pub mod batch;
pub mod report;

pub use pipeline::{Classifier, ClassifyOutcome};
pub use batch::{run_batch, BatchReport, ProcessRunner, RepositoryRunner, RunStatus};
pub use report::{build_report, write_csv, CollectionReport};
