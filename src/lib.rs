pub mod config;
pub mod error;
pub mod models;
pub mod process;
pub mod github;
pub mod llm;
pub mod packer;
pub mod storage;
pub mod discovery;
pub mod analysis;

pub use config::{ClassifierConfig, Config, ErrorJsonPolicy, SearchConfig};
pub use error::{Error, Result};
pub use github::{GhCli, HostingPlatform};
pub use llm::{LanguageModel, LlmCli};
pub use packer::{Packer, Repomix};
pub use analysis::{Classifier, ClassifyOutcome};
pub use storage::OutputCollection;
