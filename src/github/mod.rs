pub mod platform;
pub mod cli;
pub mod paginator;
#[cfg(test)]
pub mod mock;

pub use platform::{HostingPlatform, SearchFilter};
pub use cli::GhCli;
