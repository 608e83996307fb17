pub mod repository;
pub mod classification;
pub mod search;

pub use repository::*;
pub use classification::*;
pub use search::*;
