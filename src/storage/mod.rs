pub mod collection;

pub use collection::OutputCollection;
