//! Storage backends that supply artifact bytes to loaders.

mod filesystem;

pub use filesystem::FileSystemStorage;
