//! Model loaders and storage backends for Catwalk.
//!
//! This crate provides concrete implementations of the `ModelLoader` and
//! `Storage` traits.
//!
//! # Supported Formats
//!
//! - **Mock**: In-memory models for testing and development
//! - **Raw**: Opaque artifact bytes, footprint is the file size
//! - **Linear**: JSON-encoded linear model (`weights` + `bias`)

pub mod factory;
pub mod linear;
pub mod mock;
pub mod raw;
pub mod storage;

pub use factory::{LoaderFactory, ModelFormat};
pub use linear::{LinearLoader, LinearModel};
pub use mock::{MockLoader, MockModel};
pub use raw::{RawLoader, RawModel};
pub use storage::FileSystemStorage;
