pub mod context;
pub mod csp;
pub mod endpoint;
pub mod engine;
pub mod finalizer;
pub mod initializer;
pub mod markup;
pub mod setup;
pub mod version;

pub use crate::domain::model::{Environment, Platform};
pub use crate::domain::ports::{BuildTask, Storage};
pub use crate::utils::error::Result;
