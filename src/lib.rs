pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::storage::LocalStorage;
pub use config::BuildConfig;
pub use core::{
    context::BuildContext, finalizer::Finalizer, initializer::Initializer, setup::Setup,
};
pub use domain::model::{Environment, Platform};
pub use utils::error::{BuildError, Result};
