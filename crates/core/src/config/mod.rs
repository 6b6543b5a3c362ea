//! Configuration loading and schema definitions

mod loader;
mod schema;

pub use loader::{find_config_file, Config};
pub use schema::*;
