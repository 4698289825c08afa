pub mod collab;
pub mod config;
pub mod controller;
pub mod error;
pub mod executor;
pub mod io;
pub mod paths;
pub mod process;
pub mod project;
pub mod stages;
pub mod state;
pub mod status;
pub mod step;
pub mod store;
pub mod types;

pub use controller::Controller;
pub use error::{CoverError, Result};
