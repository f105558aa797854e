pub mod calendar;
pub mod commands;
pub mod dates;
pub mod events;
pub mod filters;
pub mod gesture;
pub mod logging;
pub mod models;
pub mod repository;
pub mod selection;
pub mod state;
pub mod storage;
#[cfg(all(feature = "app", not(test)))]
mod cli;

#[cfg(all(feature = "app", not(test)))]
pub use crate::cli::run;
