//! Map exploration core: manual selection, the detail panel, and the guided
//! tour, driven over abstract map and page collaborators.

pub mod config;
pub mod controller;
pub mod explorer;
pub mod focus;
pub mod panel;
pub mod surface;
pub mod tour;

#[cfg(test)]
pub(crate) mod testing;

pub use config::*;
pub use explorer::*;
pub use focus::*;
pub use panel::*;
pub use surface::*;
pub use tour::*;
