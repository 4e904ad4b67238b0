//! Headless editing layer for layermap boards.
//!
//! Any shell (CLI, desktop, web bridge) drives a board through an [`InteractionController`]
//! and may subscribe to its [`layermap_events::EventBus`].

mod controller;
mod error;
mod filter;
mod job;
pub mod settings;

pub use controller::{ConnectPolicy, Deleted, InteractionController, LayoutSummary, Selection};
pub use error::ControllerError;
pub use filter::NodeFilter;
pub use job::{LayoutJob, LayoutOutcome};
pub use settings::BoardSettings;
