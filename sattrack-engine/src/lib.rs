pub mod bus;
pub mod config;
pub mod error;
pub mod gate;
pub mod logging;
pub mod orchestrator;
pub mod sat;
pub mod scheduler;
pub mod session;
pub mod sky;
pub mod view;

pub use bus::{Event, EventBus};
pub use error::{Result, TrackerError};
pub use orchestrator::{Collaborators, Orchestrator};
