//! Views and the exclusive-activation registry

mod registry;
mod renderer;

pub use registry::{ViewDescriptor, ViewRegistry};
pub use renderer::{Renderer, TracingRenderer};
