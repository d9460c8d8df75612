pub mod container;
pub mod controller;
pub mod router;

pub use container::{BackendOptions, Container, ContainerConfig};
pub use router::Router;
