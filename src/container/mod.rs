pub mod manager;
pub mod exec;

pub use manager::{ContainerManager, ContainerStatus};
