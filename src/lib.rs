pub mod bootstrap;
pub mod common;
pub mod processors;
pub mod propagate;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod sweep;
pub mod tasks;
pub mod workers;
