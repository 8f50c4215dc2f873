pub mod memory;
pub mod scheduler;
pub mod store;
pub mod token;
