pub mod guest_provider;
pub mod headers;
