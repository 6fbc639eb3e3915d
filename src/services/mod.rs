pub mod discovery;
pub mod geo;
pub mod geocode;
pub mod grounded;
pub mod knowledge;
pub mod postprocess;
pub mod providers;
pub mod schema;
pub mod websearch;

pub use discovery::DiscoveryService;
