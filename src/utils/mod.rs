pub mod endpoint;
pub use endpoint::{EndpointError, join_endpoint, validate_endpoint};
