pub mod v1;

pub use v1::api_routes;
