pub mod caller;
pub mod jwks;
pub mod jwt;
pub mod middleware;

pub use caller::Caller;
