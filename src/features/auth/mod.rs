//! Bearer-token authentication against the identity provider's JWKS and the
//! role guard protecting catalog administration.

mod jwks;
mod validator;

pub mod guards;
pub mod model;

pub use jwks::JwksClient;
pub use validator::JwtValidator;
