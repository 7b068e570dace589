//! Bearer-token authentication: token capability, per-request middleware,
//! and the authorization entry point.

pub mod extract;
pub mod middleware;
pub mod token;

pub use extract::CurrentPrincipal;
pub use middleware::AuthenticationLayer;
pub use token::{bearer_token, Claims, TokenConfig, TokenError, TokenService};
