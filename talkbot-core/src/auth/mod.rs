pub mod authenticator;
pub mod credentials;
pub mod middleware;
pub mod types;


pub use authenticator::{extract_bearer_token, Authenticator};
pub use credentials::{CredentialError, CredentialSet};
pub use middleware::AuthMiddleware;
pub use types::*;
