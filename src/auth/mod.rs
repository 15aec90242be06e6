//! Authentication and identity module.
//!
//! - **Tokens**: HS256 JWTs carrying the user id as `sub`, with expiry checked
//!   against an injectable clock
//! - **Passwords**: Argon2 PHC hashes, verified in constant time
//! - **Guard**: resolves an `Authorization: Bearer` header to a [`Principal`]
//!
//! ## Security Model
//!
//! - Authentication failures are coarse on purpose (see [`AuthError`])
//! - Password hashes never leave [`UserStore`]
//! - A principal carries no project roles; authorization reloads them on
//!   every request
//!
//! ## Usage
//!
//! ```ignore
//! let auth = Authenticator::new(AuthConfig::default(), db);
//! let token = auth.login("alice@example.com", "secret").await?;
//! let principal = auth
//!     .authenticate(Some(&format!("Bearer {}", token.access_token)))
//!     .await?;
//! ```

mod context;
mod extractor;
mod password;
pub mod token;
mod user_store;

pub use context::Principal;
pub use extractor::{AuthConfig, AuthError, Authenticator, DEV_SECRET_KEY};
pub use password::PasswordHasher;
pub use token::{Clock, FixedClock, SystemClock, TokenError, TokenService};
pub use user_store::{Credentials, NewUser, UserStore};
