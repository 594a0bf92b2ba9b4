//! Bearer-token session verification.

mod session;

pub use session::{bearer_token, AuthError, AuthUser, SessionVerifier};
