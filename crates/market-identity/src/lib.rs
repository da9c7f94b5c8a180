//! # market-identity
//!
//! User records and sign-in upsert for market-rs.
//!
//! Magic-link issuance and verification belong to the external identity
//! provider; this crate owns what happens after verification — the
//! idempotent upsert of a user record keyed by normalized email.

mod error;
mod signin;
mod user;

pub use error::{IdentityError, Result};
pub use signin::{normalize_email, upsert_user, SignInOutcome, VerifiedSignIn};
pub use user::{MemoryUserStore, NewUser, UserRecord, UserStore};
