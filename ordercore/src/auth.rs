//! The verified-identity contract.
//!
//! Credential issuance and signature mechanics belong to an external
//! authentication collaborator. This crate consumes only the result of
//! verification: an [`Identity`] with a role flag, used to gate admin
//! catalog writes and to stamp audit metadata on orders. The checkout
//! transaction itself works for anonymous callers.

use crate::errors::AuthError;
use crate::types::{CustomerEmail, UserId};
use serde::{Deserialize, Serialize};

/// A verified identity produced by credential verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The verified user identifier.
    pub user_id: UserId,
    /// The verified email, when the credential carries one.
    pub email: Option<CustomerEmail>,
    /// Whether this identity may perform admin catalog writes.
    pub is_admin: bool,
}

impl Identity {
    /// A non-admin identity.
    pub const fn customer(user_id: UserId, email: Option<CustomerEmail>) -> Self {
        Self {
            user_id,
            email,
            is_admin: false,
        }
    }

    /// An admin identity.
    pub const fn admin(user_id: UserId, email: Option<CustomerEmail>) -> Self {
        Self {
            user_id,
            email,
            is_admin: true,
        }
    }
}

/// Verifies an opaque signed credential into an [`Identity`].
///
/// Implemented by the authentication collaborator (e.g. over signed bearer
/// tokens); never by this crate. Verification is local computation, so the
/// contract is synchronous.
pub trait CredentialVerifier: Send + Sync {
    /// Verify a presented credential.
    fn verify(&self, credential: &str) -> Result<Identity, AuthError>;
}
