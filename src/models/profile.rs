use serde::{Deserialize, Serialize};

/// User profile decoded from the identity provider's credential.
///
/// Created on successful sign-in, held for the lifetime of the session,
/// and discarded on logout. The orchestrator is its only owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Subject id (the `sub` claim).
    pub subject: String,
    pub name: Option<String>,
    pub email: Option<String>,
}
