use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimal captain projection: the captain record and the user account that
/// receives their notifications.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaptainRef {
    pub id: Uuid,
    pub user_id: Uuid,
}

/// Read-only captain lookups consumed from the directory subsystem.
#[async_trait]
pub trait CaptainDirectory: Send + Sync {
    /// The captain profile owned by a user account, if one exists.
    async fn captain_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<CaptainRef>, Box<dyn std::error::Error + Send + Sync>>;
}
