//! Login sessions
//!
//! The bearer token and the anti-forgery token are handed to the client once;
//! only their SHA-256 digests are stored.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub csrf_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn start(user_id: Uuid, token_hash: String, csrf_hash: String, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            token_hash,
            csrf_hash,
            created_at: now,
            last_activity: now,
            expires_at: now + ttl,
            ended_at: None,
        }
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.ended_at.is_none() && now < self.expires_at
    }

    pub fn ended(&self) -> Self {
        Self {
            ended_at: Some(Utc::now()),
            ..self.clone()
        }
    }
}
