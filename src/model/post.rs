use chrono::{DateTime, Utc};

use super::user;

pub type Id = u64;

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Post {
    #[serde(skip_serializing_if = "is_zero")]
    pub id: Id,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub body: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub user_id: user::Id,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn is_zero(id: &u64) -> bool {
    *id == 0
}
