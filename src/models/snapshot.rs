use serde::{Deserialize, Serialize};

/// An ephemeral read of one currently visible notification. Snapshots are
/// never persisted; they exist only as summarizer input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSnapshot {
    pub package_name: String,
    pub channel: String,
    pub priority: i32,
    pub title: String,
    pub body: String,
    pub sub_text: String,
}
