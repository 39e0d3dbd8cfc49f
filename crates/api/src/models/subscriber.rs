//! Newsletter subscriber domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;

use threadline_core::{Email, SubscriberId};

/// A newsletter subscription.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    /// Unique subscriber ID.
    pub id: SubscriberId,
    /// Subscribed email address (unique).
    pub email: Email,
    /// When the subscription was created.
    pub subscribed_at: DateTime<Utc>,
}
