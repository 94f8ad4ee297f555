//! Content entities delivered between nodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A top-level post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
  pub guid:       String,
  /// Handle of the authoring person.
  pub author:     String,
  pub message:    String,
  pub public:     bool,
  pub created_at: DateTime<Utc>,
}

/// A reply attached to a [`StatusMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
  pub guid:       String,
  pub author:     String,
  /// Guid of the parent status message.
  pub post_guid:  String,
  pub text:       String,
  /// Older nodes omit the timestamp.
  pub created_at: Option<DateTime<Utc>>,
}
