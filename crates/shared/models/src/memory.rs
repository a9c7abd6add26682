use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agentcore_identifiers::{ConversationId, MemorySummaryId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySummary {
    pub id: MemorySummaryId,
    pub user_id: UserId,
    pub conversation_id: Option<ConversationId>,
    pub summary: String,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// A memory ranked by a similarity search, carrying its cosine distance so
/// the relevance-threshold gate (§4.4 step 4) stays with the result.
#[derive(Debug, Clone)]
pub struct RankedMemory {
    pub memory: MemorySummary,
    pub distance: f32,
}
