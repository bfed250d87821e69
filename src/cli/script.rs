//! Script format
//!
//! ```json
//! {
//!   "steps": [
//!     { "step": "batch", "header": { "timestamp": { "wall_time": 10 } },
//!       "requests": [ { "op": "put", "key": "a", "value": "v1" } ] },
//!     { "step": "resolve", "key": "a", "txn_id": "<uuid>",
//!       "commit_timestamp": { "wall_time": 12 } }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::batcheval::BatchRequest;
use crate::kv::{Key, Timestamp, TxnId};
use crate::mvcc::IntentStatus;

/// A sequence of steps evaluated against one range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Evaluate and apply a batch
    Batch(BatchRequest),
    /// Resolve one intent
    Resolve(ResolveStep),
}

/// Resolution of a transaction's intent on one key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveStep {
    pub key: Key,
    pub txn_id: TxnId,
    /// Commit timestamp; absent aborts the intent
    #[serde(default)]
    pub commit_timestamp: Option<Timestamp>,
}

impl ResolveStep {
    pub fn status(&self) -> IntentStatus {
        match self.commit_timestamp {
            Some(timestamp) => IntentStatus::Committed { timestamp },
            None => IntentStatus::Aborted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batcheval::Request;

    #[test]
    fn test_parse_script() {
        let json = r#"{
            "steps": [
                { "step": "batch", "header": { "timestamp": { "wall_time": 10 } },
                  "requests": [ { "op": "put", "key": "a", "value": "v1" } ] },
                { "step": "resolve", "key": "a",
                  "txn_id": "67e55044-10b1-426f-9247-bb680e5fe0c8" }
            ]
        }"#;
        let script: Script = serde_json::from_str(json).unwrap();
        assert_eq!(script.steps.len(), 2);

        match &script.steps[0] {
            Step::Batch(batch) => {
                assert_eq!(batch.header.timestamp, Timestamp::from_wall(10));
                assert!(matches!(batch.requests[0], Request::Put(_)));
            }
            other => panic!("unexpected step: {:?}", other),
        }
        match &script.steps[1] {
            Step::Resolve(resolve) => assert_eq!(resolve.status(), IntentStatus::Aborted),
            other => panic!("unexpected step: {:?}", other),
        }
    }
}
