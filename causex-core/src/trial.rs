use serde::{Deserialize, Serialize};
use std::fmt;

use crate::stimulus::ObjectId;

/// How the two objects meet
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionType {
    Overtaking,
    FakeCausal,
    TrueCausal,
}

impl CollisionType {
    pub const ALL: [CollisionType; 3] = [
        CollisionType::Overtaking,
        CollisionType::FakeCausal,
        CollisionType::TrueCausal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollisionType::Overtaking => "overtaking",
            CollisionType::FakeCausal => "fake_causal",
            CollisionType::TrueCausal => "true_causal",
        }
    }

    /// Which object carries the targets; fixed by the collision type
    pub fn which_changes(&self) -> WhichChanges {
        match self {
            CollisionType::Overtaking => WhichChanges::O1Twice,
            CollisionType::FakeCausal | CollisionType::TrueCausal => WhichChanges::O1ThenO2,
        }
    }
}

impl fmt::Display for CollisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhichChanges {
    O1Twice,
    O1ThenO2,
}

impl WhichChanges {
    pub fn as_str(&self) -> &'static str {
        match self {
            WhichChanges::O1Twice => "o1_twice",
            WhichChanges::O1ThenO2 => "o1_then_o2",
        }
    }

    /// Object showing the second target
    pub fn t2_object(&self) -> ObjectId {
        match self {
            WhichChanges::O1Twice => ObjectId::O1,
            WhichChanges::O1ThenO2 => ObjectId::O2,
        }
    }
}

impl fmt::Display for WhichChanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One trial's experimental condition.
///
/// Built once when a trial list is generated and never changed afterwards;
/// fields are only reachable through accessors.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrialCondition {
    collision_type: CollisionType,
    lag_ms: u32,
    which_changes: WhichChanges,
    burst: bool,
}

impl TrialCondition {
    /// `burst` only survives on true-causal trials.
    pub fn new(collision_type: CollisionType, lag_ms: u32, burst: bool) -> Self {
        Self {
            collision_type,
            lag_ms,
            which_changes: collision_type.which_changes(),
            burst: burst && collision_type == CollisionType::TrueCausal,
        }
    }

    pub fn collision_type(&self) -> CollisionType {
        self.collision_type
    }

    pub fn lag_ms(&self) -> u32 {
        self.lag_ms
    }

    pub fn which_changes(&self) -> WhichChanges {
        self.which_changes
    }

    pub fn burst(&self) -> bool {
        self.burst
    }
}

/// A single keyed answer
#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Letter(char),
    Unknown,
}

impl Response {
    /// Text as exported; unknown answers are empty
    pub fn as_export(&self) -> String {
        match self {
            Response::Letter(c) => c.to_string(),
            Response::Unknown => String::new(),
        }
    }

    pub fn letter(&self) -> Option<char> {
        match self {
            Response::Letter(c) => Some(*c),
            Response::Unknown => None,
        }
    }
}

/// Both answers for one trial. `response1` is absent on one-target trials.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePair {
    pub response1: Option<Response>,
    pub response2: Response,
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockLabel {
    Training,
    Block(usize),
}

impl fmt::Display for BlockLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockLabel::Training => f.write_str("Training"),
            BlockLabel::Block(n) => write!(f, "{}", n),
        }
    }
}

/// Recorded result per trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub participant_id: String,
    /// 1-based within its trial list
    pub trial: usize,
    pub block: BlockLabel,
    pub collision_type: CollisionType,
    pub which_changes: WhichChanges,
    pub lag_ms: u32,
    pub o1_start: Option<usize>,
    pub o2_start: Option<usize>,
    pub score: Option<u32>,
    pub t1_value: Option<char>,
    pub t2_value: Option<char>,
    pub t1_object: Option<ObjectId>,
    pub t2_object: Option<ObjectId>,
    pub t1_response: Option<Response>,
    pub t2_response: Option<Response>,
    pub attention_prompt: Option<String>,
    pub is_training: bool,
    pub burst: bool,
    pub num_targets: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn which_changes_is_derived_from_collision() {
        let o = TrialCondition::new(CollisionType::Overtaking, 300, false);
        assert_eq!(o.which_changes(), WhichChanges::O1Twice);
        let f = TrialCondition::new(CollisionType::FakeCausal, 100, false);
        assert_eq!(f.which_changes(), WhichChanges::O1ThenO2);
        let t = TrialCondition::new(CollisionType::TrueCausal, 700, true);
        assert_eq!(t.which_changes(), WhichChanges::O1ThenO2);
    }

    #[test]
    fn burst_is_dropped_outside_true_causal() {
        assert!(!TrialCondition::new(CollisionType::Overtaking, 100, true).burst());
        assert!(!TrialCondition::new(CollisionType::FakeCausal, 100, true).burst());
        assert!(TrialCondition::new(CollisionType::TrueCausal, 100, true).burst());
    }

    #[test]
    fn unknown_response_exports_empty() {
        assert_eq!(Response::Unknown.as_export(), "");
        assert_eq!(Response::Letter('K').as_export(), "K");
    }

    #[test]
    fn block_label_display() {
        assert_eq!(BlockLabel::Training.to_string(), "Training");
        assert_eq!(BlockLabel::Block(3).to_string(), "3");
    }
}
