//! Prediction labels and the API response body

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary outcome for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Normal,
    Anomaly,
}

impl Label {
    /// Signed vote: +1 normal, -1 anomaly.
    pub fn vote(self) -> i32 {
        match self {
            Label::Normal => 1,
            Label::Anomaly => -1,
        }
    }

    /// Map a signed detector output back to a label. Anything non-positive is an anomaly.
    pub fn from_vote(vote: i32) -> Self {
        if vote > 0 {
            Label::Normal
        } else {
            Label::Anomaly
        }
    }

    pub fn is_anomaly(self) -> bool {
        self == Label::Anomaly
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Normal => write!(f, "Normal"),
            Label::Anomaly => write!(f, "Anomaly"),
        }
    }
}

/// Response body of `POST /predict`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: Label,
}
