//! Retrieval results and modes

use crate::{ChunkId, CoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which retrieval signal produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Vector,
    Graph,
    Raptor,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Vector => write!(f, "vector"),
            Signal::Graph => write!(f, "graph"),
            Signal::Raptor => write!(f, "raptor"),
        }
    }
}

/// One ranked hit. Ephemeral: produced per query, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunk_id: ChunkId,
    pub score: f64,
    pub source: Signal,
    /// 1-based position in the final ordering
    pub rank: usize,
}

/// Retrieval mode selected by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    Vector,
    Graph,
    Raptor,
    Hybrid,
}

impl RetrievalMode {
    /// Keyword heuristic for callers that do not pick a mode: relationship
    /// wording routes to the graph, summary wording to the tree, everything
    /// else to flat vector search.
    pub fn route(query: &str) -> Self {
        let q = query.to_lowercase();
        const GRAPH_CUES: [&str; 5] = ["related", "connection", "between", "relationship", "connect"];
        const RAPTOR_CUES: [&str; 4] = ["summarize", "overview", "main points", "summary"];
        if GRAPH_CUES.iter().any(|w| q.contains(w)) {
            return Self::Graph;
        }
        if RAPTOR_CUES.iter().any(|w| q.contains(w)) {
            return Self::Raptor;
        }
        Self::Vector
    }
}

impl FromStr for RetrievalMode {
    type Err = CoreError;

    /// The `InvalidMode` boundary: every string-facing caller parses here
    /// before any retrieval work begins.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vector" => Ok(Self::Vector),
            "graph" => Ok(Self::Graph),
            "raptor" => Ok(Self::Raptor),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(CoreError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalMode::Vector => write!(f, "vector"),
            RetrievalMode::Graph => write!(f, "graph"),
            RetrievalMode::Raptor => write!(f, "raptor"),
            RetrievalMode::Hybrid => write!(f, "hybrid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("vector".parse::<RetrievalMode>().unwrap(), RetrievalMode::Vector);
        assert_eq!("HYBRID".parse::<RetrievalMode>().unwrap(), RetrievalMode::Hybrid);
    }

    #[test]
    fn test_invalid_mode_rejected() {
        let err = "fulltext".parse::<RetrievalMode>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidMode(m) if m == "fulltext"));
    }

    #[test]
    fn test_auto_routing() {
        assert_eq!(
            RetrievalMode::route("What is the relationship between A and B?"),
            RetrievalMode::Graph
        );
        assert_eq!(
            RetrievalMode::route("Give me an overview of the report"),
            RetrievalMode::Raptor
        );
        assert_eq!(
            RetrievalMode::route("When was the treaty signed?"),
            RetrievalMode::Vector
        );
    }
}
