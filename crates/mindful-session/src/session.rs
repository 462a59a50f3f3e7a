use chrono::{DateTime, Utc};
use mindful_core::Turn;
use serde::Serialize;
use uuid::Uuid;

/// Ordered turn history for one continuous user interaction.
///
/// Insertion order is display order is chronological order. Turns are
/// expected to alternate user/assistant starting with a user turn, but this is
/// not validated: a failed exchange leaves a trailing user turn behind.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    /// Unique identifier for this session.
    pub id: Uuid,
    turns: Vec<Turn>,
    /// UTC timestamp of when the session was created.
    pub created_at: DateTime<Utc>,
    /// UTC timestamp of the last append.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Creates an empty session with a fresh id.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Adds a turn to the end of the sequence.
    pub fn append(&mut self, turn: Turn) {
        self.updated_at = Utc::now();
        self.turns.push(turn);
    }

    /// All turns, oldest first.
    pub fn all(&self) -> &[Turn] {
        &self.turns
    }

    /// The most recent turn, if any.
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Number of turns recorded so far.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether no turn has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use mindful_core::Role;

    #[test]
    fn test_new_session_is_empty() {
        let session = Session::new();
        assert!(session.is_empty());
        assert_eq!(session.len(), 0);
        assert!(session.last().is_none());
        assert_eq!(session.created_at, session.updated_at);
    }

    #[test]
    fn test_append_preserves_order() {
        let mut session = Session::new();
        session.append(Turn::user("first"));
        session.append(Turn::assistant("second"));
        session.append(Turn::user("third"));

        let contents: Vec<&str> = session.all().iter().map(Turn::content).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
        assert_eq!(session.last().unwrap().role(), Role::User);
        assert!(session.updated_at >= session.created_at);
    }

    #[test]
    fn test_append_does_not_validate_alternation() {
        let mut session = Session::new();
        session.append(Turn::user("hello"));
        session.append(Turn::user("anyone there?"));
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn test_sessions_get_distinct_ids() {
        assert_ne!(Session::new().id, Session::new().id);
    }
}
