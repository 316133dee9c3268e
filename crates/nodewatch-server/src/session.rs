//! Per-connection session state.

/// Lifecycle state of one node connection.
///
/// Transitions only move forward: `Unauthenticated` to `Authenticated`
/// on a valid `hello`, and either state to `Closed` when the
/// connection ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, `hello` not yet accepted. No acknowledgements are
    /// sent and no events are dispatched in this state.
    Unauthenticated,
    /// Handshake accepted; frames are decoded, dispatched, mirrored.
    Authenticated,
    /// Connection over; terminal.
    Closed,
}

/// Identity and lifecycle of a single node connection.
#[derive(Debug)]
pub struct Session {
    node_id: String,
    state: SessionState,
}

impl Session {
    /// A fresh, unauthenticated session with no identity.
    pub fn new() -> Self {
        Self {
            node_id: String::new(),
            state: SessionState::Unauthenticated,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The node's self-reported name. Empty until authenticated, and
    /// may legitimately stay empty if the node reported no name.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Record a successful handshake. Valid only once, from
    /// `Unauthenticated`.
    pub fn authenticate(&mut self, node_id: String) {
        debug_assert_eq!(self.state, SessionState::Unauthenticated);
        self.node_id = node_id;
        self.state = SessionState::Authenticated;
    }

    /// Mark the session over. Idempotent.
    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unauthenticated_and_nameless() {
        let session = Session::new();
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert!(session.node_id().is_empty());
    }

    #[test]
    fn authenticate_records_identity() {
        let mut session = Session::new();
        session.authenticate("node-1".to_owned());
        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(session.node_id(), "node-1");
    }

    #[test]
    fn empty_node_id_is_allowed() {
        let mut session = Session::new();
        session.authenticate(String::new());
        assert_eq!(session.state(), SessionState::Authenticated);
        assert!(session.node_id().is_empty());
    }

    #[test]
    fn close_is_terminal_and_idempotent() {
        let mut session = Session::new();
        session.authenticate("node-1".to_owned());
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        // Identity survives closing, for final logging.
        assert_eq!(session.node_id(), "node-1");
    }
}
