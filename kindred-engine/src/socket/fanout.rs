use socketioxide::SocketIo;
use uuid::Uuid;

/// Who a real-time emit addresses. Rooms follow the `{kind}:{id}` naming the
/// clients subscribe to on connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    User(Uuid),
    Event(Uuid),
    Conversation(Uuid),
}

impl Scope {
    pub fn room(&self) -> String {
        match self {
            Self::User(id) => format!("user:{id}"),
            Self::Event(id) => format!("event:{id}"),
            Self::Conversation(id) => format!("conversation:{id}"),
        }
    }
}

/// Fire-and-forget emit to one scope.
///
/// The durable record of the transition is already committed by the time
/// this runs; delivery here is at-most-once and a failure must never alter
/// the response, so errors are logged and dropped.
pub fn emit(io: &SocketIo, scope: Scope, event: &'static str, payload: &serde_json::Value) {
    let room = scope.room();
    if let Err(e) = io.to(room.clone()).emit(event, payload) {
        tracing::warn!(error = %e, room = %room, event = %event, "socket emit failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rooms_follow_kind_id_naming() {
        let id = Uuid::nil();
        assert_eq!(
            Scope::User(id).room(),
            "user:00000000-0000-0000-0000-000000000000"
        );
        assert!(Scope::Event(id).room().starts_with("event:"));
        assert!(Scope::Conversation(id).room().starts_with("conversation:"));
    }

    #[test]
    fn scopes_with_same_id_use_distinct_rooms() {
        let id = Uuid::new_v4();
        let rooms = [
            Scope::User(id).room(),
            Scope::Event(id).room(),
            Scope::Conversation(id).room(),
        ];
        assert_ne!(rooms[0], rooms[1]);
        assert_ne!(rooms[1], rooms[2]);
    }
}
