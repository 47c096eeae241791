//! Per-entity handler hooks for streaming consumption.

use async_trait::async_trait;
use serde_json::Value;

use super::StreamEntity;
use crate::types::{
    DeletionNotice, DirectMessage, DisconnectNotice, FriendsList, LimitNotice,
    LocationDeletionNotice, Status, UserEvent, WithheldStatusNotice, WithheldUserNotice,
};

/// Handler for streaming entities.
///
/// Every hook returns whether reading should continue. All hooks default to
/// `true`, so implementors only override what they care about.
///
/// ```rust
/// use async_trait::async_trait;
/// use tweetwire::{Status, StreamProcessor};
///
/// struct Printer;
///
/// #[async_trait]
/// impl StreamProcessor for Printer {
///     async fn on_status(&mut self, status: Status) -> bool {
///         println!("{}", status.text);
///         true
///     }
/// }
/// ```
#[async_trait]
pub trait StreamProcessor: Send {
    async fn on_status(&mut self, _status: Status) -> bool {
        true
    }

    async fn on_message(&mut self, _message: DirectMessage) -> bool {
        true
    }

    async fn on_event(&mut self, _event: UserEvent) -> bool {
        true
    }

    async fn on_delete(&mut self, _notice: DeletionNotice) -> bool {
        true
    }

    async fn on_geo_delete(&mut self, _notice: LocationDeletionNotice) -> bool {
        true
    }

    async fn on_limit(&mut self, _notice: LimitNotice) -> bool {
        true
    }

    async fn on_withheld_status(&mut self, _notice: WithheldStatusNotice) -> bool {
        true
    }

    async fn on_withheld_user(&mut self, _notice: WithheldUserNotice) -> bool {
        true
    }

    /// The server closes the connection right after this message.
    async fn on_disconnect(&mut self, _notice: DisconnectNotice) -> bool {
        true
    }

    async fn on_friends(&mut self, _friends: FriendsList) -> bool {
        true
    }

    async fn on_unknown_entity(&mut self, _raw: Value) -> bool {
        true
    }

    /// Route an entity to its hook.
    async fn process_entity(&mut self, entity: StreamEntity) -> bool {
        match entity {
            StreamEntity::Status(status) => self.on_status(*status).await,
            StreamEntity::DirectMessage(message) => self.on_message(*message).await,
            StreamEntity::Event(event) => self.on_event(*event).await,
            StreamEntity::Deletion(notice) => self.on_delete(notice).await,
            StreamEntity::LocationDeletion(notice) => self.on_geo_delete(notice).await,
            StreamEntity::Limit(notice) => self.on_limit(notice).await,
            StreamEntity::WithheldStatus(notice) => self.on_withheld_status(notice).await,
            StreamEntity::WithheldUser(notice) => self.on_withheld_user(notice).await,
            StreamEntity::Disconnect(notice) => self.on_disconnect(notice).await,
            StreamEntity::Friends(friends) => self.on_friends(friends).await,
            StreamEntity::Unknown(raw) => self.on_unknown_entity(raw).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::stream::classify;

    #[derive(Default)]
    struct Recorder {
        seen: Vec<&'static str>,
    }

    #[async_trait]
    impl StreamProcessor for Recorder {
        async fn on_status(&mut self, _status: Status) -> bool {
            self.seen.push("status");
            true
        }

        async fn on_delete(&mut self, _notice: DeletionNotice) -> bool {
            self.seen.push("delete");
            false
        }

        async fn on_unknown_entity(&mut self, _raw: Value) -> bool {
            self.seen.push("unknown");
            true
        }
    }

    #[tokio::test]
    async fn test_routes_to_overridden_hooks() {
        let mut recorder = Recorder::default();

        let status = classify(&json!({"id": 1, "text": "x"}).to_string()).unwrap();
        assert!(recorder.process_entity(status).await);

        let unknown = classify(&json!({"mystery": true}).to_string()).unwrap();
        assert!(recorder.process_entity(unknown).await);

        let delete = classify(&json!({"delete": {"status": {"id": 1}}}).to_string()).unwrap();
        assert!(!recorder.process_entity(delete).await);

        assert_eq!(recorder.seen, vec!["status", "unknown", "delete"]);
    }

    #[tokio::test]
    async fn test_default_hooks_continue() {
        let mut recorder = Recorder::default();
        let limit = classify(&json!({"limit": {"track": 12}}).to_string()).unwrap();
        assert!(recorder.process_entity(limit).await);
        assert!(recorder.seen.is_empty());
    }
}
