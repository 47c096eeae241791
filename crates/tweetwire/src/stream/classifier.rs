//! Classification of streaming API lines into typed entities.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::types::{
    DeletionNotice, DirectMessage, DisconnectNotice, FriendsList, LimitNotice,
    LocationDeletionNotice, Status, UserEvent, WithheldStatusNotice, WithheldUserNotice,
};

/// One message of a streaming response.
#[derive(Debug, Clone)]
pub enum StreamEntity {
    Status(Box<Status>),
    DirectMessage(Box<DirectMessage>),
    /// Social event (`target` key present)
    Event(Box<UserEvent>),
    Deletion(DeletionNotice),
    LocationDeletion(LocationDeletionNotice),
    Limit(LimitNotice),
    WithheldStatus(WithheldStatusNotice),
    WithheldUser(WithheldUserNotice),
    Disconnect(DisconnectNotice),
    Friends(FriendsList),
    /// Anything that did not decode into one of the above
    Unknown(Value),
}

impl StreamEntity {
    /// Short name of the variant, used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::DirectMessage(_) => "direct_message",
            Self::Event(_) => "event",
            Self::Deletion(_) => "delete",
            Self::LocationDeletion(_) => "scrub_geo",
            Self::Limit(_) => "limit",
            Self::WithheldStatus(_) => "status_withheld",
            Self::WithheldUser(_) => "user_withheld",
            Self::Disconnect(_) => "disconnect",
            Self::Friends(_) => "friends",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// Classify one line of a streaming response.
///
/// Top-level keys are tested in a fixed priority order since one payload may
/// carry several of them. Blank lines (keep-alives) and lines that are not
/// JSON yield `None`.
#[must_use]
pub fn classify(line: &str) -> Option<StreamEntity> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "Skipping non-JSON stream line");
            return None;
        }
    };

    match value {
        Value::Object(object) => Some(classify_object(object)),
        other => {
            warn!("Stream line is not a JSON object");
            Some(StreamEntity::Unknown(other))
        }
    }
}

fn classify_object(mut object: Map<String, Value>) -> StreamEntity {
    macro_rules! keyed {
        ($key:literal, $variant:expr) => {
            if let Some(payload) = object.remove($key) {
                return decode(payload, $variant).unwrap_or_else(|raw| {
                    let mut object = object;
                    object.insert($key.to_string(), raw);
                    StreamEntity::Unknown(Value::Object(object))
                });
            }
        };
    }

    keyed!("delete", StreamEntity::Deletion);
    keyed!("scrub_geo", StreamEntity::LocationDeletion);
    keyed!("limit", StreamEntity::Limit);
    keyed!("status_withheld", StreamEntity::WithheldStatus);
    keyed!("user_withheld", StreamEntity::WithheldUser);
    keyed!("disconnect", StreamEntity::Disconnect);
    keyed!("friends", StreamEntity::Friends);

    if object.contains_key("target") {
        return decode(Value::Object(object), |event: UserEvent| {
            StreamEntity::Event(Box::new(event))
        })
        .unwrap_or_else(StreamEntity::Unknown);
    }

    keyed!("direct_message", |message: DirectMessage| {
        StreamEntity::DirectMessage(Box::new(message))
    });

    decode(Value::Object(object), |status: Status| {
        StreamEntity::Status(Box::new(status))
    })
    .unwrap_or_else(StreamEntity::Unknown)
}

/// Decode `payload` into `T` and wrap it; hand the raw value back on failure.
fn decode<T, F>(payload: Value, wrap: F) -> Result<StreamEntity, Value>
where
    T: DeserializeOwned,
    F: FnOnce(T) -> StreamEntity,
{
    match T::deserialize(&payload) {
        Ok(record) => Ok(wrap(record)),
        Err(e) => {
            warn!(
                error = %e,
                record = std::any::type_name::<T>(),
                "Undecodable stream entity"
            );
            Err(payload)
        }
    }
}
