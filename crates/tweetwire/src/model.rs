//! Response model tags and the JSON-to-record decoder.

use serde_json::Value;

use crate::types::{CursoredIds, DirectMessage, SearchResult, Status, User};

/// Shape of a REST response, as recorded in the endpoint catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelTag {
    Status,
    Statuses,
    User,
    Users,
    DirectMessage,
    DirectMessages,
    /// Bare array of numeric IDs
    IdList,
    /// `{ids, next_cursor, previous_cursor}`
    CursoredIds,
    SearchResult,
}

/// A decoded REST response.
#[derive(Debug, Clone)]
pub enum Model {
    Status(Box<Status>),
    Statuses(Vec<Status>),
    User(Box<User>),
    Users(Vec<User>),
    DirectMessage(Box<DirectMessage>),
    DirectMessages(Vec<DirectMessage>),
    IdList(Vec<u64>),
    CursoredIds(CursoredIds),
    SearchResult(SearchResult),
}

impl ModelTag {
    /// Decode a JSON value into the record this tag names.
    pub fn decode(self, value: Value) -> serde_json::Result<Model> {
        Ok(match self {
            Self::Status => Model::Status(serde_json::from_value(value)?),
            Self::Statuses => Model::Statuses(serde_json::from_value(value)?),
            Self::User => Model::User(serde_json::from_value(value)?),
            Self::Users => Model::Users(serde_json::from_value(value)?),
            Self::DirectMessage => Model::DirectMessage(serde_json::from_value(value)?),
            Self::DirectMessages => Model::DirectMessages(serde_json::from_value(value)?),
            Self::IdList => Model::IdList(serde_json::from_value(value)?),
            Self::CursoredIds => Model::CursoredIds(serde_json::from_value(value)?),
            Self::SearchResult => Model::SearchResult(serde_json::from_value(value)?),
        })
    }
}

impl Model {
    /// The tag this model was decoded with.
    #[must_use]
    pub const fn tag(&self) -> ModelTag {
        match self {
            Self::Status(_) => ModelTag::Status,
            Self::Statuses(_) => ModelTag::Statuses,
            Self::User(_) => ModelTag::User,
            Self::Users(_) => ModelTag::Users,
            Self::DirectMessage(_) => ModelTag::DirectMessage,
            Self::DirectMessages(_) => ModelTag::DirectMessages,
            Self::IdList(_) => ModelTag::IdList,
            Self::CursoredIds(_) => ModelTag::CursoredIds,
            Self::SearchResult(_) => ModelTag::SearchResult,
        }
    }

    /// Take the single user out of a `User` model.
    #[must_use]
    pub fn into_user(self) -> Option<User> {
        match self {
            Self::User(user) => Some(*user),
            _ => None,
        }
    }

    /// Take the single status out of a `Status` model.
    #[must_use]
    pub fn into_status(self) -> Option<Status> {
        match self {
            Self::Status(status) => Some(*status),
            _ => None,
        }
    }

    /// Statuses of a `Statuses` or `SearchResult` model.
    #[must_use]
    pub fn into_statuses(self) -> Option<Vec<Status>> {
        match self {
            Self::Statuses(statuses) => Some(statuses),
            Self::SearchResult(result) => Some(result.statuses),
            _ => None,
        }
    }
}
