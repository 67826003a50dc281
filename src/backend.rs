//! The collection contract shared by stores and option resolvers.

use std::sync::Arc;

use serde_json::Value;

use crate::error::ApiError;
use crate::types::{EntityId, ListPage, ListQuery, Record};

/// REST collection operations against `<endpoint>` and `<endpoint><id>/`.
///
/// Endpoints are passed as declared in the schema; implementations normalize
/// the trailing slash.
pub trait Backend: Send + Sync {
    /// `GET <endpoint>?page=..&search=..`
    fn list(&self, endpoint: &str, query: &ListQuery) -> Result<ListPage, ApiError>;

    /// `POST <endpoint>`
    fn create(&self, endpoint: &str, payload: &Record) -> Result<Record, ApiError>;

    /// `PATCH <endpoint><id>/`
    fn update(&self, endpoint: &str, id: &EntityId, payload: &Record)
        -> Result<Record, ApiError>;

    /// `DELETE <endpoint><id>/`
    fn delete(&self, endpoint: &str, id: &EntityId) -> Result<(), ApiError>;

    /// `POST <endpoint><id>/<action>/`
    fn action(&self, endpoint: &str, id: &EntityId, action: &str)
        -> Result<Option<Value>, ApiError>;
}

impl<B: Backend + ?Sized> Backend for Arc<B> {
    fn list(&self, endpoint: &str, query: &ListQuery) -> Result<ListPage, ApiError> {
        (**self).list(endpoint, query)
    }

    fn create(&self, endpoint: &str, payload: &Record) -> Result<Record, ApiError> {
        (**self).create(endpoint, payload)
    }

    fn update(
        &self,
        endpoint: &str,
        id: &EntityId,
        payload: &Record,
    ) -> Result<Record, ApiError> {
        (**self).update(endpoint, id, payload)
    }

    fn delete(&self, endpoint: &str, id: &EntityId) -> Result<(), ApiError> {
        (**self).delete(endpoint, id)
    }

    fn action(
        &self,
        endpoint: &str,
        id: &EntityId,
        action: &str,
    ) -> Result<Option<Value>, ApiError> {
        (**self).action(endpoint, id, action)
    }
}
