//! The shared document store.
//!
//! Every piece of battle state lives in one JSON document that both clients
//! read, write and watch. [`DocumentStore`] is the seam to whatever service
//! hosts it; [`MemoryStore`] keeps the document in process.

mod memory;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use pokeduel_protocol::DocPath;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

pub use memory::{MemoryConnection, MemoryStore};

use crate::DuelError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store link is offline")]
    Offline,

    #[error("Store connection closed")]
    Closed,

    #[error("Invalid path {0}")]
    InvalidPath(DocPath),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Key-path access to the shared document.
///
/// Writes with `None` remove the node. Subscriptions deliver the current
/// value first and then every change. Commitments registered through
/// [`on_disconnect`](Self::on_disconnect) are applied by the store when this
/// client's link drops.
pub trait DocumentStore: Clone + Send + Sync + 'static {
    fn read(
        &self,
        path: &DocPath,
    ) -> impl Future<Output = Result<Option<Value>, StoreError>> + Send;

    fn write(
        &self,
        path: &DocPath,
        value: Option<Value>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn subscribe(
        &self,
        path: &DocPath,
    ) -> impl Future<Output = Result<Subscription, StoreError>> + Send;

    fn unsubscribe(&self, id: SubscriptionId)
    -> impl Future<Output = Result<(), StoreError>> + Send;

    fn on_disconnect(
        &self,
        path: &DocPath,
        value: Option<Value>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn cancel_on_disconnect(
        &self,
        path: &DocPath,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Stream of values at one path. `None` means the node does not exist.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::UnboundedReceiver<Option<Value>>,
}

impl Subscription {
    pub fn new(id: SubscriptionId, rx: mpsc::UnboundedReceiver<Option<Value>>) -> Self {
        Self { id, rx }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl Stream for Subscription {
    type Item = Option<Value>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Read and decode the node at `path`
pub(crate) async fn read_json<S, T>(store: &S, path: &DocPath) -> Result<Option<T>, DuelError>
where
    S: DocumentStore,
    T: DeserializeOwned,
{
    match store.read(path).await? {
        Some(value) => decode(path, value).map(Some),
        None => Ok(None),
    }
}

/// Encode and write `value` at `path`
pub(crate) async fn write_json<S, T>(store: &S, path: &DocPath, value: &T) -> Result<(), DuelError>
where
    S: DocumentStore,
    T: Serialize + ?Sized,
{
    let value = encode(path, value)?;
    store.write(path, Some(value)).await?;
    Ok(())
}

pub(crate) fn decode<T: DeserializeOwned>(path: &DocPath, value: Value) -> Result<T, DuelError> {
    serde_json::from_value(value).map_err(|source| DuelError::MalformedDocument {
        path: path.clone(),
        source,
    })
}

pub(crate) fn encode<T: Serialize + ?Sized>(path: &DocPath, value: &T) -> Result<Value, DuelError> {
    serde_json::to_value(value).map_err(|source| DuelError::MalformedDocument {
        path: path.clone(),
        source,
    })
}
