//! In-process document store.
//!
//! One [`MemoryStore`] holds the document. Each client gets its own
//! [`MemoryConnection`], which can be dropped and restored to simulate a
//! flaky link.

use std::collections::HashMap;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pokeduel_protocol::{CONNECTED_PATH, DocPath};
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use super::{DocumentStore, StoreError, Subscription, SubscriptionId};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Mutex<Shared>>,
}

#[derive(Debug)]
struct Shared {
    root: Value,
    next_connection: u64,
    next_subscription: u64,
    links: HashMap<u64, Link>,
}

impl Default for Shared {
    fn default() -> Self {
        Self {
            root: Value::Object(Map::new()),
            next_connection: 0,
            next_subscription: 0,
            links: HashMap::new(),
        }
    }
}

#[derive(Debug)]
struct Link {
    online: bool,
    closed: bool,
    watches: HashMap<SubscriptionId, Watch>,
    on_disconnect: Vec<(DocPath, Option<Value>)>,
}

#[derive(Debug)]
struct Watch {
    path: DocPath,
    tx: mpsc::UnboundedSender<Option<Value>>,
    /// Last value delivered, `None` before the first delivery
    last: Option<Option<Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new client link to the document
    pub fn connect(&self) -> MemoryConnection {
        let mut shared = self.lock();
        let id = shared.next_connection;
        shared.next_connection += 1;
        shared.links.insert(
            id,
            Link {
                online: true,
                closed: false,
                watches: HashMap::new(),
                on_disconnect: Vec::new(),
            },
        );
        tracing::debug!(connection = id, "Memory store link opened");

        MemoryConnection {
            store: self.clone(),
            id,
        }
    }

    /// Current value at `path`, bypassing any link
    pub fn peek(&self, path: &DocPath) -> Option<Value> {
        get_value(&self.lock().root, path)
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One client's link to a [`MemoryStore`].
///
/// Clones share the link, so disconnecting one disconnects them all.
#[derive(Debug, Clone)]
pub struct MemoryConnection {
    store: MemoryStore,
    id: u64,
}

impl MemoryConnection {
    pub fn is_online(&self) -> bool {
        self.store
            .lock()
            .links
            .get(&self.id)
            .is_some_and(|l| l.online && !l.closed)
    }

    /// Drop the link. Pending on-disconnect commitments are applied and
    /// subscriptions go quiet until [`reconnect`](Self::reconnect).
    pub fn disconnect(&self) {
        self.store.lock().drop_link(self.id, false);
        tracing::debug!(connection = self.id, "Memory store link dropped");
    }

    /// Restore a dropped link and resync every subscription
    pub fn reconnect(&self) {
        let mut shared = self.store.lock();
        if let Some(link) = shared.links.get_mut(&self.id).filter(|l| !l.closed) {
            link.online = true;
        }
        shared.notify();
        tracing::debug!(connection = self.id, "Memory store link restored");
    }

    /// Close the link for good. Subscriptions end.
    pub fn close(&self) {
        self.store.lock().drop_link(self.id, true);
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

impl DocumentStore for MemoryConnection {
    async fn read(&self, path: &DocPath) -> Result<Option<Value>, StoreError> {
        let shared = self.store.lock();
        let link = shared.link(self.id)?;
        if is_connected_path(path) {
            return Ok(Some(Value::Bool(link.online)));
        }
        if path.is_reserved() {
            return Err(StoreError::InvalidPath(path.clone()));
        }
        if !link.online {
            return Err(StoreError::Offline);
        }
        Ok(get_value(&shared.root, path))
    }

    async fn write(&self, path: &DocPath, value: Option<Value>) -> Result<(), StoreError> {
        let mut shared = self.store.lock();
        shared.online_link(self.id)?;
        writable(path)?;

        set_value(&mut shared.root, path, value);
        shared.notify();
        Ok(())
    }

    async fn subscribe(&self, path: &DocPath) -> Result<Subscription, StoreError> {
        if path.is_reserved() && !is_connected_path(path) {
            return Err(StoreError::InvalidPath(path.clone()));
        }

        let mut shared = self.store.lock();
        shared.link(self.id)?;
        let id = SubscriptionId(shared.next_subscription);
        shared.next_subscription += 1;

        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(link) = shared.links.get_mut(&self.id) {
            link.watches.insert(
                id,
                Watch {
                    path: path.clone(),
                    tx,
                    last: None,
                },
            );
        }
        shared.notify();

        Ok(Subscription::new(id, rx))
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), StoreError> {
        if let Some(link) = self.store.lock().links.get_mut(&self.id) {
            link.watches.remove(&id);
        }
        Ok(())
    }

    async fn on_disconnect(&self, path: &DocPath, value: Option<Value>) -> Result<(), StoreError> {
        writable(path)?;
        let mut shared = self.store.lock();
        let link = shared.online_link(self.id)?;

        link.on_disconnect.retain(|(p, _)| p != path);
        link.on_disconnect.push((path.clone(), value));
        Ok(())
    }

    async fn cancel_on_disconnect(&self, path: &DocPath) -> Result<(), StoreError> {
        let mut shared = self.store.lock();
        if let Some(link) = shared.links.get_mut(&self.id) {
            if link.closed {
                return Err(StoreError::Closed);
            }
            link.on_disconnect.retain(|(p, _)| !is_same_or_below(p, path));
        }
        Ok(())
    }
}

impl Shared {
    fn link(&self, id: u64) -> Result<&Link, StoreError> {
        match self.links.get(&id) {
            Some(link) if !link.closed => Ok(link),
            _ => Err(StoreError::Closed),
        }
    }

    fn online_link(&mut self, id: u64) -> Result<&mut Link, StoreError> {
        match self.links.get_mut(&id) {
            Some(link) if link.closed => Err(StoreError::Closed),
            Some(link) if !link.online => Err(StoreError::Offline),
            Some(link) => Ok(link),
            None => Err(StoreError::Closed),
        }
    }

    fn drop_link(&mut self, id: u64, close: bool) {
        let Some(link) = self.links.get_mut(&id) else {
            return;
        };
        if link.closed {
            return;
        }

        link.online = false;
        let commitments = mem::take(&mut link.on_disconnect);
        if close {
            link.closed = true;
            link.watches.clear();
        }

        for (path, value) in commitments {
            set_value(&mut self.root, &path, value);
        }
        self.notify();
    }

    /// Deliver every watched value that changed since its last delivery
    fn notify(&mut self) {
        let root = &self.root;
        for link in self.links.values_mut() {
            if link.closed {
                continue;
            }
            let online = link.online;
            link.watches.retain(|_, watch| {
                let current = if is_connected_path(&watch.path) {
                    Some(Value::Bool(online))
                } else if online {
                    get_value(root, &watch.path)
                } else {
                    return true;
                };

                if watch.last.as_ref() == Some(&current) {
                    return true;
                }
                let delivered = watch.tx.send(current.clone()).is_ok();
                watch.last = Some(current);
                delivered
            });
        }
    }
}

fn is_connected_path(path: &DocPath) -> bool {
    path.as_str() == CONNECTED_PATH
}

fn writable(path: &DocPath) -> Result<(), StoreError> {
    if path.is_root() || path.is_reserved() {
        Err(StoreError::InvalidPath(path.clone()))
    } else {
        Ok(())
    }
}

fn is_same_or_below(path: &DocPath, ancestor: &DocPath) -> bool {
    let mut segments = path.segments();
    ancestor
        .segments()
        .all(|expected| segments.next() == Some(expected))
}

fn get_value(root: &Value, path: &DocPath) -> Option<Value> {
    let mut node = root;
    for segment in path.segments() {
        node = match node {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    match node {
        Value::Null => None,
        value => Some(value.clone()),
    }
}

fn set_value(root: &mut Value, path: &DocPath, value: Option<Value>) {
    let segments: Vec<&str> = path.segments().collect();
    let Some((leaf, parents)) = segments.split_last() else {
        return;
    };

    let mut node = &mut *root;
    for segment in parents {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node = match node {
            Value::Object(map) => map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            _ => return,
        };
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        match value {
            Some(value) => {
                map.insert(leaf.to_string(), value);
            }
            None => {
                map.remove(*leaf);
            }
        }
    }

    let pruned = strip_empty(mem::take(root));
    *root = pruned.unwrap_or_else(|| Value::Object(Map::new()));
}

/// Nulls and empty containers do not exist in the document
fn strip_empty(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| strip_empty(v).map(|v| (k, v)))
                .collect();
            (!map.is_empty()).then_some(Value::Object(map))
        }
        Value::Array(items) => {
            let items: Vec<Value> = items.into_iter().filter_map(strip_empty).collect();
            (!items.is_empty()).then_some(Value::Array(items))
        }
        value => Some(value),
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{FutureExt, StreamExt};
    use serde_json::json;

    use super::*;

    fn path(p: &str) -> DocPath {
        DocPath::new(p)
    }

    fn pending(sub: &mut Subscription) -> Option<Option<Value>> {
        sub.next().now_or_never().flatten()
    }

    #[tokio::test]
    async fn test_write_strips_nulls_and_empty_objects() {
        let conn = MemoryStore::new().connect();
        conn.write(&path("rooms/1"), Some(json!({"a": {"b": null}, "c": 1, "d": {}})))
            .await
            .unwrap();

        assert_eq!(conn.read(&path("rooms/1")).await.unwrap(), Some(json!({"c": 1})));

        conn.write(&path("rooms/1/c"), None).await.unwrap();
        assert_eq!(conn.read(&path("rooms/1")).await.unwrap(), None);
        assert_eq!(conn.read(&path("rooms")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_creates_parents() {
        let conn = MemoryStore::new().connect();
        conn.write(&path("rooms/1/player2/ready"), Some(json!(true)))
            .await
            .unwrap();
        assert_eq!(
            conn.read(&path("rooms/1")).await.unwrap(),
            Some(json!({"player2": {"ready": true}}))
        );
    }

    #[tokio::test]
    async fn test_reserved_and_root_writes_rejected() {
        let conn = MemoryStore::new().connect();
        assert_eq!(
            conn.write(&DocPath::connected(), Some(json!(false))).await,
            Err(StoreError::InvalidPath(DocPath::connected()))
        );
        assert_eq!(
            conn.write(&DocPath::root(), None).await,
            Err(StoreError::InvalidPath(DocPath::root()))
        );
    }

    #[tokio::test]
    async fn test_subscription_delivers_current_then_changes() {
        let store = MemoryStore::new();
        let writer = store.connect();
        let watcher = store.connect();
        writer.write(&path("rooms/1/x"), Some(json!(1))).await.unwrap();

        let mut sub = watcher.subscribe(&path("rooms/1")).await.unwrap();
        assert_eq!(sub.next().await, Some(Some(json!({"x": 1}))));

        // unrelated and identical writes are silent
        writer.write(&path("rooms/2/x"), Some(json!(5))).await.unwrap();
        writer.write(&path("rooms/1/x"), Some(json!(1))).await.unwrap();
        assert_eq!(pending(&mut sub), None);

        writer.write(&path("rooms/1/x"), Some(json!(2))).await.unwrap();
        assert_eq!(sub.next().await, Some(Some(json!({"x": 2}))));

        writer.write(&path("rooms/1"), None).await.unwrap();
        assert_eq!(sub.next().await, Some(None));
    }

    #[tokio::test]
    async fn test_offline_link_resyncs_on_reconnect() {
        let store = MemoryStore::new();
        let writer = store.connect();
        let flaky = store.connect();

        let mut sub = flaky.subscribe(&path("k")).await.unwrap();
        assert_eq!(sub.next().await, Some(None));

        flaky.disconnect();
        assert!(!flaky.is_online());
        assert_eq!(flaky.read(&path("k")).await, Err(StoreError::Offline));
        assert_eq!(flaky.write(&path("k"), Some(json!(0))).await, Err(StoreError::Offline));

        writer.write(&path("k"), Some(json!(1))).await.unwrap();
        writer.write(&path("k"), Some(json!(2))).await.unwrap();
        assert_eq!(pending(&mut sub), None);

        flaky.reconnect();
        assert_eq!(sub.next().await, Some(Some(json!(2))));
        assert_eq!(pending(&mut sub), None);
    }

    #[tokio::test]
    async fn test_connected_path_follows_link() {
        let conn = MemoryStore::new().connect();
        let mut sub = conn.subscribe(&DocPath::connected()).await.unwrap();
        assert_eq!(sub.next().await, Some(Some(json!(true))));

        conn.disconnect();
        assert_eq!(sub.next().await, Some(Some(json!(false))));
        assert_eq!(conn.read(&DocPath::connected()).await, Ok(Some(json!(false))));

        conn.reconnect();
        assert_eq!(sub.next().await, Some(Some(json!(true))));
    }

    #[tokio::test]
    async fn test_on_disconnect_applies_once() {
        let store = MemoryStore::new();
        let client = store.connect();
        let online = path("rooms/1/player1/online");

        client.write(&online, Some(json!(true))).await.unwrap();
        client.on_disconnect(&online, Some(json!(false))).await.unwrap();

        client.disconnect();
        assert_eq!(store.peek(&online), Some(json!(false)));

        client.reconnect();
        client.write(&online, Some(json!(true))).await.unwrap();
        client.disconnect();
        // not re-armed, so nothing changes
        assert_eq!(store.peek(&online), Some(json!(true)));
    }

    #[tokio::test]
    async fn test_cancel_on_disconnect() {
        let store = MemoryStore::new();
        let client = store.connect();
        let online = path("rooms/1/player1/online");

        client.write(&online, Some(json!(true))).await.unwrap();
        client.on_disconnect(&online, Some(json!(false))).await.unwrap();
        client.cancel_on_disconnect(&path("rooms/1")).await.unwrap();

        client.close();
        assert_eq!(store.peek(&online), Some(json!(true)));
    }

    #[tokio::test]
    async fn test_close_ends_subscriptions() {
        let conn = MemoryStore::new().connect();
        let mut sub = conn.subscribe(&path("a")).await.unwrap();
        assert_eq!(sub.next().await, Some(None));

        conn.close();
        assert_eq!(sub.next().await, None);
        assert_eq!(conn.read(&path("a")).await, Err(StoreError::Closed));
        assert!(conn.subscribe(&path("a")).await.is_err());
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let conn = MemoryStore::new().connect();
        let mut sub = conn.subscribe(&path("a")).await.unwrap();
        assert_eq!(sub.next().await, Some(None));

        conn.unsubscribe(sub.id()).await.unwrap();
        conn.write(&path("a"), Some(json!(1))).await.unwrap();
        assert_eq!(sub.next().await, None);
    }
}
