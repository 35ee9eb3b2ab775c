//! Shared slideshow state.
//!
//! One [`BroadcastState`] exists per process, owned by the [`KioskState`]
//! handle that is cloned into the scheduler task, the WebSocket connection
//! handler, and the admin handlers. Every read and write of the photo
//! snapshot, the cursor, and the client registry happens under the single
//! mutex; fan-out sends happen only after the lock is released.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::events::KioskEvent;
use crate::store::PhotoStore;

/// Outbound events buffered per kiosk client before the socket loop drains them.
const CLIENT_CHANNEL_CAPACITY: usize = 32;

/// Ordered photo snapshot plus the display cursor.
///
/// The snapshot is rebuilt in full on every [`Slideshow::refresh`] and never
/// patched incrementally, so readers always see a point-in-time view of
/// storage. The cursor rewinds to 0 on refresh; after a deletion the display
/// may jump to a different photo, which is accepted behavior.
#[derive(Debug, Default)]
pub struct Slideshow {
    photos: Vec<String>,
    cursor: usize,
}

impl Slideshow {
    /// Replace the snapshot with the store's current contents and rewind.
    pub fn refresh(&mut self, store: &PhotoStore) {
        self.photos = store.list();
        self.cursor = 0;
    }

    /// Filename under the cursor, or `None` when no photos are known.
    pub fn current(&self) -> Option<&str> {
        self.photos.get(self.cursor).map(String::as_str)
    }

    /// Step the cursor forward, wrapping at the end of the set, and return
    /// the newly current filename. No-op on an empty set.
    pub fn advance(&mut self) -> Option<&str> {
        if self.photos.is_empty() {
            return None;
        }
        self.cursor = (self.cursor + 1) % self.photos.len();
        self.current()
    }

    pub fn photos(&self) -> &[String] {
        &self.photos
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

/// Everything guarded by the state lock: the slideshow and the registry of
/// connected display clients.
#[derive(Default)]
struct BroadcastState {
    slideshow: Slideshow,
    clients: HashMap<Uuid, mpsc::Sender<KioskEvent>>,
}

/// Cloneable handle to the process-wide kiosk state.
#[derive(Clone)]
pub struct KioskState {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<BroadcastState>,
    store: PhotoStore,
}

impl KioskState {
    pub fn new(store: PhotoStore) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(BroadcastState::default()),
                store,
            }),
        }
    }

    pub fn store(&self) -> &PhotoStore {
        &self.inner.store
    }

    /// Rebuild the photo snapshot from storage and rewind the cursor.
    pub async fn refresh(&self) {
        let mut state = self.inner.state.lock().await;
        state.slideshow.refresh(&self.inner.store);
        info!(count = state.slideshow.photos().len(), "refreshed photo list");
    }

    /// Register a new display client and return its id plus the event
    /// receiver its socket loop should drain.
    ///
    /// When photos are known, the current one is queued on the fresh channel
    /// inside the same critical section, so the client receives exactly one
    /// initial `update_image` before any tick-driven event.
    pub async fn subscribe(&self) -> (Uuid, mpsc::Receiver<KioskEvent>) {
        let client_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(CLIENT_CHANNEL_CAPACITY);
        let mut state = self.inner.state.lock().await;
        if let Some(current) = state.slideshow.current() {
            // Fresh channel with capacity; try_send cannot fail here.
            let _ = tx.try_send(KioskEvent::update_image(current));
        }
        state.clients.insert(client_id, tx);
        (client_id, rx)
    }

    pub async fn unsubscribe(&self, client_id: Uuid) {
        let mut state = self.inner.state.lock().await;
        state.clients.remove(&client_id);
    }

    pub async fn client_count(&self) -> usize {
        self.inner.state.lock().await.clients.len()
    }

    /// One scheduler step: advance the cursor under the lock and return the
    /// event to broadcast, or `None` when the photo set is empty.
    pub async fn advance(&self) -> Option<KioskEvent> {
        let mut state = self.inner.state.lock().await;
        state.slideshow.advance().map(KioskEvent::update_image)
    }

    /// Fan an event out to every connected client.
    ///
    /// The sender list is snapshotted under the lock and the sends happen
    /// after release, so a slow client never blocks refresh or the next
    /// tick's cursor math. Clients whose channel is gone are pruned.
    pub async fn broadcast(&self, event: KioskEvent) {
        let targets: Vec<(Uuid, mpsc::Sender<KioskEvent>)> = {
            let state = self.inner.state.lock().await;
            state
                .clients
                .iter()
                .map(|(id, tx)| (*id, tx.clone()))
                .collect()
        };

        let mut dead = Vec::new();
        for (client_id, tx) in targets {
            if tx.send(event.clone()).await.is_err() {
                dead.push(client_id);
            }
        }

        if !dead.is_empty() {
            let mut state = self.inner.state.lock().await;
            for client_id in &dead {
                state.clients.remove(client_id);
            }
            debug!(pruned = dead.len(), "dropped disconnected kiosk clients");
        }
    }

    /// Photo snapshot for read-only surfaces (admin page, JSON listing).
    pub async fn snapshot(&self) -> Vec<String> {
        self.inner.state.lock().await.slideshow.photos().to_vec()
    }

    #[cfg(test)]
    pub(crate) async fn cursor(&self) -> usize {
        self.inner.state.lock().await.slideshow.cursor()
    }
}
