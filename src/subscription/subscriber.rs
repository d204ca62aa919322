use std::collections::HashMap;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use crate::events::stream::{PriceUpdate, StreamMessage};
use crate::subscription::{Scope, SubscriptionState};
use crate::types::ids::{ClientId, HotelId};
use crate::types::timestamp::Timestamp;

type Cursors = Arc<Mutex<HashMap<HotelId, u64>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Result of offering one incremental update to a subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Delivery {
    Delivered,
    /// Held until the catch-up burst in progress has been queued.
    Buffered,
    /// Queue was full; the subscriber was told to resync.
    Lagged,
    /// Already covered by the burst or replay, or not deliverable in this state.
    Skipped,
    /// The receiving side is gone.
    Closed,
}

struct Outbox {
    sender: mpsc::UnboundedSender<StreamMessage>,
    sent: Arc<AtomicUsize>,
    received: Arc<AtomicUsize>,
    /// Value of `sent` once the catch-up burst was fully queued.
    burst_end: usize,
}

impl Outbox {
    fn push(&self, message: StreamMessage) -> bool {
        self.sent.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(message).is_err() {
            self.sent.fetch_sub(1, Ordering::SeqCst);
            return false;
        }
        true
    }

    /// Incremental messages queued but not yet received. The queue is FIFO,
    /// so burst messages still waiting are everything below `burst_end`.
    fn backlog(&self) -> usize {
        let received = self.received.load(Ordering::SeqCst).max(self.burst_end);
        self.sent.load(Ordering::SeqCst).saturating_sub(received)
    }
}

struct SubscriberInner {
    state: SubscriptionState,
    outbox: Option<Outbox>,
    /// Hub-wide id of the current attachment; a transport only detaches its own.
    generation: u64,
    pending: Vec<PriceUpdate>,
    /// Highest sequence queued per hotel since the last attach.
    high_water: HashMap<HotelId, u64>,
    connected_at: Timestamp,
    disconnected_at: Option<Timestamp>,
}

impl SubscriberInner {
    fn queued(&self, hotel_id: &HotelId) -> u64 {
        self.high_water.get(hotel_id).copied().unwrap_or(0)
    }

    fn push(&mut self, message: StreamMessage) -> bool {
        if let Some((hotel_id, sequence)) = message.cursor_position() {
            let mark = self.high_water.entry(hotel_id.clone()).or_insert(0);
            *mark = (*mark).max(sequence);
        }
        match &self.outbox {
            Some(outbox) => outbox.push(message),
            None => false,
        }
    }

    fn detach(&mut self, now: Timestamp) {
        self.state = SubscriptionState::Disconnected;
        self.outbox = None;
        self.pending.clear();
        self.disconnected_at = Some(now);
    }
}

/// Hub-side record of one client's subscription.
pub(crate) struct Subscriber {
    client_id: ClientId,
    scope: Scope,
    capacity: usize,
    cursors: Cursors,
    inner: Mutex<SubscriberInner>,
}

impl Subscriber {
    pub fn new(client_id: ClientId, scope: Scope, capacity: usize, now: Timestamp) -> Self {
        Subscriber {
            client_id,
            scope,
            capacity,
            cursors: Arc::new(Mutex::new(HashMap::new())),
            inner: Mutex::new(SubscriberInner {
                state: SubscriptionState::Disconnected,
                outbox: None,
                generation: 0,
                pending: Vec::new(),
                high_water: HashMap::new(),
                connected_at: now,
                disconnected_at: Some(now),
            }),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Opens a fresh outbound queue in `Connected`; incremental updates are
    /// buffered until [`finish_catch_up`](Subscriber::finish_catch_up).
    pub fn attach(&self, generation: u64, now: Timestamp) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let sent = Arc::new(AtomicUsize::new(0));
        let received = Arc::new(AtomicUsize::new(0));

        let mut inner = lock(&self.inner);
        inner.state = SubscriptionState::Connected;
        inner.outbox = Some(Outbox {
            sender,
            sent: sent.clone(),
            received: received.clone(),
            burst_end: 0,
        });
        inner.generation = generation;
        inner.pending.clear();
        inner.high_water = lock(&self.cursors).clone();
        inner.connected_at = now;
        inner.disconnected_at = None;

        Subscription {
            client_id: self.client_id,
            scope: self.scope.clone(),
            generation: inner.generation,
            receiver,
            sent,
            received,
            cursors: self.cursors.clone(),
        }
    }

    pub fn cursor(&self, hotel_id: &HotelId) -> Option<u64> {
        lock(&self.cursors).get(hotel_id).copied()
    }

    /// Records that nothing for `hotel_id` has been seen yet, so a later
    /// replay starts from its first sequence.
    pub fn ensure_cursor(&self, hotel_id: &HotelId) {
        lock(&self.cursors).entry(hotel_id.clone()).or_insert(0);
    }

    /// Queues part of a burst or replay. Not counted against the capacity.
    pub fn enqueue_catch_up(&self, message: StreamMessage) -> bool {
        lock(&self.inner).push(message)
    }

    /// Flushes updates published during the burst, then switches to `CaughtUp`.
    /// Returns the total number of replayed updates.
    pub fn finish_catch_up(&self, replayed: usize) -> usize {
        let mut inner = lock(&self.inner);
        if inner.state != SubscriptionState::Connected {
            return replayed;
        }

        let mut replayed = replayed;
        for update in mem::take(&mut inner.pending) {
            if update.sequence > inner.queued(&update.hotel_id) {
                inner.push(StreamMessage::PriceUpdate(update));
                replayed += 1;
            }
        }
        inner.push(StreamMessage::CaughtUp { replayed });
        if let Some(outbox) = inner.outbox.as_mut() {
            outbox.burst_end = outbox.sent.load(Ordering::SeqCst);
        }
        inner.state = SubscriptionState::CaughtUp;
        replayed
    }

    pub fn deliver(&self, update: &PriceUpdate, now: Timestamp) -> Delivery {
        let mut inner = lock(&self.inner);
        match inner.state {
            SubscriptionState::Connected => {
                inner.pending.push(update.clone());
                Delivery::Buffered
            }
            SubscriptionState::CaughtUp => {
                if update.sequence <= inner.queued(&update.hotel_id) {
                    return Delivery::Skipped;
                }
                let full = inner.outbox.as_ref().map_or(true, |o| o.backlog() >= self.capacity);
                if full {
                    inner.state = SubscriptionState::Lagging;
                    return if inner.push(StreamMessage::ResyncRequired) {
                        Delivery::Lagged
                    } else {
                        inner.detach(now);
                        Delivery::Closed
                    };
                }
                if inner.push(StreamMessage::PriceUpdate(update.clone())) {
                    Delivery::Delivered
                } else {
                    inner.detach(now);
                    Delivery::Closed
                }
            }
            SubscriptionState::Lagging
            | SubscriptionState::Disconnected
            | SubscriptionState::Expired => Delivery::Skipped,
        }
    }

    pub fn detach(&self, now: Timestamp) {
        lock(&self.inner).detach(now);
    }

    /// Detaches only if `generation` is still the live attachment.
    pub fn detach_generation(&self, generation: u64, now: Timestamp) -> bool {
        let mut inner = lock(&self.inner);
        if inner.generation != generation || inner.outbox.is_none() {
            return false;
        }
        inner.detach(now);
        true
    }

    /// Detaches a subscriber whose receiving side was dropped without an
    /// explicit disconnect. Returns true if it did so.
    pub fn detach_if_closed(&self, now: Timestamp) -> bool {
        let mut inner = lock(&self.inner);
        let closed = inner.outbox.as_ref().is_some_and(|o| o.sender.is_closed());
        if closed {
            inner.detach(now);
        }
        closed
    }

    pub fn close(&self) {
        let mut inner = lock(&self.inner);
        inner.state = SubscriptionState::Expired;
        inner.outbox = None;
        inner.pending.clear();
    }

    pub fn is_expired(&self, now: Timestamp, grace: Duration) -> bool {
        let inner = lock(&self.inner);
        match (inner.state, inner.disconnected_at) {
            (SubscriptionState::Expired, _) => true,
            (SubscriptionState::Disconnected, Some(at)) => now > at.saturating_add(grace),
            _ => false,
        }
    }

    pub fn state(&self, now: Timestamp, grace: Duration) -> SubscriptionState {
        if self.is_expired(now, grace) {
            return SubscriptionState::Expired;
        }
        lock(&self.inner).state
    }

    pub fn connected_at(&self) -> Timestamp {
        lock(&self.inner).connected_at
    }
}

/// Receiving end of a subscription, owned by the transport task.
///
/// Receiving a message advances the subscription's per-hotel cursor, which is
/// what a later resume replays from.
pub struct Subscription {
    client_id: ClientId,
    scope: Scope,
    generation: u64,
    receiver: mpsc::UnboundedReceiver<StreamMessage>,
    sent: Arc<AtomicUsize>,
    received: Arc<AtomicUsize>,
    cursors: Cursors,
}

impl Subscription {
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn recv(&mut self) -> Option<StreamMessage> {
        let message = self.receiver.recv().await?;
        self.delivered(&message);
        Some(message)
    }

    pub fn try_recv(&mut self) -> Option<StreamMessage> {
        let message = self.receiver.try_recv().ok()?;
        self.delivered(&message);
        Some(message)
    }

    /// Messages queued but not yet received.
    pub fn queued(&self) -> usize {
        self.sent.load(Ordering::SeqCst).saturating_sub(self.received.load(Ordering::SeqCst))
    }

    pub fn cursor(&self, hotel_id: &HotelId) -> Option<u64> {
        lock(&self.cursors).get(hotel_id).copied()
    }

    fn delivered(&self, message: &StreamMessage) {
        self.received.fetch_add(1, Ordering::SeqCst);
        if let Some((hotel_id, sequence)) = message.cursor_position() {
            let mut cursors = lock(&self.cursors);
            let cursor = cursors.entry(hotel_id.clone()).or_insert(0);
            *cursor = (*cursor).max(sequence);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .field("queued", &self.queued())
            .finish()
    }
}
