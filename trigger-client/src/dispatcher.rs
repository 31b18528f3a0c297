//! TriggerDispatcher - the main interface for firing triggers.
//!
//! # Architecture
//!
//! The dispatcher owns no protocol state of its own. The pairing state of a
//! device is whatever the credential store says it is, run through the pure
//! state machine from `trigger-core`:
//!
//! ```text
//! Application → TriggerDispatcher → Transport → Radio
//!                   ↓          ↓
//!        CredentialStore    trigger-core (codec, state machine)
//! ```
//!
//! A trigger is: durably advance the counter (getting back the key from the
//! same locked read), sign, hand the payload to the transport. The counter is spent as soon as it is
//! persisted; a transport failure does not roll it back and nothing is
//! retried here.
//!
//! # Example
//!
//! ```ignore
//! let dispatcher = TriggerDispatcher::new(Arc::new(MemoryStore::new()), MockTransport::new());
//! let mut events = dispatcher.subscribe();
//!
//! dispatcher.pair(&device_id, "0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f").await?;
//! let payload = dispatcher.trigger(&device_id).await?;
//! ```

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{info, warn};
use trigger_core::{encode, PairingInput, PairingState};
use trigger_types::{DeviceId, Opcode, Payload, PresharedKey};

use crate::error::TriggerError;
use crate::store::{CredentialStore, StoreError};
use crate::transport::Transport;

/// Buffered events per subscriber before the oldest are dropped.
pub const EVENT_CAPACITY: usize = 64;

/// What happened to a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A key was stored.
    Paired,
    /// A payload was accepted by the transport.
    Triggered {
        /// Counter the payload was signed with.
        counter: u64,
    },
    /// The pairing was removed.
    Reset,
    /// A trigger attempt failed.
    Failed {
        /// Display form of the error.
        reason: String,
    },
}

/// Notification published after every dispatcher operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchEvent {
    /// The device concerned.
    pub device_id: DeviceId,
    /// Pairing state after the operation.
    pub state: PairingState,
    /// What the operation did.
    pub outcome: Outcome,
}

/// Fires authenticated triggers at paired devices.
pub struct TriggerDispatcher<S: CredentialStore, T: Transport> {
    store: Arc<S>,
    transport: T,
    events: broadcast::Sender<DispatchEvent>,
}

impl<S: CredentialStore, T: Transport> TriggerDispatcher<S, T> {
    /// Create a dispatcher over an injected store and transport.
    pub fn new(store: Arc<S>, transport: T) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            transport,
            events,
        }
    }

    /// The credential store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Subscribe to pairing and trigger events.
    ///
    /// Results are still returned from each call; events are for observers
    /// such as a UI layer.
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.events.subscribe()
    }

    fn publish(&self, device_id: &DeviceId, state: PairingState, outcome: Outcome) {
        // No subscribers is fine
        let _ = self.events.send(DispatchEvent {
            device_id: device_id.clone(),
            state,
            outcome,
        });
    }

    /// Pair with a device, replacing any existing key and resetting its
    /// counter to 0.
    ///
    /// A malformed key fails with `InvalidKeyFormat` before the store is
    /// touched.
    pub async fn pair(&self, device_id: &DeviceId, key_hex: &str) -> Result<(), TriggerError> {
        let key = PresharedKey::from_hex(key_hex)?;
        self.pair_with_key(device_id, &key).await
    }

    /// Pair from a parsed QR payload.
    pub async fn pair_input(&self, input: &PairingInput) -> Result<(), TriggerError> {
        self.pair_with_key(&input.device_id, &input.key).await
    }

    async fn pair_with_key(
        &self,
        device_id: &DeviceId,
        key: &PresharedKey,
    ) -> Result<(), TriggerError> {
        self.store.save(device_id, key).await.map_err(|e| {
            warn!(device = %device_id, error = %e, "pairing failed");
            TriggerError::from(e)
        })?;

        info!(device = %device_id, "paired");
        self.publish(device_id, PairingState::Paired, Outcome::Paired);
        Ok(())
    }

    /// Advance the counter, sign and broadcast one trigger.
    ///
    /// Returns the payload the transport accepted.
    pub async fn trigger(&self, device_id: &DeviceId) -> Result<Payload, TriggerError> {
        match self.try_trigger(device_id).await {
            Ok((payload, counter)) => {
                info!(device = %device_id, counter, "trigger sent");
                self.publish(device_id, PairingState::Paired, Outcome::Triggered { counter });
                Ok(payload)
            }
            Err(e) => {
                warn!(device = %device_id, error = %e, "trigger failed");
                // A failed trigger leaves the device where it was
                let state = PairingState::from_paired(!matches!(e, TriggerError::NotPaired { .. }));
                self.publish(
                    device_id,
                    state,
                    Outcome::Failed {
                        reason: e.to_string(),
                    },
                );
                Err(e)
            }
        }
    }

    async fn try_trigger(&self, device_id: &DeviceId) -> Result<(Payload, u64), TriggerError> {
        // NotFound surfaces as NotPaired, an unusable key as Encoding
        let (counter, key) = self.store.advance(device_id).await?;

        let payload = encode(Opcode::Trigger.as_u8(), counter, key.as_bytes()).map_err(|e| {
            TriggerError::Encoding {
                reason: e.to_string(),
            }
        })?;

        self.transport.broadcast(&payload).await?;
        Ok((payload, counter))
    }

    /// Remove the pairing for a device.
    ///
    /// Returns `true` if a pairing existed.
    pub async fn reset(&self, device_id: &DeviceId) -> Result<bool, TriggerError> {
        let removed = self.store.clear(device_id).await?;
        if removed {
            info!(device = %device_id, "pairing reset");
            self.publish(device_id, PairingState::Unpaired, Outcome::Reset);
        }
        Ok(removed)
    }

    /// Remove every pairing. Returns how many were removed.
    pub async fn reset_all(&self) -> Result<usize, TriggerError> {
        let mut removed = 0;
        for device_id in self.store.list().await? {
            if self.reset(&device_id).await? {
                removed += 1;
            }
        }
        info!(removed, "all pairings reset");
        Ok(removed)
    }

    /// Current pairing state of a device.
    pub async fn state(&self, device_id: &DeviceId) -> Result<PairingState, TriggerError> {
        match self.store.get(device_id).await {
            Ok(_) => Ok(PairingState::Paired),
            Err(StoreError::NotFound { .. }) => Ok(PairingState::Unpaired),
            Err(e) => Err(TriggerError::Store(e)),
        }
    }

    /// Paired device ids, sorted.
    pub async fn paired_devices(&self) -> Result<Vec<DeviceId>, TriggerError> {
        Ok(self.store.list().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FileStore, MemoryStore, PairingRecord};
    use crate::transport::{MockTransport, TransportError};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::tempdir;
    use trigger_core::authenticate;
    use trigger_types::KeyError;

    const KEY_HEX: &str = "0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f";
    const NEW_KEY_HEX: &str = "00112233445566778899aabbccddeeff";

    /// Re-pairs with a new key just before the first counter advance, as a
    /// `pair` from another task or process would.
    struct RepairingStore {
        inner: MemoryStore,
        new_key: PresharedKey,
        repaired: AtomicBool,
    }

    #[async_trait]
    impl CredentialStore for RepairingStore {
        async fn save(
            &self,
            device_id: &DeviceId,
            key: &PresharedKey,
        ) -> Result<PairingRecord, StoreError> {
            self.inner.save(device_id, key).await
        }

        async fn get(&self, device_id: &DeviceId) -> Result<PairingRecord, StoreError> {
            self.inner.get(device_id).await
        }

        async fn advance(
            &self,
            device_id: &DeviceId,
        ) -> Result<(u64, PresharedKey), StoreError> {
            if !self.repaired.swap(true, Ordering::SeqCst) {
                self.inner.save(device_id, &self.new_key).await?;
            }
            self.inner.advance(device_id).await
        }

        async fn clear(&self, device_id: &DeviceId) -> Result<bool, StoreError> {
            self.inner.clear(device_id).await
        }

        async fn clear_all(&self) -> Result<usize, StoreError> {
            self.inner.clear_all().await
        }

        async fn list(&self) -> Result<Vec<DeviceId>, StoreError> {
            self.inner.list().await
        }
    }

    fn pi() -> DeviceId {
        DeviceId::new("pi-01").unwrap()
    }

    fn dispatcher() -> (
        TriggerDispatcher<MemoryStore, MockTransport>,
        Arc<MemoryStore>,
        MockTransport,
    ) {
        let store = Arc::new(MemoryStore::new());
        let transport = MockTransport::new();
        let dispatcher = TriggerDispatcher::new(Arc::clone(&store), transport.clone());
        (dispatcher, store, transport)
    }

    #[tokio::test]
    async fn pair_then_trigger_known_answer() {
        let (dispatcher, _, transport) = dispatcher();
        dispatcher.pair(&pi(), KEY_HEX).await.unwrap();

        let payload = dispatcher.trigger(&pi()).await.unwrap();
        assert_eq!(payload.to_hex(), "0100000001ea39e0e32e9470e2");
        assert_eq!(transport.last_broadcast(), Some(payload));
    }

    #[tokio::test]
    async fn consecutive_triggers_advance_by_one() {
        let (dispatcher, _, _) = dispatcher();
        dispatcher.pair(&pi(), KEY_HEX).await.unwrap();

        let first = dispatcher.trigger(&pi()).await.unwrap();
        let second = dispatcher.trigger(&pi()).await.unwrap();
        assert_eq!(second.wire_counter(), first.wire_counter() + 1);
        assert_ne!(first.tag(), second.tag());
        assert_eq!(second.to_hex(), "01000000029e434d7a04bb7b87");
    }

    #[tokio::test]
    async fn payload_verifies_under_key() {
        let (dispatcher, _, _) = dispatcher();
        let key = PresharedKey::from_hex("00112233445566778899aabbccddeeff").unwrap();
        dispatcher.pair(&pi(), &key.to_hex()).await.unwrap();

        for _ in 0..6 {
            dispatcher.trigger(&pi()).await.unwrap();
        }
        let payload = dispatcher.trigger(&pi()).await.unwrap();
        assert_eq!(authenticate(&payload, key.as_bytes()), Ok(7));
        assert_eq!(payload.tag(), hex::decode("fd45b157c11efff3").unwrap().as_slice());
    }

    #[tokio::test]
    async fn trigger_unpaired_fails_without_mutation() {
        let (dispatcher, store, transport) = dispatcher();

        let result = dispatcher.trigger(&pi()).await;
        assert!(matches!(result, Err(TriggerError::NotPaired { .. })));
        assert!(store.is_empty());
        assert!(transport.broadcasts().is_empty());
    }

    #[tokio::test]
    async fn invalid_key_creates_no_record() {
        let (dispatcher, store, _) = dispatcher();

        let result = dispatcher.pair(&pi(), "0f0").await;
        assert!(matches!(
            result,
            Err(TriggerError::InvalidKeyFormat(KeyError::OddLength { len: 3 }))
        ));
        let result = dispatcher.pair(&pi(), "zz").await;
        assert!(matches!(result, Err(TriggerError::InvalidKeyFormat(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn store_failure_transmits_nothing() {
        let (dispatcher, store, transport) = dispatcher();
        dispatcher.pair(&pi(), KEY_HEX).await.unwrap();

        store.fail_next_write("disk full");
        let result = dispatcher.trigger(&pi()).await;
        assert!(matches!(result, Err(TriggerError::Store(_))));
        assert!(result.unwrap_err().is_retryable());
        assert!(transport.broadcasts().is_empty());

        // Still paired; the next attempt uses counter 1
        assert_eq!(dispatcher.state(&pi()).await.unwrap(), PairingState::Paired);
        let payload = dispatcher.trigger(&pi()).await.unwrap();
        assert_eq!(payload.wire_counter(), 1);
    }

    #[tokio::test]
    async fn transport_rejection_still_spends_counter() {
        let (dispatcher, store, transport) = dispatcher();
        dispatcher.pair(&pi(), KEY_HEX).await.unwrap();

        transport.reject_next("adapter off");
        let result = dispatcher.trigger(&pi()).await;
        assert!(matches!(
            result,
            Err(TriggerError::Transport(TransportError::Rejected(_)))
        ));
        assert_eq!(store.get(&pi()).await.unwrap().send_counter, 1);

        let payload = dispatcher.trigger(&pi()).await.unwrap();
        assert_eq!(payload.wire_counter(), 2);
        assert_eq!(transport.broadcasts().len(), 1);
    }

    #[tokio::test]
    async fn corrupt_stored_key_is_encoding_error() {
        let dir = tempdir().unwrap();
        let file_store = Arc::new(FileStore::open(dir.path()).await.unwrap());
        file_store
            .save(&pi(), &PresharedKey::from_hex(KEY_HEX).unwrap())
            .await
            .unwrap();

        // Simulate a record written by something else
        tokio::fs::write(
            file_store.record_path(&pi()),
            br#"{"device_id":"pi-01","preshared_key_hex":"xyz","send_counter":4}"#,
        )
        .await
        .unwrap();

        let dispatcher = TriggerDispatcher::new(Arc::clone(&file_store), MockTransport::new());
        let result = dispatcher.trigger(&pi()).await;
        assert!(matches!(result, Err(TriggerError::Encoding { .. })));
        // No counter was spent on an unusable key
        assert_eq!(file_store.get(&pi()).await.unwrap().send_counter, 4);
    }

    #[tokio::test]
    async fn repair_before_advance_signs_with_new_key() {
        let inner = MemoryStore::new();
        let old_key = PresharedKey::from_hex(KEY_HEX).unwrap();
        let new_key = PresharedKey::from_hex(NEW_KEY_HEX).unwrap();
        inner.save(&pi(), &old_key).await.unwrap();
        for _ in 0..5 {
            inner.next_counter(&pi()).await.unwrap();
        }

        let store = Arc::new(RepairingStore {
            inner,
            new_key: new_key.clone(),
            repaired: AtomicBool::new(false),
        });
        let dispatcher = TriggerDispatcher::new(Arc::clone(&store), MockTransport::new());

        let payload = dispatcher.trigger(&pi()).await.unwrap();
        assert_eq!(authenticate(&payload, new_key.as_bytes()), Ok(1));
        assert!(authenticate(&payload, old_key.as_bytes()).is_err());
        // Old key, counter 1 was spent long ago
        assert_ne!(payload.to_hex(), "0100000001ea39e0e32e9470e2");
        assert_eq!(store.get(&pi()).await.unwrap().send_counter, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn pair_racing_triggers_never_reuses_a_counter() {
        let dir = tempdir().unwrap();
        let transport = MockTransport::new();
        let store = Arc::new(FileStore::open(dir.path()).await.unwrap());
        let dispatcher = Arc::new(TriggerDispatcher::new(store, transport.clone()));
        dispatcher.pair(&pi(), KEY_HEX).await.unwrap();
        for _ in 0..5 {
            dispatcher.trigger(&pi()).await.unwrap();
        }

        // A second handle on the same directory, as another process would have
        let other = TriggerDispatcher::new(
            Arc::new(FileStore::open(dir.path()).await.unwrap()),
            MockTransport::new(),
        );

        let mut handles = Vec::new();
        for _ in 0..20 {
            let dispatcher = Arc::clone(&dispatcher);
            handles.push(tokio::spawn(async move {
                dispatcher.trigger(&pi()).await.unwrap()
            }));
        }
        other.pair(&pi(), NEW_KEY_HEX).await.unwrap();
        for h in handles {
            h.await.unwrap();
        }

        let old_key = PresharedKey::from_hex(KEY_HEX).unwrap();
        let new_key = PresharedKey::from_hex(NEW_KEY_HEX).unwrap();
        let mut seen = HashSet::new();
        for payload in transport.broadcasts() {
            let signed = match authenticate(&payload, old_key.as_bytes()) {
                Ok(counter) => ("old", counter),
                Err(_) => ("new", authenticate(&payload, new_key.as_bytes()).unwrap()),
            };
            assert!(seen.insert(signed), "{signed:?} broadcast twice");
        }
        assert_eq!(seen.len(), 25);
    }

    #[tokio::test]
    async fn failed_trigger_event_keeps_prior_state() {
        let (dispatcher, store, _) = dispatcher();
        let mut events = dispatcher.subscribe();
        dispatcher.pair(&pi(), KEY_HEX).await.unwrap();
        events.recv().await.unwrap();

        store.fail_next_write("disk full");
        let _ = dispatcher.trigger(&pi()).await;
        let e = events.recv().await.unwrap();
        assert!(matches!(e.outcome, Outcome::Failed { .. }));
        assert_eq!(e.state, PairingState::Paired);
    }

    #[tokio::test]
    async fn reset_then_repair_starts_over() {
        let (dispatcher, _, _) = dispatcher();
        dispatcher.pair(&pi(), KEY_HEX).await.unwrap();
        dispatcher.trigger(&pi()).await.unwrap();
        dispatcher.trigger(&pi()).await.unwrap();

        assert!(dispatcher.reset(&pi()).await.unwrap());
        assert!(!dispatcher.reset(&pi()).await.unwrap());
        assert_eq!(
            dispatcher.state(&pi()).await.unwrap(),
            PairingState::Unpaired
        );
        assert!(matches!(
            dispatcher.trigger(&pi()).await,
            Err(TriggerError::NotPaired { .. })
        ));

        dispatcher.pair(&pi(), KEY_HEX).await.unwrap();
        let payload = dispatcher.trigger(&pi()).await.unwrap();
        assert_eq!(payload.wire_counter(), 1);
    }

    #[tokio::test]
    async fn reset_all_clears_every_device() {
        let (dispatcher, store, _) = dispatcher();
        let other = DeviceId::new("pi-02").unwrap();
        dispatcher.pair(&pi(), KEY_HEX).await.unwrap();
        dispatcher.pair(&other, KEY_HEX).await.unwrap();
        assert_eq!(
            dispatcher.paired_devices().await.unwrap(),
            vec![pi(), other]
        );

        assert_eq!(dispatcher.reset_all().await.unwrap(), 2);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn pair_input_from_qr_payload() {
        let (dispatcher, _, _) = dispatcher();
        let input = PairingInput::parse(&format!("http://pi.local:8000|pi-01|{KEY_HEX}")).unwrap();
        dispatcher.pair_input(&input).await.unwrap();

        let payload = dispatcher.trigger(&pi()).await.unwrap();
        assert_eq!(payload.to_hex(), "0100000001ea39e0e32e9470e2");
    }

    #[tokio::test]
    async fn events_are_published() {
        let (dispatcher, _, transport) = dispatcher();
        let mut events = dispatcher.subscribe();

        dispatcher.pair(&pi(), KEY_HEX).await.unwrap();
        dispatcher.trigger(&pi()).await.unwrap();
        transport.reject_next("busy");
        let _ = dispatcher.trigger(&pi()).await;
        dispatcher.reset(&pi()).await.unwrap();
        let _ = dispatcher.trigger(&pi()).await;

        let e = events.recv().await.unwrap();
        assert_eq!(e.outcome, Outcome::Paired);
        assert_eq!(e.state, PairingState::Paired);

        let e = events.recv().await.unwrap();
        assert_eq!(e.outcome, Outcome::Triggered { counter: 1 });

        let e = events.recv().await.unwrap();
        assert!(matches!(e.outcome, Outcome::Failed { .. }));
        assert_eq!(e.state, PairingState::Paired);

        let e = events.recv().await.unwrap();
        assert_eq!(e.outcome, Outcome::Reset);
        assert_eq!(e.state, PairingState::Unpaired);

        let e = events.recv().await.unwrap();
        assert!(matches!(e.outcome, Outcome::Failed { .. }));
        assert_eq!(e.state, PairingState::Unpaired);
        assert_eq!(e.device_id, pi());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_triggers_use_distinct_counters() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FileStore::open(dir.path()).await.unwrap());
        let transport = MockTransport::new();
        let dispatcher = Arc::new(TriggerDispatcher::new(store, transport.clone()));
        dispatcher.pair(&pi(), KEY_HEX).await.unwrap();

        const N: u32 = 24;
        let mut handles = Vec::new();
        for _ in 0..N {
            let dispatcher = Arc::clone(&dispatcher);
            handles.push(tokio::spawn(async move {
                dispatcher.trigger(&pi()).await.unwrap()
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let counters: HashSet<u32> = transport
            .broadcasts()
            .iter()
            .map(|p| p.wire_counter())
            .collect();
        assert_eq!(counters, (1..=N).collect::<HashSet<u32>>());
    }
}
