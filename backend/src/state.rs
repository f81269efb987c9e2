use crate::accounts::Accounts;
use crate::auth::AuthProvider;
use crate::battle::{ArenaServices, BattleOrchestrator};
use crate::playback::Voicebox;
use crate::tts::VerseSynthesizer;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Orchestrator for one battle, behind its own lock.
pub type Arena = Arc<Mutex<BattleOrchestrator>>;

/// Shared per-key values that only stay registered while a request holds
/// them. The map lock is never held across an await.
struct Leases<V> {
    entries: RwLock<HashMap<Uuid, Arc<V>>>,
}

impl<V> Leases<V> {
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    async fn acquire(&self, key: Uuid, make: impl FnOnce() -> V) -> Arc<V> {
        if let Some(value) = self.entries.read().await.get(&key) {
            return value.clone();
        }
        self.entries
            .write()
            .await
            .entry(key)
            .or_insert_with(|| Arc::new(make()))
            .clone()
    }

    /// Drops the entry when the caller holds the last lease on it.
    async fn release(&self, key: Uuid, value: Arc<V>) {
        let mut entries = self.entries.write().await;
        let registered = entries
            .get(&key)
            .is_some_and(|entry| Arc::ptr_eq(entry, &value));
        // One reference in the map, one in `value`
        if registered && Arc::strong_count(&value) == 2 {
            entries.remove(&key);
        }
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub services: ArenaServices,
    pub accounts: Arc<Accounts>,
    pub synthesizer: Arc<dyn VerseSynthesizer>,
    arenas: Arc<Leases<Mutex<BattleOrchestrator>>>,
    voiceboxes: Arc<Leases<Voicebox>>,
}

impl AppState {
    pub fn new(
        services: ArenaServices,
        auth: Arc<dyn AuthProvider>,
        synthesizer: Arc<dyn VerseSynthesizer>,
    ) -> Self {
        let accounts = Arc::new(Accounts::new(auth, services.db.clone()));
        Self {
            services,
            accounts,
            synthesizer,
            arenas: Arc::new(Leases::new()),
            voiceboxes: Arc::new(Leases::new()),
        }
    }

    /// Lease on the arena for `battle_id`. A new arena starts idle; the
    /// holder resumes it from the store under the arena's own lock.
    pub async fn arena(&self, battle_id: Uuid) -> Arena {
        self.arenas
            .acquire(battle_id, || {
                Mutex::new(BattleOrchestrator::new(self.services.clone()))
            })
            .await
    }

    pub async fn release_arena(&self, battle_id: Uuid, arena: Arena) {
        self.arenas.release(battle_id, arena).await;
    }

    /// One voicebox per user, so one verse plays per user at a time.
    pub async fn voicebox(&self, user_id: Uuid) -> Arc<Voicebox> {
        self.voiceboxes
            .acquire(user_id, || Voicebox::new(self.synthesizer.clone()))
            .await
    }

    pub async fn release_voicebox(&self, user_id: Uuid, voicebox: Arc<Voicebox>) {
        self.voiceboxes.release(user_id, voicebox).await;
    }

    /// Arenas and voiceboxes currently leased out.
    pub async fn leased(&self) -> (usize, usize) {
        (self.arenas.len().await, self.voiceboxes.len().await)
    }
}
