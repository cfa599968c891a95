//! In-memory session storage that forgets idle sessions and never grows past a fixed size.
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tower_sessions::SessionStore;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store;
use tracing::debug;

#[derive(Clone, Debug)]
pub(crate) struct BoundedMemoryStore {
    records: Arc<Mutex<HashMap<Id, Record>>>,
    max_sessions: usize,
}

impl BoundedMemoryStore {
    pub(crate) fn new(max_sessions: usize) -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            max_sessions: max_sessions.max(1),
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.records.lock().await.len()
    }
}

fn is_active(record: &Record, now: OffsetDateTime) -> bool {
    record.expiry_date > now
}

/// Drops expired records, then evicts the soonest-to-expire ones until `incoming` fits.
fn make_room(records: &mut HashMap<Id, Record>, incoming: &Id, max_sessions: usize) {
    let now = OffsetDateTime::now_utc();
    records.retain(|_, record| is_active(record, now));
    if records.contains_key(incoming) {
        return;
    }
    while records.len() >= max_sessions {
        let Some(oldest) = records
            .values()
            .min_by_key(|record| record.expiry_date)
            .map(|record| record.id)
        else {
            break;
        };
        debug!("session store full, evicting least recently active session");
        records.remove(&oldest);
    }
}

#[async_trait]
impl SessionStore for BoundedMemoryStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        let mut records = self.records.lock().await;
        while records.contains_key(&record.id) {
            record.id = Id::default();
        }
        make_room(&mut records, &record.id, self.max_sessions);
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        let mut records = self.records.lock().await;
        make_room(&mut records, &record.id, self.max_sessions);
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let mut records = self.records.lock().await;
        let now = OffsetDateTime::now_utc();
        match records.get(session_id) {
            Some(record) if is_active(record, now) => Ok(Some(record.clone())),
            Some(_) => {
                records.remove(session_id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.records.lock().await.remove(session_id);
        Ok(())
    }
}
