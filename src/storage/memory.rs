//! In-memory store for development and tests.
//!
//! Implements the same merge and query semantics as the Postgres store, so
//! the contact rules and pagination math stay observable without a database.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use uuid::Uuid;

use crate::storage::{
    DayCount, EventFilter, EventStats, EventStore, EventTypeCount, Page, PageRequest,
    StorageAdapter, StorageResult,
};
use crate::webhook::record::{sao_paulo_offset, Contact, NormalizedEvent, StoredEvent};

/// Concurrent map store. Cheap to create, nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    events: DashMap<Uuid, StoredEvent>,
    contacts: DashMap<String, Contact>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

fn matches(filter: &EventFilter, event: &NormalizedEvent) -> bool {
    if let Some(event_id) = &filter.event_id {
        if &event.event_id != event_id {
            return false;
        }
    }
    if let Some(since) = filter.since {
        if event.received_at < since {
            return false;
        }
    }
    if let Some(until) = filter.until {
        if event.received_at >= until {
            return false;
        }
    }
    true
}

fn contact_from_event(event: &NormalizedEvent) -> Contact {
    Contact {
        number: event.numero_formatado.clone(),
        name: none_if_empty(&event.name),
        etiquetas: none_if_empty(&event.etiquetas),
        unread_messages: event.unread_messages,
        message_count: 1,
        last_message_text: none_if_empty(&event.mensagem_texto),
        last_message_at: event.mensagem_timestamp,
        first_seen: event.received_at,
        last_seen: event.received_at,
    }
}

// Mirrors the COALESCE clauses of the relational upsert: empty incoming
// values keep what is already stored, the counter always grows.
fn merge_contact(contact: &mut Contact, event: &NormalizedEvent) {
    if let Some(name) = none_if_empty(&event.name) {
        contact.name = Some(name);
    }
    if let Some(etiquetas) = none_if_empty(&event.etiquetas) {
        contact.etiquetas = Some(etiquetas);
    }
    contact.unread_messages = event.unread_messages;
    contact.message_count += 1;
    if let Some(text) = none_if_empty(&event.mensagem_texto) {
        contact.last_message_text = Some(text);
    }
    if let Some(at) = event.mensagem_timestamp {
        contact.last_message_at = Some(at);
    }
    contact.last_seen = event.received_at;
}

fn none_if_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[async_trait]
impl StorageAdapter for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn persist(&self, event: &NormalizedEvent, raw: &Value) -> StorageResult<()> {
        self.events.insert(
            event.id,
            StoredEvent {
                event: event.clone(),
                raw: raw.clone(),
            },
        );

        if !event.numero_formatado.is_empty() {
            self.contacts
                .entry(event.numero_formatado.clone())
                .and_modify(|contact| merge_contact(contact, event))
                .or_insert_with(|| contact_from_event(event));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn list(&self, filter: &EventFilter, page: PageRequest) -> StorageResult<Page> {
        let mut items: Vec<StoredEvent> = self
            .events
            .iter()
            .filter(|entry| matches(filter, &entry.event))
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by(|a, b| {
            b.event
                .received_at
                .cmp(&a.event.received_at)
                .then(a.event.id.cmp(&b.event.id))
        });

        let total = items.len() as u64;
        let items = items
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        Ok(Page { items, total })
    }

    async fn fetch(&self, id: Uuid) -> StorageResult<Option<StoredEvent>> {
        Ok(self.events.get(&id).map(|entry| entry.value().clone()))
    }

    async fn delete(&self, id: Uuid) -> StorageResult<bool> {
        Ok(self.events.remove(&id).is_some())
    }

    async fn delete_matching(&self, filter: &EventFilter) -> StorageResult<u64> {
        let mut removed = 0;
        self.events.retain(|_, stored| {
            if matches(filter, &stored.event) {
                removed += 1;
                false
            } else {
                true
            }
        });
        Ok(removed)
    }

    async fn stats(&self, filter: &EventFilter) -> StorageResult<EventStats> {
        let mut total = 0i64;
        let mut by_event: HashMap<String, i64> = HashMap::new();
        let mut by_day: BTreeMap<String, i64> = BTreeMap::new();

        for entry in self.events.iter() {
            let event = &entry.event;
            if !matches(filter, event) {
                continue;
            }
            total += 1;
            *by_event.entry(event.event_id.clone()).or_default() += 1;
            let dia = event
                .received_at
                .with_timezone(&sao_paulo_offset())
                .format("%Y-%m-%d")
                .to_string();
            *by_day.entry(dia).or_default() += 1;
        }

        let mut por_evento: Vec<EventTypeCount> = by_event
            .into_iter()
            .map(|(event_id, total)| EventTypeCount { event_id, total })
            .collect();
        por_evento.sort_by(|a, b| b.total.cmp(&a.total).then(a.event_id.cmp(&b.event_id)));

        let por_dia: Vec<DayCount> = by_day
            .into_iter()
            .rev()
            .map(|(dia, total)| DayCount { dia, total })
            .collect();

        Ok(EventStats {
            total,
            por_evento,
            por_dia,
        })
    }

    async fn contact(&self, number: &str) -> StorageResult<Option<Contact>> {
        Ok(self.contacts.get(number).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook::normalizer::normalize;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn seed(store: &MemoryStore, payload: Value, hour: u32) -> Uuid {
        let received = Utc.with_ymd_and_hms(2024, 3, 10, hour, 0, 0).unwrap();
        let id = Uuid::new_v4();
        let event = normalize(&payload, id, received);
        block_on(store.persist(&event, &payload)).unwrap();
        id
    }

    // Small helper so unit tests stay synchronous where possible.
    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(future)
    }

    fn message(number: &str, text: &str) -> Value {
        json!({
            "eventID": "msg",
            "number": number,
            "lastMessage": {"text": text, "type": "chat", "timestamp": 1700000000}
        })
    }

    #[tokio::test]
    async fn persists_and_fetches_with_raw_payload() {
        let store = MemoryStore::new();
        let payload = message("5511999@c.us", "oi");
        let event = normalize(&payload, Uuid::new_v4(), Utc::now());
        store.persist(&event, &payload).await.unwrap();

        let stored = store.fetch(event.id).await.unwrap().unwrap();
        assert_eq!(stored.event.mensagem_texto, "oi");
        assert_eq!(stored.raw, payload);
    }

    #[tokio::test]
    async fn contact_counter_grows_with_every_event() {
        let store = MemoryStore::new();
        let payload = message("5511999@c.us", "oi");
        for _ in 0..3 {
            let event = normalize(&payload, Uuid::new_v4(), Utc::now());
            store.persist(&event, &payload).await.unwrap();
        }

        let contact = store.contact("5511999").await.unwrap().unwrap();
        assert_eq!(contact.message_count, 3);
    }

    #[tokio::test]
    async fn contact_keeps_fields_the_new_event_left_empty() {
        let store = MemoryStore::new();
        let first = json!({
            "eventID": "msg",
            "name": "Ana",
            "number": "5511999@c.us",
            "labels": [{"name": "Lead"}],
            "lastMessage": {"text": "oi", "type": "chat", "timestamp": 1700000000}
        });
        let event = normalize(&first, Uuid::new_v4(), Utc::now());
        store.persist(&event, &first).await.unwrap();

        // Second event carries nothing but the number.
        let second = json!({"eventID": "ack", "number": "5511999@c.us"});
        let event = normalize(&second, Uuid::new_v4(), Utc::now());
        store.persist(&event, &second).await.unwrap();

        let contact = store.contact("5511999").await.unwrap().unwrap();
        assert_eq!(contact.name.as_deref(), Some("Ana"));
        assert_eq!(contact.etiquetas.as_deref(), Some("Lead"));
        assert_eq!(contact.last_message_text.as_deref(), Some("oi"));
        assert_eq!(contact.message_count, 2);
    }

    #[tokio::test]
    async fn contact_updates_fields_the_new_event_carries() {
        let store = MemoryStore::new();
        let first = json!({"eventID": "msg", "name": "Ana", "number": "55@c.us"});
        let event = normalize(&first, Uuid::new_v4(), Utc::now());
        store.persist(&event, &first).await.unwrap();

        let second = json!({"eventID": "msg", "name": "Ana Paula", "number": "55@c.us"});
        let event = normalize(&second, Uuid::new_v4(), Utc::now());
        store.persist(&event, &second).await.unwrap();

        let contact = store.contact("55").await.unwrap().unwrap();
        assert_eq!(contact.name.as_deref(), Some("Ana Paula"));
    }

    #[tokio::test]
    async fn first_seen_is_immutable() {
        let store = MemoryStore::new();
        let payload = message("55@c.us", "a");
        let early = Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();

        let event = normalize(&payload, Uuid::new_v4(), early);
        store.persist(&event, &payload).await.unwrap();
        let event = normalize(&payload, Uuid::new_v4(), late);
        store.persist(&event, &payload).await.unwrap();

        let contact = store.contact("55").await.unwrap().unwrap();
        assert_eq!(contact.first_seen, early);
        assert_eq!(contact.last_seen, late);
    }

    #[tokio::test]
    async fn events_without_a_number_do_not_create_contacts() {
        let store = MemoryStore::new();
        let payload = json!({"eventID": "status"});
        let event = normalize(&payload, Uuid::new_v4(), Utc::now());
        store.persist(&event, &payload).await.unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.contact("").await.unwrap().is_none());
    }

    #[test]
    fn list_paginates_newest_first() {
        let store = MemoryStore::new();
        for hour in 8..13 {
            seed(&store, json!({"eventID": "msg"}), hour);
        }

        let page = block_on(store.list(
            &EventFilter::default(),
            PageRequest { page: 2, limit: 2 },
        ))
        .unwrap();

        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        // Newest first: page 2 of limit 2 holds the 10:00 and 09:00 events.
        assert_eq!(page.items[0].event.data_hora, "10/03/2024 07:00:00");
        assert_eq!(page.items[1].event.data_hora, "10/03/2024 06:00:00");
    }

    #[test]
    fn list_filters_by_event_type_and_window() {
        let store = MemoryStore::new();
        seed(&store, json!({"eventID": "msg"}), 8);
        seed(&store, json!({"eventID": "ack"}), 9);
        seed(&store, json!({"eventID": "msg"}), 10);

        let filter = EventFilter {
            event_id: Some("msg".into()),
            ..Default::default()
        };
        let page = block_on(store.list(&filter, PageRequest { page: 1, limit: 10 })).unwrap();
        assert_eq!(page.total, 2);

        let filter = EventFilter {
            since: Some(Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap()),
            until: Some(Utc.with_ymd_and_hms(2024, 3, 10, 10, 0, 0).unwrap()),
            ..Default::default()
        };
        let page = block_on(store.list(&filter, PageRequest { page: 1, limit: 10 })).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].event.event_id, "ack");
    }

    #[test]
    fn absurd_page_numbers_yield_an_empty_page() {
        let store = MemoryStore::new();
        seed(&store, json!({"eventID": "msg"}), 8);
        seed(&store, json!({"eventID": "msg"}), 9);

        let page = block_on(store.list(
            &EventFilter::default(),
            PageRequest {
                page: u64::MAX,
                limit: 50,
            },
        ))
        .unwrap();

        assert_eq!(page.total, 2);
        assert!(page.items.is_empty());
    }

    #[test]
    fn stats_group_by_type_and_local_day() {
        let store = MemoryStore::new();
        seed(&store, json!({"eventID": "msg"}), 8);
        seed(&store, json!({"eventID": "msg"}), 9);
        seed(&store, json!({"eventID": "ack"}), 10);
        // 01:00 UTC is still the previous day in São Paulo.
        seed(&store, json!({"eventID": "msg"}), 1);

        let stats = block_on(store.stats(&EventFilter::default())).unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.por_evento[0].event_id, "msg");
        assert_eq!(stats.por_evento[0].total, 3);
        assert_eq!(stats.por_evento[1].event_id, "ack");
        assert_eq!(stats.por_evento[1].total, 1);

        assert_eq!(stats.por_dia.len(), 2);
        assert_eq!(stats.por_dia[0].dia, "2024-03-10");
        assert_eq!(stats.por_dia[0].total, 3);
        assert_eq!(stats.por_dia[1].dia, "2024-03-09");
        assert_eq!(stats.por_dia[1].total, 1);
    }

    #[test]
    fn delete_single_and_matching() {
        let store = MemoryStore::new();
        let keep = seed(&store, json!({"eventID": "ack"}), 8);
        seed(&store, json!({"eventID": "msg"}), 9);
        seed(&store, json!({"eventID": "msg"}), 10);

        let filter = EventFilter {
            event_id: Some("msg".into()),
            ..Default::default()
        };
        assert_eq!(block_on(store.delete_matching(&filter)).unwrap(), 2);
        assert_eq!(store.len(), 1);

        assert!(block_on(store.delete(keep)).unwrap());
        assert!(!block_on(store.delete(keep)).unwrap());
        assert!(store.is_empty());
    }
}
