//! In-process change notifications for transactions.
//!
//! Writers publish every insert and update; admin sessions subscribe and merge
//! events into a [`TransactionView`] keyed by id.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::db::entity::transaction;

const FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub old: Option<transaction::Model>,
    pub new: Option<transaction::Model>,
}

impl ChangeEvent {
    pub fn insert(new: transaction::Model) -> Self {
        Self { kind: ChangeKind::Insert, old: None, new: Some(new) }
    }

    pub fn update(old: Option<transaction::Model>, new: transaction::Model) -> Self {
        Self { kind: ChangeKind::Update, old, new: Some(new) }
    }

    pub fn delete(old: transaction::Model) -> Self {
        Self { kind: ChangeKind::Delete, old: Some(old), new: None }
    }
}

#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, event: ChangeEvent) {
        // No receivers is normal when no admin is watching
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Admin-side view of the transaction table.
///
/// Events are applied in arrival order, last writer wins per id, and applying
/// the same event twice leaves the view unchanged.
#[derive(Debug, Default, Clone)]
pub struct TransactionView {
    rows: HashMap<Uuid, transaction::Model>,
}

impl TransactionView {
    pub fn new(snapshot: Vec<transaction::Model>) -> Self {
        Self {
            rows: snapshot
                .into_iter()
                .map(|tx| (tx.id, tx))
                .collect(),
        }
    }

    /// Merge one event. Returns `true` when the view changed.
    pub fn apply(&mut self, event: &ChangeEvent) -> bool {
        match event.kind {
            ChangeKind::Insert | ChangeKind::Update => {
                let Some(new) = &event.new else {
                    return false;
                };
                if self.rows.get(&new.id) == Some(new) {
                    return false;
                }
                self.rows.insert(new.id, new.clone());
                true
            }
            ChangeKind::Delete => {
                let Some(old) = &event.old else {
                    return false;
                };
                self.rows.remove(&old.id).is_some()
            }
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<&transaction::Model> {
        self.rows.get(id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows newest first.
    pub fn rows(&self) -> Vec<transaction::Model> {
        let mut rows: Vec<_> = self.rows.values().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn tx(status: &str) -> transaction::Model {
        let now = Utc::now();
        transaction::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            origin_country: "VE".to_string(),
            destination_country: "CO".to_string(),
            amount: dec!(1000000),
            rate: dec!(0.00008),
            operation: "multiply".to_string(),
            currency: "COP".to_string(),
            received_amount: 80,
            payment_method_origin_id: None,
            payment_method_destination_id: None,
            payment_reference: None,
            destination_reference_number: None,
            admin_reference_number: None,
            status: status.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut view = TransactionView::default();
        let event = ChangeEvent::insert(tx("Creando"));

        assert!(view.apply(&event));
        assert!(!view.apply(&event));
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn test_last_writer_wins() {
        let original = tx("Procesando");
        let mut view = TransactionView::new(vec![original.clone()]);

        let mut completed = original.clone();
        completed.status = "Completado".to_string();
        let mut cancelled = original.clone();
        cancelled.status = "Cancelada".to_string();

        view.apply(&ChangeEvent::update(Some(original.clone()), completed.clone()));
        view.apply(&ChangeEvent::update(Some(completed), cancelled));

        assert_eq!(view.get(&original.id).unwrap().status, "Cancelada");
    }

    #[test]
    fn test_delete_removes_row_once() {
        let row = tx("Creando");
        let mut view = TransactionView::new(vec![row.clone()]);

        assert!(view.apply(&ChangeEvent::delete(row.clone())));
        assert!(!view.apply(&ChangeEvent::delete(row)));
        assert!(view.is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_receive_published_events() {
        let feed = ChangeFeed::new();
        let mut rx = feed.subscribe();

        feed.publish(ChangeEvent::insert(tx("Creando")));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Insert);
    }
}
