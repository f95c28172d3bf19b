//! `GET /api/admin/transactions/stream`: a snapshot of every transaction,
//! then each change that altered the session's view.

use std::time::Duration;

use axum::{
    extract::{ ws::{ Message, WebSocket, WebSocketUpgrade }, State },
    response::IntoResponse,
};
use futures_util::{ stream::SplitSink, SinkExt, StreamExt };
use serde::Serialize;
use tokio::sync::broadcast;

use crate::auth::Caller;
use crate::db::entity::transaction;
use crate::error::Result;
use crate::feed::{ ChangeEvent, TransactionView };
use crate::services::admin_service::TransactionQuery;

use super::AppState;

const HEARTBEAT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
enum StreamMessage<'a> {
    Snapshot(Vec<transaction::Model>),
    Change(&'a ChangeEvent),
}

pub async fn transaction_stream(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    caller: Caller
) -> Result<impl IntoResponse> {
    caller.require_admin()?;

    // Subscribe before reading the snapshot; overlapping events merge as no-ops
    let events = state.feed.subscribe();
    let snapshot = state.admin_service.list_transactions(&caller, TransactionQuery::default()).await?;

    tracing::info!("Admin {} opened the transaction stream", caller.user_id);
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, caller, snapshot, events)))
}

async fn send_json(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &StreamMessage<'_>
) -> bool {
    let text = match serde_json::to_string(message) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("Failed to encode stream message: {}", e);
            return true;
        }
    };

    match sender.send(Message::Text(text.into())).await {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!("Stream send failed: {}", e);
            false
        }
    }
}

/// What a received feed item turns into on the wire.
enum Outgoing {
    Change(ChangeEvent),
    Snapshot(Vec<transaction::Model>),
    Skip,
    Close,
}

/// Merge one feed item into `view`. After a lag the view has lost events, so
/// it is rebuilt from the store and resent whole.
async fn next_outgoing(
    state: &AppState,
    caller: &Caller,
    view: &mut TransactionView,
    received: std::result::Result<ChangeEvent, broadcast::error::RecvError>
) -> Outgoing {
    match received {
        Ok(event) => {
            if view.apply(&event) { Outgoing::Change(event) } else { Outgoing::Skip }
        }
        Err(broadcast::error::RecvError::Lagged(n)) => {
            tracing::warn!("Transaction stream missed {} events, resending snapshot", n);
            match state.admin_service.list_transactions(caller, TransactionQuery::default()).await {
                Ok(snapshot) => {
                    *view = TransactionView::new(snapshot.clone());
                    Outgoing::Snapshot(snapshot)
                }
                Err(e) => {
                    tracing::error!("Failed to reload transaction snapshot: {}", e);
                    Outgoing::Close
                }
            }
        }
        Err(broadcast::error::RecvError::Closed) => Outgoing::Close,
    }
}

async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    caller: Caller,
    snapshot: Vec<transaction::Model>,
    mut events: broadcast::Receiver<ChangeEvent>
) {
    let (mut sender, mut receiver) = socket.split();

    let mut view = TransactionView::new(snapshot.clone());
    if !send_json(&mut sender, &StreamMessage::Snapshot(snapshot)).await {
        return;
    }

    let mut heartbeat = tokio::time::interval(HEARTBEAT);

    loop {
        tokio::select! {
            received = events.recv() => {
                let sent = match next_outgoing(&state, &caller, &mut view, received).await {
                    Outgoing::Change(event) => send_json(&mut sender, &StreamMessage::Change(&event)).await,
                    Outgoing::Snapshot(rows) => send_json(&mut sender, &StreamMessage::Snapshot(rows)).await,
                    Outgoing::Skip => true,
                    Outgoing::Close => false,
                };
                if !sent {
                    break;
                }
            }

            _ = heartbeat.tick() => {
                if sender.send(Message::Ping(axum::body::Bytes::new())).await.is_err() {
                    break;
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!("Stream receive error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    tracing::info!("Transaction stream closed ({} rows in view)", view.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::{ Repositories, TransactionRepository };
    use crate::enums::{ Role, TxStatus };
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn sample_transaction() -> transaction::Model {
        let now = Utc::now();
        transaction::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            origin_country: "VE".to_string(),
            destination_country: "CO".to_string(),
            amount: dec!(1000),
            rate: dec!(0.5),
            operation: "multiply".to_string(),
            currency: "COP".to_string(),
            received_amount: 500,
            payment_method_origin_id: None,
            payment_method_destination_id: None,
            payment_reference: None,
            destination_reference_number: None,
            admin_reference_number: None,
            status: TxStatus::Creando.as_str().to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_lagged_stream_resends_snapshot() {
        let repos = Repositories::in_memory();
        let transactions = repos.transactions.clone();
        let state = AppState::new(Config::for_memory("stream-test-secret-0123456789"), repos);
        let admin = Caller { user_id: Uuid::new_v4(), role: Role::Administrador };

        let stored = transactions.insert(sample_transaction()).await.unwrap();
        let mut events = state.feed.subscribe();
        for _ in 0..300 {
            state.feed.publish(ChangeEvent::insert(sample_transaction()));
        }

        let mut view = TransactionView::new(Vec::new());
        let received = events.recv().await;
        assert!(matches!(received, Err(broadcast::error::RecvError::Lagged(_))));

        match next_outgoing(&state, &admin, &mut view, received).await {
            Outgoing::Snapshot(rows) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].id, stored.id);
            }
            _ => panic!("expected a fresh snapshot"),
        }
        assert_eq!(view.len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_event_is_skipped() {
        let state = AppState::new(
            Config::for_memory("stream-test-secret-0123456789"),
            Repositories::in_memory()
        );
        let admin = Caller { user_id: Uuid::new_v4(), role: Role::Administrador };
        let tx = sample_transaction();
        let mut view = TransactionView::new(vec![tx.clone()]);

        let outgoing = next_outgoing(&state, &admin, &mut view, Ok(ChangeEvent::insert(tx))).await;
        assert!(matches!(outgoing, Outgoing::Skip));
    }
}
