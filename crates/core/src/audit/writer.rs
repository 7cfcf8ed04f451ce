use std::sync::Arc;

use tokio::sync::mpsc;

use super::{AuditEventEnvelope, AuditHandle, AuditRecord, AuditStore};

/// Background task draining the audit channel into an [`AuditStore`].
pub struct AuditWriter {
    rx: mpsc::Receiver<AuditEventEnvelope>,
    store: Arc<dyn AuditStore>,
}

impl AuditWriter {
    pub fn new(rx: mpsc::Receiver<AuditEventEnvelope>, store: Arc<dyn AuditStore>) -> Self {
        Self { rx, store }
    }

    /// Consume events until every [`AuditHandle`] has been dropped.
    pub async fn run(mut self) {
        tracing::info!("Audit writer started");

        while let Some(envelope) = self.rx.recv().await {
            let record = AuditRecord {
                id: 0,
                timestamp: envelope.timestamp,
                event_type: envelope.event.event_type().to_string(),
                parcel_id: envelope.event.parcel_id(),
                user_id: envelope.event.user_id(),
                data: envelope.event,
            };

            if let Err(e) = self.store.insert(&record) {
                tracing::error!(event_type = %record.event_type, "Failed to write audit event: {}", e);
            }
        }

        tracing::info!("Audit writer shutting down");
    }
}

/// Wire a handle to a writer over a bounded channel.
///
/// Spawn the writer with `tokio::spawn(writer.run())` and clone the handle
/// into every component that emits events.
pub fn create_audit_system(
    store: Arc<dyn AuditStore>,
    buffer_size: usize,
) -> (AuditHandle, AuditWriter) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (AuditHandle::new(tx), AuditWriter::new(rx, store))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use rust_decimal::Decimal;

    use super::*;
    use crate::audit::{AuditError, AuditEvent, AuditFilter};

    struct MockStore {
        records: Mutex<Vec<AuditRecord>>,
        should_fail: bool,
    }

    impl MockStore {
        fn new() -> Self {
            Self {
                records: Mutex::new(Vec::new()),
                should_fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                records: Mutex::new(Vec::new()),
                should_fail: true,
            }
        }

        fn get_records(&self) -> Vec<AuditRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    impl AuditStore for MockStore {
        fn insert(&self, record: &AuditRecord) -> Result<i64, AuditError> {
            if self.should_fail {
                return Err(AuditError::Database("Mock failure".to_string()));
            }
            let mut records = self.records.lock().unwrap();
            let id = records.len() as i64 + 1;
            let mut stored = record.clone();
            stored.id = id;
            records.push(stored);
            Ok(id)
        }

        fn query(&self, _filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditError> {
            Ok(self.records.lock().unwrap().clone())
        }

        fn count(&self, _filter: &AuditFilter) -> Result<i64, AuditError> {
            Ok(self.records.lock().unwrap().len() as i64)
        }
    }

    fn parcel_created(parcel_id: i64, user_id: i64) -> AuditEvent {
        AuditEvent::ParcelCreated {
            parcel_id,
            user_id,
            recipient_id: 1,
            tracking_number: "0123456789abcdef0123456789abcdef".to_string(),
            cost: Decimal::new(500, 2),
        }
    }

    fn spawn_system(store: &Arc<MockStore>) -> (AuditHandle, tokio::task::JoinHandle<()>) {
        let store_dyn: Arc<dyn AuditStore> = Arc::clone(store) as Arc<dyn AuditStore>;
        let (handle, writer) = create_audit_system(store_dyn, 100);
        (handle, tokio::spawn(writer.run()))
    }

    #[tokio::test]
    async fn test_writer_stores_events_with_ids() {
        let store = Arc::new(MockStore::new());
        let (handle, writer_handle) = spawn_system(&store);

        handle.emit(parcel_created(42, 7)).await;
        drop(handle);
        writer_handle.await.unwrap();

        let records = store.get_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event_type, "parcel_created");
        assert_eq!(records[0].parcel_id, Some(42));
        assert_eq!(records[0].user_id, Some(7));
    }

    #[tokio::test]
    async fn test_writer_continues_on_insert_failure() {
        let store = Arc::new(MockStore::failing());
        let (handle, writer_handle) = spawn_system(&store);

        handle.emit(parcel_created(1, 1)).await;
        handle.emit(parcel_created(2, 1)).await;
        drop(handle);

        writer_handle.await.unwrap();
        assert!(store.get_records().is_empty());
    }

    #[tokio::test]
    async fn test_writer_waits_for_all_handles() {
        let store = Arc::new(MockStore::new());
        let (main_handle, writer_handle) = spawn_system(&store);
        let manager_handle = main_handle.clone();

        manager_handle.emit(parcel_created(1, 1)).await;
        main_handle
            .emit(AuditEvent::ServiceStopped {
                reason: "graceful_shutdown".to_string(),
            })
            .await;

        drop(main_handle);
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        assert!(
            !writer_handle.is_finished(),
            "Writer should still be running with handles alive"
        );

        drop(manager_handle);
        let result = tokio::time::timeout(tokio::time::Duration::from_secs(1), writer_handle).await;
        assert!(result.is_ok(), "Writer should exit once all handles dropped");

        let records = store.get_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].event_type, "parcel_created");
        assert_eq!(records[1].event_type, "service_stopped");
    }
}
