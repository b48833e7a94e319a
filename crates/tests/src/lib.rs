//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - Message contract snapshots
//! - Configuration to dispatcher wiring
//! - End-to-end delivery against the in-memory broker

#[cfg(test)]
mod contract_tests {
    use contracts::{ChangeRecord, EntityState, ProductionArea};
    use dispatcher::codec;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_created_message_contract() {
        let area = ProductionArea {
            production_area_id: Uuid::nil(),
            store_id: Uuid::from_u128(7),
            restrictions: vec!["nuts".to_string()],
            on: true,
        };

        let message = codec::encode(&ChangeRecord::created(area))
            .unwrap()
            .unwrap();
        let payload: serde_json::Value = serde_json::from_slice(&message.payload).unwrap();

        assert_eq!(message.label, Uuid::from_u128(7).to_string());
        assert_eq!(
            payload,
            json!({
                "state": "created",
                "productionArea": {
                    "productionAreaId": "00000000-0000-0000-0000-000000000000",
                    "storeId": "00000000-0000-0000-0000-000000000007",
                    "restrictions": ["nuts"],
                    "on": true
                }
            })
        );
    }

    #[test]
    fn test_state_names() {
        let area = ProductionArea::new(Uuid::new_v4(), vec![], false);
        let states: Vec<_> = [
            EntityState::Modified,
            EntityState::Deleted,
            EntityState::Unchanged,
        ]
        .into_iter()
        .map(|state| {
            codec::encode(&ChangeRecord::new(area.clone(), state))
                .unwrap()
                .map(|m| serde_json::from_slice::<serde_json::Value>(&m.payload).unwrap()["state"].clone())
        })
        .collect();

        assert_eq!(
            states,
            vec![Some(json!("updated")), Some(json!("deleted")), None]
        );
    }

    #[test]
    fn test_message_ids_are_unique_per_encode() {
        let record = ChangeRecord::updated(ProductionArea::new(Uuid::new_v4(), vec![], true));
        let first = codec::encode(&record).unwrap().unwrap();
        let second = codec::encode(&record).unwrap().unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(first.payload, second.payload);
    }
}

#[cfg(test)]
mod config_tests {
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::DispatcherConfig;

    #[test]
    fn test_service_config_drives_dispatcher_config() {
        let service = ConfigLoader::load_from_str(
            r#"
[service_bus]
connection_string = "Endpoint=sb://bus.example.net/"

[dispatcher]
topic = "AreaEvents"
topic_size_mb = 2048
retry_base_delay_ms = 250
max_backoff_multiplier = 8
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let config = DispatcherConfig::from(&service);
        assert_eq!(config.connection_string, "Endpoint=sb://bus.example.net/");
        assert_eq!(config.topic, "AreaEvents");
        assert_eq!(config.topic_size_mb, 2048);
        assert_eq!(config.retry.base_delay, Duration::from_millis(250));
        assert_eq!(config.retry.max_multiplier, 8);
    }

    #[test]
    fn test_missing_connection_string_is_rejected() {
        let result = ConfigLoader::load_from_str("[service_bus]\nconnection_string = \"\"\n", ConfigFormat::Toml);
        assert!(result.is_err());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use contracts::{ChangeRecord, DispatcherConfig, ProductionArea, RetryConfig};
    use dispatcher::{ChangeDispatcher, FailureKind, InMemoryBroker};
    use uuid::Uuid;

    fn config(base_delay: Duration) -> DispatcherConfig {
        DispatcherConfig::new("Endpoint=sb://local/").with_retry(RetryConfig {
            base_delay,
            max_multiplier: 4,
        })
    }

    async fn dispatcher(broker: &InMemoryBroker, base_delay: Duration) -> ChangeDispatcher<InMemoryBroker> {
        ChangeDispatcher::new(config(base_delay), broker, broker.clone())
            .await
            .unwrap()
    }

    fn area_for(store: u128) -> ProductionArea {
        ProductionArea::new(Uuid::from_u128(store), vec![], true)
    }

    /// Area ids in delivery order, grouped by store label
    fn delivered_by_store(broker: &InMemoryBroker) -> HashMap<String, Vec<Uuid>> {
        let mut by_store: HashMap<String, Vec<Uuid>> = HashMap::new();
        for delivery in broker.deliveries() {
            let payload: serde_json::Value =
                serde_json::from_slice(&delivery.message.payload).unwrap();
            let id = payload["productionArea"]["productionAreaId"]
                .as_str()
                .unwrap()
                .parse()
                .unwrap();
            by_store.entry(delivery.message.label).or_default().push(id);
        }
        by_store
    }

    /// Head fails twice, then A, B and C go out in order
    #[tokio::test]
    async fn test_head_of_line_retry() {
        let broker = InMemoryBroker::new();
        let dispatcher = dispatcher(&broker, Duration::from_millis(2)).await;
        broker.fail_next_sends(2, FailureKind::Connectivity);

        let records = (1..=3).map(|store| ChangeRecord::created(area_for(store)));
        assert_eq!(dispatcher.dispatch_changes(records).unwrap(), 3);
        dispatcher.wait_until_idle().await;

        let attempts: Vec<_> = broker
            .attempts()
            .into_iter()
            .map(|a| (a.label, a.succeeded))
            .collect();
        let label = |store: u128| Uuid::from_u128(store).to_string();
        assert_eq!(
            attempts,
            vec![
                (label(1), false),
                (label(1), false),
                (label(1), true),
                (label(2), true),
                (label(3), true),
            ]
        );
        assert_eq!(dispatcher.pending_len(), 0);
        assert!(!dispatcher.is_dispatching());

        let metrics = dispatcher.metrics();
        assert_eq!(metrics.sent_count, 3);
        assert_eq!(metrics.failure_count, 2);
        assert_eq!(metrics.queue_len, 0);
    }

    /// Two triggers from an empty queue share one loop and one client
    #[tokio::test]
    async fn test_concurrent_triggers_share_one_loop() {
        let broker = InMemoryBroker::new();
        let dispatcher = dispatcher(&broker, Duration::from_millis(2)).await;
        broker.set_send_delay(Duration::from_millis(5));

        let first: Vec<_> = (0..2).map(|_| area_for(1)).collect();
        let second: Vec<_> = (0..2).map(|_| area_for(2)).collect();

        dispatcher
            .dispatch_changes(first.iter().cloned().map(ChangeRecord::created))
            .unwrap();
        dispatcher
            .dispatch_changes(second.iter().cloned().map(ChangeRecord::created))
            .unwrap();
        dispatcher.wait_until_idle().await;

        let by_store = delivered_by_store(&broker);
        let ids = |areas: &[ProductionArea]| -> Vec<Uuid> {
            areas.iter().map(|a| a.production_area_id).collect()
        };
        assert_eq!(by_store[&Uuid::from_u128(1).to_string()], ids(&first));
        assert_eq!(by_store[&Uuid::from_u128(2).to_string()], ids(&second));

        assert_eq!(broker.max_open_clients(), 1);
        assert_eq!(broker.max_in_flight(), 1);
        assert_eq!(dispatcher.metrics().loops_started, 1);
    }

    /// Reported queue length matches the queue once racing triggers drain
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_queue_len_metric_settles_at_zero() {
        let broker = InMemoryBroker::new();
        let dispatcher = dispatcher(&broker, Duration::from_millis(1)).await;

        for round in 0..50u128 {
            let handles: Vec<_> = (0..16u128)
                .map(|i| {
                    let dispatcher = dispatcher.clone();
                    tokio::spawn(async move {
                        dispatcher.dispatch_changes(vec![ChangeRecord::created(area_for(
                            round * 16 + i,
                        ))])
                    })
                })
                .collect();
            for handle in handles {
                assert_eq!(handle.await.unwrap().unwrap(), 1);
            }
            dispatcher.wait_until_idle().await;

            assert_eq!(dispatcher.pending_len(), 0);
            assert_eq!(dispatcher.metrics().queue_len, 0, "round {round}");
        }
        assert_eq!(broker.deliveries().len(), 800);
    }

    /// Many tasks trigger at once on a multi-threaded runtime
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_triggers_deliver_everything_once() {
        let broker = InMemoryBroker::new();
        let dispatcher = dispatcher(&broker, Duration::from_millis(1)).await;
        broker.set_send_delay(Duration::from_millis(1));
        broker.fail_next_sends(3, FailureKind::Transport);

        let mut handles = Vec::new();
        let mut expected = HashMap::new();
        for store in 1..=8u128 {
            let areas: Vec<_> = (0..5).map(|_| area_for(store)).collect();
            expected.insert(
                Uuid::from_u128(store).to_string(),
                areas.iter().map(|a| a.production_area_id).collect::<Vec<_>>(),
            );

            let dispatcher = dispatcher.clone();
            handles.push(tokio::spawn(async move {
                dispatcher.dispatch_changes(areas.into_iter().map(ChangeRecord::updated))
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 5);
        }
        dispatcher.wait_until_idle().await;

        assert_eq!(broker.deliveries().len(), 40);
        assert_eq!(delivered_by_store(&broker), expected);
        assert_eq!(broker.max_in_flight(), 1);
        assert_eq!(broker.max_open_clients(), 1);
        assert_eq!(broker.clients_opened(), broker.clients_closed());
        assert_eq!(dispatcher.metrics().sent_count, 40);
    }

    /// A trigger during backoff joins the running loop behind the failing head
    #[tokio::test]
    async fn test_trigger_during_backoff_queues_behind_head() {
        let broker = InMemoryBroker::new();
        let dispatcher = dispatcher(&broker, Duration::from_millis(30)).await;
        broker.fail_next_sends(1, FailureKind::Transport);

        dispatcher
            .dispatch_changes(vec![ChangeRecord::created(area_for(1))])
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(dispatcher.is_dispatching());
        assert_eq!(dispatcher.pending_len(), 1);

        dispatcher
            .dispatch_changes(vec![ChangeRecord::created(area_for(2))])
            .unwrap();
        assert_eq!(dispatcher.pending_len(), 2);
        dispatcher.wait_until_idle().await;

        let labels: Vec<_> = broker.attempts().into_iter().map(|a| a.label).collect();
        assert_eq!(
            labels,
            vec![
                Uuid::from_u128(1).to_string(),
                Uuid::from_u128(1).to_string(),
                Uuid::from_u128(2).to_string(),
            ]
        );
        assert_eq!(dispatcher.metrics().loops_started, 1);
    }

    /// Dispatchers sharing a broker provision the topic once
    #[tokio::test]
    async fn test_provisioning_is_idempotent() {
        let broker = InMemoryBroker::new();
        let _first = dispatcher(&broker, Duration::from_millis(1)).await;
        let second = dispatcher(&broker, Duration::from_millis(1)).await;

        assert_eq!(broker.create_requests(), 1);
        assert_eq!(broker.topics(), vec!["ProductionAreaChanged".to_string()]);

        second
            .dispatch_changes(vec![ChangeRecord::deleted(area_for(3))])
            .unwrap();
        second.wait_until_idle().await;
        assert_eq!(broker.deliveries()[0].topic, "ProductionAreaChanged");
    }

    /// Shutdown during an outage leaves the message queued for inspection
    #[tokio::test]
    async fn test_shutdown_during_outage_leaves_message_queued() {
        let broker = InMemoryBroker::new();
        let dispatcher = dispatcher(&broker, Duration::from_secs(5)).await;
        broker.fail_next_sends(1, FailureKind::Connectivity);

        let area = area_for(4);
        dispatcher
            .dispatch_changes(vec![ChangeRecord::updated(area.clone())])
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(dispatcher.shutdown().await, 1);
        assert!(broker.deliveries().is_empty());

        let pending = dispatcher.pending_messages();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].label, area.store_id.to_string());
    }
}
