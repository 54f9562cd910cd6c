//! # Coordinator Flow
//!
//! Drives an `EngineCoordinator` only through the management bus, the way
//! the runtime does:
//!
//! 1. **Selection**: builds announce themselves, the coordinator deploys by
//!    priority and publishes `SelectedEngine`
//! 2. **Updates**: `AddSubscription` / `DeleteSubscription` reach every
//!    engine, including the ones not serving traffic
//! 3. **Statistics**: the ticker publishes traffic windows

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    use shared_bus::{
        EventFilter, EventPublisher, EventTopic, InMemoryEventBus, ManagementEvent, Subscription,
    };

    use fc_01_filter_engines::{
        CoordinatorConfig, EngineCoordinator, EngineKind, EngineState, FilteringApi,
        ManagementBusAdapter, Subscriptions,
    };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn subscriptions() -> Subscriptions {
        let mut subs = Subscriptions::new();
        subs.insert("0011", "http://localhost/a", 1.0).unwrap();
        subs.insert("00110000", "http://localhost/a2", 0.0).unwrap();
        subs.insert("1111", "http://localhost/b", 0.5).unwrap();
        subs
    }

    /// Coordinator with its bus adapter already running
    fn spawn_coordinator(
        config: CoordinatorConfig,
    ) -> (Arc<InMemoryEventBus>, Arc<EngineCoordinator>, JoinHandle<()>) {
        let bus = Arc::new(InMemoryEventBus::new());
        let coordinator =
            Arc::new(EngineCoordinator::new(config, subscriptions(), bus.clone()).unwrap());
        let adapter = ManagementBusAdapter::new(&bus, coordinator.clone());
        let task = tokio::spawn(adapter.run());
        (bus, coordinator, task)
    }

    async fn next_selected(events: &mut Subscription) -> String {
        timeout(Duration::from_secs(5), async {
            loop {
                match events.recv().await {
                    Some(ManagementEvent::SelectedEngine { engine }) => return engine,
                    Some(_) => continue,
                    None => panic!("bus closed"),
                }
            }
        })
        .await
        .expect("no engine selected")
    }

    async fn eventually(what: &str, condition: impl Fn() -> bool) {
        timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
    }

    async fn build(coordinator: &EngineCoordinator, kind: EngineKind) {
        coordinator
            .generator(kind)
            .unwrap()
            .init(coordinator.subscriptions())
            .unwrap()
            .await
            .unwrap();
    }

    fn sorted(mut uris: Vec<String>) -> Vec<String> {
        uris.sort();
        uris
    }

    // =============================================================================
    // SELECTION
    // =============================================================================

    /// List(3) > Splay(2) > Trie(1): each later, higher-priority build takes
    /// over, and a lower one arriving last does not.
    #[tokio::test]
    async fn test_priority_sequence_over_bus() {
        let config = CoordinatorConfig::default()
            .with_engines([
                EngineKind::List,
                EngineKind::SplayTree,
                EngineKind::PatriciaTrie,
            ])
            .with_priority(EngineKind::List, 3)
            .with_priority(EngineKind::SplayTree, 2)
            .with_priority(EngineKind::PatriciaTrie, 1);
        let (bus, coordinator, task) = spawn_coordinator(config);
        let mut events = bus.subscribe(EventFilter::topics(vec![EventTopic::Engines]));

        build(&coordinator, EngineKind::PatriciaTrie).await;
        assert_eq!(next_selected(&mut events).await, "PatriciaTrie");

        build(&coordinator, EngineKind::SplayTree).await;
        assert_eq!(next_selected(&mut events).await, "SplayTree");

        build(&coordinator, EngineKind::List).await;
        assert_eq!(next_selected(&mut events).await, "List");

        // Regenerated trie announces itself again but stays in the background
        bus.publish(ManagementEvent::AddSubscription {
            pattern: "0101".to_string(),
            report_uri: "http://localhost/c".to_string(),
        })
        .await;
        let trie = coordinator.generator(EngineKind::PatriciaTrie).unwrap().clone();
        eventually("trie updated", || {
            trie.search(&[0x50]).unwrap_or_default() == ["http://localhost/c"]
        })
        .await;
        let list = coordinator.generator(EngineKind::List).unwrap().clone();
        eventually("list redeployed", || list.state() == EngineState::Deployed).await;

        assert_eq!(coordinator.current_engine(), Some(EngineKind::List));
        assert_eq!(trie.state(), EngineState::Ready);

        task.abort();
    }

    /// With default priorities, whatever order the builds finish in, the
    /// trie ends up serving.
    #[tokio::test]
    async fn test_concurrent_builds_settle_on_highest_priority() {
        let (_bus, coordinator, task) = spawn_coordinator(CoordinatorConfig::default());

        for handle in coordinator.start().unwrap() {
            handle.await.unwrap();
        }
        eventually("trie selected", || {
            coordinator.current_engine() == Some(EngineKind::PatriciaTrie)
        })
        .await;

        let deployed: Vec<_> = coordinator
            .generators()
            .filter(|g| g.state() == EngineState::Deployed)
            .map(|g| g.kind())
            .collect();
        assert_eq!(deployed, [EngineKind::PatriciaTrie]);

        task.abort();
    }

    // =============================================================================
    // UPDATES
    // =============================================================================

    #[tokio::test]
    async fn test_updates_reach_every_engine() {
        let (bus, coordinator, task) = spawn_coordinator(CoordinatorConfig::default());
        for handle in coordinator.start().unwrap() {
            handle.await.unwrap();
        }
        eventually("an engine selected", || coordinator.current_engine().is_some()).await;

        bus.publish(ManagementEvent::AddSubscription {
            pattern: "001101".to_string(),
            report_uri: "http://localhost/a3".to_string(),
        })
        .await;
        bus.publish(ManagementEvent::DeleteSubscription {
            pattern: "1111".to_string(),
            report_uri: "http://localhost/b".to_string(),
        })
        .await;
        eventually("delete applied", || {
            !coordinator.subscriptions().contains("1111")
        })
        .await;

        for generator in coordinator.generators() {
            assert_eq!(
                sorted(generator.search(&[0x34]).unwrap()),
                ["http://localhost/a", "http://localhost/a3"],
                "{}",
                generator.kind()
            );
            assert!(
                generator.search(&[0xF0]).unwrap().is_empty(),
                "{}",
                generator.kind()
            );
        }
        assert_eq!(
            sorted(coordinator.search(&[0x30]).unwrap()),
            ["http://localhost/a", "http://localhost/a2"]
        );

        task.abort();
    }

    #[tokio::test]
    async fn test_rejected_delete_keeps_loop_running() {
        let (bus, coordinator, task) = spawn_coordinator(CoordinatorConfig::default());

        // Wrong URI: logged and dropped
        bus.publish(ManagementEvent::DeleteSubscription {
            pattern: "0011".to_string(),
            report_uri: "http://localhost/b".to_string(),
        })
        .await;
        bus.publish(ManagementEvent::AddSubscription {
            pattern: "0101".to_string(),
            report_uri: "http://localhost/c".to_string(),
        })
        .await;

        eventually("add applied", || coordinator.subscriptions().contains("0101")).await;
        assert!(coordinator.subscriptions().contains("0011"));

        task.abort();
    }

    #[tokio::test]
    async fn test_burst_of_changes_is_not_lost() {
        let bus = Arc::new(InMemoryEventBus::with_capacity(8));
        let coordinator = Arc::new(
            EngineCoordinator::new(CoordinatorConfig::default(), subscriptions(), bus.clone())
                .unwrap(),
        );
        let task = tokio::spawn(ManagementBusAdapter::new(&bus, coordinator.clone()).run());
        for handle in coordinator.start().unwrap() {
            handle.await.unwrap();
        }

        let uri = |i: u32| format!("http://localhost/burst/{i}");
        for i in 0..100u32 {
            bus.publish(ManagementEvent::AddSubscription {
                pattern: format!("1{i:010b}"),
                report_uri: uri(i),
            })
            .await;
        }
        for i in (0..100u32).step_by(2) {
            bus.publish(ManagementEvent::DeleteSubscription {
                pattern: format!("1{i:010b}"),
                report_uri: uri(i),
            })
            .await;
        }

        // The last add lands before the first delete
        eventually("every change applied", || {
            let subs = coordinator.subscriptions();
            subs.contains(&format!("1{:010b}", 99)) && subs.len() == 3 + 50
        })
        .await;
        // 99 = 1_0001100011: 1000_1100 011x_xxxx
        for generator in coordinator.generators() {
            assert_eq!(
                generator.search(&[0x8C, 0x60]).unwrap_or_default(),
                [uri(99)],
                "{}",
                generator.kind()
            );
            assert!(generator.search(&[0x8C, 0x40]).unwrap_or_default().is_empty());
        }

        task.abort();
    }

    // =============================================================================
    // STATISTICS
    // =============================================================================

    #[tokio::test]
    async fn test_stat_ticker_reports_throughput() {
        let config = CoordinatorConfig {
            stat_interval_secs: 1,
            ..CoordinatorConfig::default().with_engines([EngineKind::WeightedTree])
        };
        let (bus, coordinator, task) = spawn_coordinator(config);
        let mut traffic = bus.subscribe(EventFilter::for_engines(["WeightedTree"]));

        for handle in coordinator.start().unwrap() {
            handle.await.unwrap();
        }
        eventually("tree selected", || coordinator.current_engine().is_some()).await;
        for _ in 0..100 {
            coordinator.search(&[0x30]).unwrap();
        }

        let (events, matched) = timeout(Duration::from_secs(5), async {
            loop {
                match traffic.recv().await {
                    Some(ManagementEvent::TrafficStat {
                        event_count,
                        matched_count,
                        ..
                    }) if event_count > 0 => return (event_count, matched_count),
                    Some(_) => continue,
                    None => panic!("bus closed"),
                }
            }
        })
        .await
        .expect("no traffic window");
        assert_eq!(events, 100);
        assert_eq!(matched, 100);

        eventually("throughput recorded", || {
            coordinator.throughput(EngineKind::WeightedTree).is_some()
        })
        .await;

        task.abort();
    }
}
