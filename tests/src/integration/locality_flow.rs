//! # Locality Flow
//!
//! Sample traffic replayed through the live engine of a coordinator, and
//! the resulting usage tree as it is written out for visualization.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use shared_bus::InMemoryEventBus;

    use fc_01_filter_engines::{
        CoordinatorConfig, EngineCoordinator, EngineKind, FilterEngine, FilterError, FilteringApi,
        LocalityAnalyzer, LocalityReport, Subscriptions,
    };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const A: &str = "http://localhost/a";
    const A2: &str = "http://localhost/a2";
    const B: &str = "http://localhost/b";

    fn subscriptions() -> Subscriptions {
        let mut subs = Subscriptions::new();
        subs.insert("0011", A, 1.0).unwrap();
        subs.insert("00110000", A2, 0.0).unwrap();
        subs.insert("1111", B, 0.5).unwrap();
        subs
    }

    /// Two hits on A and its subset, one on B, one miss
    fn samples() -> Vec<Vec<u8>> {
        vec![vec![0x30], vec![0x30], vec![0xF0], vec![0x00]]
    }

    fn value(report: &LocalityReport, path: &[&str]) -> f64 {
        report
            .find(path)
            .unwrap_or_else(|| panic!("no node at {path:?}"))
            .value
    }

    async fn serving(kind: EngineKind) -> EngineCoordinator {
        let bus = Arc::new(InMemoryEventBus::new());
        let coordinator = EngineCoordinator::new(
            CoordinatorConfig::default().with_engines([kind]),
            subscriptions(),
            bus,
        )
        .unwrap();
        for handle in coordinator.start().unwrap() {
            handle.await.unwrap();
        }
        assert!(coordinator.on_engine_generated(kind).unwrap());
        coordinator
    }

    // =============================================================================
    // ANALYSIS
    // =============================================================================

    #[test]
    fn test_weighted_tree_usage() {
        let engine = FilterEngine::build(EngineKind::WeightedTree, &subscriptions());
        let samples = samples();
        let report = LocalityAnalyzer::analyze(&engine, samples.iter().map(Vec::as_slice));

        assert_eq!(report.name, "Entry");
        assert_eq!(report.value, 100.0);
        assert_eq!(value(&report, &[A]), 100.0);
        assert_eq!(value(&report, &[A, A2]), 50.0);
        assert_eq!(value(&report, &[A, A2, "Match"]), 50.0);
        assert_eq!(value(&report, &[A, B]), 50.0);
        assert_eq!(value(&report, &[A, B, "Match"]), 25.0);
        assert_eq!(value(&report, &[A, B, "Mismatch"]), 25.0);
    }

    #[test]
    fn test_walk_ending_on_failed_subset_is_a_mismatch() {
        let engine = FilterEngine::build(EngineKind::WeightedTree, &subscriptions());
        // 00111111: A matches, its subset A2 does not
        let samples: [&[u8]; 2] = [&[0x3F], &[0x30]];
        let report = LocalityAnalyzer::analyze(&engine, samples);

        assert_eq!(value(&report, &[A, A2]), 100.0);
        assert_eq!(value(&report, &[A, A2, "Mismatch"]), 50.0);
        assert_eq!(value(&report, &[A, A2, "Match"]), 50.0);
        assert!(report.find(&[A, B]).is_none());
    }

    #[test]
    fn test_trace_counts_visits() {
        let engine = FilterEngine::build(EngineKind::WeightedTree, &subscriptions());
        let samples = samples();
        let locality = LocalityAnalyzer::trace(&engine, samples.iter().map(Vec::as_slice));

        assert_eq!(locality.samples(), 4);
        assert_eq!(locality.visits(&[A]), 4);
        assert_eq!(locality.visits(&[A, B]), 2);
        assert_eq!(locality.visits(&[B]), 0);
    }

    #[tokio::test]
    async fn test_coordinator_analyzes_live_engine() {
        let coordinator = serving(EngineKind::WeightedTree).await;
        let report = coordinator.analyze_locality(&samples()).unwrap();

        assert_eq!(value(&report, &[A, A2, "Match"]), 50.0);
        assert_eq!(value(&report, &[A, B, "Mismatch"]), 25.0);
    }

    #[tokio::test]
    async fn test_analysis_keeps_splay_tree_shape() {
        let coordinator = serving(EngineKind::SplayTree).await;
        let before = coordinator.dump().unwrap();

        let traffic = vec![vec![0xF0]; 50];
        coordinator.analyze_locality(&traffic).unwrap();

        assert_eq!(coordinator.dump().unwrap(), before);
    }

    #[test]
    fn test_analysis_needs_live_engine() {
        let bus = Arc::new(InMemoryEventBus::new());
        let coordinator =
            EngineCoordinator::new(CoordinatorConfig::default(), subscriptions(), bus).unwrap();

        assert!(matches!(
            coordinator.analyze_locality(&samples()),
            Err(FilterError::NoEngineReady)
        ));
    }

    // =============================================================================
    // OUTPUT
    // =============================================================================

    #[test]
    fn test_report_json_tree() {
        let engine = FilterEngine::build(EngineKind::WeightedTree, &subscriptions());
        let samples = samples();
        let report = LocalityAnalyzer::analyze(&engine, samples.iter().map(Vec::as_slice));

        let json: serde_json::Value = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();
        assert_eq!(json["name"], "Entry");
        assert!(json["parent"].is_null());

        let first = &json["children"][0];
        assert_eq!(first["name"], A);
        assert_eq!(first["parent"], "Entry");
        assert_eq!(first["value"], 100.0);

        let round_trip: LocalityReport = serde_json::from_value(json).unwrap();
        assert_eq!(round_trip, report);
    }
}
