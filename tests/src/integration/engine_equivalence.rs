//! # Engine Equivalence
//!
//! Every variant must report the same set of URIs for the same identifier,
//! on the initial build, after incremental changes, after splaying and
//! after a blob round trip.

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use fc_01_filter_engines::{EngineKind, FilterEngine, FilterError, Subscription, Subscriptions};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// Occasionally empty, which subscription maps refuse
    fn random_pattern(rng: &mut StdRng) -> String {
        let len = rng.gen_range(0..=24);
        (0..len)
            .map(|_| if rng.gen_bool(0.5) { '1' } else { '0' })
            .collect()
    }

    fn random_subscriptions(rng: &mut StdRng, count: usize) -> Subscriptions {
        let mut subs = Subscriptions::new();
        while subs.len() < count {
            let pattern = random_pattern(rng);
            let uri = format!("http://localhost/{pattern}");
            match subs.insert(&pattern, uri, rng.gen_range(0.0..5.0)) {
                Err(FilterError::EmptyPattern) => assert!(pattern.is_empty()),
                other => assert!(other.is_ok()),
            }
        }
        subs
    }

    fn result_set(uris: Vec<String>) -> BTreeSet<String> {
        uris.into_iter().collect()
    }

    /// Reference result: every pattern that is a bit prefix of `id`
    fn expected(subs: &Subscriptions, id: &[u8]) -> BTreeSet<String> {
        let bits: String = id.iter().map(|byte| format!("{byte:08b}")).collect();
        subs.iter()
            .filter(|(pattern, _)| bits.starts_with(pattern))
            .map(|(_, sub)| sub.report_uri.clone())
            .collect()
    }

    fn build_all(subs: &Subscriptions) -> Vec<FilterEngine> {
        EngineKind::ALL
            .into_iter()
            .map(|kind| FilterEngine::build(kind, subs))
            .collect()
    }

    // =============================================================================
    // FIXED SCENARIOS
    // =============================================================================

    #[test]
    fn test_large_random_set_matches_reference() {
        let mut rng = StdRng::seed_from_u64(42);
        let subs = random_subscriptions(&mut rng, 500);
        let mut engines = build_all(&subs);

        for _ in 0..2_000 {
            let id: Vec<u8> = (0..rng.gen_range(0..=4)).map(|_| rng.gen()).collect();
            let want = expected(&subs, &id);
            for engine in &mut engines {
                assert_eq!(
                    result_set(engine.search_adaptive(&id)),
                    want,
                    "{} on {id:02x?}",
                    engine.kind()
                );
            }
        }
    }

    #[test]
    fn test_incremental_changes_match_rebuild() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut subs = random_subscriptions(&mut rng, 200);
        let mut engines = build_all(&subs);

        for step in 0..300 {
            if step % 3 == 0 {
                let (pattern, uri) = subs
                    .iter()
                    .nth(rng.gen_range(0..subs.len()))
                    .map(|(p, s)| (p.to_string(), s.report_uri.clone()))
                    .unwrap();
                subs.remove(&pattern);
                for engine in &mut engines {
                    engine.delete(&pattern, &uri).unwrap();
                }
            } else {
                let pattern = random_pattern(&mut rng);
                let uri = format!("http://localhost/added/{step}");
                if subs.insert(&pattern, uri.clone(), 0.0).is_err() {
                    assert!(pattern.is_empty());
                    continue;
                }
                for engine in &mut engines {
                    engine.add(&pattern, &uri);
                }
            }
        }

        let rebuilt = build_all(&subs);
        for _ in 0..1_000 {
            let id: Vec<u8> = (0..3).map(|_| rng.gen()).collect();
            let want = expected(&subs, &id);
            for engine in engines.iter().chain(&rebuilt) {
                assert_eq!(result_set(engine.search(&id)), want, "{}", engine.kind());
            }
        }
    }

    #[test]
    fn test_blob_round_trip_preserves_results() {
        let mut rng = StdRng::seed_from_u64(99);
        let subs = random_subscriptions(&mut rng, 100);

        for engine in build_all(&subs) {
            let restored = FilterEngine::from_bytes(&engine.to_bytes().unwrap()).unwrap();
            assert_eq!(restored.kind(), engine.kind());
            assert_eq!(restored.dump(), engine.dump());

            for _ in 0..200 {
                let id: Vec<u8> = (0..3).map(|_| rng.gen()).collect();
                assert_eq!(restored.search(&id), engine.search(&id));
            }
        }
    }

    // =============================================================================
    // PROPERTIES
    // =============================================================================

    proptest! {
        #[test]
        fn prop_add_delete_restores_dump(
            patterns in prop::collection::btree_set("[01]{1,12}", 1..20),
            added in "[01]{1,12}",
        ) {
            prop_assume!(!patterns.contains(&added));
            let subs: Subscriptions = patterns
                .iter()
                .map(|p| (p.clone(), Subscription::new(format!("uri:{p}"), 1.0)))
                .collect();

            for kind in [EngineKind::WeightedTree, EngineKind::PatriciaTrie] {
                let mut engine = FilterEngine::build(kind, &subs);
                let before = engine.dump();
                engine.add(&added, "uri:added");
                engine.delete(&added, "uri:added").unwrap();
                prop_assert_eq!(engine.dump(), before, "{}", kind);
            }
        }
    }
}
