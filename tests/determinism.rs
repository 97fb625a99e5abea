//! Property-based tests for sampling determinism and plan shape.

mod common;

use proptest::prelude::*;

use chunked_bagging::sampling::assign_groups;
use chunked_bagging::*;
use common::*;

fn config(n_estimators: usize, seed: u64, bootstrap: bool, max_features: f64) -> BaggingConfig {
    BaggingConfigBuilder::new()
        .n_estimators(n_estimators)
        .max_samples(0.5)
        .max_features(max_features)
        .bootstrap(bootstrap)
        .random_seed(seed)
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn samples_do_not_depend_on_chunking(
        n_estimators in 1usize..20,
        seed in any::<u64>(),
        n_rows in 1usize..200,
        n_cols in 1usize..20,
        chunks_a in 1usize..12,
        chunks_b in 1usize..12,
        bootstrap in any::<bool>(),
    ) {
        let planner = SamplingPlanner::new(config(n_estimators, seed, bootstrap, 0.5)).unwrap();
        let a = planner.plan((n_rows, n_cols), chunks_a.min(n_rows)).unwrap();
        let b = planner.plan((n_rows, n_cols), chunks_b.min(n_rows)).unwrap();

        for id in 0..n_estimators {
            prop_assert_eq!(a.estimator(id).unwrap(), b.estimator(id).unwrap());
        }
    }

    #[test]
    fn plan_sizes_match_configuration(
        n_estimators in 1usize..20,
        seed in any::<u64>(),
        n_rows in 1usize..200,
        n_cols in 2usize..40,
        row_chunks in 1usize..12,
        bootstrap in any::<bool>(),
        max_features in 0.05f64..0.95,
    ) {
        let planner =
            SamplingPlanner::new(config(n_estimators, seed, bootstrap, max_features)).unwrap();
        let plan = planner.plan((n_rows, n_cols), row_chunks.min(n_rows)).unwrap();
        let expected_rows = SampleSize::Fraction(0.5).resolve_rows(n_rows);
        let expected_features = SampleSize::Fraction(max_features).resolve_features(n_cols);

        prop_assert_eq!(plan.feature_count(), expected_features);
        for id in 0..n_estimators {
            let sample = plan.estimator(id).unwrap();
            prop_assert_eq!(sample.rows.len(), expected_rows);
            prop_assert!(sample.rows.iter().all(|&r| r < n_rows));
            match (&sample.features, expected_features) {
                (Some(features), Some(count)) => {
                    prop_assert_eq!(features.len(), count);
                    prop_assert!(features.windows(2).all(|w| w[0] < w[1]));
                    prop_assert!(features.iter().all(|&c| c < n_cols));
                }
                (None, None) => {}
                (features, count) => {
                    prop_assert!(false, "features {:?} for count {:?}", features, count);
                }
            }
        }
        if let Some(set) = plan.feature_index_set().unwrap() {
            prop_assert_eq!(set.n_estimators(), n_estimators);
            prop_assert_eq!(set.group_count(), plan.group_count());
        }
    }

    #[test]
    fn groups_partition_estimators(
        n_estimators in 1usize..100,
        row_chunks in 1usize..100,
    ) {
        let groups = assign_groups(n_estimators, row_chunks);
        prop_assert_eq!(groups.len(), n_estimators.min(row_chunks));

        let mut next = 0;
        for (g, group) in groups.iter().enumerate() {
            prop_assert_eq!(group.index, g);
            prop_assert_eq!(group.estimators.start, next);
            next = group.estimators.end;
        }
        prop_assert_eq!(next, n_estimators);

        let sizes: Vec<usize> = groups.iter().map(|g| g.len()).collect();
        let largest = sizes.iter().copied().max().unwrap();
        let smallest = sizes.iter().copied().min().unwrap();
        prop_assert!(largest - smallest <= 1);
        prop_assert!(sizes.windows(2).all(|w| w[0] >= w[1]));
    }
}

#[test]
fn test_gathered_rows_do_not_depend_on_thread_count() {
    let values = create_test_matrix(120, 8, 21);
    let gather = |num_threads: usize| {
        let storage = storage();
        let data = storage.store_matrix("x", &values, (30, 4)).unwrap();
        let config = BaggingConfigBuilder::new()
            .n_estimators(6)
            .max_samples(0.25)
            .max_features(0.5)
            .random_seed(99)
            .num_threads(num_threads)
            .build()
            .unwrap();
        let executor = RayonExecutor::from_config(&config).unwrap();
        BaggingSample::new(config, storage)
            .unwrap()
            .call(&data, None, None)
            .unwrap()
            .sampled
            .collect(&executor)
            .unwrap()
    };
    assert_eq!(gather(1), gather(4));
}

#[test]
fn test_seed_changes_samples() {
    let planner = |seed| SamplingPlanner::new(config(3, seed, true, 0.5)).unwrap();
    let a = planner(1).plan((50, 10), 5).unwrap();
    let b = planner(2).plan((50, 10), 5).unwrap();
    assert_ne!(a.estimator(0).unwrap().rows, b.estimator(0).unwrap().rows);
}
