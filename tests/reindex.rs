//! Integration tests for replaying feature indices onto other datasets.

mod common;

use chunked_bagging::*;
use common::*;
use tempfile::TempDir;

/// Sample a 100 x 50 training set and return its feature handle.
fn train_handle(
    storage: &std::sync::Arc<InMemoryStorage>,
    chunk_shape: (usize, usize),
    max_features: f64,
) -> Option<FeatureIndexHandle> {
    let insts = storage
        .store_matrix("insts", &create_test_matrix(100, 50, 7), chunk_shape)
        .unwrap();
    let config = create_test_config(10, 10usize, max_features);
    BaggingSample::new(config, storage.clone())
        .unwrap()
        .call(&insts, None, None)
        .unwrap()
        .feature_indices
}

#[test]
fn test_reindex_row_chunked_target() {
    let storage = storage();
    let handle = train_handle(&storage, (20, 50), 0.5);
    assert!(handle.is_some());

    let values = create_position_matrix(200, 50);
    let target = storage.store_matrix("data", &values, (50, 50)).unwrap();
    let reindexed = BaggingSampleReindex::new(storage.clone())
        .call(&target, handle.as_ref())
        .unwrap();
    assert_eq!(reindexed.grid_shape(), (5, 4));
    assert_eq!(reindexed.chunk_count(), 20);

    let features = handle.unwrap();
    for chunk in reindexed.collect(&RayonExecutor::new(2).unwrap()).unwrap() {
        let ReindexedChunk::Projected {
            group,
            row_block,
            estimators,
            slices,
        } = chunk
        else {
            panic!("expected a projected chunk");
        };
        assert_eq!(estimators.len(), 2);
        assert_eq!(slices.len(), 2);

        let feature_chunk = features.set().chunk(group).unwrap();
        for (i, slice) in slices.iter().enumerate() {
            let m = slice.as_matrix().unwrap();
            assert_eq!(m.dim(), (50, 25));
            let cols = feature_chunk.estimator_features(i).unwrap().to_vec();
            for k in 0..50 {
                let r = row_block * 50 + k;
                assert_eq!(m.row(k).to_vec(), expected_row(&values, r, Some(cols.as_slice())));
            }
        }
    }
}

#[test]
fn test_reindex_without_feature_plan() {
    let storage = storage();
    let handle = train_handle(&storage, (20, 50), 1.0);
    assert!(handle.is_none());

    let values = create_position_matrix(200, 50);
    let target = storage.store_matrix("data", &values, (50, 50)).unwrap();
    let chunks = BaggingSampleReindex::new(storage.clone())
        .call(&target, handle.as_ref())
        .unwrap()
        .execute_all(&InlineExecutor)
        .unwrap();
    assert_eq!(chunks.len(), 4);

    for (index, chunk) in chunks {
        let ReindexedChunk::Passthrough { row_block, data } = chunk else {
            panic!("expected a passthrough chunk");
        };
        assert_eq!(index, (row_block, 0));
        let expected = values.slice(ndarray::s![row_block * 50..(row_block + 1) * 50, ..]);
        assert_eq!(data.as_matrix().unwrap(), &expected.to_owned());
    }
}

#[test]
fn test_reindex_column_chunked_inputs() {
    for (split, plan_chunks, passthrough_chunks) in [(50, 2 * 4, 4), (20, 5 * 10, 10)] {
        let storage = storage();
        let values = create_position_matrix(200, 50);
        let target = storage
            .store_matrix("data", &values, (split, split))
            .unwrap();
        let reindex = BaggingSampleReindex::new(storage.clone());

        let no_plan = train_handle(&storage, (split, split), 1.0);
        let passthrough = reindex.call(&target, no_plan.as_ref()).unwrap();
        assert_eq!(passthrough.chunk_count(), passthrough_chunks);
        for chunk in passthrough.collect(&InlineExecutor).unwrap() {
            assert!(chunk.slices().iter().all(|s| s.n_cols() == 50));
        }

        let handle = train_handle(&storage, (split, split), 0.5);
        let projected = reindex.call(&target, handle.as_ref()).unwrap();
        assert_eq!(projected.chunk_count(), plan_chunks);
        for chunk in projected.collect(&InlineExecutor).unwrap() {
            let slices = chunk.slices();
            assert!(!slices.is_empty());
            assert!(slices.iter().all(|s| s.n_cols() == 25));
        }
    }
}

#[test]
fn test_reindex_labeled_table_columns() {
    let storage = storage();
    let handle = train_handle(&storage, (25, 25), 0.2).unwrap();

    let table = LabeledTable::from_values(create_test_matrix(60, 50, 11), 0);
    let target = storage.store_table("frame", &table, (30, 20)).unwrap();
    let chunk = BaggingSampleReindex::new(storage.clone())
        .call(&target, Some(&handle))
        .unwrap()
        .execute_chunk((1, 1))
        .unwrap();

    let feature_chunk = handle.set().chunk(1).unwrap();
    for (i, slice) in chunk.slices().into_iter().enumerate() {
        let t = slice.as_table().unwrap();
        let expected: Vec<String> = feature_chunk
            .estimator_features(i)
            .unwrap()
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(t.columns(), expected.as_slice());
        assert_eq!(t.row_labels().first(), Some(&30));
        assert_eq!(t.n_rows(), 30);
    }
}

#[test]
fn test_reindex_rejects_narrow_target() {
    let storage = storage();
    let handle = train_handle(&storage, (20, 50), 0.5).unwrap();
    let max = handle.set().max_feature_index().unwrap();

    let narrow = storage
        .store_matrix("narrow", &create_test_matrix(40, max, 1), (20, max))
        .unwrap();
    let err = BaggingSampleReindex::new(storage.clone())
        .call(&narrow, Some(&handle))
        .unwrap_err();
    assert!(matches!(err, BaggingError::ShapeMismatch { .. }));
    assert_eq!(storage.fetch_count(&narrow.partition().chunks()[0].key), 0);

    let labels = storage
        .store_vector("labels", &create_test_labels(40), 20)
        .unwrap();
    assert!(BaggingSampleReindex::new(storage.clone())
        .call(&labels, None)
        .is_err());
}

#[test]
fn test_reindex_with_persisted_feature_indices() {
    let storage = storage();
    let handle = train_handle(&storage, (20, 50), 0.5).unwrap();
    let target = storage
        .store_matrix("data", &create_test_matrix(80, 50, 3), (40, 50))
        .unwrap();
    let reindex = BaggingSampleReindex::new(storage.clone());
    let expected = reindex
        .call(&target, Some(&handle))
        .unwrap()
        .collect(&InlineExecutor)
        .unwrap();

    let temp_dir = TempDir::new().unwrap();
    for file_name in ["features.json", "features.bin"] {
        let path = temp_dir.path().join(file_name);
        handle.save_to_file(&path).unwrap();
        let loaded = FeatureIndexHandle::load_from_file(&path).unwrap();
        assert_eq!(loaded.set().chunks, handle.set().chunks);

        let replayed = reindex
            .call(&target, Some(&loaded))
            .unwrap()
            .collect(&InlineExecutor)
            .unwrap();
        assert_eq!(replayed, expected);
    }
}
