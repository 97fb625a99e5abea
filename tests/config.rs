//! Integration tests for configuration loading and validation.

use chunked_bagging::*;
use tempfile::TempDir;

fn sample_config() -> BaggingConfig {
    BaggingConfigBuilder::new()
        .n_estimators(25)
        .max_samples(0.8)
        .max_features(12usize)
        .bootstrap(false)
        .random_seed(1234)
        .num_threads(2)
        .build()
        .unwrap()
}

#[test]
fn test_config_file_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let config = sample_config();

    for file_name in ["bagging.json", "bagging.toml"] {
        let path = temp_dir.path().join(file_name);
        config.save_to_file(&path).unwrap();
        let loaded = BaggingConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.max_samples, SampleSize::Fraction(0.8));
        assert_eq!(loaded.max_features, SampleSize::Count(12));
    }
}

#[test]
fn test_partial_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("partial.toml");
    std::fs::write(&path, "n_estimators = 4\nmax_features = 0.5\n").unwrap();

    let config = BaggingConfig::load_from_file(&path).unwrap();
    assert_eq!(config.n_estimators, 4);
    assert_eq!(config.max_features, SampleSize::Fraction(0.5));
    assert_eq!(config.max_samples, BaggingConfig::default().max_samples);
    assert_eq!(config.random_seed, None);
}

#[test]
fn test_invalid_files_rejected() {
    let temp_dir = TempDir::new().unwrap();

    let unsupported = temp_dir.path().join("bagging.yaml");
    std::fs::write(&unsupported, "n_estimators: 4").unwrap();
    let err = BaggingConfig::load_from_file(&unsupported).unwrap_err();
    assert_eq!(err.category(), "configuration");

    let zero = temp_dir.path().join("zero.json");
    std::fs::write(&zero, r#"{"n_estimators": 0}"#).unwrap();
    assert!(BaggingConfig::load_from_file(&zero).is_err());

    let malformed = temp_dir.path().join("bad.json");
    std::fs::write(&malformed, "{ not json").unwrap();
    assert_eq!(
        BaggingConfig::load_from_file(&malformed).unwrap_err().category(),
        "json"
    );

    let missing = temp_dir.path().join("missing.toml");
    assert_eq!(
        BaggingConfig::load_from_file(&missing).unwrap_err().category(),
        "io"
    );
}

#[test]
fn test_environment_overrides() {
    std::env::set_var("BAGGING_N_ESTIMATORS", "7");
    std::env::set_var("BAGGING_MAX_SAMPLES", "30");
    std::env::set_var("BAGGING_MAX_FEATURES", "0.25");
    std::env::set_var("BAGGING_RANDOM_SEED", "5");

    let config = BaggingConfig::load_from_environment().unwrap();
    assert_eq!(config.n_estimators, 7);
    assert_eq!(config.max_samples, SampleSize::Count(30));
    assert_eq!(config.max_features, SampleSize::Fraction(0.25));
    assert_eq!(config.random_seed, Some(5));

    std::env::set_var("BAGGING_N_ESTIMATORS", "many");
    let err = BaggingConfig::load_from_environment().unwrap_err();
    assert_eq!(err.category(), "configuration");

    for name in [
        "BAGGING_N_ESTIMATORS",
        "BAGGING_MAX_SAMPLES",
        "BAGGING_MAX_FEATURES",
        "BAGGING_RANDOM_SEED",
    ] {
        std::env::remove_var(name);
    }
}

#[test]
fn test_builder_collects_errors() {
    let err = BaggingConfigBuilder::new()
        .n_estimators(0)
        .max_samples(-1.0)
        .build()
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("n_estimators"));
    assert!(message.contains("max_samples"));

    assert!(BaggingConfigBuilder::new()
        .max_features(f64::NAN)
        .build()
        .is_err());
    assert!(BaggingConfigBuilder::new().max_samples(0usize).build().is_err());
}

#[test]
fn test_shape_validation() {
    let validator = ConfigValidator::new().with_shape(ShapeContext {
        n_rows: 10,
        n_cols: 4,
        row_chunks: 2,
    });

    let without_replacement = BaggingConfigBuilder::new()
        .max_samples(11usize)
        .bootstrap(false)
        .build()
        .unwrap();
    assert!(validator.check(&without_replacement).is_err());

    let with_replacement = BaggingConfigBuilder::new()
        .max_samples(11usize)
        .build()
        .unwrap();
    assert!(validator.check(&with_replacement).is_ok());

    let results = validator.validate(&BaggingConfig::default());
    assert!(!results
        .iter()
        .any(|r| matches!(r, ValidationResult::Error(_))));
}

#[test]
fn test_executor_from_config() {
    let config = sample_config();
    let executor = RayonExecutor::from_config(&config).unwrap();
    assert_eq!(executor.parallelism(), 2);
    assert_eq!(config.effective_num_threads(), 2);
    assert_eq!(config.as_parameter_map()["random_seed"], "1234");
}
