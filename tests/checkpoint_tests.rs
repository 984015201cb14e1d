//! Checkpoint save/load tests.
//!
//! A restored engine must continue the run exactly where the original
//! would, and a failed load must never disturb a live engine.

use aprender_cmaes::checkpoint::CHECKPOINT_FORMAT_VERSION;
use aprender_cmaes::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::tempdir;

fn sphere(x: &Vector<f64>) -> f64 {
    x.squared_magnitude()
}

fn advanced_engine(generations: usize) -> (CmaEs, StdRng) {
    let bound = Bounds::new(-4.0, 4.0).expect("valid interval");
    let space = SearchSpaceConfiguration::new(
        vec![Some(bound), None, Some(bound), None],
        vec![1.0, 2.0, 0.5, 1.0],
        BoundHandling::DarwinianReflection,
    )
    .expect("valid configuration");
    let config = CmaEsConfig::new()
        .with_sigma(1.5)
        .with_weights(WeightScheme::Active)
        .with_search_space(space);

    let mut cma =
        CmaEs::from_config(Vector::from_slice(&[3.0, -2.0, 1.0, 2.5]), &config).expect("valid");
    let mut rng = StdRng::seed_from_u64(2024);
    let mut objective = sphere;
    for _ in 0..generations {
        cma.epoch(&mut objective, &mut rng, |_, _| {}).expect("epoch");
    }
    (cma, rng)
}

#[test]
fn test_save_load_continues_identically() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("run.json");

    let (mut original, rng) = advanced_engine(15);
    original.save(&path).expect("save checkpoint");
    let mut restored = CmaEs::load(&path).expect("load checkpoint");

    assert_eq!(restored.dimension(), original.dimension());
    assert_eq!(restored.eval_count(), original.eval_count());
    assert_eq!(restored.generation(), original.generation());
    assert_eq!(restored.sigma(), original.sigma());
    assert_eq!(restored.mean(), original.mean());
    assert_eq!(restored.covariance(), original.covariance());
    assert_eq!(restored.best_solution(), original.best_solution());
    assert_eq!(restored.params(), original.params());
    assert_eq!(restored.search_space(), original.search_space());

    let mut rng_a = rng.clone();
    let mut rng_b = rng;
    let mut objective = sphere;
    for _ in 0..10 {
        let a = original.epoch(&mut objective, &mut rng_a, |_, _| {}).expect("epoch");
        let b = restored.epoch(&mut objective, &mut rng_b, |_, _| {}).expect("epoch");
        assert_eq!(a, b);
    }
    assert_eq!(
        original.to_checkpoint_bytes().expect("encode"),
        restored.to_checkpoint_bytes().expect("encode")
    );
}

#[test]
fn test_restore_replaces_state() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("run.json");

    let (saved, _) = advanced_engine(8);
    saved.save(&path).expect("save checkpoint");

    let (mut live, _) = advanced_engine(20);
    live.restore(&path).expect("restore");
    assert_eq!(live.generation(), 8);
    assert_eq!(live.eval_count(), saved.eval_count());
    assert_eq!(live.mean(), saved.mean());
}

#[test]
fn test_failed_restore_leaves_engine_untouched() {
    let dir = tempdir().expect("tempdir");
    let (mut live, _) = advanced_engine(5);
    let before = live.to_checkpoint_bytes().expect("encode");

    let missing = dir.path().join("missing.json");
    assert!(matches!(live.restore(&missing), Err(CmaError::Io(_))));

    let corrupt = dir.path().join("corrupt.json");
    std::fs::write(&corrupt, b"{ \"format_version\": 1, \"engine\": { \"sigma\": ").expect("write");
    assert!(matches!(live.restore(&corrupt), Err(CmaError::Serialization(_))));

    assert_eq!(live.to_checkpoint_bytes().expect("encode"), before);
}

#[test]
fn test_newer_format_version_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("future.json");

    let (cma, _) = advanced_engine(2);
    let mut doc: serde_json::Value =
        serde_json::from_slice(&cma.to_checkpoint_bytes().expect("encode")).expect("valid json");
    doc["format_version"] = serde_json::json!(CHECKPOINT_FORMAT_VERSION + 1);
    std::fs::write(&path, serde_json::to_vec(&doc).expect("serialize")).expect("write");

    let err = CmaEs::load(&path).unwrap_err();
    assert!(matches!(err, CmaError::UnsupportedVersion { .. }));
}

#[test]
fn test_inconsistent_population_is_rejected() {
    let (cma, _) = advanced_engine(2);
    let mut doc: serde_json::Value =
        serde_json::from_slice(&cma.to_checkpoint_bytes().expect("encode")).expect("valid json");
    doc["engine"]["params"]["mu"] = serde_json::json!(1);

    let err = CmaEs::from_checkpoint_bytes(&serde_json::to_vec(&doc).expect("serialize")).unwrap_err();
    assert!(matches!(err, CmaError::CheckpointFormat { .. }));
}

#[test]
fn test_truncated_weights_are_rejected() {
    let (cma, _) = advanced_engine(2);
    let mut doc: serde_json::Value =
        serde_json::from_slice(&cma.to_checkpoint_bytes().expect("encode")).expect("valid json");
    doc["engine"]["params"]["weights"] = serde_json::json!([0.5, 0.5]);

    let err = CmaEs::from_checkpoint_bytes(&serde_json::to_vec(&doc).expect("serialize")).unwrap_err();
    assert!(matches!(err, CmaError::DimensionMismatch { .. }));
}

#[test]
fn test_infinite_best_value_survives_save_and_load() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut cma = CmaEs::new(Vector::from_slice(&[1.0, 1.0]), 6, 1.0, None).expect("valid");
    let mut objective = |_: &Vector<f64>| f64::INFINITY;
    cma.epoch(&mut objective, &mut rng, |_, _| {}).expect("epoch");
    assert_eq!(cma.best_solution().map(|b| b.value), Some(f64::INFINITY));

    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("inf.json");
    cma.save(&path).expect("save checkpoint");
    let mut restored = CmaEs::load(&path).expect("load checkpoint");

    assert_eq!(restored.best_solution(), cma.best_solution());
    assert_eq!(restored.last_generation_best(), cma.last_generation_best());

    // Both continue identically and replace the infinite best with a finite one
    let mut rng_b = rng.clone();
    let mut sphere_a = sphere;
    let mut sphere_b = sphere;
    let a = cma.epoch(&mut sphere_a, &mut rng, |_, _| {}).expect("epoch");
    let b = restored.epoch(&mut sphere_b, &mut rng_b, |_, _| {}).expect("epoch");
    assert_eq!(a, b);
    assert!(restored.best_solution().expect("best recorded").value.is_finite());
}
