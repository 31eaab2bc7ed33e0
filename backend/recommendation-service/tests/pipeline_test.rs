/// Integration tests for the recommendation pipeline
use mockall::mock;
use recommendation_service::{
    AppError, CsvRatingSource, OutputFormat, RatingSource, RecommendationPipeline,
    RecommendationRequest, Result, TargetUser,
};
use std::io::Write;
use tempfile::NamedTempFile;
use user_cf::{CfError, Execution, ItemCatalog, PredictionMode, RatingMatrix, User};

// ============================================
// Mock rating source
// ============================================

mock! {
    pub Source {}

    impl RatingSource for Source {
        fn describe(&self) -> String;
        fn load(&self) -> Result<(RatingMatrix, ItemCatalog)>;
    }
}

// ============================================
// Test Helpers
// ============================================

const RATINGS_CSV: &str = "\
user,Alien,Brazil,Casablanca,Dune,Eraserhead
1,5,3,,1,4
2,4,,,1,5
3,1,1,,5,2
4,1,,,4,1
5,,1,5,4,
6,5,3,4,1,4
";

fn write_csv(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

fn request(target: TargetUser, neighbor_count: usize, top_items: usize) -> RecommendationRequest {
    RecommendationRequest {
        target,
        neighbor_count,
        top_items,
        modes: vec![PredictionMode::Raw, PredictionMode::Normalized],
        execution: Execution::Sequential,
    }
}

// ============================================
// CSV-backed runs
// ============================================

#[test]
fn test_csv_pipeline_end_to_end() {
    let file = write_csv(RATINGS_CSV);
    let pipeline = RecommendationPipeline::new(CsvRatingSource::new(file.path()));

    let report = pipeline
        .run(&request(TargetUser::Id(1), 3, 3))
        .expect("pipeline should succeed");

    assert_eq!(report.target_user_id, 1);
    assert_eq!(report.target_index, 0);
    assert_eq!(report.user_count, 6);
    assert_eq!(report.item_count, 5);
    assert_eq!(report.similarities.len(), 6);

    // User 6 rates almost exactly like user 1
    assert_eq!(report.neighbors[0].user_id, 6);
    assert!(report.neighbors.iter().all(|n| n.user_id != 1));

    for rec in &report.recommendations {
        assert_eq!(rec.items.len(), 3);
        let scores: Vec<f64> = rec.items.iter().map(|i| i.score).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]), "{:?} not sorted", scores);
    }
}

#[test]
fn test_parallel_and_sequential_reports_match() {
    let file = write_csv(RATINGS_CSV);
    let pipeline = RecommendationPipeline::new(CsvRatingSource::new(file.path()));

    let sequential = pipeline.run(&request(TargetUser::Index(4), 4, 2)).unwrap();

    let mut parallel_request = request(TargetUser::Index(4), 4, 2);
    parallel_request.execution = Execution::Parallel;
    let parallel = pipeline.run(&parallel_request).unwrap();

    assert_eq!(sequential, parallel);
}

#[test]
fn test_ragged_csv_aborts_run() {
    let file = write_csv("user,a,b,c\n1,5,3,1\n2,4,3\n");
    let pipeline = RecommendationPipeline::new(CsvRatingSource::new(file.path()));

    let err = pipeline
        .run(&request(TargetUser::Index(0), 1, 1))
        .unwrap_err();
    assert!(matches!(err, AppError::MalformedRow { line: 3, .. }));
}

#[test]
fn test_user_without_ratings_aborts_run() {
    let file = write_csv("user,a,b\n1,5,3\n2,,0\n3,1,4\n");
    let pipeline = RecommendationPipeline::new(CsvRatingSource::new(file.path()));

    let err = pipeline
        .run(&request(TargetUser::Index(0), 1, 1))
        .unwrap_err();
    assert!(matches!(err, AppError::Engine(CfError::InsufficientData(_))));
}

#[test]
fn test_report_renders_as_json() {
    let file = write_csv(RATINGS_CSV);
    let pipeline = RecommendationPipeline::new(CsvRatingSource::new(file.path()));
    let report = pipeline.run(&request(TargetUser::Index(0), 2, 2)).unwrap();

    let json = report.render(OutputFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["recommendations"].as_array().map(Vec::len), Some(2));
    assert_eq!(value["recommendations"][0]["mode"], "raw");
}

// ============================================
// Mocked sources
// ============================================

#[test]
fn test_mock_source_is_loaded_once() {
    let mut source = MockSource::new();
    source
        .expect_describe()
        .returning(|| "mock".to_string());
    source.expect_load().times(1).returning(|| {
        let catalog: ItemCatalog = ["x", "y", "z"].into_iter().collect();
        let users = vec![
            User::from_dense(1, &[5.0, 1.0, 0.0]),
            User::from_dense(2, &[4.0, 2.0, 3.0]),
            User::from_dense(3, &[1.0, 5.0, 5.0]),
        ];
        Ok((RatingMatrix::with_catalog(users, &catalog)?, catalog))
    });

    let pipeline = RecommendationPipeline::new(source);
    let report = pipeline.run(&request(TargetUser::Index(0), 1, 1)).unwrap();

    assert_eq!(report.neighbors.len(), 1);
    assert_eq!(report.neighbors[0].user_id, 2);
    // Only item "z" is unrated by the target; every item is predictable from user 2
    assert_eq!(report.recommendations[0].predictable_items, 3);
}

#[test]
fn test_source_failure_is_propagated() {
    let mut source = MockSource::new();
    source.expect_describe().returning(|| "mock".to_string());
    source.expect_load().returning(|| {
        Err(AppError::SourceUnreadable {
            source_name: "mock".to_string(),
            message: "connection refused".to_string(),
        })
    });

    let pipeline = RecommendationPipeline::new(source);
    let err = pipeline
        .run(&request(TargetUser::Index(0), 1, 1))
        .unwrap_err();

    assert!(matches!(err, AppError::SourceUnreadable { .. }));
    assert_eq!(err.exit_code(), 66);
}

#[test]
fn test_too_many_neighbors_requested() {
    let mut source = MockSource::new();
    source.expect_describe().returning(|| "mock".to_string());
    source.expect_load().returning(|| {
        let catalog: ItemCatalog = ["x", "y"].into_iter().collect();
        let users = vec![
            User::from_dense(1, &[5.0, 1.0]),
            User::from_dense(2, &[4.0, 2.0]),
            User::from_dense(3, &[1.0, 5.0]),
        ];
        Ok((RatingMatrix::with_catalog(users, &catalog)?, catalog))
    });

    let pipeline = RecommendationPipeline::new(source);
    let err = pipeline
        .run(&request(TargetUser::Index(0), 10, 1))
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Engine(CfError::InvalidNeighborCount {
            requested: 10,
            available: 2
        })
    ));
}
