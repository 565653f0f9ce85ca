//! Identity resolution tests with mocked directory and extractor.

use std::sync::Arc;
use std::time::Duration;

use attendance_engine::config::MatchSettings;
use attendance_engine::domain::{Embedding, EnrolledEmbedding, MatchOutcome};
use attendance_engine::errors::AppError;
use attendance_engine::infra::{MockEmbeddingExtractor, MockUserDirectory};
use attendance_engine::services::{IdentityResolver, IdentityService};
use uuid::Uuid;

fn settings() -> MatchSettings {
    MatchSettings {
        dimension: 2,
        extractor_timeout_ms: 50,
        ..Default::default()
    }
}

fn enrolled(user_id: Uuid, values: [f32; 2]) -> EnrolledEmbedding {
    EnrolledEmbedding {
        user_id,
        embedding: Embedding::new(values.to_vec()).unwrap(),
    }
}

fn directory_with(population: Vec<EnrolledEmbedding>) -> Arc<MockUserDirectory> {
    let mut directory = MockUserDirectory::new();
    directory
        .expect_find_eligible_embeddings()
        .returning(move || Ok(population.clone()));
    Arc::new(directory)
}

fn resolver(
    directory: Arc<MockUserDirectory>,
    extractor: MockEmbeddingExtractor,
) -> IdentityResolver {
    IdentityResolver::new(directory, Arc::new(extractor), settings())
}

#[tokio::test]
async fn test_image_resolves_to_nearest_user() {
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let directory = directory_with(vec![enrolled(alice, [0.0, 0.0]), enrolled(bob, [1.0, 1.0])]);

    let mut extractor = MockEmbeddingExtractor::new();
    extractor
        .expect_extract()
        .times(1)
        .returning(|_| Embedding::new(vec![0.3, 0.4]));

    let outcome = resolver(directory, extractor)
        .resolve_image(vec![0xFF, 0xD8])
        .await
        .unwrap();

    match outcome {
        MatchOutcome::Matched {
            user_id,
            distance,
            confidence,
        } => {
            assert_eq!(user_id, alice);
            assert!((distance - 0.5).abs() < 1e-6);
            assert!((confidence - 0.5).abs() < 1e-6);
        }
        other => panic!("expected a match, got {:?}", other),
    }
}

#[tokio::test]
async fn test_equidistant_users_are_ambiguous() {
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let directory = directory_with(vec![enrolled(alice, [0.0, 0.1]), enrolled(bob, [0.0, -0.1])]);

    let outcome = resolver(directory, MockEmbeddingExtractor::new())
        .resolve_embedding(Embedding::new(vec![0.0, 0.0]).unwrap())
        .await
        .unwrap();

    match outcome {
        MatchOutcome::Ambiguous { user_ids, .. } => {
            assert_eq!(user_ids.len(), 2);
            assert!(user_ids.contains(&alice) && user_ids.contains(&bob));
        }
        other => panic!("expected ambiguity, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_population_is_no_match() {
    let outcome = resolver(directory_with(vec![]), MockEmbeddingExtractor::new())
        .resolve_embedding(Embedding::new(vec![0.0, 0.0]).unwrap())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        MatchOutcome::NoMatch {
            nearest_distance: None
        }
    );
}

#[tokio::test]
async fn test_wrong_dimension_is_rejected_before_lookup() {
    let mut directory = MockUserDirectory::new();
    directory.expect_find_eligible_embeddings().never();

    let err = resolver(Arc::new(directory), MockEmbeddingExtractor::new())
        .resolve_embedding(Embedding::new(vec![0.0, 0.0, 0.0]).unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_extraction_failure_is_external_error() {
    let mut extractor = MockEmbeddingExtractor::new();
    extractor
        .expect_extract()
        .returning(|_| Err(AppError::external("no face found")));

    let err = resolver(directory_with(vec![]), extractor)
        .resolve_image(vec![1, 2, 3])
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ExternalService(_)));
    assert_eq!(err.code(), "EXTERNAL_SERVICE_ERROR");
}

#[tokio::test]
async fn test_slow_extractor_times_out() {
    struct SlowExtractor;

    #[async_trait::async_trait]
    impl attendance_engine::infra::EmbeddingExtractor for SlowExtractor {
        async fn extract(&self, _image: Vec<u8>) -> attendance_engine::AppResult<Embedding> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Embedding::new(vec![0.0, 0.0])
        }
    }

    let resolver = IdentityResolver::new(
        directory_with(vec![]),
        Arc::new(SlowExtractor),
        settings(),
    );
    let err = resolver.resolve_image(vec![1]).await.unwrap_err();

    assert!(matches!(err, AppError::ExternalService(_)));
    assert!(err.to_string().contains("timed out"));
}

#[tokio::test]
async fn test_empty_image_is_rejected() {
    let mut extractor = MockEmbeddingExtractor::new();
    extractor.expect_extract().never();

    let err = resolver(directory_with(vec![]), extractor)
        .resolve_image(Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
}
