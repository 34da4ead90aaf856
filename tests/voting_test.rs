mod common;

use common::setup_pool;
use photo_contest::db::{self, PhotoContent, PhotoMeta, Pool, PUBLISHED};
use photo_contest::report;
use photo_contest::voting::{self, VoteError};

async fn add_photo(pool: &Pool, slug: &str, author: &str) -> i64 {
    let id = db::insert_photo(
        pool,
        &PhotoContent {
            slug: slug.into(),
            title: slug.into(),
            body: String::new(),
            status: PUBLISHED.into(),
            created_at: 1_700_000_000,
        },
    )
    .await
    .unwrap();
    db::write_photo_meta(
        pool,
        id,
        &PhotoMeta {
            photo_id: id.to_string(),
            photo_url: format!("https://wordpress.org/photos/photo/{}/", slug),
            photo_image_url: String::new(),
            photo_author: author.into(),
            photo_date: 1_700_000_000,
            photo_feed_date: 1_700_000_000,
        },
    )
    .await
    .unwrap();
    id
}

#[tokio::test]
async fn test_vote_rules() {
    let pool = setup_pool().await;
    let a = add_photo(&pool, "a", "Marta").await;
    let b = add_photo(&pool, "b", "Marta").await;

    let receipt = voting::submit_vote(&pool, 1, a, 5).await.unwrap();
    assert_eq!(receipt.average, 10.0);
    assert_eq!(receipt.remaining, 1);
    assert_eq!(receipt.next_photo.map(|p| p.id), Some(b));

    let err = voting::submit_vote(&pool, 1, a, 3).await.unwrap_err();
    assert!(matches!(err, VoteError::AlreadyVoted));

    let err = voting::submit_vote(&pool, 1, b, 9).await.unwrap_err();
    assert!(matches!(err, VoteError::InvalidVote(9)));

    let err = voting::submit_vote(&pool, 1, 999, 3).await.unwrap_err();
    assert!(matches!(err, VoteError::PhotoNotFound(999)));

    let receipt = voting::submit_vote(&pool, 2, a, 3).await.unwrap();
    assert_eq!(receipt.average, 7.5);

    let receipt = voting::submit_vote(&pool, 1, b, 1).await.unwrap();
    assert_eq!(receipt.average, 0.0);
    assert_eq!(receipt.remaining, 0);
    assert!(receipt.next_photo.is_none());
}

#[tokio::test]
async fn test_next_photo_excludes_voted() {
    let pool = setup_pool().await;
    let a = add_photo(&pool, "a", "Marta").await;
    let b = add_photo(&pool, "b", "Ana").await;

    let prompt = voting::next_photo(&pool, 42).await.unwrap();
    assert_eq!(prompt.remaining, 2);
    assert!(prompt.photo.is_some());

    voting::submit_vote(&pool, 42, a, 4).await.unwrap();
    for _ in 0..5 {
        let prompt = voting::next_photo(&pool, 42).await.unwrap();
        assert_eq!(prompt.photo.map(|p| p.id), Some(b));
        assert_eq!(prompt.remaining, 1);
    }

    // another voter still sees both
    assert_eq!(voting::next_photo(&pool, 7).await.unwrap().remaining, 2);
}

#[tokio::test]
async fn test_leaderboard_and_author_report() {
    let pool = setup_pool().await;
    let a = add_photo(&pool, "a", "Marta").await;
    let b = add_photo(&pool, "b", "Marta").await;
    let c = add_photo(&pool, "c", "").await;
    let d = add_photo(&pool, "d", "Ana").await;

    voting::submit_vote(&pool, 1, a, 5).await.unwrap();
    voting::submit_vote(&pool, 2, a, 3).await.unwrap();
    voting::submit_vote(&pool, 1, b, 4).await.unwrap();
    voting::submit_vote(&pool, 1, d, 2).await.unwrap();

    let rows = report::leaderboard(&pool, None).await.unwrap();
    let order: Vec<(usize, i64)> = rows.iter().map(|r| (r.position, r.id)).collect();
    assert_eq!(order, vec![(1, a), (2, b), (3, d)]);
    assert_eq!(rows[0].vote_count, 2);
    assert_eq!(rows[0].average, 7.5);
    assert!(rows.iter().all(|r| r.id != c));

    let top = report::leaderboard(&pool, Some(1)).await.unwrap();
    assert_eq!(top.len(), 1);

    let authors = report::author_report(&pool).await.unwrap();
    let summary: Vec<(String, i64, i64, Option<f64>)> = authors
        .into_iter()
        .map(|r| (r.author, r.photo_count, r.vote_count, r.mean_average))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Marta".to_string(), 2, 3, Some(7.25)),
            ("Ana".to_string(), 1, 1, Some(3.0)),
            ("(unknown)".to_string(), 1, 0, None),
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_vote_is_already_voted() {
    let td = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", td.path().join("contest.db").display());
    let pool = db::init_pool(&url).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    let a = add_photo(&pool, "a", "Marta").await;
    add_photo(&pool, "b", "Marta").await;

    for round in 0..5 {
        let user = 100 + round;
        let ballots: Vec<_> = [5, 4]
            .into_iter()
            .map(|value| {
                let pool = pool.clone();
                tokio::spawn(async move { voting::submit_vote(&pool, user, a, value).await })
            })
            .collect();

        let mut accepted = 0;
        let mut rejected = 0;
        for ballot in ballots {
            match ballot.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(VoteError::AlreadyVoted) => rejected += 1,
                Err(other) => panic!("unexpected vote error: {other:?}"),
            }
        }
        assert_eq!((accepted, rejected), (1, 1));
    }

    let rows = report::leaderboard(&pool, None).await.unwrap();
    assert_eq!(rows[0].id, a);
    assert_eq!(rows[0].vote_count, 5);
}
