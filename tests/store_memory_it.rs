// crates.io
use time::macros;
// self
use oauth2_refresh::{
	auth::{AppId, AppUserGrant, RefreshToken, ScopeSet, ScopeVocabulary, TokenSecret, UserId},
	store::{CompareAndSwapOutcome, DuplicatePolicy, InsertOutcome, MemoryStore, RefreshTokenStore},
};

fn make_grant() -> AppUserGrant {
	let user = UserId::new("user-123").expect("Failed to build user identifier for store tests.");
	let app = AppId::new("app-456").expect("Failed to build app identifier for store tests.");

	AppUserGrant::new(user, app)
}

fn build_token(grant: &AppUserGrant, secret: &str) -> RefreshToken {
	RefreshToken::builder(grant.clone(), ScopeSet::offline())
		.token(secret)
		.issued_at(macros::datetime!(2025-11-10 12:00 UTC))
		.build(&ScopeVocabulary::default())
		.expect("Refresh token fixture should build successfully.")
}

#[tokio::test]
async fn insert_and_fetch_round_trip() {
	let store = MemoryStore::default();
	let grant = make_grant();
	let token = build_token(&grant, "refresh-1");
	let outcome = store
		.insert_unique(token.clone(), DuplicatePolicy::Replace)
		.await
		.expect("Inserting the token fixture should succeed.");

	assert_eq!(outcome, InsertOutcome::Inserted);

	let by_owner = store
		.fetch_by_owner(&grant)
		.await
		.expect("Fetching by owner should succeed.")
		.expect("Stored token should remain present.");
	let by_secret = store
		.fetch_by_secret("refresh-1")
		.await
		.expect("Fetching by secret should succeed.")
		.expect("Stored token should resolve by secret.");

	assert_eq!(by_owner, token);
	assert_eq!(by_secret, token);
	assert!(
		store.fetch_by_secret("refresh-2").await.expect("Fetching should succeed.").is_none()
	);
}

#[tokio::test]
async fn cas_success_mismatch_and_missing() {
	let store = MemoryStore::default();
	let grant = make_grant();
	let initial = build_token(&grant, "refresh-old");

	store
		.insert_unique(initial.clone(), DuplicatePolicy::Replace)
		.await
		.expect("Inserting the initial token should succeed.");

	let replacement =
		initial.rotated(TokenSecret::new("refresh-new"), macros::datetime!(2025-11-11 12:00 UTC));
	let outcome = store
		.compare_and_swap(&grant, "refresh-old", replacement.clone())
		.await
		.expect("CAS should succeed when secrets match.");

	assert_eq!(outcome, CompareAndSwapOutcome::Updated);

	let mismatch = store
		.compare_and_swap(&grant, "refresh-old", replacement.clone())
		.await
		.expect("CAS should report a mismatch when secrets differ.");

	assert_eq!(mismatch, CompareAndSwapOutcome::SecretMismatch);

	store.destroy(&grant).await.expect("Destroy should succeed.");

	let missing = store
		.compare_and_swap(&grant, "refresh-new", replacement)
		.await
		.expect("CAS should report a missing token after destroy.");

	assert_eq!(missing, CompareAndSwapOutcome::Missing);
}

#[tokio::test]
async fn concurrent_cas_allows_single_winner() {
	let store = MemoryStore::default();
	let grant = make_grant();
	let base = build_token(&grant, "refresh-base");

	store
		.insert_unique(base.clone(), DuplicatePolicy::Replace)
		.await
		.expect("Inserting the base token should succeed.");

	let spawn_rotation = |secret: &'static str| {
		let store = store.clone();
		let grant = grant.clone();
		let replacement =
			base.rotated(TokenSecret::new(secret), macros::datetime!(2025-11-11 12:00 UTC));

		tokio::spawn(async move {
			store
				.compare_and_swap(&grant, "refresh-base", replacement)
				.await
				.expect("CAS task should complete successfully.")
		})
	};
	let task_a = spawn_rotation("refresh-a");
	let task_b = spawn_rotation("refresh-b");
	let (outcome_a, outcome_b) = tokio::join!(task_a, task_b);
	let outcomes = [
		outcome_a.expect("CAS task A should not panic."),
		outcome_b.expect("CAS task B should not panic."),
	];
	let successes = outcomes
		.iter()
		.filter(|outcome| matches!(outcome, CompareAndSwapOutcome::Updated))
		.count();

	assert_eq!(successes, 1, "only one CAS should succeed");

	let final_token = store
		.fetch_by_owner(&grant)
		.await
		.expect("Fetching the final token should succeed.")
		.expect("Final token should remain present.");

	assert!(matches!(final_token.token.expose(), "refresh-a" | "refresh-b"));
}

#[tokio::test]
async fn destroy_is_idempotent() {
	let store = MemoryStore::default();
	let grant = make_grant();

	store
		.insert_unique(build_token(&grant, "refresh"), DuplicatePolicy::Replace)
		.await
		.expect("Inserting the token fixture should succeed.");

	assert!(store.destroy(&grant).await.expect("Destroy should succeed.").is_some());
	assert!(store.destroy(&grant).await.expect("Destroy should succeed.").is_none());
	assert!(store.fetch_by_secret("refresh").await.expect("Fetching should succeed.").is_none());
	assert_eq!(store.count().await.expect("Count should succeed."), 0);
}
