//! Tests for store service business rules.

use tempfile::NamedTempFile;

use game_store::{
    MAX_PASSWORD_BYTES, ReferentialPolicy, StoreConfig, StoreErrorKind, StoreRepository,
    StoreService, prepare_service, verify_password,
};

const TEST_COST: u32 = 4;

fn setup_service(policy: ReferentialPolicy) -> (NamedTempFile, StoreService) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();

    let repo = StoreRepository::new(db_path).expect("Failed to create repository");
    repo.initialize().expect("Migrations failed");
    (db_file, StoreService::new(repo, policy, TEST_COST))
}

#[test]
fn test_add_game_returns_identity() {
    let (_db, service) = setup_service(ReferentialPolicy::Strict);
    let game = service
        .add_game("Stardew Valley".to_string(), "Simulation".to_string(), 15)
        .expect("Add failed");
    assert!(*game.id() > 0);

    let listed = service.list_games().expect("List failed");
    assert_eq!(listed, vec![game]);
}

#[test]
fn test_add_game_validation() {
    let (_db, service) = setup_service(ReferentialPolicy::Strict);

    let cases = [
        ("", "RPG", 10),
        ("   ", "RPG", 10),
        ("Name", "", 10),
        ("Name", "RPG", -1),
    ];
    for (name, genre, price) in cases {
        let err = service
            .add_game(name.to_string(), genre.to_string(), price)
            .expect_err("Invalid game accepted");
        assert_eq!(err.kind, StoreErrorKind::Validation);
    }

    // Free games are fine.
    service
        .add_game("Free".to_string(), "Misc".to_string(), 0)
        .expect("Zero price rejected");
}

#[test]
fn test_delete_game_twice_is_not_found() {
    let (_db, service) = setup_service(ReferentialPolicy::Strict);
    let game = service
        .add_game("Limbo".to_string(), "Puzzle".to_string(), 10)
        .expect("Add failed");

    service.delete_game(*game.id()).expect("Delete failed");
    assert!(service.list_games().expect("List failed").is_empty());

    let err = service.delete_game(*game.id()).expect_err("Second delete succeeded");
    assert_eq!(err.kind, StoreErrorKind::NotFound);
    assert_eq!(err.message, "Game not found");
}

#[test]
fn test_register_twice_is_conflict() {
    let (_db, service) = setup_service(ReferentialPolicy::Strict);
    let user_id = service
        .register_user("dana".to_string(), "pa55word".to_string())
        .expect("Register failed");
    assert!(user_id > 0);

    let err = service
        .register_user("dana".to_string(), "different".to_string())
        .expect_err("Duplicate accepted");
    assert_eq!(err.kind, StoreErrorKind::Conflict);
    assert_eq!(err.message, "Username already exists");

    // The first registration is untouched.
    let stored = service
        .repository()
        .get_user_by_name("dana")
        .expect("Query failed")
        .expect("User missing");
    assert_eq!(*stored.id(), user_id);
    assert!(verify_password("pa55word", stored.password_hash()).expect("Verify failed"));
}

#[test]
fn test_register_stores_hash_not_plaintext() {
    let (_db, service) = setup_service(ReferentialPolicy::Strict);
    service
        .register_user("erin".to_string(), "plaintext".to_string())
        .expect("Register failed");

    let stored = service
        .repository()
        .get_user_by_name("erin")
        .expect("Query failed")
        .expect("User missing");
    assert_ne!(stored.password_hash(), "plaintext");
    assert!(verify_password("plaintext", stored.password_hash()).expect("Verify failed"));
    assert!(!verify_password("PLAINTEXT", stored.password_hash()).expect("Verify failed"));
}

#[test]
fn test_register_validation() {
    let (_db, service) = setup_service(ReferentialPolicy::Strict);
    let err = service
        .register_user(" ".to_string(), "pw".to_string())
        .expect_err("Blank username accepted");
    assert_eq!(err.kind, StoreErrorKind::Validation);

    let err = service
        .register_user("frank".to_string(), String::new())
        .expect_err("Empty password accepted");
    assert_eq!(err.kind, StoreErrorKind::Validation);
}

#[test]
fn test_register_rejects_over_long_password() {
    let (_db, service) = setup_service(ReferentialPolicy::Strict);
    let password = "p".repeat(MAX_PASSWORD_BYTES + 1);
    let err = service
        .register_user("long".to_string(), password)
        .expect_err("Over-long password accepted");
    assert_eq!(err.kind, StoreErrorKind::Validation);
    assert!(
        service
            .repository()
            .get_user_by_name("long")
            .expect("Query failed")
            .is_none()
    );

    service
        .register_user("long".to_string(), "p".repeat(MAX_PASSWORD_BYTES))
        .expect("Password at the limit rejected");
}

#[test]
fn test_concurrent_registration_of_same_name() {
    let (_db, service) = setup_service(ReferentialPolicy::Strict);
    const THREADS: usize = 8;

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let service = service.clone();
                scope.spawn(move || service.register_user("race".to_string(), format!("pw{i}")))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("Thread panicked"))
            .collect()
    });

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "results: {results:?}");
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.kind, StoreErrorKind::Conflict, "unexpected error: {err}");
    }

    let stored = service
        .repository()
        .get_user_by_name("race")
        .expect("Query failed")
        .expect("User missing");
    let winner_id = results
        .iter()
        .find_map(|r| r.as_ref().ok())
        .expect("No winner");
    assert_eq!(stored.id(), winner_id);
}

#[test]
fn test_concurrent_purchases_all_commit() {
    let (_db, service) = setup_service(ReferentialPolicy::Strict);
    let user_id = service
        .register_user("buyer".to_string(), "pw".to_string())
        .expect("Register failed");
    let game = service
        .add_game("Spelunky".to_string(), "Platformer".to_string(), 15)
        .expect("Add failed");
    let game_id = *game.id();
    const THREADS: usize = 8;

    let ids: Vec<i32> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let service = service.clone();
                scope.spawn(move || service.purchase_game(user_id, game_id))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join()
                    .expect("Thread panicked")
                    .expect("Purchase failed")
            })
            .collect()
    });

    let mut unique = ids.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), THREADS);
    assert_eq!(
        service.purchases_for_user(user_id).expect("List failed").len(),
        THREADS
    );
}

#[test]
fn test_usernames_are_case_sensitive() {
    let (_db, service) = setup_service(ReferentialPolicy::Strict);
    service
        .register_user("Gus".to_string(), "pw".to_string())
        .expect("Register failed");
    service
        .register_user("gus".to_string(), "pw".to_string())
        .expect("Case variant rejected");
}

#[test]
fn test_strict_purchase_rejects_unknown_ids() {
    let (_db, service) = setup_service(ReferentialPolicy::Strict);
    let user_id = service
        .register_user("hana".to_string(), "pw".to_string())
        .expect("Register failed");
    let game = service
        .add_game("Inside".to_string(), "Puzzle".to_string(), 20)
        .expect("Add failed");

    let err = service
        .purchase_game(user_id + 100, *game.id())
        .expect_err("Unknown user accepted");
    assert_eq!(err.kind, StoreErrorKind::Validation);

    let err = service
        .purchase_game(user_id, *game.id() + 100)
        .expect_err("Unknown game accepted");
    assert_eq!(err.kind, StoreErrorKind::Validation);

    let purchase_id = service
        .purchase_game(user_id, *game.id())
        .expect("Purchase failed");
    assert!(purchase_id > 0);
    assert_eq!(service.purchases_for_user(user_id).expect("List failed").len(), 1);
}

#[test]
fn test_permissive_purchase_accepts_unknown_ids() {
    let (_db, service) = setup_service(ReferentialPolicy::Permissive);
    let purchase_id = service.purchase_game(7, 9).expect("Purchase failed");
    assert!(purchase_id > 0);

    let purchases = service.purchases_for_user(7).expect("List failed");
    assert_eq!(purchases.len(), 1);
    assert_eq!(*purchases[0].game_id(), 9);
}

#[test]
fn test_strict_delete_of_purchased_game_is_conflict() {
    let (_db, service) = setup_service(ReferentialPolicy::Strict);
    let user_id = service
        .register_user("ivan".to_string(), "pw".to_string())
        .expect("Register failed");
    let game = service
        .add_game("Journey".to_string(), "Adventure".to_string(), 15)
        .expect("Add failed");
    service.purchase_game(user_id, *game.id()).expect("Purchase failed");

    let err = service.delete_game(*game.id()).expect_err("Delete succeeded");
    assert_eq!(err.kind, StoreErrorKind::Conflict);
    assert_eq!(service.list_games().expect("List failed").len(), 1);
}

#[test]
fn test_permissive_delete_leaves_dangling_purchase() {
    let (_db, service) = setup_service(ReferentialPolicy::Permissive);
    let user_id = service
        .register_user("jo".to_string(), "pw".to_string())
        .expect("Register failed");
    let game = service
        .add_game("Katamari".to_string(), "Puzzle".to_string(), 15)
        .expect("Add failed");
    service.purchase_game(user_id, *game.id()).expect("Purchase failed");

    service.delete_game(*game.id()).expect("Delete failed");
    assert!(service.list_games().expect("List failed").is_empty());
    assert_eq!(service.purchases_for_user(user_id).expect("List failed").len(), 1);
}

#[test]
fn test_prepare_service_seeds_once() {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let toml = format!(
        "database_url = {:?}\nbcrypt_cost = {}\n",
        db_file.path().to_str().expect("Invalid path"),
        TEST_COST
    );
    let config = StoreConfig::from_toml_str(&toml).expect("Config failed");

    let service = prepare_service(&config).expect("Prepare failed");
    assert_eq!(service.list_games().expect("List failed").len(), 3);

    let service = prepare_service(&config).expect("Second prepare failed");
    assert_eq!(service.list_games().expect("List failed").len(), 3);
}

#[test]
fn test_prepare_service_without_seed() {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let mut config = StoreConfig::default();
    config.set_database_url(db_file.path().to_str().expect("Invalid path").to_string());
    config.set_seed_catalog(false);
    config.set_bcrypt_cost(TEST_COST);

    let service = prepare_service(&config).expect("Prepare failed");
    assert!(service.list_games().expect("List failed").is_empty());
}
