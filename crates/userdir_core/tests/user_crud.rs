use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use userdir_core::{open_db, DbError, NewUser, RepoError, SqliteUserRepository, UserRepository};

fn setup() -> (TempDir, PathBuf, SqliteUserRepository) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.db");
    drop(open_db(&path).unwrap());
    let repo = SqliteUserRepository::try_new(&path).unwrap();
    (dir, path, repo)
}

fn new_user(name: &str, surname: &str, age: i64, email: &str) -> NewUser {
    NewUser::new(name, surname, age, email).unwrap()
}

fn row_count(path: &Path) -> i64 {
    let conn = Connection::open(path).unwrap();
    conn.query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn add_then_get_roundtrip_is_normalized() {
    let (_dir, _path, repo) = setup();

    let created = repo
        .add_user(&new_user("John", "Doe", 25, "John@Example.COM"))
        .unwrap();
    assert_eq!(created.id(), 1);

    let loaded = repo.get_user_by_email("john@example.com").unwrap();
    assert_eq!(loaded, created);
    assert_eq!(loaded.name(), "john");
    assert_eq!(loaded.surname(), "doe");
    assert_eq!(loaded.age(), 25);
    assert_eq!(loaded.email(), "john@example.com");
}

#[test]
fn update_then_delete_lifecycle() {
    let (_dir, _path, repo) = setup();
    let created = repo
        .add_user(&new_user("John", "Doe", 25, "John@Example.COM"))
        .unwrap();

    repo.update_user(&new_user("John", "Doe", 35, "john@example.com"))
        .unwrap();
    let updated = repo.get_user_by_email("john@example.com").unwrap();
    assert_eq!(updated.age(), 35);
    assert_eq!(updated.id(), created.id());

    repo.delete_user_by_email("john@example.com").unwrap();
    let err = repo.get_user_by_email("john@example.com").unwrap_err();
    assert!(matches!(err, RepoError::NotFound(ref email) if email == "john@example.com"));
}

#[test]
fn update_replaces_name_fields_only() {
    let (_dir, _path, repo) = setup();
    let created = repo
        .add_user(&new_user("ann", "lee", 30, "ann@example.com"))
        .unwrap();

    repo.update_user(&new_user("Anna", "Leigh", 31, "ANN@example.com"))
        .unwrap();

    let loaded = repo.get_user_by_email("ann@example.com").unwrap();
    assert_eq!(loaded.id(), created.id());
    assert_eq!(loaded.name(), "anna");
    assert_eq!(loaded.surname(), "leigh");
    assert_eq!(loaded.age(), 31);
}

#[test]
fn get_missing_email_returns_not_found() {
    let (_dir, _path, repo) = setup();

    let err = repo.get_user_by_email("ghost@example.com").unwrap_err();
    assert!(matches!(err, RepoError::NotFound(_)));
    assert_eq!(err.to_string(), "user with email ghost@example.com not found");
}

#[test]
fn duplicate_email_is_rejected_and_original_kept() {
    let (_dir, path, repo) = setup();
    let original = repo
        .add_user(&new_user("ann", "lee", 30, "ann@example.com"))
        .unwrap();

    let err = repo
        .add_user(&new_user("Other", "Person", 50, "Ann@Example.com"))
        .unwrap_err();
    assert!(matches!(err, RepoError::DuplicateKey(ref email) if email == "ann@example.com"));

    assert_eq!(row_count(&path), 1);
    assert_eq!(repo.get_user_by_email("ann@example.com").unwrap(), original);
}

#[test]
fn update_missing_email_returns_not_found_without_insert() {
    let (_dir, path, repo) = setup();
    repo.add_user(&new_user("ann", "lee", 30, "ann@example.com"))
        .unwrap();

    let err = repo
        .update_user(&new_user("x", "y", 40, "nonexistent@x.com"))
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(ref email) if email == "nonexistent@x.com"));
    assert_eq!(row_count(&path), 1);
}

#[test]
fn delete_missing_email_returns_not_found() {
    let (_dir, path, repo) = setup();
    repo.add_user(&new_user("ann", "lee", 30, "ann@example.com"))
        .unwrap();

    let err = repo.delete_user_by_email("bob@example.com").unwrap_err();
    assert!(matches!(err, RepoError::NotFound(_)));
    assert_eq!(row_count(&path), 1);
}

#[test]
fn list_returns_users_in_insertion_order() {
    let (_dir, _path, repo) = setup();
    assert!(repo.list_users().unwrap().is_empty());

    repo.add_user(&new_user("b", "b", 20, "b@example.com")).unwrap();
    repo.add_user(&new_user("a", "a", 21, "a@example.com")).unwrap();
    repo.add_user(&new_user("c", "c", 22, "c@example.com")).unwrap();

    let emails: Vec<String> = repo
        .list_users()
        .unwrap()
        .into_iter()
        .map(|user| user.email().to_string())
        .collect();
    assert_eq!(emails, ["b@example.com", "a@example.com", "c@example.com"]);
}

#[test]
fn delete_all_on_empty_table_is_noop() {
    let (_dir, _path, repo) = setup();

    assert_eq!(repo.delete_all_users().unwrap(), 0);
    assert!(repo.list_users().unwrap().is_empty());
}

#[test]
fn delete_all_reports_removed_count() {
    let (_dir, _path, repo) = setup();
    repo.add_user(&new_user("a", "a", 20, "a@example.com")).unwrap();
    repo.add_user(&new_user("b", "b", 20, "b@example.com")).unwrap();

    assert_eq!(repo.delete_all_users().unwrap(), 2);
    assert!(repo.list_users().unwrap().is_empty());
}

#[test]
fn ids_are_not_reused_after_delete() {
    let (_dir, _path, repo) = setup();
    let first = repo
        .add_user(&new_user("a", "a", 20, "a@example.com"))
        .unwrap();
    repo.delete_all_users().unwrap();

    let second = repo
        .add_user(&new_user("a", "a", 20, "a@example.com"))
        .unwrap();
    assert!(second.id() > first.id());
}

#[test]
fn storage_check_violation_maps_to_constraint_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("strict.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT UNIQUE NOT NULL,
            name TEXT NOT NULL,
            surname TEXT NOT NULL,
            age INTEGER NOT NULL CHECK (age <= 60)
        );
        PRAGMA user_version = 1;",
    )
    .unwrap();
    drop(conn);

    let repo = SqliteUserRepository::try_new(&path).unwrap();
    let err = repo
        .add_user(&new_user("ann", "lee", 70, "ann@example.com"))
        .unwrap_err();
    match err {
        RepoError::Constraint(message) => assert!(message.starts_with("failed to add user")),
        other => panic!("unexpected error: {other}"),
    }

    repo.add_user(&new_user("ann", "lee", 50, "ann@example.com"))
        .unwrap();
    let err = repo
        .update_user(&new_user("ann", "lee", 70, "ann@example.com"))
        .unwrap_err();
    match err {
        RepoError::Constraint(message) => assert!(message.starts_with("failed to update user")),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(repo.get_user_by_email("ann@example.com").unwrap().age(), 50);
}

#[test]
fn invalid_persisted_row_is_reported() {
    let (_dir, path, repo) = setup();
    let conn = Connection::open(&path).unwrap();
    conn.execute(
        "INSERT INTO users (email, name, surname, age) VALUES ('a b@example.com', 'ann', 'lee', 30);",
        [],
    )
    .unwrap();

    let err = repo.list_users().unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn repository_rejects_uninitialized_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.db");
    std::fs::File::create(&path).unwrap();

    let result = SqliteUserRepository::try_new(&path);
    match result {
        Err(RepoError::UninitializedStore {
            expected_version,
            actual_version: 0,
        }) => assert!(expected_version > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized store error"),
    }
}

#[test]
fn deserialized_input_reaches_storage_only_when_valid() {
    let (_dir, path, repo) = setup();

    let rejected = serde_json::from_value::<NewUser>(serde_json::json!({
        "name": "Kid",
        "surname": "Doe",
        "age": 17,
        "email": "kid@example.com"
    }));
    assert!(rejected.is_err());

    let accepted: NewUser = serde_json::from_value(serde_json::json!({
        "name": "Ann",
        "surname": "Lee",
        "age": 30,
        "email": "Ann@Example.com"
    }))
    .unwrap();
    let stored = repo.add_user(&accepted).unwrap();

    assert_eq!(stored.email(), "ann@example.com");
    assert_eq!(row_count(&path), 1);
}

#[test]
fn repository_refuses_missing_file_without_creating_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("typo.db");

    let err = SqliteUserRepository::try_new(&path).unwrap_err();
    match err {
        RepoError::Db(DbError::MissingStore(missing)) => assert_eq!(missing, path),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!path.exists());
}

#[test]
fn repository_rejects_store_without_users_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("versioned.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 1;").unwrap();
    drop(conn);

    let result = SqliteUserRepository::try_new(&path);
    assert!(matches!(result, Err(RepoError::MissingRequiredTable("users"))));
}
