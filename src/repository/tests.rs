//! Repository Integration Tests
//!
//! Tests for the KV store, collections and users with in-memory SQLite.

#[cfg(test)]
mod tests {
    use crate::domain::{
        DomainError, InventoryItem, PersonalLedger, Project, Role, Task, UserRecord,
        WithdrawalHistory,
    };
    use crate::repository::{
        init_db, load_json, load_json_opt, ChangeFeed, CollectionRepository, KvStore, KvWrite,
        Repository, SearchableRepository, SqliteKvStore, StorageKey, StoreEvent, UserRepository,
        IN_MEMORY,
    };
    use chrono::NaiveDate;
    use std::path::PathBuf;
    use std::sync::Arc;

    async fn setup_test_store() -> (Arc<SqliteKvStore>, UserRepository) {
        // Use in-memory database for tests
        let db_state = init_db(&PathBuf::from(IN_MEMORY)).await.expect("Failed to init test DB");
        let feed = ChangeFeed::default();
        let store = Arc::new(SqliteKvStore::new(db_state.conn.clone(), feed.clone()));
        let users = UserRepository::new(db_state.conn.clone(), feed);
        (store, users)
    }

    #[tokio::test]
    async fn test_missing_key_reads_as_default() {
        let (store, _) = setup_test_store().await;

        let items: Vec<InventoryItem> = load_json(store.as_ref(), &StorageKey::Inventory).await.unwrap();
        assert!(items.is_empty());
        assert!(store.get("inventory").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_json_is_masked() {
        let (store, _) = setup_test_store().await;
        store
            .write_batch(vec![KvWrite::Put {
                key: "inventory".to_string(),
                value: "{not json".to_string(),
            }])
            .await
            .unwrap();

        let items: Vec<InventoryItem> = load_json(store.as_ref(), &StorageKey::Inventory).await.unwrap();
        assert!(items.is_empty());
        let raw: Option<Vec<InventoryItem>> =
            load_json_opt(store.as_ref(), &StorageKey::Inventory).await.unwrap();
        assert!(raw.is_none());
    }

    #[tokio::test]
    async fn test_entity_lists_round_trip() {
        let (store, _) = setup_test_store().await;

        let mut gloves = InventoryItem::new("Gloves".into(), 20, 5, "pcs".into(), true);
        gloves.id = 1;
        let mut ledger = PersonalLedger::default();
        ledger.credit(&gloves, 3, 9).unwrap();
        let mut history = WithdrawalHistory::default();
        history.record(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 1, 3);
        let mut project = Project::new("Launch".into(), "Q3".into(), vec!["alice".into()]);
        project.id = 4;
        project.tasks.push(Task::new(5, "Plan".into(), "alice".into()));

        let ledger_key = StorageKey::PersonalInventory("alice".into());
        let history_key = StorageKey::WithdrawalHistory("alice".into());
        store
            .write_batch(vec![
                KvWrite::put_json(&StorageKey::Inventory, &vec![gloves.clone()]).unwrap(),
                KvWrite::put_json(&ledger_key, &ledger).unwrap(),
                KvWrite::put_json(&history_key, &history).unwrap(),
                KvWrite::put_json(&StorageKey::Projects, &vec![project.clone()]).unwrap(),
            ])
            .await
            .unwrap();

        let items: Vec<InventoryItem> = load_json(store.as_ref(), &StorageKey::Inventory).await.unwrap();
        let ledger_back: PersonalLedger = load_json(store.as_ref(), &ledger_key).await.unwrap();
        let history_back: WithdrawalHistory = load_json(store.as_ref(), &history_key).await.unwrap();
        let projects: Vec<Project> = load_json(store.as_ref(), &StorageKey::Projects).await.unwrap();
        assert_eq!(items, vec![gloves]);
        assert_eq!(ledger_back, ledger);
        assert_eq!(history_back, history);
        assert_eq!(projects, vec![project]);
    }

    #[tokio::test]
    async fn test_batch_publishes_changes() {
        let (store, _) = setup_test_store().await;
        let mut events = store.subscribe();

        store
            .write_batch(vec![
                KvWrite::put_json(&StorageKey::AuthorizedEmails, &vec!["a@x.io"]).unwrap(),
                KvWrite::remove(&StorageKey::CurrentUser),
            ])
            .await
            .unwrap();

        assert_eq!(events.recv().await.unwrap(), StoreEvent::Key("authorizedEmails".into()));
        assert_eq!(events.recv().await.unwrap(), StoreEvent::Key("currentUser".into()));
        assert!(store.get("authorizedEmails").await.unwrap().is_some());
        assert!(store.get("currentUser").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sequences_are_independent() {
        let (store, _) = setup_test_store().await;
        assert_eq!(store.next_id("inventory").await.unwrap(), 1);
        assert_eq!(store.next_id("inventory").await.unwrap(), 2);
        assert_eq!(store.next_id("projects").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_collection_crud() {
        let (store, _) = setup_test_store().await;
        let repo: CollectionRepository<InventoryItem> =
            CollectionRepository::new(store.clone(), StorageKey::Inventory);

        let created = repo
            .create(&InventoryItem::new("Tape".into(), 4, 2, "rolls".into(), false))
            .await
            .expect("Failed to create");
        assert!(created.id > 0);

        let mut found = repo.find_by_id(created.id).await.unwrap().unwrap();
        found.quantity = 9;
        repo.update(&found).await.expect("Update failed");
        assert_eq!(repo.list().await.unwrap()[0].quantity, 9);

        repo.delete(created.id).await.expect("Delete failed");
        assert!(repo.find_by_id(created.id).await.unwrap().is_none());
        assert!(matches!(repo.delete(created.id).await, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_user_repository() {
        let (_, users) = setup_test_store().await;

        let alice = UserRecord::new("alice".into(), "alice@corp.io".into(), Role::Employee);
        users.create(&alice).await.expect("Failed to create");
        users
            .create(&UserRecord::new("root".into(), "root@corp.io".into(), Role::Admin))
            .await
            .unwrap();

        assert!(matches!(users.create(&alice).await, Err(DomainError::Conflict(_))));
        assert_eq!(users.find_by_id("alice".into()).await.unwrap(), Some(alice.clone()));
        assert_eq!(users.list().await.unwrap().len(), 2);
        assert_eq!(users.list_by_role(Role::Employee).await.unwrap(), vec![alice.clone()]);
        assert_eq!(users.search("corp").await.unwrap().len(), 2);

        let mut promoted = alice.clone();
        promoted.role = Role::Admin;
        users.update(&promoted).await.unwrap();
        assert!(users.list_by_role(Role::Employee).await.unwrap().is_empty());

        users.delete("alice".into()).await.unwrap();
        assert!(!users.exists("alice".into()).await.unwrap());
    }

    #[tokio::test]
    async fn test_user_search_matches_wildcards_literally() {
        let (_, users) = setup_test_store().await;
        for (name, email) in [("a_b", "ab@corp.io"), ("aXb", "axb@corp.io"), ("max", "100%@corp.io")] {
            users
                .create(&UserRecord::new(name.into(), email.into(), Role::Employee))
                .await
                .unwrap();
        }

        let found = users.search("a_b").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "a_b");

        let found = users.search("%").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "max");
        assert_eq!(users.search("AXB").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("opsdesk.db");

        {
            let db_state = init_db(&path).await.unwrap();
            let store = SqliteKvStore::new(db_state.conn.clone(), ChangeFeed::default());
            store
                .write_batch(vec![KvWrite::put_json(&StorageKey::AuthorizedEmails, &vec!["a@x.io"]).unwrap()])
                .await
                .unwrap();
            db_state.close().await;
        }

        let db_state = init_db(&path).await.unwrap();
        let store = SqliteKvStore::new(db_state.conn.clone(), ChangeFeed::default());
        let emails: Vec<String> = load_json(&store, &StorageKey::AuthorizedEmails).await.unwrap();
        assert_eq!(emails, vec!["a@x.io".to_string()]);
    }
}
