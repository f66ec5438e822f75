//! End-to-end friendship flow over a SQLite store.

use std::sync::Arc;

use amity_core::{Database, Error, FriendsService, User, UserStore};

async fn user(db: &Database, name: &str, friends: &[&str]) -> String {
    let mut user = User::new(name.to_string(), format!("{}@example.com", name), "x".into());
    user.friends = friends.iter().map(|f| f.to_string()).collect();
    db.insert(&mut user).await.unwrap();
    user.id
}

#[tokio::test]
async fn test_request_accept_recommend() {
    let db = Database::open(None).await.unwrap();
    let u1 = user(&db, "u1", &[]).await;
    let u2 = user(&db, "u2", &[]).await;
    let u3 = user(&db, "u3", &[&u1]).await;
    let friends = FriendsService::new(Arc::new(db.clone()));

    friends.send_request(&u1, &u2).await.unwrap();
    let pending = db.find_by_id(&u2).await.unwrap().unwrap().friend_requests;
    assert_eq!(pending, vec![u1.clone()]);

    friends.accept_request(&u2, &u1).await.unwrap();
    let one = db.find_by_id(&u1).await.unwrap().unwrap();
    let two = db.find_by_id(&u2).await.unwrap().unwrap();
    assert!(one.friends.contains(&u2));
    assert_eq!(two.friends, vec![u1.clone()]);
    assert!(two.friend_requests.is_empty());

    let recs = friends.recommendations(&u3).await.unwrap();
    let ids: Vec<&str> = recs.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec![u2.as_str()]);
    assert_eq!(recs[0].name, "u2");
}

#[tokio::test]
async fn test_accept_twice_fails_cleanly() {
    let db = Database::open(None).await.unwrap();
    let a = user(&db, "a", &[]).await;
    let b = user(&db, "b", &[]).await;
    let friends = FriendsService::new(Arc::new(db.clone()));

    friends.send_request(&b, &a).await.unwrap();
    friends.accept_request(&a, &b).await.unwrap();
    assert!(matches!(
        friends.accept_request(&a, &b).await,
        Err(Error::NoSuchRequest)
    ));

    let a_user = db.find_by_id(&a).await.unwrap().unwrap();
    assert_eq!(a_user.friends, vec![b.clone()]);
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("amity.db");
    let path = path.to_str().unwrap();

    let (a, b) = {
        let db = Database::open(Some(path)).await.unwrap();
        let a = user(&db, "a", &[]).await;
        let b = user(&db, "b", &[]).await;
        let friends = FriendsService::new(Arc::new(db));
        friends.send_request(&a, &b).await.unwrap();
        friends.accept_request(&b, &a).await.unwrap();
        (a, b)
    };

    let db = Database::open(Some(path)).await.unwrap();
    let friends = FriendsService::new(Arc::new(db));
    let listed = friends.list_friends(&a).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, b);
}
