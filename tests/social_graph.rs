// End-to-end scenarios across the services, driven against the real store.

use std::sync::Arc;

use socialhub::core::{IdGenerator, UserId};
use socialhub::error::AppError;
use socialhub::models::AccountPatch;
use socialhub::services::{
    account_map, AccountService, CommentService, FriendService, NewAccount, PostService,
};
use socialhub::store::{DocumentStore, SqliteStore};

struct Backend {
    store: Arc<dyn DocumentStore>,
    accounts: AccountService,
    friends: FriendService,
    posts: PostService,
    comments: CommentService,
}

impl Backend {
    fn over(store: Arc<dyn DocumentStore>) -> Self {
        let ids = Arc::new(IdGenerator::new(1));
        Self {
            accounts: AccountService::new(store.clone(), ids.clone()),
            friends: FriendService::new(store.clone()),
            posts: PostService::new(store.clone(), ids.clone()),
            comments: CommentService::new(store.clone(), ids),
            store,
        }
    }

    async fn in_memory() -> Self {
        Self::over(Arc::new(SqliteStore::new_in_memory().await.unwrap()))
    }

    async fn register(&self, email: &str, first: &str) -> UserId {
        self.accounts
            .create_account(NewAccount {
                email: email.to_string(),
                first_name: first.to_string(),
                last_name: "Tester".to_string(),
                avatar_image_name: "avatar.png".to_string(),
                cover_image_name: "cover.png".to_string(),
            })
            .await
            .unwrap()
            .user
            .id
    }
}

#[tokio::test]
async fn friendship_negotiation_end_to_end() {
    let backend = Backend::in_memory().await;
    let ada = backend.register("ada@example.com", "Ada").await;
    let grace = backend.register("grace@example.com", "Grace").await;
    let linus = backend.register("linus@example.com", "Linus").await;

    // Before any requests everyone else is a potential friend.
    let data = backend.friends.friends_data(ada).await.unwrap();
    assert_eq!(data.potential_friends.len(), 2);
    assert!(!data.potential_friends.contains(&ada));
    assert_eq!(data.accounts_map.len(), 2);

    backend.friends.send_request(ada, grace).await.unwrap();

    // Pending relations no longer count as potential, on both sides.
    let data = backend.friends.friends_data(ada).await.unwrap();
    assert_eq!(data.potential_friends, vec![linus]);
    assert_eq!(data.related_ids, vec![grace]);
    let data = backend.friends.friends_data(grace).await.unwrap();
    assert_eq!(data.potential_friends, vec![linus]);

    let outcome = backend.friends.accept_request(grace, ada).await.unwrap();
    assert!(outcome.applied());

    let data = backend.friends.friends_data(ada).await.unwrap();
    assert_eq!(data.record.friends_list, vec![grace]);
    assert!(data.record.sent_requests.is_empty());
    assert_eq!(data.potential_friends, vec![linus]);
}

#[tokio::test]
async fn engagement_counters_end_to_end() {
    let backend = Backend::in_memory().await;
    let ada = backend.register("ada@example.com", "Ada").await;
    let grace = backend.register("grace@example.com", "Grace").await;

    let post = backend
        .posts
        .create_post(ada, "first post".to_string())
        .await
        .unwrap();

    backend.posts.toggle_like(grace, post.id).await.unwrap();
    let comment = backend
        .comments
        .add_comment(grace, post.id, "nice".to_string())
        .await
        .unwrap();

    let (post, likers) = backend.posts.likes(post.id).await.unwrap();
    assert_eq!(post.likes, vec![grace]);
    assert_eq!(post.comments_length, 1);
    assert_eq!(likers.get(&grace).unwrap().first_name, "Grace");

    let (comments, authors) = backend.comments.post_comments(post.id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].id, comment.id);
    assert_eq!(authors.get(&grace).unwrap().first_name, "Grace");

    // Unlike restores the original like set, the counter stays.
    let (post, _) = backend.posts.likes(post.id).await.unwrap();
    let post = backend.posts.toggle_like(grace, post.id).await.unwrap();
    assert!(post.likes.is_empty());
    assert_eq!(post.comments_length, 1);
}

#[tokio::test]
async fn deleting_a_user_purges_every_reference() {
    let backend = Backend::in_memory().await;
    let ada = backend.register("ada@example.com", "Ada").await;
    let grace = backend.register("grace@example.com", "Grace").await;
    let linus = backend.register("linus@example.com", "Linus").await;

    backend.friends.send_request(ada, grace).await.unwrap();
    backend.friends.send_request(linus, ada).await.unwrap();

    let post = backend
        .posts
        .create_post(grace, "a post".to_string())
        .await
        .unwrap();
    backend.posts.toggle_like(ada, post.id).await.unwrap();
    let comment = backend
        .comments
        .add_comment(linus, post.id, "hello".to_string())
        .await
        .unwrap();
    backend.comments.toggle_like(ada, comment.id).await.unwrap();
    backend
        .posts
        .create_post(ada, "ada's own post".to_string())
        .await
        .unwrap();

    // The same purge sequence the delete endpoint drives.
    backend.accounts.delete_user(ada).await.unwrap();
    backend.posts.delete_user_posts(ada).await.unwrap();
    let purged = backend.friends.purge_references(ada).await.unwrap();
    assert_eq!(purged, 2);
    backend.posts.purge_likes(ada).await.unwrap();
    backend.comments.purge_likes(ada).await.unwrap();

    for other in [grace, linus] {
        let record = backend.friends.get(other).await.unwrap();
        assert!(!record.is_related(ada));
    }
    assert!(backend.posts.get_post(post.id).await.unwrap().likes.is_empty());
    assert!(backend
        .comments
        .get_comment(comment.id)
        .await
        .unwrap()
        .likes
        .is_empty());
    assert!(backend.posts.user_posts(ada).await.unwrap().is_empty());
    assert!(matches!(
        backend.friends.get(ada).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn account_projection_covers_requested_ids_only() {
    let backend = Backend::in_memory().await;
    let ada = backend.register("ada@example.com", "Ada").await;
    let grace = backend.register("grace@example.com", "Grace").await;
    backend.register("linus@example.com", "Linus").await;

    let map = account_map(backend.store.as_ref(), &[ada, grace])
        .await
        .unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&ada).unwrap().first_name, "Ada");
    assert_eq!(map.get(&grace).unwrap().first_name, "Grace");

    // Unknown ids are simply absent from the projection.
    let map = account_map(backend.store.as_ref(), &[UserId::new(999)])
        .await
        .unwrap();
    assert!(map.is_empty());
}

#[tokio::test]
async fn file_backed_store_survives_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}/social.db?mode=rwc", dir.path().display());

    let ada = {
        let backend = Backend::over(Arc::new(SqliteStore::connect(&url).await.unwrap()));
        let ada = backend.register("ada@example.com", "Ada").await;
        let grace = backend.register("grace@example.com", "Grace").await;
        backend.friends.send_request(ada, grace).await.unwrap();
        backend.friends.accept_request(grace, ada).await.unwrap();
        ada
    };

    let backend = Backend::over(Arc::new(SqliteStore::connect(&url).await.unwrap()));
    let record = backend.friends.get(ada).await.unwrap();
    assert_eq!(record.friends_list.len(), 1);

    let edited = backend
        .accounts
        .edit_account(
            ada,
            AccountPatch {
                first_name: Some("Adeline".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.first_name, "Adeline");
}
