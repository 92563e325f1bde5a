// Posts: authoring, feeds, and the like-toggle engagement counter.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::core::{current_time_millis, IdGenerator, UserId};
use crate::error::{AppError, AppResult};
use crate::models::{pull_member, toggle_member, validate_content, Account, FriendRecord, Post};
use crate::services::account_map;
use crate::store::{encode, DocumentStore, NewDocument};

#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn DocumentStore>,
    ids: Arc<IdGenerator>,
}

impl PostService {
    pub fn new(store: Arc<dyn DocumentStore>, ids: Arc<IdGenerator>) -> Self {
        Self { store, ids }
    }

    pub async fn create_post(&self, actor: UserId, content: String) -> AppResult<Post> {
        validate_content(&content)?;

        let post = Post {
            id: self.ids.next_id(),
            created_by: actor,
            content,
            likes: Vec::new(),
            comments_length: 0,
            created_time: current_time_millis(),
        };
        self.store
            .insert(
                Post::COLLECTION,
                NewDocument::new(post.id, encode(&post)?).owned_by(actor.value()),
            )
            .await?;

        info!("create_post: user {} created post {}", actor, post.id);
        Ok(post)
    }

    pub async fn get_post(&self, id: i64) -> AppResult<Post> {
        let doc = self
            .store
            .get(Post::COLLECTION, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No post with id {}", id)))?;
        doc.decode()
    }

    /// Posts authored by one user, oldest first.
    pub async fn user_posts(&self, user: UserId) -> AppResult<Vec<Post>> {
        let docs = self
            .store
            .find_by_owner(Post::COLLECTION, user.value())
            .await?;
        docs.iter().map(|doc| doc.decode()).collect()
    }

    /// Posts authored by the viewer's confirmed friends, one batched lookup
    /// over the friends list.
    pub async fn friends_posts(&self, viewer: UserId) -> AppResult<Vec<Post>> {
        let record: FriendRecord = self
            .store
            .get(FriendRecord::COLLECTION, viewer.value())
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Friend record not found for user {}", viewer))
            })?
            .decode()?;

        let friend_ids: Vec<i64> = record.friends_list.iter().map(|id| id.value()).collect();
        let docs = self
            .store
            .find_by_owners(Post::COLLECTION, &friend_ids)
            .await?;
        docs.iter().map(|doc| doc.decode()).collect()
    }

    /// Delete a post the caller owns.
    pub async fn delete_post(&self, actor: UserId, id: i64) -> AppResult<Post> {
        let post = self.get_post(id).await?;
        if post.created_by != actor {
            return Err(AppError::NotFound(format!("No post with id {}", id)));
        }
        self.store.delete(Post::COLLECTION, id).await?;
        info!("delete_post: user {} deleted post {}", actor, id);
        Ok(post)
    }

    /// Flip the actor's membership in the post's like set. Applying twice
    /// returns the set to its original state.
    pub async fn toggle_like(&self, actor: UserId, post_id: i64) -> AppResult<Post> {
        let mut tx = self.store.begin().await?;
        let mut post: Post = self
            .store
            .get_tx(&mut tx, Post::COLLECTION, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No post with id {}", post_id)))?
            .decode()?;

        let liked = toggle_member(&mut post.likes, actor);
        self.store
            .update_tx(&mut tx, Post::COLLECTION, post_id, encode(&post)?)
            .await?;
        tx.commit().await?;

        info!(
            "toggle_like: user {} {} post {}",
            actor,
            if liked { "liked" } else { "unliked" },
            post_id
        );
        Ok(post)
    }

    /// The post together with a profile projection of everyone who liked it.
    pub async fn likes(&self, post_id: i64) -> AppResult<(Post, HashMap<UserId, Account>)> {
        let post = self.get_post(post_id).await?;
        let accounts = account_map(self.store.as_ref(), &post.likes).await?;
        Ok((post, accounts))
    }

    pub async fn delete_user_posts(&self, user: UserId) -> AppResult<u64> {
        self.store
            .delete_by_owner(Post::COLLECTION, user.value())
            .await
    }

    /// Pull a departing user out of every remaining post's like set.
    pub async fn purge_likes(&self, target: UserId) -> AppResult<u64> {
        let docs = self.store.list(Post::COLLECTION).await?;
        let mut purged = 0;

        for doc in &docs {
            let mut post: Post = doc.decode()?;
            if pull_member(&mut post.likes, target) {
                self.store
                    .update(Post::COLLECTION, doc.id, encode(&post)?)
                    .await?;
                purged += 1;
            }
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::FriendService;
    use crate::store::SqliteStore;

    async fn setup() -> (PostService, FriendService) {
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteStore::new_in_memory().await.unwrap());
        let ids = Arc::new(IdGenerator::new(0));
        (
            PostService::new(store.clone(), ids),
            FriendService::new(store),
        )
    }

    #[tokio::test]
    async fn test_create_and_fetch_post() {
        let (posts, _) = setup().await;
        let post = posts
            .create_post(UserId::new(1), "hello".to_string())
            .await
            .unwrap();

        let fetched = posts.get_post(post.id).await.unwrap();
        assert_eq!(fetched.content, "hello");
        assert_eq!(fetched.created_by, UserId::new(1));
        assert_eq!(fetched.comments_length, 0);
        assert!(fetched.likes.is_empty());
    }

    #[tokio::test]
    async fn test_create_post_validates_content() {
        let (posts, _) = setup().await;
        assert!(matches!(
            posts.create_post(UserId::new(1), String::new()).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            posts.create_post(UserId::new(1), "x".repeat(301)).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_toggle_like_is_involution() {
        let (posts, _) = setup().await;
        let post = posts
            .create_post(UserId::new(1), "hello".to_string())
            .await
            .unwrap();

        let liked = posts.toggle_like(UserId::new(2), post.id).await.unwrap();
        assert_eq!(liked.likes, vec![UserId::new(2)]);

        let unliked = posts.toggle_like(UserId::new(2), post.id).await.unwrap();
        assert!(unliked.likes.is_empty());
    }

    #[tokio::test]
    async fn test_toggle_like_missing_post_is_not_found() {
        let (posts, _) = setup().await;
        let err = posts.toggle_like(UserId::new(1), 999).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_friends_posts_only_covers_confirmed_friends() {
        let (posts, friends) = setup().await;
        for id in [1, 2, 3] {
            friends.create_record(UserId::new(id)).await.unwrap();
        }
        // 1 and 2 become friends; 3 stays pending.
        friends
            .send_request(UserId::new(1), UserId::new(2))
            .await
            .unwrap();
        friends
            .accept_request(UserId::new(2), UserId::new(1))
            .await
            .unwrap();
        friends
            .send_request(UserId::new(1), UserId::new(3))
            .await
            .unwrap();

        posts
            .create_post(UserId::new(2), "from a friend".to_string())
            .await
            .unwrap();
        posts
            .create_post(UserId::new(3), "from a pending request".to_string())
            .await
            .unwrap();

        let feed = posts.friends_posts(UserId::new(1)).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].created_by, UserId::new(2));
    }

    #[tokio::test]
    async fn test_delete_post_requires_ownership() {
        let (posts, _) = setup().await;
        let post = posts
            .create_post(UserId::new(1), "mine".to_string())
            .await
            .unwrap();

        let err = posts
            .delete_post(UserId::new(2), post.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        posts.delete_post(UserId::new(1), post.id).await.unwrap();
        assert!(matches!(
            posts.get_post(post.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_purge_likes_removes_target_everywhere() {
        let (posts, _) = setup().await;
        let p1 = posts
            .create_post(UserId::new(1), "one".to_string())
            .await
            .unwrap();
        let p2 = posts
            .create_post(UserId::new(2), "two".to_string())
            .await
            .unwrap();
        posts.toggle_like(UserId::new(9), p1.id).await.unwrap();
        posts.toggle_like(UserId::new(9), p2.id).await.unwrap();
        posts.toggle_like(UserId::new(1), p2.id).await.unwrap();

        let purged = posts.purge_likes(UserId::new(9)).await.unwrap();
        assert_eq!(purged, 2);
        assert!(posts.get_post(p1.id).await.unwrap().likes.is_empty());
        assert_eq!(
            posts.get_post(p2.id).await.unwrap().likes,
            vec![UserId::new(1)]
        );
    }
}
