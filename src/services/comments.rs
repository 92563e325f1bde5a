// Comments: creation with the denormalized post counter, per-post listing
// with author projection, and the like toggle.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::core::{current_time_millis, IdGenerator, UserId};
use crate::error::{AppError, AppResult};
use crate::models::{pull_member, toggle_member, validate_content, Account, Comment, Post};
use crate::services::account_map;
use crate::store::{encode, DocumentStore, NewDocument};

#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn DocumentStore>,
    ids: Arc<IdGenerator>,
}

impl CommentService {
    pub fn new(store: Arc<dyn DocumentStore>, ids: Arc<IdGenerator>) -> Self {
        Self { store, ids }
    }

    /// Create a comment against a post and bump the post's comment counter.
    /// Insert and increment commit as one unit: a comment can never exist
    /// without its counter increment.
    pub async fn add_comment(
        &self,
        actor: UserId,
        commented_in: i64,
        content: String,
    ) -> AppResult<Comment> {
        validate_content(&content)?;

        let mut tx = self.store.begin().await?;
        let mut post: Post = self
            .store
            .get_tx(&mut tx, Post::COLLECTION, commented_in)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No post with id {}", commented_in)))?
            .decode()?;

        let comment = Comment {
            id: self.ids.next_id(),
            created_by: actor,
            commented_in,
            content,
            likes: Vec::new(),
            created_time: current_time_millis(),
        };
        self.store
            .insert_tx(
                &mut tx,
                Comment::COLLECTION,
                NewDocument::new(comment.id, encode(&comment)?)
                    .owned_by(actor.value())
                    .child_of(commented_in),
            )
            .await?;

        post.comments_length += 1;
        self.store
            .update_tx(&mut tx, Post::COLLECTION, commented_in, encode(&post)?)
            .await?;
        tx.commit().await?;

        info!(
            "add_comment: user {} commented on post {} (count {})",
            actor, commented_in, post.comments_length
        );
        Ok(comment)
    }

    pub async fn get_comment(&self, id: i64) -> AppResult<Comment> {
        let doc = self
            .store
            .get(Comment::COLLECTION, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No comment with id {}", id)))?;
        doc.decode()
    }

    pub async fn user_comments(&self, user: UserId) -> AppResult<Vec<Comment>> {
        let docs = self
            .store
            .find_by_owner(Comment::COLLECTION, user.value())
            .await?;
        docs.iter().map(|doc| doc.decode()).collect()
    }

    /// Comments on a post plus a profile projection of their authors,
    /// fetched with one batched account lookup.
    pub async fn post_comments(
        &self,
        post_id: i64,
    ) -> AppResult<(Vec<Comment>, HashMap<UserId, Account>)> {
        let docs = self
            .store
            .find_by_parent(Comment::COLLECTION, post_id)
            .await?;
        let comments: Vec<Comment> = docs
            .iter()
            .map(|doc| doc.decode())
            .collect::<AppResult<_>>()?;

        let mut authors: Vec<UserId> = comments.iter().map(|c| c.created_by).collect();
        authors.sort_unstable();
        authors.dedup();

        let accounts = account_map(self.store.as_ref(), &authors).await?;
        Ok((comments, accounts))
    }

    /// Flip the actor's membership in the comment's like set.
    pub async fn toggle_like(&self, actor: UserId, comment_id: i64) -> AppResult<Comment> {
        let mut tx = self.store.begin().await?;
        let mut comment: Comment = self
            .store
            .get_tx(&mut tx, Comment::COLLECTION, comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No comment with id {}", comment_id)))?
            .decode()?;

        let liked = toggle_member(&mut comment.likes, actor);
        self.store
            .update_tx(&mut tx, Comment::COLLECTION, comment_id, encode(&comment)?)
            .await?;
        tx.commit().await?;

        info!(
            "toggle_like: user {} {} comment {}",
            actor,
            if liked { "liked" } else { "unliked" },
            comment_id
        );
        Ok(comment)
    }

    /// The comment together with a projection of everyone who liked it.
    pub async fn likes(&self, comment_id: i64) -> AppResult<(Comment, HashMap<UserId, Account>)> {
        let comment = self.get_comment(comment_id).await?;
        let accounts = account_map(self.store.as_ref(), &comment.likes).await?;
        Ok((comment, accounts))
    }

    /// Pull a departing user out of every comment's like set.
    pub async fn purge_likes(&self, target: UserId) -> AppResult<u64> {
        let docs = self.store.list(Comment::COLLECTION).await?;
        let mut purged = 0;

        for doc in &docs {
            let mut comment: Comment = doc.decode()?;
            if pull_member(&mut comment.likes, target) {
                self.store
                    .update(Comment::COLLECTION, doc.id, encode(&comment)?)
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
    use crate::services::PostService;
    use crate::store::SqliteStore;

    async fn setup() -> (CommentService, PostService) {
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteStore::new_in_memory().await.unwrap());
        let ids = Arc::new(IdGenerator::new(0));
        (
            CommentService::new(store.clone(), ids.clone()),
            PostService::new(store, ids),
        )
    }

    #[tokio::test]
    async fn test_add_comment_increments_post_counter() {
        let (comments, posts) = setup().await;
        let post = posts
            .create_post(UserId::new(1), "a post".to_string())
            .await
            .unwrap();
        assert_eq!(post.comments_length, 0);

        let comment = comments
            .add_comment(UserId::new(2), post.id, "hi".to_string())
            .await
            .unwrap();
        assert_eq!(comment.commented_in, post.id);
        assert_eq!(comment.created_by, UserId::new(2));

        let post = posts.get_post(post.id).await.unwrap();
        assert_eq!(post.comments_length, 1);

        comments
            .add_comment(UserId::new(1), post.id, "again".to_string())
            .await
            .unwrap();
        assert_eq!(posts.get_post(post.id).await.unwrap().comments_length, 2);
    }

    #[tokio::test]
    async fn test_add_comment_validates_content() {
        let (comments, posts) = setup().await;
        let post = posts
            .create_post(UserId::new(1), "a post".to_string())
            .await
            .unwrap();

        assert!(matches!(
            comments.add_comment(UserId::new(2), post.id, String::new()).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            comments
                .add_comment(UserId::new(2), post.id, "x".repeat(301))
                .await,
            Err(AppError::Validation(_))
        ));
        // Failed attempts must not move the counter.
        assert_eq!(posts.get_post(post.id).await.unwrap().comments_length, 0);
    }

    #[tokio::test]
    async fn test_add_comment_on_missing_post_is_not_found() {
        let (comments, _) = setup().await;
        let err = comments
            .add_comment(UserId::new(1), 404, "hi".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_toggle_like_on_comment_is_involution() {
        let (comments, posts) = setup().await;
        let post = posts
            .create_post(UserId::new(1), "a post".to_string())
            .await
            .unwrap();
        let comment = comments
            .add_comment(UserId::new(2), post.id, "hi".to_string())
            .await
            .unwrap();

        let liked = comments
            .toggle_like(UserId::new(3), comment.id)
            .await
            .unwrap();
        assert_eq!(liked.likes, vec![UserId::new(3)]);

        let unliked = comments
            .toggle_like(UserId::new(3), comment.id)
            .await
            .unwrap();
        assert!(unliked.likes.is_empty());
    }

    #[tokio::test]
    async fn test_post_comments_lists_only_that_post() {
        let (comments, posts) = setup().await;
        let p1 = posts
            .create_post(UserId::new(1), "one".to_string())
            .await
            .unwrap();
        let p2 = posts
            .create_post(UserId::new(1), "two".to_string())
            .await
            .unwrap();

        comments
            .add_comment(UserId::new(2), p1.id, "on one".to_string())
            .await
            .unwrap();
        comments
            .add_comment(UserId::new(3), p1.id, "also on one".to_string())
            .await
            .unwrap();
        comments
            .add_comment(UserId::new(2), p2.id, "on two".to_string())
            .await
            .unwrap();

        let (listed, _) = comments.post_comments(p1.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|c| c.commented_in == p1.id));

        let mine = comments.user_comments(UserId::new(2)).await.unwrap();
        assert_eq!(mine.len(), 2);
    }
}
