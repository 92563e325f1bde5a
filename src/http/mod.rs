// HTTP surface: application state, the API router, and caller identity.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use crate::core::IdGenerator;
use crate::services::{AccountService, CommentService, FriendService, PostService};
use crate::store::DocumentStore;

#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub friends: FriendService,
    pub posts: PostService,
    pub comments: CommentService,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, ids: Arc<IdGenerator>) -> Self {
        Self {
            accounts: AccountService::new(store.clone(), ids.clone()),
            friends: FriendService::new(store.clone()),
            posts: PostService::new(store.clone(), ids.clone()),
            comments: CommentService::new(store, ids),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route(
            "/api/accounts",
            get(handlers::list_accounts)
                .post(handlers::create_account)
                .patch(handlers::edit_account)
                .delete(handlers::delete_user),
        )
        .route("/api/accounts/{id}", get(handlers::get_account))
        .route("/api/friends-data", get(handlers::friends_data))
        .route(
            "/api/friends-data/send-request",
            post(handlers::send_friend_request),
        )
        .route(
            "/api/friends-data/accept-request",
            post(handlers::accept_friend_request),
        )
        .route(
            "/api/posts",
            get(handlers::my_posts).post(handlers::create_post),
        )
        .route("/api/posts/friends", get(handlers::friends_posts))
        .route("/api/posts/user/{id}", get(handlers::user_posts))
        .route(
            "/api/posts/{id}",
            get(handlers::get_post).delete(handlers::delete_post),
        )
        .route("/api/posts/{id}/toggle-like", post(handlers::toggle_like_post))
        .route("/api/posts/{id}/likes", get(handlers::post_likes))
        .route("/api/comments", post(handlers::create_comment))
        .route("/api/comments/mine", get(handlers::my_comments))
        .route("/api/comments/post/{id}", get(handlers::post_comments))
        .route("/api/comments/{id}", get(handlers::get_comment))
        .route(
            "/api/comments/{id}/toggle-like",
            post(handlers::toggle_like_comment),
        )
        .route("/api/comments/{id}/likes", get(handlers::comment_likes))
        .layer(
            ServiceBuilder::new().layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}
