// API handlers. Each mutating endpoint returns the mutated entity (or both
// entities for the pair operations) as the response body.

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::core::{current_time_millis, UserId};
use crate::error::AppResult;
use crate::http::auth::Viewer;
use crate::http::AppState;
use crate::models::{Account, AccountPatch, Comment, FriendRecord, Post};
use crate::services::{AcceptOutcome, CreatedAccount, FriendsData, NewAccount};

#[derive(Deserialize)]
pub struct SendRequestBody {
    pub requested_user_id: UserId,
}

#[derive(Deserialize)]
pub struct AcceptRequestBody {
    pub accepted_user_id: UserId,
}

#[derive(Deserialize)]
pub struct CreatePostBody {
    pub content: String,
}

#[derive(Deserialize)]
pub struct CreateCommentBody {
    pub commented_in: i64,
    pub content: String,
}

#[derive(Serialize)]
pub struct SendRequestResponse {
    pub record: FriendRecord,
    pub recipient_record: FriendRecord,
}

#[derive(Serialize)]
pub struct PostsResponse {
    pub posts: Vec<Post>,
    pub count: usize,
}

#[derive(Serialize)]
pub struct AccountsResponse {
    pub accounts: Vec<Account>,
    pub count: usize,
}

#[derive(Serialize)]
pub struct PostLikesResponse {
    pub post: Post,
    pub accounts_map: HashMap<UserId, Account>,
}

#[derive(Serialize)]
pub struct CommentLikesResponse {
    pub comment: Comment,
    pub accounts_map: HashMap<UserId, Account>,
}

#[derive(Serialize)]
pub struct CommentsResponse {
    pub comments: Vec<Comment>,
    pub accounts_map: HashMap<UserId, Account>,
}

#[derive(Serialize)]
pub struct DeleteUserResponse {
    pub deleted_user: UserId,
    pub purged_friend_records: u64,
    pub deleted_posts: u64,
    pub purged_post_likes: u64,
    pub purged_comment_likes: u64,
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "socialhub",
        "timestamp": current_time_millis()
    }))
}

// Accounts

pub async fn create_account(
    State(state): State<AppState>,
    Json(body): Json<NewAccount>,
) -> AppResult<(StatusCode, Json<CreatedAccount>)> {
    let created = state.accounts.create_account(body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_accounts(
    State(state): State<AppState>,
    viewer: Viewer,
) -> AppResult<Json<AccountsResponse>> {
    let accounts = state.accounts.list_accounts(viewer.0).await?;
    let count = accounts.len();
    Ok(Json(AccountsResponse { accounts, count }))
}

pub async fn get_account(
    State(state): State<AppState>,
    _viewer: Viewer,
    Path(id): Path<i64>,
) -> AppResult<Json<Account>> {
    let account = state.accounts.get_account(UserId::new(id)).await?;
    Ok(Json(account))
}

pub async fn edit_account(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(patch): Json<AccountPatch>,
) -> AppResult<Json<Account>> {
    let account = state.accounts.edit_account(viewer.0, patch).await?;
    Ok(Json(account))
}

/// Remove the caller's user and purge every reference to it: friend sets,
/// like sets and post authorship.
pub async fn delete_user(
    State(state): State<AppState>,
    viewer: Viewer,
) -> AppResult<Json<DeleteUserResponse>> {
    let user = viewer.0;
    state.accounts.delete_user(user).await?;

    let deleted_posts = state.posts.delete_user_posts(user).await?;
    let purged_friend_records = state.friends.purge_references(user).await?;
    let purged_post_likes = state.posts.purge_likes(user).await?;
    let purged_comment_likes = state.comments.purge_likes(user).await?;

    Ok(Json(DeleteUserResponse {
        deleted_user: user,
        purged_friend_records,
        deleted_posts,
        purged_post_likes,
        purged_comment_likes,
    }))
}

// Friendship graph

pub async fn friends_data(
    State(state): State<AppState>,
    viewer: Viewer,
) -> AppResult<Json<FriendsData>> {
    let data = state.friends.friends_data(viewer.0).await?;
    Ok(Json(data))
}

pub async fn send_friend_request(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(body): Json<SendRequestBody>,
) -> AppResult<Json<SendRequestResponse>> {
    let (record, recipient_record) = state
        .friends
        .send_request(viewer.0, body.requested_user_id)
        .await?;
    Ok(Json(SendRequestResponse {
        record,
        recipient_record,
    }))
}

pub async fn accept_friend_request(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(body): Json<AcceptRequestBody>,
) -> AppResult<Json<AcceptOutcome>> {
    let outcome = state
        .friends
        .accept_request(viewer.0, body.accepted_user_id)
        .await?;
    Ok(Json(outcome))
}

// Posts

pub async fn create_post(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(body): Json<CreatePostBody>,
) -> AppResult<(StatusCode, Json<Post>)> {
    let post = state.posts.create_post(viewer.0, body.content).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn my_posts(
    State(state): State<AppState>,
    viewer: Viewer,
) -> AppResult<Json<PostsResponse>> {
    let posts = state.posts.user_posts(viewer.0).await?;
    let count = posts.len();
    Ok(Json(PostsResponse { posts, count }))
}

pub async fn user_posts(
    State(state): State<AppState>,
    _viewer: Viewer,
    Path(id): Path<i64>,
) -> AppResult<Json<PostsResponse>> {
    let posts = state.posts.user_posts(UserId::new(id)).await?;
    let count = posts.len();
    Ok(Json(PostsResponse { posts, count }))
}

pub async fn friends_posts(
    State(state): State<AppState>,
    viewer: Viewer,
) -> AppResult<Json<Vec<Post>>> {
    let posts = state.posts.friends_posts(viewer.0).await?;
    Ok(Json(posts))
}

pub async fn get_post(
    State(state): State<AppState>,
    _viewer: Viewer,
    Path(id): Path<i64>,
) -> AppResult<Json<Post>> {
    let post = state.posts.get_post(id).await?;
    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> AppResult<Json<Post>> {
    let post = state.posts.delete_post(viewer.0, id).await?;
    Ok(Json(post))
}

pub async fn toggle_like_post(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> AppResult<Json<Post>> {
    let post = state.posts.toggle_like(viewer.0, id).await?;
    Ok(Json(post))
}

pub async fn post_likes(
    State(state): State<AppState>,
    _viewer: Viewer,
    Path(id): Path<i64>,
) -> AppResult<Json<PostLikesResponse>> {
    let (post, accounts_map) = state.posts.likes(id).await?;
    Ok(Json(PostLikesResponse { post, accounts_map }))
}

// Comments

pub async fn create_comment(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(body): Json<CreateCommentBody>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let comment = state
        .comments
        .add_comment(viewer.0, body.commented_in, body.content)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn get_comment(
    State(state): State<AppState>,
    _viewer: Viewer,
    Path(id): Path<i64>,
) -> AppResult<Json<Comment>> {
    let comment = state.comments.get_comment(id).await?;
    Ok(Json(comment))
}

pub async fn my_comments(
    State(state): State<AppState>,
    viewer: Viewer,
) -> AppResult<Json<Vec<Comment>>> {
    let comments = state.comments.user_comments(viewer.0).await?;
    Ok(Json(comments))
}

pub async fn post_comments(
    State(state): State<AppState>,
    _viewer: Viewer,
    Path(id): Path<i64>,
) -> AppResult<Json<CommentsResponse>> {
    let (comments, accounts_map) = state.comments.post_comments(id).await?;
    Ok(Json(CommentsResponse {
        comments,
        accounts_map,
    }))
}

pub async fn toggle_like_comment(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> AppResult<Json<Comment>> {
    let comment = state.comments.toggle_like(viewer.0, id).await?;
    Ok(Json(comment))
}

pub async fn comment_likes(
    State(state): State<AppState>,
    _viewer: Viewer,
    Path(id): Path<i64>,
) -> AppResult<Json<CommentLikesResponse>> {
    let (comment, accounts_map) = state.comments.likes(id).await?;
    Ok(Json(CommentLikesResponse {
        comment,
        accounts_map,
    }))
}
