// Document models stored in the document store, plus the set helpers the
// friendship and like invariants rely on.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::UserId;
use crate::error::{AppError, AppResult};

/// Maximum length for post and comment bodies, in characters.
pub const MAX_CONTENT_LENGTH: usize = 300;

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

/// Insert into a duplicate-free id list. Returns false when already present.
pub fn push_unique(set: &mut Vec<UserId>, id: UserId) -> bool {
    if set.contains(&id) {
        return false;
    }
    set.push(id);
    true
}

/// Remove from an id list. Returns false when absent.
pub fn pull_member(set: &mut Vec<UserId>, id: UserId) -> bool {
    match set.iter().position(|member| *member == id) {
        Some(index) => {
            set.remove(index);
            true
        }
        None => false,
    }
}

/// Flip membership: present -> removed, absent -> inserted. Returns true when
/// the id is a member afterwards.
pub fn toggle_member(set: &mut Vec<UserId>, id: UserId) -> bool {
    if pull_member(set, id) {
        false
    } else {
        set.push(id);
        true
    }
}

pub fn validate_email(email: &str) -> AppResult<()> {
    if !EMAIL_REGEX.is_match(email) {
        return Err(AppError::Validation(format!("Invalid email: {}", email)));
    }
    Ok(())
}

pub fn validate_content(content: &str) -> AppResult<()> {
    if content.is_empty() {
        return Err(AppError::Validation("Content must not be empty".to_string()));
    }
    if content.chars().count() > MAX_CONTENT_LENGTH {
        return Err(AppError::Validation(format!(
            "Content exceeds {} characters",
            MAX_CONTENT_LENGTH
        )));
    }
    Ok(())
}

fn validate_name(field: &str, value: &str, max: usize) -> AppResult<()> {
    if value.is_empty() || value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{} must be between 1 and {} characters",
            field, max
        )));
    }
    Ok(())
}

/// Identity record. Credentials live with the external auth collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub created_time: i64,
}

impl User {
    pub const COLLECTION: &'static str = "users";
}

/// Public profile shown wherever a user id needs a face.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub created_by: UserId,
    pub first_name: String,
    pub last_name: String,
    pub avatar_image_name: String,
    pub cover_image_name: String,
}

impl Account {
    pub const COLLECTION: &'static str = "accounts";

    pub fn validate(&self) -> AppResult<()> {
        validate_name("first_name", &self.first_name, 30)?;
        validate_name("last_name", &self.last_name, 50)?;
        Ok(())
    }
}

/// Optional-field profile edit; only present fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_image_name: Option<String>,
    pub cover_image_name: Option<String>,
}

impl AccountPatch {
    pub fn apply(self, account: &mut Account) {
        if let Some(first_name) = self.first_name {
            account.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            account.last_name = last_name;
        }
        if let Some(avatar_image_name) = self.avatar_image_name {
            account.avatar_image_name = avatar_image_name;
        }
        if let Some(cover_image_name) = self.cover_image_name {
            account.cover_image_name = cover_image_name;
        }
    }
}

/// Per-user relationship record. Invariants: the three sets are
/// duplicate-free, never contain the owner, and a (sender, recipient) pair
/// appears either mirrored across sent/received, mirrored across the two
/// friends lists, or not at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRecord {
    pub created_by: UserId,
    #[serde(default)]
    pub sent_requests: Vec<UserId>,
    #[serde(default)]
    pub received_requests: Vec<UserId>,
    #[serde(default)]
    pub friends_list: Vec<UserId>,
}

impl FriendRecord {
    pub const COLLECTION: &'static str = "friend_records";

    pub fn new(owner: UserId) -> Self {
        Self {
            created_by: owner,
            sent_requests: Vec::new(),
            received_requests: Vec::new(),
            friends_list: Vec::new(),
        }
    }

    /// Everyone this user already has a relation with, pending or confirmed.
    pub fn related_ids(&self) -> Vec<UserId> {
        let mut ids = Vec::with_capacity(
            self.friends_list.len() + self.sent_requests.len() + self.received_requests.len(),
        );
        ids.extend(&self.friends_list);
        ids.extend(&self.sent_requests);
        ids.extend(&self.received_requests);
        ids
    }

    pub fn is_related(&self, id: UserId) -> bool {
        self.friends_list.contains(&id)
            || self.sent_requests.contains(&id)
            || self.received_requests.contains(&id)
    }

    /// Drop every reference to a departing user. Returns true if anything
    /// changed.
    pub fn purge(&mut self, target: UserId) -> bool {
        let a = pull_member(&mut self.sent_requests, target);
        let b = pull_member(&mut self.received_requests, target);
        let c = pull_member(&mut self.friends_list, target);
        a || b || c
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub created_by: UserId,
    pub content: String,
    #[serde(default)]
    pub likes: Vec<UserId>,
    #[serde(default)]
    pub comments_length: u32,
    pub created_time: i64,
}

impl Post {
    pub const COLLECTION: &'static str = "posts";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub created_by: UserId,
    /// Post this comment was created against.
    pub commented_in: i64,
    pub content: String,
    #[serde(default)]
    pub likes: Vec<UserId>,
    pub created_time: i64,
}

impl Comment {
    pub const COLLECTION: &'static str = "comments";
}
