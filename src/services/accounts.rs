// Accounts: the user + profile + friend record creation unit, profile
// reads and patch edits, and the per-user deletes behind user removal.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::{current_time_millis, IdGenerator, UserId};
use crate::error::{AppError, AppResult};
use crate::models::{validate_email, Account, AccountPatch, FriendRecord, User};
use crate::store::{encode, DocumentStore, NewDocument};

/// Input for account creation. Image names come from the upload collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_image_name: String,
    pub cover_image_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedAccount {
    pub user: User,
    pub account: Account,
    pub record: FriendRecord,
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn DocumentStore>,
    ids: Arc<IdGenerator>,
}

impl AccountService {
    pub fn new(store: Arc<dyn DocumentStore>, ids: Arc<IdGenerator>) -> Self {
        Self { store, ids }
    }

    /// Create the user identity, its public profile and its friend record as
    /// one unit. A user never exists without a relationship record.
    pub async fn create_account(&self, input: NewAccount) -> AppResult<CreatedAccount> {
        validate_email(&input.email)?;

        let user_docs = self.store.list(User::COLLECTION).await?;
        for doc in &user_docs {
            let existing: User = doc.decode()?;
            if existing.email == input.email {
                return Err(AppError::Conflict(format!(
                    "Email {} already registered",
                    input.email
                )));
            }
        }

        let id = UserId::new(self.ids.next_id());
        let user = User {
            id,
            email: input.email,
            created_time: current_time_millis(),
        };
        let account = Account {
            created_by: id,
            first_name: input.first_name,
            last_name: input.last_name,
            avatar_image_name: input.avatar_image_name,
            cover_image_name: input.cover_image_name,
        };
        account.validate()?;
        let record = FriendRecord::new(id);

        let mut tx = self.store.begin().await?;
        self.store
            .insert_tx(
                &mut tx,
                User::COLLECTION,
                NewDocument::new(id.value(), encode(&user)?),
            )
            .await?;
        self.store
            .insert_tx(
                &mut tx,
                Account::COLLECTION,
                NewDocument::new(id.value(), encode(&account)?).owned_by(id.value()),
            )
            .await?;
        self.store
            .insert_tx(
                &mut tx,
                FriendRecord::COLLECTION,
                NewDocument::new(id.value(), encode(&record)?).owned_by(id.value()),
            )
            .await?;
        tx.commit().await?;

        info!("create_account: user {} registered", id);
        Ok(CreatedAccount {
            user,
            account,
            record,
        })
    }

    pub async fn get_user(&self, id: UserId) -> AppResult<User> {
        let doc = self
            .store
            .get(User::COLLECTION, id.value())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No user with id {}", id)))?;
        doc.decode()
    }

    pub async fn get_account(&self, owner: UserId) -> AppResult<Account> {
        let doc = self
            .store
            .get(Account::COLLECTION, owner.value())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No account for user {}", owner)))?;
        doc.decode()
    }

    /// Every profile except the viewer's, oldest first.
    pub async fn list_accounts(&self, except: UserId) -> AppResult<Vec<Account>> {
        let docs = self.store.list(Account::COLLECTION).await?;
        let mut accounts = Vec::with_capacity(docs.len());
        for doc in &docs {
            let account: Account = doc.decode()?;
            if account.created_by != except {
                accounts.push(account);
            }
        }
        Ok(accounts)
    }

    /// Apply an optional-field patch to the caller's profile.
    pub async fn edit_account(&self, owner: UserId, patch: AccountPatch) -> AppResult<Account> {
        let mut tx = self.store.begin().await?;
        let mut account: Account = self
            .store
            .get_tx(&mut tx, Account::COLLECTION, owner.value())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No account for user {}", owner)))?
            .decode()?;

        patch.apply(&mut account);
        account.validate()?;

        self.store
            .update_tx(&mut tx, Account::COLLECTION, owner.value(), encode(&account)?)
            .await?;
        tx.commit().await?;
        Ok(account)
    }

    /// Delete the user's own documents. Cross-record reference purging
    /// (friend sets, like sets) is driven by the caller alongside this.
    pub async fn delete_user(&self, user: UserId) -> AppResult<()> {
        self.get_user(user).await?;

        self.store.delete(User::COLLECTION, user.value()).await?;
        self.store.delete(Account::COLLECTION, user.value()).await?;
        self.store
            .delete(FriendRecord::COLLECTION, user.value())
            .await?;

        info!("delete_user: user {} removed", user);
        Ok(())
    }
}
