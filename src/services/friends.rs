// Friendship graph: relationship records, the friend-request protocol and
// the potential-friends projection.
//
// Both sides of a pair mutation are written inside one store transaction so
// a partial failure can never leave the mirrored sets inconsistent.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::core::UserId;
use crate::error::{AppError, AppResult};
use crate::models::{push_unique, Account, FriendRecord};
use crate::store::{encode, DocumentStore, NewDocument, StoreTransaction};

/// Result of an accept call. `NoMatchingRequest` is a tolerated no-op: the
/// pending pair was not mirrored on both records, nothing was written, and
/// the caller gets both records back to inspect.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AcceptOutcome {
    Applied {
        accepter: FriendRecord,
        requester: FriendRecord,
    },
    NoMatchingRequest {
        accepter: FriendRecord,
        requester: FriendRecord,
    },
}

impl AcceptOutcome {
    pub fn applied(&self) -> bool {
        matches!(self, AcceptOutcome::Applied { .. })
    }

    pub fn records(&self) -> (&FriendRecord, &FriendRecord) {
        match self {
            AcceptOutcome::Applied { accepter, requester }
            | AcceptOutcome::NoMatchingRequest { accepter, requester } => (accepter, requester),
        }
    }
}

/// Everything the friends screen needs in one response: the viewer's record,
/// every related id, the potential-friends complement and a profile map.
#[derive(Debug, Clone, Serialize)]
pub struct FriendsData {
    pub record: FriendRecord,
    pub related_ids: Vec<UserId>,
    pub potential_friends: Vec<UserId>,
    pub accounts_map: HashMap<UserId, Account>,
}

#[derive(Clone)]
pub struct FriendService {
    store: Arc<dyn DocumentStore>,
}

impl FriendService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, owner: UserId) -> AppResult<FriendRecord> {
        let doc = self
            .store
            .get(FriendRecord::COLLECTION, owner.value())
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Friend record not found for user {}", owner))
            })?;
        doc.decode()
    }

    async fn get_in_tx(&self, tx: &mut StoreTransaction, owner: UserId) -> AppResult<FriendRecord> {
        let doc = self
            .store
            .get_tx(tx, FriendRecord::COLLECTION, owner.value())
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Friend record not found for user {}", owner))
            })?;
        doc.decode()
    }

    async fn save_in_tx(
        &self,
        tx: &mut StoreTransaction,
        record: &FriendRecord,
    ) -> AppResult<()> {
        self.store
            .update_tx(
                tx,
                FriendRecord::COLLECTION,
                record.created_by.value(),
                encode(record)?,
            )
            .await
    }

    /// Create the relationship record that accompanies a new account.
    pub async fn create_record(&self, owner: UserId) -> AppResult<FriendRecord> {
        let record = FriendRecord::new(owner);
        self.store
            .insert(
                FriendRecord::COLLECTION,
                NewDocument::new(owner.value(), encode(&record)?).owned_by(owner.value()),
            )
            .await?;
        Ok(record)
    }

    pub async fn delete_record(&self, owner: UserId) -> AppResult<bool> {
        self.store
            .delete(FriendRecord::COLLECTION, owner.value())
            .await
    }

    /// Record a pending request on both sides. Idempotent: re-sending is a
    /// no-op beyond the first call. Both writes land in one transaction.
    pub async fn send_request(
        &self,
        sender: UserId,
        recipient: UserId,
    ) -> AppResult<(FriendRecord, FriendRecord)> {
        if sender == recipient {
            return Err(AppError::Validation(
                "Cannot send a friend request to yourself".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let mut sender_record = self.get_in_tx(&mut tx, sender).await?;
        let mut recipient_record = self.get_in_tx(&mut tx, recipient).await?;

        let sent = push_unique(&mut sender_record.sent_requests, recipient);
        let received = push_unique(&mut recipient_record.received_requests, sender);

        if sent {
            self.save_in_tx(&mut tx, &sender_record).await?;
        }
        if received {
            self.save_in_tx(&mut tx, &recipient_record).await?;
        }
        tx.commit().await?;

        if sent || received {
            info!("send_request: {} -> {} pending", sender, recipient);
        }
        Ok((sender_record, recipient_record))
    }

    /// Resolve a pending request into a mutual friendship. The pending pair
    /// must be mirrored on both records; otherwise nothing is mutated and
    /// `NoMatchingRequest` is returned.
    pub async fn accept_request(
        &self,
        accepter: UserId,
        requester: UserId,
    ) -> AppResult<AcceptOutcome> {
        let mut tx = self.store.begin().await?;
        let mut accepter_record = self.get_in_tx(&mut tx, accepter).await?;
        let mut requester_record = self.get_in_tx(&mut tx, requester).await?;

        let received_index = accepter_record
            .received_requests
            .iter()
            .position(|id| *id == requester);
        let sent_index = requester_record
            .sent_requests
            .iter()
            .position(|id| *id == accepter);

        let (received_index, sent_index) = match (received_index, sent_index) {
            (Some(r), Some(s)) => (r, s),
            _ => {
                tx.rollback().await?;
                info!(
                    "accept_request: no mirrored pending request {} <- {}",
                    accepter, requester
                );
                return Ok(AcceptOutcome::NoMatchingRequest {
                    accepter: accepter_record,
                    requester: requester_record,
                });
            }
        };

        accepter_record.received_requests.remove(received_index);
        requester_record.sent_requests.remove(sent_index);
        push_unique(&mut accepter_record.friends_list, requester);
        push_unique(&mut requester_record.friends_list, accepter);

        self.save_in_tx(&mut tx, &accepter_record).await?;
        self.save_in_tx(&mut tx, &requester_record).await?;
        tx.commit().await?;

        info!("accept_request: {} and {} are now friends", accepter, requester);
        Ok(AcceptOutcome::Applied {
            accepter: accepter_record,
            requester: requester_record,
        })
    }

    /// Accounts the user has no relation with yet: everyone minus self minus
    /// the three relation sets. O(total users), accepted at this scale.
    pub fn potential_friends(&self, record: &FriendRecord, accounts: &[Account]) -> Vec<UserId> {
        accounts
            .iter()
            .map(|account| account.created_by)
            .filter(|owner| *owner != record.created_by && !record.is_related(*owner))
            .collect()
    }

    /// The friends screen payload: record, related ids, potential friends
    /// and the profile map, from one record read and one account scan.
    pub async fn friends_data(&self, user: UserId) -> AppResult<FriendsData> {
        let (record, account_docs) = futures::future::try_join(
            self.get(user),
            self.store.list(Account::COLLECTION),
        )
        .await?;

        let mut accounts = Vec::with_capacity(account_docs.len());
        for doc in &account_docs {
            let account: Account = doc.decode()?;
            if account.created_by != user {
                accounts.push(account);
            }
        }

        let potential_friends = self.potential_friends(&record, &accounts);
        let accounts_map: HashMap<UserId, Account> = accounts
            .into_iter()
            .map(|account| (account.created_by, account))
            .collect();

        Ok(FriendsData {
            related_ids: record.related_ids(),
            potential_friends,
            accounts_map,
            record,
        })
    }

    /// Remove a departing user from every other record's three sets.
    /// Returns the number of records rewritten.
    pub async fn purge_references(&self, target: UserId) -> AppResult<u64> {
        let docs = self.store.list(FriendRecord::COLLECTION).await?;
        let mut purged = 0;

        for doc in &docs {
            let mut record: FriendRecord = doc.decode()?;
            if record.created_by == target {
                continue;
            }
            if record.purge(target) {
                self.store
                    .update(FriendRecord::COLLECTION, doc.id, encode(&record)?)
                    .await?;
                purged += 1;
            }
        }

        if purged > 0 {
            info!("purge_references: removed {} from {} records", target, purged);
        }
        Ok(purged)
    }
}
