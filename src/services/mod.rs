// Business logic over the document store, one service per controller surface.

pub mod accounts;
pub mod comments;
pub mod friends;
pub mod posts;

use std::collections::HashMap;

use crate::core::UserId;
use crate::error::AppResult;
use crate::models::Account;
use crate::store::DocumentStore;

pub use accounts::{AccountService, CreatedAccount, NewAccount};
pub use comments::CommentService;
pub use friends::{AcceptOutcome, FriendService, FriendsData};
pub use posts::PostService;

/// Profile projection: map actor ids onto their public accounts with one
/// batched lookup instead of one fetch per id.
pub async fn account_map(
    store: &dyn DocumentStore,
    ids: &[UserId],
) -> AppResult<HashMap<UserId, Account>> {
    let owners: Vec<i64> = ids.iter().map(|id| id.value()).collect();
    let docs = store.find_by_owners(Account::COLLECTION, &owners).await?;

    let mut map = HashMap::with_capacity(docs.len());
    for doc in &docs {
        let account: Account = doc.decode()?;
        map.insert(account.created_by, account);
    }
    Ok(map)
}
