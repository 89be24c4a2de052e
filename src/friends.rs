//! Directed friendship edges between users.
//!
//! Every edge `user -> friend` lives in the `friendships` tree under the key
//! `user ‖ friend`, so a prefix scan over one user id yields that user's
//! outgoing edges. The one-byte value records whether the reverse edge exists
//! too; it is kept in sync on both edges by every mutation.

use crate::database::{ensure_exists, pair_key, serialize_id, split_pair_key, UserDb, USERS};
use crate::error::{abort, Entity, Error, Result};
use crate::model::*;
use sled::transaction::{ConflictableTransactionResult, TransactionalTree, Transactional};
use std::collections::BTreeSet;

pub(crate) const FRIENDSHIPS: &[u8] = b"friendships";

const REQUESTED: u8 = 0;
const CONFIRMED: u8 = 1;

fn insert_edge(
    friendships: &TransactionalTree,
    user_id: UserId,
    friend_id: UserId,
) -> ConflictableTransactionResult<(), Error> {
    if friendships.get(pair_key(user_id, friend_id))?.is_some() {
        return Ok(());
    }
    let reverse = pair_key(friend_id, user_id);
    if friendships.get(&reverse)?.is_some() {
        friendships.insert(reverse, vec![CONFIRMED])?;
        friendships.insert(pair_key(user_id, friend_id), vec![CONFIRMED])?;
    } else {
        friendships.insert(pair_key(user_id, friend_id), vec![REQUESTED])?;
    }
    Ok(())
}

fn remove_edge(
    friendships: &TransactionalTree,
    user_id: UserId,
    friend_id: UserId,
) -> ConflictableTransactionResult<(), Error> {
    if friendships.remove(pair_key(user_id, friend_id))?.is_some() {
        let reverse = pair_key(friend_id, user_id);
        if friendships.get(&reverse)?.is_some() {
            friendships.insert(reverse, vec![REQUESTED])?;
        }
    }
    Ok(())
}

fn check_users(
    users: &TransactionalTree,
    user_id: UserId,
    friend_id: UserId,
) -> ConflictableTransactionResult<(), Error> {
    if user_id == friend_id {
        return Err(abort(Error::Validation(format!(
            "user {} cannot befriend themselves",
            user_id
        ))));
    }
    ensure_exists(users, Entity::User, user_id)?;
    ensure_exists(users, Entity::User, friend_id)
}

pub trait FriendDb {
    /// Adds the edge `user_id -> friend_id`. Adding an existing edge is a
    /// no-op.
    fn add_friend(&self, user_id: UserId, friend_id: UserId) -> Result<()>;
    /// Adds both directed edges between the two users in one transaction.
    fn add_friendship(&self, user_id: UserId, friend_id: UserId) -> Result<()>;
    /// Removes the edge `user_id -> friend_id` if it exists.
    fn remove_friend(&self, user_id: UserId, friend_id: UserId) -> Result<()>;
    fn remove_friendship(&self, user_id: UserId, friend_id: UserId) -> Result<()>;
    fn friend_edges(&self, user_id: UserId) -> Result<Vec<FriendEdge>>;
    /// Targets of all outgoing edges, ascending.
    fn friend_ids(&self, user_id: UserId) -> Result<Vec<UserId>>;
    /// Users connected to `user_id` in both directions, ascending.
    fn mutual_friend_ids(&self, user_id: UserId) -> Result<Vec<UserId>>;
    fn list_friends(&self, user_id: UserId) -> Result<Vec<User>>;
    fn mutual_friends(&self, user_id: UserId) -> Result<Vec<User>>;
    /// Outgoing friends of both users, excluding the two users themselves.
    fn common_friends(&self, user_id: UserId, other_id: UserId) -> Result<Vec<User>>;
}

impl FriendDb for sled::Db {
    fn add_friend(&self, user_id: UserId, friend_id: UserId) -> Result<()> {
        let users = self.open_tree(USERS)?;
        let friendships = self.open_tree(FRIENDSHIPS)?;
        (&users, &friendships).transaction(|(users, friendships)| {
            check_users(users, user_id, friend_id)?;
            insert_edge(friendships, user_id, friend_id)
        })?;
        Ok(())
    }

    fn add_friendship(&self, user_id: UserId, friend_id: UserId) -> Result<()> {
        let users = self.open_tree(USERS)?;
        let friendships = self.open_tree(FRIENDSHIPS)?;
        (&users, &friendships).transaction(|(users, friendships)| {
            check_users(users, user_id, friend_id)?;
            insert_edge(friendships, user_id, friend_id)?;
            insert_edge(friendships, friend_id, user_id)
        })?;
        Ok(())
    }

    fn remove_friend(&self, user_id: UserId, friend_id: UserId) -> Result<()> {
        let friendships = self.open_tree(FRIENDSHIPS)?;
        friendships.transaction(|friendships| remove_edge(friendships, user_id, friend_id))?;
        Ok(())
    }

    fn remove_friendship(&self, user_id: UserId, friend_id: UserId) -> Result<()> {
        let friendships = self.open_tree(FRIENDSHIPS)?;
        friendships.transaction(|friendships| {
            remove_edge(friendships, user_id, friend_id)?;
            remove_edge(friendships, friend_id, user_id)
        })?;
        Ok(())
    }

    fn friend_edges(&self, user_id: UserId) -> Result<Vec<FriendEdge>> {
        let friendships = self.open_tree(FRIENDSHIPS)?;
        friendships
            .scan_prefix(serialize_id(user_id))
            .map(|entry| -> Result<FriendEdge> {
                let (key, value) = entry?;
                let (user_id, friend_id) = split_pair_key(key)?;
                Ok(FriendEdge {
                    user_id,
                    friend_id,
                    confirmed: value.first() == Some(&CONFIRMED),
                })
            })
            .collect()
    }

    fn friend_ids(&self, user_id: UserId) -> Result<Vec<UserId>> {
        Ok(self
            .friend_edges(user_id)?
            .into_iter()
            .map(|edge| edge.friend_id)
            .collect())
    }

    fn mutual_friend_ids(&self, user_id: UserId) -> Result<Vec<UserId>> {
        Ok(self
            .friend_edges(user_id)?
            .into_iter()
            .filter(|edge| edge.confirmed)
            .map(|edge| edge.friend_id)
            .collect())
    }

    fn list_friends(&self, user_id: UserId) -> Result<Vec<User>> {
        self.friend_ids(user_id)?
            .into_iter()
            .map(|id| self.user(id))
            .collect()
    }

    fn mutual_friends(&self, user_id: UserId) -> Result<Vec<User>> {
        self.mutual_friend_ids(user_id)?
            .into_iter()
            .map(|id| self.user(id))
            .collect()
    }

    fn common_friends(&self, user_id: UserId, other_id: UserId) -> Result<Vec<User>> {
        let theirs: BTreeSet<UserId> = self.friend_ids(other_id)?.into_iter().collect();
        self.friend_ids(user_id)?
            .into_iter()
            .filter(|id| theirs.contains(id) && *id != user_id && *id != other_id)
            .map(|id| self.user(id))
            .collect()
    }
}
