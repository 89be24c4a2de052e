use crate::error::{abort, Entity, Error, Result};
use crate::model::*;
use serde::de::DeserializeOwned;
use sled::transaction::{ConflictableTransactionResult, TransactionalTree, Transactional};

// Ids are stored big-endian so that a tree's key order is its id order.
pub(crate) fn serialize_id(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

pub(crate) fn deserialize_id<V: AsRef<[u8]>>(id: V) -> Result<u64> {
    use std::convert::TryInto;
    let bytes: [u8; 8] = id.as_ref().try_into().map_err(|_| {
        sled::Error::Unsupported(format!("malformed id of {} bytes", id.as_ref().len()))
    })?;
    Ok(u64::from_be_bytes(bytes))
}

/// Concatenation of two ids, used as the key of relation trees.
pub(crate) fn pair_key(first: u64, second: u64) -> Vec<u8> {
    let mut key = serialize_id(first).to_vec();
    key.extend_from_slice(&serialize_id(second));
    key
}

pub(crate) fn split_pair_key<V: AsRef<[u8]>>(key: V) -> Result<(u64, u64)> {
    let key = key.as_ref();
    if key.len() != 16 {
        return Err(sled::Error::Unsupported(format!("malformed pair key of {} bytes", key.len())).into());
    }
    Ok((deserialize_id(&key[..8])?, deserialize_id(&key[8..])?))
}

pub(crate) fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(data)?)
}

pub(crate) const USERS: &[u8] = b"users";
pub(crate) const USERS_EMAIL: &[u8] = b"users_email";
pub(crate) const FILMS: &[u8] = b"films";
const META: &[u8] = b"meta";
const LAST_USER_ID: &[u8] = b"last_user_id";
const LAST_FILM_ID: &[u8] = b"last_film_id";

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hands out the identifier after the largest one assigned so far.
fn next_id(meta: &TransactionalTree, counter: &'static [u8]) -> ConflictableTransactionResult<u64, Error> {
    let last = match meta.get(counter)? {
        Some(raw) => deserialize_id(raw).map_err(abort)?,
        None => 0,
    };
    let id = last + 1;
    meta.insert(counter, &serialize_id(id)[..])?;
    Ok(id)
}

/// Fails the transaction with `NotFound` unless `id` is a key of `tree`.
pub(crate) fn ensure_exists(
    tree: &TransactionalTree,
    entity: Entity,
    id: u64,
) -> ConflictableTransactionResult<(), Error> {
    if tree.get(serialize_id(id))?.is_none() {
        return Err(abort(Error::not_found(entity, id)));
    }
    Ok(())
}

fn load_all<T: DeserializeOwned>(tree: &sled::Tree) -> Result<Vec<T>> {
    tree.iter()
        .values()
        .map(|data| decode(&data?))
        .collect()
}

pub trait UserDb {
    /// Stores `user` under a fresh id and returns it with the id filled in.
    fn create_user(&self, user: User) -> Result<User>;
    /// Overwrites the stored record with the same id.
    fn update_user(&self, user: User) -> Result<User>;
    /// Reads, changes and writes back one user in a single transaction.
    /// `modify` may run more than once when the transaction is retried.
    fn modify_user<F>(&self, id: UserId, modify: F) -> Result<User>
    where
        F: Fn(&mut User) -> Result<()>;
    fn users(&self) -> Result<Vec<User>>;
    fn user(&self, id: UserId) -> Result<User>;
    fn ensure_user(&self, id: UserId) -> Result<()>;
}

impl UserDb for sled::Db {
    fn create_user(&self, mut user: User) -> Result<User> {
        let users = self.open_tree(USERS)?;
        let users_email = self.open_tree(USERS_EMAIL)?;
        let meta = self.open_tree(META)?;
        let email = email_key(&user.email);
        let id = (&users, &users_email, &meta).transaction(|(users, users_email, meta)| {
            if users_email.get(email.as_bytes())?.is_some() {
                return Err(abort(Error::Conflict(format!(
                    "email already in use: {}",
                    email
                ))));
            }
            let id = next_id(meta, LAST_USER_ID)?;
            let stored = User {
                id,
                ..user.clone()
            };
            let data = bincode::serialize(&stored).map_err(abort)?;
            users.insert(&serialize_id(id)[..], data)?;
            users_email.insert(email.as_bytes(), &serialize_id(id)[..])?;
            Ok(id)
        })?;
        user.id = id;
        Ok(user)
    }

    fn update_user(&self, user: User) -> Result<User> {
        self.modify_user(user.id, |stored| {
            *stored = user.clone();
            Ok(())
        })
    }

    fn modify_user<F>(&self, id: UserId, modify: F) -> Result<User>
    where
        F: Fn(&mut User) -> Result<()>,
    {
        let users = self.open_tree(USERS)?;
        let users_email = self.open_tree(USERS_EMAIL)?;
        let user = (&users, &users_email).transaction(
            |(users, users_email)| -> ConflictableTransactionResult<User, Error> {
                let old: User = match users.get(serialize_id(id))? {
                    Some(raw) => decode(&raw).map_err(abort)?,
                    None => return Err(abort(Error::not_found(Entity::User, id))),
                };
                let mut user = old.clone();
                modify(&mut user).map_err(abort)?;
                user.id = id;
                let old_email = email_key(&old.email);
                let new_email = email_key(&user.email);
                if old_email != new_email {
                    if let Some(owner) = users_email.get(new_email.as_bytes())? {
                        if deserialize_id(owner).map_err(abort)? != id {
                            return Err(abort(Error::Conflict(format!(
                                "email already in use: {}",
                                new_email
                            ))));
                        }
                    }
                    users_email.remove(old_email.as_bytes())?;
                    users_email.insert(new_email.as_bytes(), &serialize_id(id)[..])?;
                }
                let data = bincode::serialize(&user).map_err(abort)?;
                users.insert(&serialize_id(id)[..], data)?;
                Ok(user)
            },
        )?;
        Ok(user)
    }

    fn users(&self) -> Result<Vec<User>> {
        load_all(&self.open_tree(USERS)?)
    }

    fn user(&self, id: UserId) -> Result<User> {
        let users = self.open_tree(USERS)?;
        match users.get(serialize_id(id))? {
            Some(data) => decode(&data),
            None => Err(Error::not_found(Entity::User, id)),
        }
    }

    fn ensure_user(&self, id: UserId) -> Result<()> {
        if self.open_tree(USERS)?.contains_key(serialize_id(id))? {
            Ok(())
        } else {
            Err(Error::not_found(Entity::User, id))
        }
    }
}

pub trait FilmDb {
    fn create_film(&self, film: Film) -> Result<Film>;
    fn update_film(&self, film: Film) -> Result<Film>;
    fn modify_film<F>(&self, id: FilmId, modify: F) -> Result<Film>
    where
        F: Fn(&mut Film) -> Result<()>;
    fn films(&self) -> Result<Vec<Film>>;
    fn film(&self, id: FilmId) -> Result<Film>;
    fn ensure_film(&self, id: FilmId) -> Result<()>;
    /// Ids of all stored films, ascending.
    fn film_ids(&self) -> Result<Vec<FilmId>>;
}

impl FilmDb for sled::Db {
    fn create_film(&self, mut film: Film) -> Result<Film> {
        let films = self.open_tree(FILMS)?;
        let meta = self.open_tree(META)?;
        let id = (&films, &meta).transaction(|(films, meta)| -> ConflictableTransactionResult<u64, Error> {
            let id = next_id(meta, LAST_FILM_ID)?;
            let stored = Film {
                id,
                ..film.clone()
            };
            let data = bincode::serialize(&stored).map_err(abort)?;
            films.insert(&serialize_id(id)[..], data)?;
            Ok(id)
        })?;
        film.id = id;
        Ok(film)
    }

    fn update_film(&self, film: Film) -> Result<Film> {
        self.modify_film(film.id, |stored| {
            *stored = film.clone();
            Ok(())
        })
    }

    fn modify_film<F>(&self, id: FilmId, modify: F) -> Result<Film>
    where
        F: Fn(&mut Film) -> Result<()>,
    {
        let films = self.open_tree(FILMS)?;
        let film = films.transaction(|films| -> ConflictableTransactionResult<Film, Error> {
            let mut film: Film = match films.get(serialize_id(id))? {
                Some(raw) => decode(&raw).map_err(abort)?,
                None => return Err(abort(Error::not_found(Entity::Film, id))),
            };
            modify(&mut film).map_err(abort)?;
            film.id = id;
            let data = bincode::serialize(&film).map_err(abort)?;
            films.insert(&serialize_id(id)[..], data)?;
            Ok(film)
        })?;
        Ok(film)
    }

    fn films(&self) -> Result<Vec<Film>> {
        load_all(&self.open_tree(FILMS)?)
    }

    fn film(&self, id: FilmId) -> Result<Film> {
        let films = self.open_tree(FILMS)?;
        match films.get(serialize_id(id))? {
            Some(data) => decode(&data),
            None => Err(Error::not_found(Entity::Film, id)),
        }
    }

    fn ensure_film(&self, id: FilmId) -> Result<()> {
        if self.open_tree(FILMS)?.contains_key(serialize_id(id))? {
            Ok(())
        } else {
            Err(Error::not_found(Entity::Film, id))
        }
    }

    fn film_ids(&self) -> Result<Vec<FilmId>> {
        self.open_tree(FILMS)?
            .iter()
            .keys()
            .map(|key| deserialize_id(key?))
            .collect()
    }
}
