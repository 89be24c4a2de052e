use crate::database::{
    deserialize_id, ensure_exists, pair_key, serialize_id, split_pair_key, FilmDb, FILMS, USERS,
};
use crate::error::{abort, Entity, Error, Result};
use crate::model::*;
use serde::{Deserialize, Serialize};
use sled::transaction::{ConflictableTransactionResult, TransactionalTree, Transactional};
use std::collections::HashMap;

pub(crate) const LIKES: &[u8] = b"likes";
pub(crate) const FILM_LIKES: &[u8] = b"film_likes";

/// How [`LikeDb::top_films`] obtains the like count of each film.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Ranking {
    /// Read the per-film counters maintained alongside every like.
    Incremental,
    /// Group-count the like relation on every call.
    OnDemand,
}

impl Default for Ranking {
    fn default() -> Self {
        Ranking::Incremental
    }
}

fn read_count(film_likes: &TransactionalTree, film_id: FilmId) -> ConflictableTransactionResult<u64, Error> {
    match film_likes.get(serialize_id(film_id))? {
        Some(raw) => deserialize_id(raw).map_err(abort),
        None => Ok(0),
    }
}

fn write_count(
    film_likes: &TransactionalTree,
    film_id: FilmId,
    count: u64,
) -> ConflictableTransactionResult<(), Error> {
    if count == 0 {
        film_likes.remove(&serialize_id(film_id)[..])?;
    } else {
        film_likes.insert(&serialize_id(film_id)[..], &serialize_id(count)[..])?;
    }
    Ok(())
}

pub trait LikeDb {
    /// Records that `user_id` likes `film_id`. Liking twice is a no-op.
    fn add_like(&self, film_id: FilmId, user_id: UserId) -> Result<()>;
    /// Fails with `NotFound` when the like does not exist.
    fn remove_like(&self, film_id: FilmId, user_id: UserId) -> Result<()>;
    fn like_count(&self, film_id: FilmId) -> Result<u64>;
    /// Ids of the users who like `film_id`, ascending.
    fn likers(&self, film_id: FilmId) -> Result<Vec<UserId>>;
    /// Like counts as maintained by the per-film counters.
    fn counted_likes(&self) -> Result<HashMap<FilmId, u64>>;
    /// Like counts obtained by scanning the like relation.
    fn recounted_likes(&self) -> Result<HashMap<FilmId, u64>>;
    /// Up to `count` films ordered by descending like count, then by
    /// ascending id. A non-positive `count` yields nothing.
    fn top_films(&self, count: i64, ranking: Ranking) -> Result<Vec<RankedFilm>>;
}

impl LikeDb for sled::Db {
    fn add_like(&self, film_id: FilmId, user_id: UserId) -> Result<()> {
        let films = self.open_tree(FILMS)?;
        let users = self.open_tree(USERS)?;
        let likes = self.open_tree(LIKES)?;
        let film_likes = self.open_tree(FILM_LIKES)?;
        (&films, &users, &likes, &film_likes).transaction(
            |(films, users, likes, film_likes)| -> ConflictableTransactionResult<(), Error> {
                ensure_exists(films, Entity::Film, film_id)?;
                ensure_exists(users, Entity::User, user_id)?;
                if likes.insert(pair_key(film_id, user_id), Vec::<u8>::new())?.is_none() {
                    let count = read_count(film_likes, film_id)?;
                    write_count(film_likes, film_id, count + 1)?;
                }
                Ok(())
            },
        )?;
        Ok(())
    }

    fn remove_like(&self, film_id: FilmId, user_id: UserId) -> Result<()> {
        let likes = self.open_tree(LIKES)?;
        let film_likes = self.open_tree(FILM_LIKES)?;
        (&likes, &film_likes).transaction(|(likes, film_likes)| {
            if likes.remove(pair_key(film_id, user_id))?.is_none() {
                return Err(abort(Error::not_found(
                    Entity::Like,
                    format!("user {} on film {}", user_id, film_id),
                )));
            }
            let count = read_count(film_likes, film_id)?;
            write_count(film_likes, film_id, count.saturating_sub(1))
        })?;
        Ok(())
    }

    fn like_count(&self, film_id: FilmId) -> Result<u64> {
        match self.open_tree(FILM_LIKES)?.get(serialize_id(film_id))? {
            Some(raw) => deserialize_id(raw),
            None => Ok(0),
        }
    }

    fn likers(&self, film_id: FilmId) -> Result<Vec<UserId>> {
        self.open_tree(LIKES)?
            .scan_prefix(serialize_id(film_id))
            .keys()
            .map(|key| -> Result<UserId> { Ok(split_pair_key(key?)?.1) })
            .collect()
    }

    fn counted_likes(&self) -> Result<HashMap<FilmId, u64>> {
        self.open_tree(FILM_LIKES)?
            .iter()
            .map(|entry| -> Result<(FilmId, u64)> {
                let (key, value) = entry?;
                Ok((deserialize_id(key)?, deserialize_id(value)?))
            })
            .collect()
    }

    fn recounted_likes(&self) -> Result<HashMap<FilmId, u64>> {
        let mut counts = HashMap::new();
        for key in self.open_tree(LIKES)?.iter().keys() {
            let (film_id, _user_id) = split_pair_key(key?)?;
            *counts.entry(film_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    fn top_films(&self, count: i64, ranking: Ranking) -> Result<Vec<RankedFilm>> {
        use std::convert::TryFrom;
        if count <= 0 {
            return Ok(Vec::new());
        }
        let limit = usize::try_from(count).unwrap_or(usize::MAX);
        let counts = match ranking {
            Ranking::Incremental => self.counted_likes()?,
            Ranking::OnDemand => self.recounted_likes()?,
        };
        let mut ranked = self
            .film_ids()?
            .into_iter()
            .map(|id| (counts.get(&id).copied().unwrap_or(0), id))
            .collect::<Vec<_>>();
        ranked.sort_by(|(likes_a, id_a), (likes_b, id_b)| {
            likes_b.cmp(likes_a).then(id_a.cmp(id_b))
        });
        ranked
            .into_iter()
            .take(limit)
            .map(|(likes, id)| -> Result<RankedFilm> {
                Ok(RankedFilm {
                    film: self.film(id)?,
                    likes,
                })
            })
            .collect()
    }
}
