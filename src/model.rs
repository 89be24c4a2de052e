use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type UserId = u64;
pub type FilmId = u64;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub login: String,
    pub name: String,
    pub birthday: Option<NaiveDate>,
}

/// Fields accepted when registering a user. The identifier is assigned by
/// the store.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub login: String,
    pub name: Option<String>,
    pub birthday: Option<NaiveDate>,
}

/// Partial update of a stored user. `None` keeps the stored value, except
/// for `name`, which falls back to the login.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UserUpdate {
    pub id: UserId,
    pub email: Option<String>,
    pub login: Option<String>,
    pub name: Option<String>,
    pub birthday: Option<NaiveDate>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GenreId(pub u32);

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MpaId(pub u32);

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Mpa {
    pub id: MpaId,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Film {
    pub id: FilmId,
    pub name: String,
    pub description: String,
    pub release_date: NaiveDate,
    /// Minutes.
    pub duration: u32,
    pub mpa: Mpa,
    /// Unique by id, ascending.
    pub genres: Vec<Genre>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct NewFilm {
    pub name: String,
    pub description: String,
    pub release_date: Option<NaiveDate>,
    pub duration: i64,
    pub mpa: Option<MpaId>,
    pub genres: Vec<GenreId>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct FilmUpdate {
    pub id: FilmId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub duration: Option<i64>,
    pub mpa: Option<MpaId>,
    pub genres: Option<Vec<GenreId>>,
}

/// One directional friendship record. `confirmed` is set while the reverse
/// edge exists as well.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FriendEdge {
    pub user_id: UserId,
    pub friend_id: UserId,
    pub confirmed: bool,
}

/// A film together with its number of distinct likers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedFilm {
    pub film: Film,
    pub likes: u64,
}
