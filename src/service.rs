use crate::settings::{FriendListing, Settings};
use crate::database::{FilmDb, UserDb};
use crate::error::{Error, Result};
use crate::friends::FriendDb;
use crate::likes::{LikeDb, Ranking};
use crate::model::*;
use crate::reference::ReferenceDb;
use crate::validation;
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::BTreeSet;

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Logs a rejected request before handing the error back.
fn rejected<T>(result: Result<T>, action: &str) -> Result<T> {
    if let Err(ref err) = result {
        warn!("{} rejected: {}", action, err);
    }
    result
}

#[derive(Clone)]
pub struct Catalog {
    db: sled::Db,
    friend_listing: FriendListing,
    ranking: Ranking,
}

impl Catalog {
    pub fn new(db: sled::Db, friend_listing: FriendListing, ranking: Ranking) -> Result<Self> {
        db.seed_reference_data()?;
        Ok(Catalog {
            db,
            friend_listing,
            ranking,
        })
    }

    pub fn open(settings: &Settings) -> Result<Self> {
        Self::new(settings.open_db()?, settings.friend_listing, settings.ranking)
    }

    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    pub fn create_user(&self, user: NewUser) -> Result<User> {
        rejected(validation::new_user(&user, today()), "user creation")?;
        let name = validation::display_name(user.name.as_deref(), &user.login);
        let user = rejected(
            self.db.create_user(User {
                id: 0,
                email: user.email,
                login: user.login,
                name,
                birthday: user.birthday,
            }),
            "user creation",
        )?;
        info!("created user {} ({})", user.id, user.login);
        Ok(user)
    }

    pub fn update_user(&self, update: UserUpdate) -> Result<User> {
        rejected(validation::user_update(&update, today()), "user update")?;
        let user = rejected(
            self.db.modify_user(update.id, |user| {
                if let Some(ref email) = update.email {
                    user.email = email.clone();
                }
                if let Some(ref login) = update.login {
                    user.login = login.clone();
                }
                if update.birthday.is_some() {
                    user.birthday = update.birthday;
                }
                user.name = validation::display_name(update.name.as_deref(), &user.login);
                Ok(())
            }),
            "user update",
        )?;
        info!("updated user {}", user.id);
        Ok(user)
    }

    pub fn users(&self) -> Result<Vec<User>> {
        self.db.users()
    }

    pub fn user(&self, id: UserId) -> Result<User> {
        self.db.user(id)
    }

    /// Makes the two users friends of each other.
    pub fn add_friend(&self, user_id: UserId, friend_id: UserId) -> Result<()> {
        rejected(self.db.add_friendship(user_id, friend_id), "friend request")?;
        info!("users {} and {} are friends", user_id, friend_id);
        Ok(())
    }

    /// Ends the friendship in both directions. Both users must exist; a
    /// missing friendship is not an error.
    pub fn remove_friend(&self, user_id: UserId, friend_id: UserId) -> Result<()> {
        rejected(
            self.db
                .ensure_user(user_id)
                .and_then(|_| self.db.ensure_user(friend_id))
                .and_then(|_| self.db.remove_friendship(user_id, friend_id)),
            "friend removal",
        )?;
        info!("users {} and {} are no longer friends", user_id, friend_id);
        Ok(())
    }

    pub fn friends(&self, user_id: UserId) -> Result<Vec<User>> {
        rejected(self.db.ensure_user(user_id), "friend listing")?;
        match self.friend_listing {
            FriendListing::Outgoing => self.db.list_friends(user_id),
            FriendListing::Mutual => self.db.mutual_friends(user_id),
        }
    }

    pub fn common_friends(&self, user_id: UserId, other_id: UserId) -> Result<Vec<User>> {
        rejected(
            self.db
                .ensure_user(user_id)
                .and_then(|_| self.db.ensure_user(other_id))
                .and_then(|_| self.db.common_friends(user_id, other_id)),
            "common friends",
        )
    }

    fn resolve_mpa(&self, id: Option<MpaId>) -> Result<Mpa> {
        match id {
            Some(id) => rejected(self.db.mpa(id), "film request"),
            None => rejected(
                Err(Error::Validation("MPA rating is required".to_owned())),
                "film request",
            ),
        }
    }

    fn resolve_genres(&self, ids: &[GenreId]) -> Result<Vec<Genre>> {
        ids.iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|id| rejected(self.db.genre(id), "film request"))
            .collect()
    }

    pub fn create_film(&self, film: NewFilm) -> Result<Film> {
        let (release_date, duration) = rejected(validation::new_film(&film), "film creation")?;
        let mpa = self.resolve_mpa(film.mpa)?;
        let genres = self.resolve_genres(&film.genres)?;
        let film = rejected(
            self.db.create_film(Film {
                id: 0,
                name: film.name,
                description: film.description,
                release_date,
                duration,
                mpa,
                genres,
            }),
            "film creation",
        )?;
        info!("created film {} ({})", film.id, film.name);
        Ok(film)
    }

    pub fn update_film(&self, update: FilmUpdate) -> Result<Film> {
        let duration = rejected(validation::film_update(&update), "film update")?;
        let mpa = match update.mpa {
            Some(_) => Some(self.resolve_mpa(update.mpa)?),
            None => None,
        };
        let genres = match update.genres {
            Some(ref genres) => Some(self.resolve_genres(genres)?),
            None => None,
        };
        let film = rejected(
            self.db.modify_film(update.id, |film| {
                if let Some(ref name) = update.name {
                    film.name = name.clone();
                }
                if let Some(ref description) = update.description {
                    film.description = description.clone();
                }
                if let Some(release_date) = update.release_date {
                    film.release_date = release_date;
                }
                if let Some(duration) = duration {
                    film.duration = duration;
                }
                if let Some(ref mpa) = mpa {
                    film.mpa = mpa.clone();
                }
                if let Some(ref genres) = genres {
                    film.genres = genres.clone();
                }
                Ok(())
            }),
            "film update",
        )?;
        info!("updated film {}", film.id);
        Ok(film)
    }

    pub fn films(&self) -> Result<Vec<Film>> {
        self.db.films()
    }

    pub fn film(&self, id: FilmId) -> Result<Film> {
        self.db.film(id)
    }

    pub fn add_like(&self, film_id: FilmId, user_id: UserId) -> Result<()> {
        rejected(self.db.add_like(film_id, user_id), "like")?;
        info!("user {} likes film {}", user_id, film_id);
        Ok(())
    }

    pub fn remove_like(&self, film_id: FilmId, user_id: UserId) -> Result<()> {
        rejected(self.db.remove_like(film_id, user_id), "unlike")?;
        info!("user {} no longer likes film {}", user_id, film_id);
        Ok(())
    }

    pub fn popular(&self, count: i64) -> Result<Vec<RankedFilm>> {
        self.db.top_films(count, self.ranking)
    }

    pub fn genres(&self) -> Result<Vec<Genre>> {
        self.db.genres()
    }

    pub fn genre(&self, id: GenreId) -> Result<Genre> {
        self.db.genre(id)
    }

    pub fn mpa_ratings(&self) -> Result<Vec<Mpa>> {
        self.db.mpa_ratings()
    }

    pub fn mpa(&self, id: MpaId) -> Result<Mpa> {
        self.db.mpa(id)
    }
}
