use crate::error::Result;
use crate::likes::Ranking;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which edges a user's friend list is made of.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FriendListing {
    /// Every outgoing edge, reciprocated or not.
    Outgoing,
    /// Only users connected in both directions.
    Mutual,
}

impl Default for FriendListing {
    fn default() -> Self {
        FriendListing::Outgoing
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Settings {
    pub db_path: PathBuf,
    /// Discard the database when it is dropped.
    pub temporary: bool,
    pub friend_listing: FriendListing,
    pub ranking: Ranking,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            db_path: PathBuf::from("filmrank.db"),
            temporary: false,
            friend_listing: FriendListing::default(),
            ranking: Ranking::default(),
        }
    }
}

impl Settings {
    /// Defaults, overridden by an optional `filmrank.toml` in the working
    /// directory, overridden by `FILMRANK_*` environment variables.
    pub fn load() -> Result<Self> {
        Self::load_from("filmrank")
    }

    pub fn load_from(file: &str) -> Result<Self> {
        let defaults = Settings::default();
        let settings = config::Config::builder()
            .set_default("db_path", defaults.db_path.to_string_lossy().into_owned())?
            .set_default("temporary", defaults.temporary)?
            .set_default("friend_listing", "outgoing")?
            .set_default("ranking", "incremental")?
            .add_source(config::File::with_name(file).required(false))
            .add_source(config::Environment::with_prefix("FILMRANK"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn temporary() -> Self {
        Settings {
            temporary: true,
            ..Settings::default()
        }
    }

    pub fn open_db(&self) -> Result<sled::Db> {
        let mut config = sled::Config::new().temporary(self.temporary);
        if !self.temporary {
            config = config.path(&self.db_path);
        }
        Ok(config.open()?)
    }
}
