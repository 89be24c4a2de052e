//! Film and user catalog with a friendship graph and like-based film
//! popularity ranking, stored in sled.

pub mod database;
pub mod error;
pub mod friends;
pub mod likes;
pub mod model;
pub mod reference;
pub mod service;
pub mod settings;
pub mod validation;

pub use crate::database::{FilmDb, UserDb};
pub use crate::error::{Entity, Error, Result};
pub use crate::friends::FriendDb;
pub use crate::likes::{LikeDb, Ranking};
pub use crate::reference::ReferenceDb;
pub use crate::service::Catalog;
pub use crate::settings::{FriendListing, Settings};
