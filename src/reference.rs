use crate::database::{decode, serialize_id};
use crate::error::{Entity, Error, Result};
use crate::model::*;

const GENRES: &[u8] = b"genres";
const MPA: &[u8] = b"mpa";

const GENRE_CATALOG: &[(u32, &str)] = &[
    (1, "Comedy"),
    (2, "Drama"),
    (3, "Thriller"),
    (4, "Horror"),
    (5, "Science Fiction"),
];

const MPA_CATALOG: &[(u32, &str)] = &[
    (1, "G"),
    (2, "PG"),
    (3, "PG-13"),
    (4, "R"),
    (5, "NC-17"),
];

pub trait ReferenceDb {
    /// Writes the built-in catalogs. Entries already present are left alone,
    /// so this is safe to call on every start.
    fn seed_reference_data(&self) -> Result<()>;
    fn genres(&self) -> Result<Vec<Genre>>;
    fn genre(&self, id: GenreId) -> Result<Genre>;
    fn mpa_ratings(&self) -> Result<Vec<Mpa>>;
    fn mpa(&self, id: MpaId) -> Result<Mpa>;
}

fn seed(tree: &sled::Tree, catalog: &[(u32, &str)], encode: impl Fn(u32, &str) -> Result<Vec<u8>>) -> Result<()> {
    for (id, name) in catalog {
        let key = serialize_id(u64::from(*id));
        if !tree.contains_key(key)? {
            tree.insert(&key[..], encode(*id, *name)?)?;
        }
    }
    Ok(())
}

fn lookup<T: serde::de::DeserializeOwned>(tree: &sled::Tree, entity: Entity, id: u32) -> Result<T> {
    match tree.get(serialize_id(u64::from(id)))? {
        Some(data) => decode(&data),
        None => Err(Error::not_found(entity, id)),
    }
}

impl ReferenceDb for sled::Db {
    fn seed_reference_data(&self) -> Result<()> {
        seed(&self.open_tree(GENRES)?, GENRE_CATALOG, |id, name| {
            Ok(bincode::serialize(&Genre {
                id: GenreId(id),
                name: name.to_owned(),
            })?)
        })?;
        seed(&self.open_tree(MPA)?, MPA_CATALOG, |id, name| {
            Ok(bincode::serialize(&Mpa {
                id: MpaId(id),
                name: name.to_owned(),
            })?)
        })?;
        log::debug!(
            "reference data ready: {} genres, {} MPA ratings",
            GENRE_CATALOG.len(),
            MPA_CATALOG.len()
        );
        Ok(())
    }

    fn genres(&self) -> Result<Vec<Genre>> {
        self.open_tree(GENRES)?
            .iter()
            .values()
            .map(|data| decode(&data?))
            .collect()
    }

    fn genre(&self, id: GenreId) -> Result<Genre> {
        lookup(&self.open_tree(GENRES)?, Entity::Genre, id.0)
    }

    fn mpa_ratings(&self) -> Result<Vec<Mpa>> {
        self.open_tree(MPA)?
            .iter()
            .values()
            .map(|data| decode(&data?))
            .collect()
    }

    fn mpa(&self, id: MpaId) -> Result<Mpa> {
        lookup(&self.open_tree(MPA)?, Entity::Mpa, id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::tests::temporary_db;

    #[test]
    fn catalogs_are_listed_in_id_order() {
        let db = temporary_db();
        db.seed_reference_data().unwrap();
        let genres = db.genres().unwrap();
        assert_eq!(genres.len(), 5);
        assert!(genres.windows(2).all(|w| w[0].id < w[1].id));
        let names = db
            .mpa_ratings()
            .unwrap()
            .into_iter()
            .map(|mpa| mpa.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["G", "PG", "PG-13", "R", "NC-17"]);
    }

    #[test]
    fn unknown_ids_are_domain_specific_not_found() {
        let db = temporary_db();
        db.seed_reference_data().unwrap();
        assert_eq!(db.genre(GenreId(2)).unwrap().name, "Drama");
        assert!(matches!(db.genre(GenreId(6)), Err(Error::NotFound(Entity::Genre, _))));
        assert!(matches!(db.mpa(MpaId(0)), Err(Error::NotFound(Entity::Mpa, _))));
    }

    #[test]
    fn seeding_twice_changes_nothing() {
        let db = temporary_db();
        db.seed_reference_data().unwrap();
        let cs = db.checksum().unwrap();
        db.seed_reference_data().unwrap();
        assert_eq!(cs, db.checksum().unwrap());
    }
}
