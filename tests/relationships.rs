use chrono::NaiveDate;
use filmrank::model::*;
use filmrank::{Catalog, Entity, Error, FriendDb, LikeDb, Ranking, Settings};
use rstest::{fixture, rstest};
use std::thread;

#[fixture]
fn catalog() -> Catalog {
    Catalog::open(&Settings::temporary()).unwrap()
}

fn add_users(catalog: &Catalog, count: usize) -> Vec<UserId> {
    (1..=count)
        .map(|n| {
            catalog
                .create_user(NewUser {
                    email: format!("user{}@example.com", n),
                    login: format!("user{}", n),
                    name: None,
                    birthday: NaiveDate::from_ymd_opt(2000, 1, 1),
                })
                .unwrap()
                .id
        })
        .collect()
}

fn add_films(catalog: &Catalog, count: usize) -> Vec<FilmId> {
    (1..=count)
        .map(|n| {
            catalog
                .create_film(NewFilm {
                    name: format!("Film {}", n),
                    description: "A film".to_owned(),
                    release_date: NaiveDate::from_ymd_opt(1999, 3, 31),
                    duration: 120,
                    mpa: Some(MpaId(3)),
                    genres: vec![GenreId(5)],
                })
                .unwrap()
                .id
        })
        .collect()
}

fn user_ids(users: Vec<User>) -> Vec<UserId> {
    users.into_iter().map(|user| user.id).collect()
}

#[rstest]
fn two_users_befriending_each_other(catalog: Catalog) {
    add_users(&catalog, 2);
    catalog.db().add_friend(1, 2).unwrap();
    catalog.db().add_friend(2, 1).unwrap();

    assert_eq!(user_ids(catalog.friends(1).unwrap()), vec![2]);
    assert_eq!(user_ids(catalog.friends(2).unwrap()), vec![1]);
    assert!(catalog.common_friends(1, 2).unwrap().is_empty());
}

#[rstest]
fn common_friend_of_a_mutual_pair(catalog: Catalog) {
    add_users(&catalog, 3);
    catalog.add_friend(1, 2).unwrap();
    catalog.add_friend(1, 3).unwrap();
    catalog.add_friend(2, 3).unwrap();

    let common = user_ids(catalog.common_friends(1, 2).unwrap());
    assert_eq!(common, vec![3]);
    assert!(!common.contains(&1) && !common.contains(&2));
}

#[rstest]
fn friendship_ends_for_both_sides(catalog: Catalog) {
    add_users(&catalog, 2);
    catalog.add_friend(1, 2).unwrap();
    catalog.remove_friend(2, 1).unwrap();
    assert!(catalog.friends(1).unwrap().is_empty());
    assert!(catalog.friends(2).unwrap().is_empty());
}

#[rstest]
fn removing_a_missing_friendship_leaves_state_unchanged(catalog: Catalog) {
    add_users(&catalog, 3);
    catalog.add_friend(1, 2).unwrap();
    let before = catalog.db().checksum().unwrap();
    catalog.remove_friend(1, 3).unwrap();
    assert_eq!(before, catalog.db().checksum().unwrap());
}

#[rstest]
fn friends_of_unknown_user_is_not_found(catalog: Catalog) {
    add_users(&catalog, 1);
    assert!(matches!(
        catalog.friends(5),
        Err(Error::NotFound(Entity::User, _))
    ));
    assert!(catalog.add_friend(1, 5).unwrap_err().is_not_found());
}

#[rstest]
fn popular_films_by_likes(catalog: Catalog) {
    add_users(&catalog, 3);
    add_films(&catalog, 2);
    catalog.add_like(1, 1).unwrap();
    catalog.add_like(1, 2).unwrap();
    catalog.add_like(2, 1).unwrap();

    let top = catalog.popular(2).unwrap();
    let ids = top.iter().map(|ranked| ranked.film.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(top, catalog.popular(2).unwrap());
}

#[rstest]
fn liking_twice_counts_once(catalog: Catalog) {
    add_users(&catalog, 1);
    add_films(&catalog, 1);
    catalog.add_like(1, 1).unwrap();
    catalog.add_like(1, 1).unwrap();
    assert_eq!(catalog.db().like_count(1).unwrap(), 1);
}

#[rstest]
fn unliking_twice_fails_the_second_time(catalog: Catalog) {
    add_users(&catalog, 1);
    add_films(&catalog, 1);
    catalog.add_like(1, 1).unwrap();
    catalog.remove_like(1, 1).unwrap();
    assert!(matches!(
        catalog.remove_like(1, 1),
        Err(Error::NotFound(Entity::Like, _))
    ));
}

#[rstest]
fn concurrent_likes_are_not_lost(catalog: Catalog) {
    let users = add_users(&catalog, 8);
    add_films(&catalog, 1);
    let handles = users
        .into_iter()
        .map(|user| {
            let catalog = catalog.clone();
            thread::spawn(move || {
                for _ in 0..5 {
                    catalog.add_like(1, user).unwrap();
                    catalog.remove_like(1, user).unwrap();
                }
                catalog.add_like(1, user).unwrap();
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(catalog.db().like_count(1).unwrap(), 8);
    assert_eq!(
        catalog.db().counted_likes().unwrap(),
        catalog.db().recounted_likes().unwrap()
    );
    assert_eq!(
        catalog.db().top_films(1, Ranking::Incremental).unwrap(),
        catalog.db().top_films(1, Ranking::OnDemand).unwrap()
    );
}

#[rstest]
fn concurrent_friend_requests_stay_consistent(catalog: Catalog) {
    add_users(&catalog, 2);
    let handles = (0..4)
        .map(|n| {
            let catalog = catalog.clone();
            thread::spawn(move || {
                for _ in 0..10 {
                    if n % 2 == 0 {
                        catalog.db().add_friend(1, 2).unwrap();
                        catalog.db().remove_friend(1, 2).unwrap();
                    } else {
                        catalog.db().add_friend(2, 1).unwrap();
                    }
                }
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().unwrap();
    }
    catalog.db().add_friend(1, 2).unwrap();
    let edges = catalog.db().friend_edges(1).unwrap();
    assert_eq!(edges.len(), 1);
    assert!(edges[0].confirmed);
    assert!(catalog.db().friend_edges(2).unwrap()[0].confirmed);
}

#[rstest]
fn concurrent_partial_updates_keep_every_field(catalog: Catalog) {
    let birthday = NaiveDate::from_ymd_opt(1980, 6, 15);
    for (round, id) in add_users(&catalog, 50).into_iter().enumerate() {
        let email = format!("moved{}@example.com", round);
        let writers = vec![
            UserUpdate {
                id,
                email: Some(email.clone()),
                ..UserUpdate::default()
            },
            UserUpdate {
                id,
                birthday,
                ..UserUpdate::default()
            },
        ]
        .into_iter()
        .map(|update| {
            let catalog = catalog.clone();
            thread::spawn(move || catalog.update_user(update).unwrap())
        })
        .collect::<Vec<_>>();
        for writer in writers {
            writer.join().unwrap();
        }
        let user = catalog.user(id).unwrap();
        assert_eq!((user.email.as_str(), user.birthday), (email.as_str(), birthday));
    }

    let film = add_films(&catalog, 1)[0];
    let writers = vec![
        FilmUpdate {
            id: film,
            name: Some("Renamed".to_owned()),
            ..FilmUpdate::default()
        },
        FilmUpdate {
            id: film,
            duration: Some(95),
            ..FilmUpdate::default()
        },
        FilmUpdate {
            id: film,
            mpa: Some(MpaId(1)),
            ..FilmUpdate::default()
        },
    ]
    .into_iter()
    .map(|update| {
        let catalog = catalog.clone();
        thread::spawn(move || catalog.update_film(update).unwrap())
    })
    .collect::<Vec<_>>();
    for writer in writers {
        writer.join().unwrap();
    }
    let stored = catalog.film(film).unwrap();
    assert_eq!(
        (stored.name.as_str(), stored.duration, stored.mpa.id),
        ("Renamed", 95, MpaId(1))
    );
}
