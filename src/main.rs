use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use filmrank::model::*;
use filmrank::{Catalog, Result, Settings};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "filmrank", about = "Film catalog with friends and popularity ranking")]
struct Cli {
    /// Database directory, overrides the configured `db_path`.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(subcommand)]
    User(UserCommand),
    #[command(subcommand)]
    Film(FilmCommand),
    #[command(subcommand)]
    Friend(FriendCommand),
    #[command(subcommand)]
    Like(LikeCommand),
    /// Most liked films first.
    Popular {
        #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
        count: i64,
    },
    #[command(subcommand)]
    Genre(LookupCommand),
    #[command(subcommand)]
    Mpa(LookupCommand),
}

#[derive(Args)]
struct UserFields {
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    login: Option<String>,
    #[arg(long)]
    name: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    birthday: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum UserCommand {
    Add(UserFields),
    Update {
        id: UserId,
        #[command(flatten)]
        fields: UserFields,
    },
    List,
    Show { id: UserId },
}

#[derive(Args)]
struct FilmFields {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    release_date: Option<NaiveDate>,
    /// Minutes.
    #[arg(long, allow_negative_numbers = true)]
    duration: Option<i64>,
    #[arg(long)]
    mpa: Option<u32>,
    /// May be repeated.
    #[arg(long = "genre")]
    genres: Vec<u32>,
}

#[derive(Subcommand)]
enum FilmCommand {
    Add(FilmFields),
    Update {
        id: FilmId,
        #[command(flatten)]
        fields: FilmFields,
    },
    List,
    Show { id: FilmId },
}

#[derive(Subcommand)]
enum FriendCommand {
    Add { user: UserId, friend: UserId },
    Remove { user: UserId, friend: UserId },
    List { user: UserId },
    Common { user: UserId, other: UserId },
}

#[derive(Subcommand)]
enum LikeCommand {
    Add { film: FilmId, user: UserId },
    Remove { film: FilmId, user: UserId },
}

#[derive(Subcommand)]
enum LookupCommand {
    List,
    Show { id: u32 },
}

fn print_user(user: &User) {
    let birthday = user
        .birthday
        .map(|date| date.to_string())
        .unwrap_or_else(|| "-".to_owned());
    println!(
        "{}\t{}\t{}\t{}\t{}",
        user.id, user.email, user.login, user.name, birthday
    );
}

fn print_film(film: &Film) {
    let genres = film
        .genres
        .iter()
        .map(|genre| genre.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    println!(
        "{}\t{}\t{}\t{} min\t{}\t[{}]",
        film.id, film.name, film.release_date, film.duration, film.mpa.name, genres
    );
}

fn run(catalog: &Catalog, command: Command) -> Result<()> {
    match command {
        Command::User(UserCommand::Add(fields)) => {
            let user = catalog.create_user(NewUser {
                email: fields.email.unwrap_or_default(),
                login: fields.login.unwrap_or_default(),
                name: fields.name,
                birthday: fields.birthday,
            })?;
            print_user(&user);
        }
        Command::User(UserCommand::Update { id, fields }) => {
            let user = catalog.update_user(UserUpdate {
                id,
                email: fields.email,
                login: fields.login,
                name: fields.name,
                birthday: fields.birthday,
            })?;
            print_user(&user);
        }
        Command::User(UserCommand::List) => catalog.users()?.iter().for_each(print_user),
        Command::User(UserCommand::Show { id }) => print_user(&catalog.user(id)?),
        Command::Film(FilmCommand::Add(fields)) => {
            let film = catalog.create_film(NewFilm {
                name: fields.name.unwrap_or_default(),
                description: fields.description.unwrap_or_default(),
                release_date: fields.release_date,
                duration: fields.duration.unwrap_or_default(),
                mpa: fields.mpa.map(MpaId),
                genres: fields.genres.into_iter().map(GenreId).collect(),
            })?;
            print_film(&film);
        }
        Command::Film(FilmCommand::Update { id, fields }) => {
            let genres = if fields.genres.is_empty() {
                None
            } else {
                Some(fields.genres.into_iter().map(GenreId).collect())
            };
            let film = catalog.update_film(FilmUpdate {
                id,
                name: fields.name,
                description: fields.description,
                release_date: fields.release_date,
                duration: fields.duration,
                mpa: fields.mpa.map(MpaId),
                genres,
            })?;
            print_film(&film);
        }
        Command::Film(FilmCommand::List) => catalog.films()?.iter().for_each(print_film),
        Command::Film(FilmCommand::Show { id }) => print_film(&catalog.film(id)?),
        Command::Friend(FriendCommand::Add { user, friend }) => catalog.add_friend(user, friend)?,
        Command::Friend(FriendCommand::Remove { user, friend }) => {
            catalog.remove_friend(user, friend)?
        }
        Command::Friend(FriendCommand::List { user }) => {
            catalog.friends(user)?.iter().for_each(print_user)
        }
        Command::Friend(FriendCommand::Common { user, other }) => catalog
            .common_friends(user, other)?
            .iter()
            .for_each(print_user),
        Command::Like(LikeCommand::Add { film, user }) => catalog.add_like(film, user)?,
        Command::Like(LikeCommand::Remove { film, user }) => catalog.remove_like(film, user)?,
        Command::Popular { count } => {
            for ranked in catalog.popular(count)? {
                print!("{} likes\t", ranked.likes);
                print_film(&ranked.film);
            }
        }
        Command::Genre(LookupCommand::List) => {
            for genre in catalog.genres()? {
                println!("{}\t{}", genre.id.0, genre.name);
            }
        }
        Command::Genre(LookupCommand::Show { id }) => {
            let genre = catalog.genre(GenreId(id))?;
            println!("{}\t{}", genre.id.0, genre.name);
        }
        Command::Mpa(LookupCommand::List) => {
            for mpa in catalog.mpa_ratings()? {
                println!("{}\t{}", mpa.id.0, mpa.name);
            }
        }
        Command::Mpa(LookupCommand::Show { id }) => {
            let mpa = catalog.mpa(MpaId(id))?;
            println!("{}\t{}", mpa.id.0, mpa.name);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::from_env(env_logger::Env::default().default_filter_or("filmrank=info")).init();

    let cli = Cli::parse();
    let mut settings = Settings::load()?;
    if let Some(db) = cli.db {
        settings.db_path = db;
    }
    log::debug!("opening catalog with {:?}", settings);
    let catalog = Catalog::open(&settings)?;
    let result = run(&catalog, cli.command);
    catalog.db().flush()?;
    result
}
