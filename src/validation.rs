use crate::error::{Error, Result};
use crate::model::*;
use chrono::NaiveDate;

pub const MAX_DESCRIPTION_LEN: usize = 200;

/// The first public film screening took place on this day.
pub fn earliest_release_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1895, 12, 28).unwrap_or(NaiveDate::MIN)
}

fn invalid<T>(message: impl Into<String>) -> Result<T> {
    Err(Error::Validation(message.into()))
}

pub fn email(email: &str) -> Result<()> {
    if email.trim().is_empty() || !email.contains('@') {
        return invalid(format!("email must contain '@': {:?}", email));
    }
    Ok(())
}

pub fn login(login: &str) -> Result<()> {
    if login.is_empty() || login.chars().any(char::is_whitespace) {
        return invalid(format!("login must be non-empty without spaces: {:?}", login));
    }
    Ok(())
}

pub fn birthday(birthday: Option<NaiveDate>, today: NaiveDate) -> Result<()> {
    match birthday {
        Some(date) if date > today => invalid(format!("birthday {} is in the future", date)),
        _ => Ok(()),
    }
}

pub fn film_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return invalid("film name must not be blank");
    }
    Ok(())
}

pub fn description(description: &str) -> Result<()> {
    if description.trim().is_empty() {
        return invalid("film description must not be blank");
    }
    let len = description.chars().count();
    if len > MAX_DESCRIPTION_LEN {
        return invalid(format!(
            "film description is {} characters, at most {} are allowed",
            len, MAX_DESCRIPTION_LEN
        ));
    }
    Ok(())
}

pub fn release_date(date: NaiveDate) -> Result<()> {
    if date < earliest_release_date() {
        return invalid(format!(
            "release date {} precedes {}",
            date,
            earliest_release_date()
        ));
    }
    Ok(())
}

pub fn duration(minutes: i64) -> Result<u32> {
    use std::convert::TryFrom;
    match u32::try_from(minutes) {
        Ok(minutes) if minutes > 0 => Ok(minutes),
        _ => invalid(format!("duration must be a positive number of minutes, got {}", minutes)),
    }
}

/// Display name to store: the given name unless blank, else the login.
pub fn display_name(name: Option<&str>, login: &str) -> String {
    match name {
        Some(name) if !name.trim().is_empty() => name.to_owned(),
        _ => login.to_owned(),
    }
}

pub fn new_user(user: &NewUser, today: NaiveDate) -> Result<()> {
    email(&user.email)?;
    login(&user.login)?;
    birthday(user.birthday, today)
}

pub fn user_update(update: &UserUpdate, today: NaiveDate) -> Result<()> {
    if let Some(ref value) = update.email {
        email(value)?;
    }
    if let Some(ref value) = update.login {
        login(value)?;
    }
    birthday(update.birthday, today)
}

pub fn new_film(film: &NewFilm) -> Result<(NaiveDate, u32)> {
    film_name(&film.name)?;
    description(&film.description)?;
    let date = match film.release_date {
        Some(date) => date,
        None => return invalid("release date is required"),
    };
    release_date(date)?;
    Ok((date, duration(film.duration)?))
}

pub fn film_update(update: &FilmUpdate) -> Result<Option<u32>> {
    if let Some(ref name) = update.name {
        film_name(name)?;
    }
    if let Some(ref text) = update.description {
        description(text)?;
    }
    if let Some(date) = update.release_date {
        release_date(date)?;
    }
    update.duration.map(duration).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case("mail@example.com", true)]
    #[case("example.com", false)]
    #[case("   ", false)]
    fn email_needs_an_at_sign(#[case] value: &str, #[case] ok: bool) {
        assert_eq!(email(value).is_ok(), ok);
    }

    #[rstest]
    #[case("dolore", true)]
    #[case("dolore ullamco", false)]
    #[case("", false)]
    fn login_has_no_spaces(#[case] value: &str, #[case] ok: bool) {
        assert_eq!(login(value).is_ok(), ok);
    }

    #[test]
    fn birthday_may_be_today_but_not_tomorrow() {
        let today = date(2024, 5, 1);
        assert!(birthday(Some(today), today).is_ok());
        assert!(birthday(None, today).is_ok());
        assert!(birthday(Some(date(2024, 5, 2)), today).is_err());
    }

    #[test]
    fn release_date_floor_is_inclusive() {
        assert!(release_date(date(1895, 12, 28)).is_ok());
        assert!(release_date(date(1895, 12, 27)).is_err());
    }

    #[test]
    fn description_is_limited_by_characters_not_bytes() {
        assert!(description(&"я".repeat(200)).is_ok());
        assert!(description(&"a".repeat(201)).is_err());
        assert!(description(" ").is_err());
    }

    #[rstest]
    #[case(100, Some(100))]
    #[case(0, None)]
    #[case(-1, None)]
    #[case(i64::MAX, None)]
    fn duration_must_be_positive(#[case] minutes: i64, #[case] expected: Option<u32>) {
        assert_eq!(duration(minutes).ok(), expected);
    }

    #[test]
    fn blank_name_falls_back_to_login() {
        assert_eq!(display_name(Some("  "), "login"), "login");
        assert_eq!(display_name(None, "login"), "login");
        assert_eq!(display_name(Some("Name"), "login"), "Name");
    }
}
