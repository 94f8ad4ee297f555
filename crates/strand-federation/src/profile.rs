//! Profile replacement.
//!
//! A received profile is normalised and validated as a detached value, then
//! installed with one store write. A rejected profile never touches the
//! stored one.

use chrono::{NaiveDate, Utc};
use strand_core::{
  person::{Person, Profile, parse_web_url},
  store::FederationStore,
};
use tracing::warn;

use crate::{
  Error, Result,
  dispatch::{Applied, Dispatcher, Outcome},
  resolver::IdentityLookup,
};

pub const MAX_NAME_CHARS: usize = 32;
pub const MAX_BIO_CHARS: usize = 1000;

fn blank_to_none(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.trim().is_empty())
}

fn check_length(field: &str, value: Option<&String>, max: usize) -> Result<()> {
  match value {
    Some(v) if v.chars().count() > max => Err(Error::InvalidProfile(format!(
      "{field} is longer than {max} characters"
    ))),
    _ => Ok(()),
  }
}

/// Normalise and validate `profile` as of `today`.
pub fn validate(profile: Profile, today: NaiveDate) -> Result<Profile> {
  let profile = Profile {
    first_name: blank_to_none(profile.first_name),
    last_name:  blank_to_none(profile.last_name),
    image_url:  blank_to_none(profile.image_url),
    bio:        blank_to_none(profile.bio),
    ..profile
  };

  check_length("first_name", profile.first_name.as_ref(), MAX_NAME_CHARS)?;
  check_length("last_name", profile.last_name.as_ref(), MAX_NAME_CHARS)?;
  check_length("bio", profile.bio.as_ref(), MAX_BIO_CHARS)?;

  if let Some(url) = &profile.image_url
    && parse_web_url(url).is_none()
  {
    return Err(Error::InvalidProfile(format!(
      "image_url {url:?} is not an http(s) URL"
    )));
  }

  if let Some(birthday) = profile.birthday
    && birthday > today
  {
    return Err(Error::InvalidProfile(format!(
      "birthday {birthday} is in the future"
    )));
  }

  Ok(profile)
}

impl<S, L> Dispatcher<S, L>
where
  S: FederationStore,
  L: IdentityLookup,
{
  pub(crate) async fn apply_profile(
    &self,
    owner: Person,
    profile: Profile,
  ) -> Result<Outcome> {
    let profile = validate(profile, Utc::now().date_naive()).inspect_err(|e| {
      warn!(handle = %owner.handle, error = %e, "rejecting profile");
    })?;

    if owner.profile.as_ref() == Some(&profile) {
      return Ok(Outcome::AlreadyApplied);
    }

    let replaced = self
      .store
      .replace_profile(owner.person_id, Some(profile.clone()))
      .await
      .map_err(Error::store)?;
    if !replaced {
      // the person vanished between resolution and the write
      return Ok(Outcome::AlreadyApplied);
    }

    Ok(Outcome::Applied(Applied::Profile(Person {
      profile: Some(profile),
      ..owner
    })))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 6, 1).unwrap() }

  fn bob() -> Profile {
    Profile {
      first_name: Some("bob".into()),
      last_name:  Some("billytown".into()),
      image_url:  Some("http://clown.com".into()),
      ..Profile::default()
    }
  }

  #[test]
  fn valid_profile_passes_through() {
    assert_eq!(validate(bob(), today()).unwrap(), bob());
  }

  #[test]
  fn blank_strings_become_absent() {
    let profile = Profile {
      bio: Some("   ".into()),
      last_name: Some(String::new()),
      ..bob()
    };
    let validated = validate(profile, today()).unwrap();
    assert_eq!(validated.bio, None);
    assert_eq!(validated.last_name, None);
  }

  #[test]
  fn rule_violations_are_rejected() {
    let cases = [
      Profile { first_name: Some("x".repeat(33)), ..bob() },
      Profile { bio: Some("x".repeat(1001)), ..bob() },
      Profile { image_url: Some("ftp://clown.com/a.png".into()), ..bob() },
      Profile { image_url: Some("http://".into()), ..bob() },
      Profile { image_url: Some("http://not a url/<x>".into()), ..bob() },
      Profile { image_url: Some("clown.com/a.png".into()), ..bob() },
      Profile { birthday: NaiveDate::from_ymd_opt(2030, 1, 1), ..bob() },
    ];
    for profile in cases {
      assert!(
        matches!(validate(profile.clone(), today()), Err(Error::InvalidProfile(_))),
        "accepted {profile:?}"
      );
    }
  }

  #[test]
  fn limits_count_characters_not_bytes() {
    let profile = Profile { first_name: Some("é".repeat(32)), ..bob() };
    assert!(validate(profile, today()).is_ok());
  }
}
