use anyhow::anyhow;
use chrono::{
  NaiveDate,
  NaiveDateTime
};

pub const WIRE_DATE_FORMAT: &str =
  "%Y-%m-%d";
pub const DISPLAY_DATE_FORMAT: &str =
  "%d/%m/%Y";

const MIDNIGHT_SUFFIX: &str =
  "T00:00:00";

#[must_use]
pub fn format_wire_date(
  date: Option<NaiveDate>
) -> String {
  date
    .map(|d| {
      d.format(WIRE_DATE_FORMAT)
        .to_string()
    })
    .unwrap_or_default()
}

/// Parses a wire date anchored to
/// local midnight.
///
/// An empty string means "no date".
/// Timestamps are cut down to their
/// calendar-day part first, so
/// `2024-03-15T23:30:00Z` stays on the
/// 15th.
pub fn parse_wire_date(
  raw: &str
) -> Result<
  Option<NaiveDate>,
  chrono::ParseError
> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Ok(None);
  }

  let day = trimmed
    .split(['T', ' '])
    .next()
    .unwrap_or(trimmed);

  NaiveDateTime::parse_from_str(
    &format!("{day}{MIDNIGHT_SUFFIX}"),
    "%Y-%m-%dT%H:%M:%S"
  )
  .map(|dt| Some(dt.date()))
}

#[must_use]
pub fn format_display_date(
  date: NaiveDate
) -> String {
  date
    .format(DISPLAY_DATE_FORMAT)
    .to_string()
}

/// Accepts `YYYY-MM-DD` or the
/// `DD/MM/YYYY` display form.
pub fn parse_user_date(
  raw: &str
) -> anyhow::Result<NaiveDate> {
  let trimmed = raw.trim();
  NaiveDate::parse_from_str(
    trimmed,
    WIRE_DATE_FORMAT
  )
  .or_else(|_| {
    NaiveDate::parse_from_str(
      trimmed,
      DISPLAY_DATE_FORMAT
    )
  })
  .map_err(|_| {
    anyhow!(
      "invalid date: {trimmed} \
       (expected YYYY-MM-DD or \
       DD/MM/YYYY)"
    )
  })
}

pub mod wire_date {
  use chrono::NaiveDate;
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  pub fn serialize<S>(
    date: &Option<NaiveDate>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &super::format_wire_date(*date)
    )
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<Option<NaiveDate>, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw =
      Option::<String>::deserialize(
        deserializer
      )?;
    match raw {
      | Some(raw) => {
        super::parse_wire_date(&raw)
          .map_err(
            serde::de::Error::custom
          )
      }
      | None => Ok(None)
    }
  }
}
