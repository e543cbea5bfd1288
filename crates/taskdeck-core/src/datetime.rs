use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Days,
  Months,
  NaiveDate,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

const TIMEZONE_CONFIG_FILE: &str =
  "taskdeck-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "TASKDECK_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "TASKDECK_TIME_CONFIG";
const DEFAULT_PROJECT_TIMEZONE: &str =
  "UTC";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

pub fn project_timezone() -> &'static Tz
{
  static PROJECT_TZ: OnceLock<Tz> =
    OnceLock::new();
  PROJECT_TZ.get_or_init(
    resolve_project_timezone
  )
}

/// Calendar date of an instant in the
/// project timezone.
#[must_use]
pub fn to_project_date(
  dt: DateTime<Utc>
) -> NaiveDate {
  dt.with_timezone(project_timezone())
    .date_naive()
}

#[must_use]
pub fn today(
  now: DateTime<Utc>
) -> NaiveDate {
  to_project_date(now)
}

#[must_use]
pub fn format_date(
  date: NaiveDate
) -> String {
  date.format("%Y-%m-%d").to_string()
}

/// Sunday that starts the week
/// containing `date`.
#[must_use]
pub fn week_start(
  date: NaiveDate
) -> NaiveDate {
  let offset = u64::from(
    date
      .weekday()
      .num_days_from_sunday()
  );
  date
    .checked_sub_days(Days::new(offset))
    .unwrap_or(date)
}

#[must_use]
pub fn month_start(
  date: NaiveDate
) -> NaiveDate {
  date.with_day(1).unwrap_or(date)
}

#[must_use]
pub fn month_end(
  date: NaiveDate
) -> NaiveDate {
  month_start(date)
    .checked_add_months(Months::new(1))
    .and_then(|next| next.pred_opt())
    .unwrap_or(date)
}

fn resolve_project_timezone() -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) = parse_timezone(
      &raw,
      TIMEZONE_ENV_VAR
    )
  {
    return tz;
  }

  if let Some(path) =
    timezone_config_path()
    && let Some(tz) =
      load_timezone_from_file(&path)
  {
    return tz;
  }

  parse_timezone(
    DEFAULT_PROJECT_TIMEZONE,
    "DEFAULT_PROJECT_TIMEZONE"
  )
  .unwrap_or(chrono_tz::UTC)
}

fn timezone_config_path()
-> Option<PathBuf> {
  if let Ok(raw) = std::env::var(
    TIMEZONE_CONFIG_ENV_VAR
  ) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  std::env::current_dir().ok().map(
    |dir| {
      dir.join(TIMEZONE_CONFIG_FILE)
    }
  )
}

fn load_timezone_from_file(
  path: &PathBuf
) -> Option<Tz> {
  if !path.exists() {
    return None;
  }

  let text = match fs::read_to_string(
    path
  )
  .with_context(|| {
    format!(
      "failed to read {}",
      path.display()
    )
  }) {
    | Ok(text) => text,
    | Err(error) => {
      tracing::warn!(%error, "ignoring timezone config");
      return None;
    }
  };

  let parsed: TimezoneConfig =
    match toml::from_str(&text) {
      | Ok(parsed) => parsed,
      | Err(error) => {
        tracing::warn!(
          file = %path.display(),
          %error,
          "invalid timezone config"
        );
        return None;
      }
    };

  let raw = parsed
    .time
    .and_then(|section| {
      section.timezone
    })
    .or(parsed.timezone)?;
  parse_timezone(
    &raw,
    &path.display().to_string()
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }
  match trimmed.parse::<Tz>() {
    | Ok(tz) => Some(tz),
    | Err(error) => {
      tracing::warn!(
        source,
        value = trimmed,
        %error,
        "unrecognized timezone"
      );
      None
    }
  }
}

/// Parses the date expressions the
/// task forms accept: ISO dates,
/// RFC 3339 timestamps, `today`,
/// `tomorrow`, `yesterday`, relative
/// offsets such as `+3d`/`-1w`/`+2m`,
/// and weekday names (next
/// occurrence, never today).
#[tracing::instrument(skip(now))]
pub fn parse_date_expr(
  raw: &str,
  now: DateTime<Utc>
) -> anyhow::Result<NaiveDate> {
  let input =
    raw.trim().to_ascii_lowercase();
  if input.is_empty() {
    return Err(anyhow!(
      "date expression is empty"
    ));
  }

  let base = today(now);

  match input.as_str() {
    | "today" | "now" => {
      return Ok(base);
    }
    | "tomorrow" => {
      return base
        .succ_opt()
        .ok_or_else(|| {
          anyhow!("date out of range")
        });
    }
    | "yesterday" => {
      return base
        .pred_opt()
        .ok_or_else(|| {
          anyhow!("date out of range")
        });
    }
    | _ => {}
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      &input, "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(raw.trim())
  {
    return Ok(to_project_date(
      dt.with_timezone(&Utc)
    ));
  }

  let rel_re = Regex::new(
    r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dwm])$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile \
       failure: {e}"
    )
  })?;

  if let Some(caps) =
    rel_re.captures(&input)
  {
    let amount: u32 = caps["num"]
      .parse()
      .context("invalid offset")?;
    let forward = &caps["sign"] == "+";
    let shifted = match &caps["unit"] {
      | "d" => shift_days(
        base,
        u64::from(amount),
        forward
      ),
      | "w" => shift_days(
        base,
        u64::from(amount) * 7,
        forward
      ),
      | _ => {
        if forward {
          base.checked_add_months(
            Months::new(amount)
          )
        } else {
          base.checked_sub_months(
            Months::new(amount)
          )
        }
      }
    };
    return shifted.ok_or_else(|| {
      anyhow!(
        "date offset out of range: \
         {raw}"
      )
    });
  }

  if let Some(weekday) =
    parse_weekday_name(&input)
  {
    return Ok(next_weekday_date(
      base, weekday
    ));
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {raw}"
  ))
}

fn shift_days(
  base: NaiveDate,
  days: u64,
  forward: bool
) -> Option<NaiveDate> {
  if forward {
    base.checked_add_days(Days::new(
      days
    ))
  } else {
    base.checked_sub_days(Days::new(
      days
    ))
  }
}

fn parse_weekday_name(
  input: &str
) -> Option<Weekday> {
  match input {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  base: NaiveDate,
  weekday: Weekday
) -> NaiveDate {
  let current = i64::from(
    base
      .weekday()
      .num_days_from_monday()
  );
  let target = i64::from(
    weekday.num_days_from_monday()
  );
  let mut delta =
    (target - current).rem_euclid(7);
  if delta == 0 {
    delta = 7;
  }
  base
    .checked_add_days(Days::new(
      delta.unsigned_abs()
    ))
    .unwrap_or(base)
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    TimeZone,
    Utc
  };

  use super::{
    month_end,
    parse_date_expr,
    week_start
  };

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn parses_iso_and_keywords() {
    let now = Utc
      .with_ymd_and_hms(
        2026, 2, 17, 12, 0, 0
      )
      .single()
      .expect("valid now");
    assert_eq!(
      parse_date_expr(
        "2026-04-01",
        now
      )
      .expect("iso"),
      date(2026, 4, 1)
    );
    assert_eq!(
      parse_date_expr("tomorrow", now)
        .expect("tomorrow"),
      date(2026, 2, 18)
    );
    assert!(
      parse_date_expr("someday", now)
        .is_err()
    );
  }

  #[test]
  fn parses_relative_offsets() {
    let now = Utc
      .with_ymd_and_hms(
        2026, 2, 17, 12, 0, 0
      )
      .single()
      .expect("valid now");
    assert_eq!(
      parse_date_expr("+3d", now)
        .expect("+3d"),
      date(2026, 2, 20)
    );
    assert_eq!(
      parse_date_expr("-1w", now)
        .expect("-1w"),
      date(2026, 2, 10)
    );
    assert_eq!(
      parse_date_expr("+1m", now)
        .expect("+1m"),
      date(2026, 3, 17)
    );
  }

  #[test]
  fn parses_weekday_name() {
    let now = Utc
      .with_ymd_and_hms(
        2026, 2, 17, 12, 0, 0
      )
      .single()
      .expect("valid now");
    assert_eq!(
      parse_date_expr("wednesday", now)
        .expect("parse weekday"),
      date(2026, 2, 18)
    );
    assert_eq!(
      parse_date_expr("tue", now)
        .expect("parse weekday"),
      date(2026, 2, 24)
    );
  }

  #[test]
  fn week_and_month_bounds() {
    assert_eq!(
      week_start(date(2026, 2, 17)),
      date(2026, 2, 15)
    );
    assert_eq!(
      week_start(date(2026, 2, 15)),
      date(2026, 2, 15)
    );
    assert_eq!(
      month_end(date(2024, 2, 10)),
      date(2024, 2, 29)
    );
  }
}
