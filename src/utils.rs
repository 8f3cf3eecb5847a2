use std::{collections::HashSet, sync::LazyLock};

use axum::{
    async_trait,
    extract::{
        rejection::{PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Request,
    },
    http::request::Parts,
};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use regex::Regex;
use serde::{de::DeserializeOwned, Serializer};
use tracing::warn;

use crate::Error;

static ARCHIVE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{4})\s*年\s*(\d{1,2})\s*月\s*$").expect("valid archive token pattern")
});

// A wrapper for `axum::extract::Path` that answers with a JSON 404 if the path is rejected.
pub struct Path<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for Path<T>
where
    // derive the `FromRequestParts` implementation for `axum::extract::Path` for the type `T`.
    axum::extract::Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    T: Send,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Path::<T>::from_request_parts(parts, state).await {
            Ok(value) => Ok(Self(value.0)),
            Err(rejection) => {
                warn!("parse path rejection: {:?}", rejection);
                Err(Error::NotFound(format!("resource {}", parts.uri.path())))
            }
        }
    }
}

// A wrapper for `axum::extract::Query` that turns a malformed query string into a
// validation error.
pub struct Query<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for Query<T>
where
    axum::extract::Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    T: Send,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Query::<T>::from_request_parts(parts, state).await {
            Ok(value) => Ok(Self(value.0)),
            Err(rejection) => {
                warn!("parse query rejection: {:?}", rejection);
                Err(Error::Validation(format!(
                    "invalid query string: {}",
                    rejection.body_text()
                )))
            }
        }
    }
}

// A wrapper for `axum::Json` that turns a malformed body into a validation error.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(value) => Ok(Self(value.0)),
            Err(rejection) => {
                warn!("parse json rejection: {:?}", rejection);
                Err(Error::Validation(format!(
                    "invalid request body: {}",
                    rejection.body_text()
                )))
            }
        }
    }
}

/// A requested page, already clamped to sane bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, per_page: Option<i64>, default_per_page: u32, max_per_page: u32) -> Self {
        let max_per_page = i64::from(max_per_page.max(1));
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(i64::from(default_per_page))
                .clamp(1, max_per_page),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    // ceiling division, zero items means zero pages.
    pub fn total_pages(&self, total: i64) -> i64 {
        (total + self.per_page - 1) / self.per_page
    }
}

/// A calendar month addressed by an archive token such as `2025年11月`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArchiveMonth {
    year: i32,
    month: u32,
}

impl ArchiveMonth {
    pub fn parse(token: &str) -> Option<Self> {
        let captures = ARCHIVE_TOKEN.captures(token)?;
        let year = captures[1].parse().ok()?;
        let month = captures[2].parse().ok()?;
        if !(1..=12).contains(&month) {
            return None;
        }
        Some(Self { year, month })
    }

    pub fn of(datetime: &DateTime<Utc>) -> Self {
        Self {
            year: datetime.year(),
            month: datetime.month(),
        }
    }

    // the `YYYY-MM` key used when filtering.
    pub fn key(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    // the month must stay zero-padded so that sorting labels as strings is chronological.
    pub fn label(&self) -> String {
        format!("{:04}年{:02}月", self.year, self.month)
    }

    /// Returns the half-open `[start, end)` range covering the month.
    pub fn bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        let start = NaiveDate::from_ymd_opt(self.year, self.month, 1)?.and_hms_opt(0, 0, 0)?;
        let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)?.and_hms_opt(0, 0, 0)?;
        Some((Utc.from_utc_datetime(&start), Utc.from_utc_datetime(&end)))
    }
}

// Trim the tags, drop the blank ones and remove duplicates while keeping the first occurrence.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(|tag| tag.as_ref().trim())
        .filter(|tag| !tag.is_empty() && seen.insert(*tag))
        .map(str::to_string)
        .collect()
}

// Build a `LIKE` pattern matching `query` as a literal substring. Only ASCII is folded
// since SQLite's `LOWER` leaves other characters untouched.
pub fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.to_ascii_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub fn serialize_date<S: Serializer>(datetime: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&datetime.format("%Y-%m-%d"))
}

pub fn serialize_datetime<S: Serializer>(
    datetime: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&datetime.format("%Y-%m-%d %H:%M:%S"))
}
