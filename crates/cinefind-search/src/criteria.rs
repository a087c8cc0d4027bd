//! Typed search criteria and the pure validators that produce them.

use std::collections::BTreeSet;
use std::fmt;

use chrono::Datelike;
use cinefind_api::tmdb::GenreId;

use crate::error::{Result, SearchError};
use crate::genres::GenreCatalog;

/// Earliest release year the catalog accepts (first known motion picture).
pub const MIN_ACCEPTABLE_YEAR: u16 = 1874;

/// Latest accepted release year: the current calendar year, evaluated live.
#[must_use]
pub fn max_acceptable_year() -> u16 {
    u16::try_from(chrono::Local::now().year()).unwrap_or(u16::MAX)
}

/// Release-year restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YearFilter {
    /// No year restriction.
    #[default]
    None,
    /// Exactly one release year.
    Single(u16),
    /// Open or closed span; at least one bound is present.
    Range {
        /// Lower bound (inclusive).
        min: Option<u16>,
        /// Upper bound (inclusive).
        max: Option<u16>,
    },
}

impl YearFilter {
    /// Parses a single year. Blank input means no restriction.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCriteria` when the text is not a year within
    /// `MIN_ACCEPTABLE_YEAR..=max_acceptable_year()`.
    pub fn parse_single(raw: &str) -> Result<Self> {
        Ok(parse_year(raw)?.map_or(Self::None, Self::Single))
    }

    /// Parses a year span from two optional bounds. Blank bounds are open.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCriteria` for malformed or out-of-range years, or
    /// when `min > max`.
    pub fn parse_range(min: &str, max: &str) -> Result<Self> {
        Self::range(parse_year(min)?, parse_year(max)?)
    }

    /// Builds a span from typed bounds; both absent normalises to `None`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCriteria` when a bound is out of range or `min > max`.
    pub fn range(min: Option<u16>, max: Option<u16>) -> Result<Self> {
        let filter = match (min, max) {
            (None, None) => Self::None,
            (min, max) => Self::Range { min, max },
        };
        filter.validate()?;
        Ok(filter)
    }

    /// Re-checks bounds on a filter that may have been built by hand.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCriteria` on any year outside the accepted window or
    /// an inverted span.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::None => Ok(()),
            Self::Single(year) => check_year(year),
            Self::Range { min, max } => {
                if let Some(year) = min {
                    check_year(year)?;
                }
                if let Some(year) = max {
                    check_year(year)?;
                }
                match (min, max) {
                    (Some(lo), Some(hi)) if lo > hi => Err(SearchError::invalid(format!(
                        "minimum year {lo} is after maximum year {hi}"
                    ))),
                    _ => Ok(()),
                }
            }
        }
    }

    /// Whether no year restriction applies.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(
            self,
            Self::None | Self::Range {
                min: None,
                max: None
            }
        )
    }

    /// Whether `year` satisfies the filter.
    #[must_use]
    pub fn contains(&self, year: u16) -> bool {
        match *self {
            Self::None => true,
            Self::Single(y) => y == year,
            Self::Range { min, max } => {
                min.is_none_or(|lo| year >= lo) && max.is_none_or(|hi| year <= hi)
            }
        }
    }
}

impl fmt::Display for YearFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::None => f.write_str("any year"),
            Self::Single(year) => write!(f, "{year}"),
            Self::Range { min, max } => {
                if let Some(lo) = min {
                    write!(f, "{lo}")?;
                }
                f.write_str("..")?;
                if let Some(hi) = max {
                    write!(f, "{hi}")?;
                }
                Ok(())
            }
        }
    }
}

fn parse_year(raw: &str) -> Result<Option<u16>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let year: u16 = trimmed
        .parse()
        .map_err(|_| SearchError::invalid(format!("'{trimmed}' is not a valid year")))?;
    check_year(year)?;
    Ok(Some(year))
}

fn check_year(year: u16) -> Result<()> {
    let max = max_acceptable_year();
    if (MIN_ACCEPTABLE_YEAR..=max).contains(&year) {
        Ok(())
    } else {
        Err(SearchError::invalid(format!(
            "year {year} must be between {MIN_ACCEPTABLE_YEAR} and {max}"
        )))
    }
}

/// Minimum vote average on the 0-10 scale.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct VoteThreshold(f64);

impl VoteThreshold {
    /// Highest possible vote average.
    pub const MAX: f64 = 10.0;

    /// Wraps a threshold value.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCriteria` unless `0 <= value <= 10`.
    pub fn new(value: f64) -> Result<Self> {
        if value.is_finite() && (0.0..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(SearchError::invalid(format!(
                "minimum vote {value} must be between 0 and 10"
            )))
        }
    }

    /// Parses a threshold. Blank input means no threshold.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCriteria` for non-numeric or out-of-range input.
    pub fn parse(raw: &str) -> Result<Option<Self>> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let value: f64 = trimmed
            .parse()
            .map_err(|_| SearchError::invalid(format!("'{trimmed}' is not a valid vote")))?;
        Self::new(value).map(Some)
    }

    /// The raw threshold.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for VoteThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything a search is run with.
///
/// A non-blank `title` selects title search and the genre and vote filters
/// are ignored; otherwise the year span, genres and vote threshold are
/// combined into a discovery query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCriteria {
    /// Title text; blank means "not searching by title".
    pub title: String,
    /// Release-year restriction.
    pub years: YearFilter,
    /// Minimum vote average.
    pub min_vote_average: Option<VoteThreshold>,
    /// Genres a movie must intersect.
    pub genre_ids: BTreeSet<GenreId>,
    /// 1-based page to fetch.
    pub page: u32,
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self {
            title: String::new(),
            years: YearFilter::None,
            min_vote_average: None,
            genre_ids: BTreeSet::new(),
            page: 1,
        }
    }
}

impl SearchCriteria {
    /// Empty criteria on page 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the year filter.
    #[must_use]
    pub const fn with_years(mut self, years: YearFilter) -> Self {
        self.years = years;
        self
    }

    /// Sets the minimum vote average.
    #[must_use]
    pub const fn with_min_vote(mut self, threshold: Option<VoteThreshold>) -> Self {
        self.min_vote_average = threshold;
        self
    }

    /// Replaces the genre set with `ids`.
    #[must_use]
    pub fn with_genre_ids(mut self, ids: impl IntoIterator<Item = GenreId>) -> Self {
        self.genre_ids = ids.into_iter().collect();
        self
    }

    /// Replaces the genre set by resolving `names` through `catalog`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownGenre` for the first name the catalog does not know.
    pub fn with_genre_names<I, S>(mut self, catalog: &GenreCatalog, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.genre_ids = catalog.resolve_names(names)?;
        Ok(self)
    }

    /// Sets the page.
    #[must_use]
    pub const fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Trimmed title, or `None` when blank.
    #[must_use]
    pub fn title_query(&self) -> Option<&str> {
        let trimmed = self.title.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Whether these criteria select title search.
    #[must_use]
    pub fn is_title_search(&self) -> bool {
        self.title_query().is_some()
    }

    /// Whether title and every filter are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.is_title_search()
            && self.years.is_none()
            && self.min_vote_average.is_none()
            && self.genre_ids.is_empty()
    }
}
