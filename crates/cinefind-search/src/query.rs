//! Translation between `SearchCriteria` and TMDB request descriptors.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use cinefind_api::tmdb::{Endpoint, GenreId, RequestDescriptor};

use crate::criteria::{SearchCriteria, VoteThreshold, YearFilter};
use crate::error::{Result, SearchError};
use crate::genres::GenreCatalog;

/// Highest page TMDB serves for any listing.
pub const MAX_PAGE: u32 = 500;

/// Language used when none is configured.
pub const DEFAULT_LANGUAGE: &str = "en-US";

const LANGUAGE: &str = "language";
const QUERY: &str = "query";
const PRIMARY_RELEASE_YEAR: &str = "primary_release_year";
const RELEASE_DATE_GTE: &str = "primary_release_date.gte";
const RELEASE_DATE_LTE: &str = "primary_release_date.lte";
const WITH_GENRES: &str = "with_genres";
const VOTE_AVERAGE_GTE: &str = "vote_average.gte";
const PAGE: &str = "page";

/// Builds descriptors for the four TMDB operations the engine uses.
///
/// Parameters are always emitted in the same order, so equal criteria give
/// equal descriptors:
/// `language, query, primary_release_year, primary_release_date.gte,
/// primary_release_date.lte, with_genres, vote_average.gte, page`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryBuilder {
    language: String,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE)
    }
}

impl QueryBuilder {
    /// Creates a builder that tags every request with `language`.
    #[must_use]
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }

    /// Configured language.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Translates criteria into a title-search or discovery descriptor.
    ///
    /// A year range cannot be expressed by title search and is dropped there.
    ///
    /// # Errors
    ///
    /// - `InvalidCriteria` when the page is outside `1..=MAX_PAGE` or a year
    ///   is out of bounds.
    /// - `UnknownGenre` when a genre id is not in `catalog`.
    pub fn build(
        &self,
        criteria: &SearchCriteria,
        catalog: &GenreCatalog,
    ) -> Result<RequestDescriptor> {
        check_page(criteria.page)?;
        criteria.years.validate()?;

        if let Some(title) = criteria.title_query() {
            let mut descriptor = RequestDescriptor::new(Endpoint::SearchMovie)
                .param(LANGUAGE, self.language.as_str())
                .param(QUERY, title);
            match criteria.years {
                YearFilter::Single(year) => {
                    descriptor = descriptor.param(PRIMARY_RELEASE_YEAR, year.to_string());
                }
                YearFilter::Range { .. } => {
                    tracing::debug!(years = %criteria.years, "year range ignored for title search");
                }
                YearFilter::None => {}
            }
            return Ok(descriptor.param(PAGE, criteria.page.to_string()));
        }

        let mut descriptor =
            RequestDescriptor::new(Endpoint::Discover).param(LANGUAGE, self.language.as_str());

        match criteria.years {
            YearFilter::None => {}
            YearFilter::Single(year) => {
                descriptor = descriptor.param(PRIMARY_RELEASE_YEAR, year.to_string());
            }
            YearFilter::Range { min, max } => {
                if let Some(year) = min {
                    descriptor = descriptor.param(RELEASE_DATE_GTE, format!("{year:04}-01-01"));
                }
                if let Some(year) = max {
                    descriptor = descriptor.param(RELEASE_DATE_LTE, format!("{year:04}-12-31"));
                }
            }
        }

        if !criteria.genre_ids.is_empty() {
            if let Some(unknown) = criteria
                .genre_ids
                .iter()
                .find(|id| !catalog.contains_id(**id))
            {
                return Err(SearchError::UnknownGenre {
                    name: unknown.to_string(),
                });
            }
            let joined = criteria
                .genre_ids
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            descriptor = descriptor.param(WITH_GENRES, joined);
        }

        if let Some(threshold) = criteria.min_vote_average {
            descriptor = descriptor.param(VOTE_AVERAGE_GTE, threshold.to_string());
        }

        Ok(descriptor.param(PAGE, criteria.page.to_string()))
    }

    /// Descriptor for one page of the popular catalog.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCriteria` when `page` is outside `1..=MAX_PAGE`.
    pub fn popular(&self, page: u32) -> Result<RequestDescriptor> {
        check_page(page)?;
        Ok(RequestDescriptor::new(Endpoint::Popular)
            .param(LANGUAGE, self.language.as_str())
            .param(PAGE, page.to_string()))
    }

    /// Descriptor for the genre dictionary.
    #[must_use]
    pub fn genre_list(&self) -> RequestDescriptor {
        RequestDescriptor::new(Endpoint::GenreList).param(LANGUAGE, self.language.as_str())
    }

    /// Recovers criteria from a title-search or discovery descriptor.
    ///
    /// Release dates are reduced to their year. A missing `page` reads as 1.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCriteria` for other endpoints or malformed values.
    pub fn parse(&self, descriptor: &RequestDescriptor) -> Result<SearchCriteria> {
        match descriptor.endpoint() {
            Endpoint::SearchMovie | Endpoint::Discover => {}
            other => {
                return Err(SearchError::invalid(format!(
                    "{other} does not carry search criteria"
                )));
            }
        }

        let title = descriptor.get(QUERY).unwrap_or_default().to_owned();

        let years = if let Some(year) = descriptor.get(PRIMARY_RELEASE_YEAR) {
            let single = YearFilter::Single(parse_year(year)?);
            single.validate()?;
            single
        } else {
            let min = descriptor
                .get(RELEASE_DATE_GTE)
                .map(parse_date_bound)
                .transpose()?;
            let max = descriptor
                .get(RELEASE_DATE_LTE)
                .map(parse_date_bound)
                .transpose()?;
            YearFilter::range(min, max)?
        };

        let genre_ids = descriptor
            .get(WITH_GENRES)
            .map(parse_genre_list)
            .transpose()?
            .unwrap_or_default();

        let min_vote_average = match descriptor.get(VOTE_AVERAGE_GTE) {
            Some(raw) => VoteThreshold::parse(raw)?,
            None => None,
        };

        let page = match descriptor.get(PAGE) {
            Some(raw) => raw
                .parse()
                .map_err(|_| SearchError::invalid(format!("'{raw}' is not a valid page")))?,
            None => 1,
        };

        Ok(SearchCriteria {
            title,
            years,
            min_vote_average,
            genre_ids,
            page,
        })
    }
}

fn check_page(page: u32) -> Result<()> {
    if (1..=MAX_PAGE).contains(&page) {
        Ok(())
    } else {
        Err(SearchError::invalid(format!(
            "page {page} must be between 1 and {MAX_PAGE}"
        )))
    }
}

fn parse_year(raw: &str) -> Result<u16> {
    raw.parse()
        .map_err(|_| SearchError::invalid(format!("'{raw}' is not a valid year")))
}

/// Year of a `YYYY` or `YYYY-MM-DD` bound; month and day are discarded.
fn parse_date_bound(raw: &str) -> Result<u16> {
    if raw.len() == 4 {
        return parse_year(raw);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .filter(|_| raw.len() == 10)
        .and_then(|date| u16::try_from(date.year()).ok())
        .ok_or_else(|| SearchError::invalid(format!("'{raw}' is not a YYYY-MM-DD date")))
}

fn parse_genre_list(raw: &str) -> Result<BTreeSet<GenreId>> {
    raw.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            part.parse()
                .map_err(|_| SearchError::invalid(format!("'{part}' is not a genre id")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use cinefind_api::tmdb::GenreListResponse;

    use super::*;

    fn catalog() -> GenreCatalog {
        let json = include_str!("../../../fixtures/tmdb/genre_movie_list.json");
        let response: GenreListResponse = serde_json::from_str(json).unwrap();
        GenreCatalog::from_genres(response.genres)
    }

    fn vote(raw: &str) -> Option<VoteThreshold> {
        VoteThreshold::parse(raw).unwrap()
    }

    #[test]
    fn test_discover_scenario_query_string() {
        // Arrange
        let catalog = catalog();
        let criteria = SearchCriteria::new()
            .with_years(YearFilter::parse_range("2000", "2010").unwrap())
            .with_genre_names(&catalog, ["action"])
            .unwrap()
            .with_min_vote(vote("7"));

        // Act
        let descriptor = QueryBuilder::default().build(&criteria, &catalog).unwrap();

        // Assert
        assert_eq!(descriptor.endpoint(), Endpoint::Discover);
        assert_eq!(
            descriptor.query_string(),
            "language=en-US&primary_release_date.gte=2000-01-01&primary_release_date.lte=2010-12-31&with_genres=28&vote_average.gte=7&page=1"
        );
    }

    #[test]
    fn test_title_search_ignores_genres_and_vote() {
        // Arrange
        let catalog = catalog();
        let builder = QueryBuilder::default();
        let year_filters = [
            YearFilter::None,
            YearFilter::Single(1999),
            YearFilter::range(Some(2000), None).unwrap(),
            YearFilter::range(None, Some(2010)).unwrap(),
            YearFilter::range(Some(2000), Some(2010)).unwrap(),
        ];
        let genre_sets: [&[GenreId]; 3] = [
            &[],
            &[GenreId(28)],
            &[GenreId(12), GenreId(16), GenreId(35)],
        ];
        let votes = [None, vote("0"), vote("6.5"), vote("10")];

        for years in year_filters {
            for genres in genre_sets {
                for min_vote in votes {
                    let criteria = SearchCriteria::new()
                        .with_title("The Matrix")
                        .with_years(years)
                        .with_genre_ids(genres.iter().copied())
                        .with_min_vote(min_vote);

                    // Act
                    let descriptor = builder.build(&criteria, &catalog).unwrap();

                    // Assert
                    assert_eq!(descriptor.endpoint(), Endpoint::SearchMovie);
                    assert!(!descriptor.contains("with_genres"));
                    assert!(!descriptor.contains("vote_average.gte"));
                }
            }
        }
    }

    #[test]
    fn test_title_search_query_string() {
        // Arrange
        let catalog = catalog();
        let criteria = SearchCriteria::new()
            .with_title("The Matrix")
            .with_years(YearFilter::Single(1999))
            .with_genre_ids([GenreId(28), GenreId(878)])
            .with_min_vote(vote("8"))
            .with_page(2);

        // Act
        let descriptor = QueryBuilder::default().build(&criteria, &catalog).unwrap();

        // Assert
        assert_eq!(
            descriptor.query_string(),
            "language=en-US&query=The+Matrix&primary_release_year=1999&page=2"
        );
    }

    #[test]
    fn test_title_search_drops_year_range() {
        // Arrange
        let catalog = catalog();
        let criteria = SearchCriteria::new()
            .with_title("Alien")
            .with_years(YearFilter::parse_range("1979", "1986").unwrap());

        // Act
        let descriptor = QueryBuilder::default().build(&criteria, &catalog).unwrap();

        // Assert
        assert!(!descriptor.contains("primary_release_year"));
        assert!(!descriptor.contains("primary_release_date.gte"));
        assert!(!descriptor.contains("primary_release_date.lte"));
    }

    #[test]
    fn test_discover_single_year() {
        // Arrange
        let catalog = catalog();
        let criteria = SearchCriteria::new().with_years(YearFilter::Single(1999));

        // Act
        let descriptor = QueryBuilder::new("fr-FR")
            .build(&criteria, &catalog)
            .unwrap();

        // Assert
        assert_eq!(
            descriptor.query_string(),
            "language=fr-FR&primary_release_year=1999&page=1"
        );
    }

    #[test]
    fn test_discover_open_range_emits_one_bound() {
        // Arrange
        let catalog = catalog();
        let criteria =
            SearchCriteria::new().with_years(YearFilter::parse_range("", "1980").unwrap());

        // Act
        let descriptor = QueryBuilder::default().build(&criteria, &catalog).unwrap();

        // Assert
        assert!(!descriptor.contains("primary_release_date.gte"));
        assert_eq!(
            descriptor.get("primary_release_date.lte"),
            Some("1980-12-31")
        );
    }

    #[test]
    fn test_empty_discover_is_not_rejected() {
        // Arrange
        let catalog = catalog();

        // Act
        let descriptor = QueryBuilder::default()
            .build(&SearchCriteria::new(), &catalog)
            .unwrap();

        // Assert
        assert_eq!(descriptor.query_string(), "language=en-US&page=1");
    }

    #[test]
    fn test_genre_ids_are_sorted_and_joined() {
        // Arrange
        let catalog = catalog();
        let criteria =
            SearchCriteria::new().with_genre_ids([GenreId(878), GenreId(12), GenreId(28)]);

        // Act
        let descriptor = QueryBuilder::default().build(&criteria, &catalog).unwrap();

        // Assert
        assert_eq!(descriptor.get("with_genres"), Some("12,28,878"));
    }

    #[test]
    fn test_unknown_genre_id_is_rejected() {
        // Arrange
        let catalog = catalog();
        let criteria = SearchCriteria::new().with_genre_ids([GenreId(28), GenreId(4242)]);

        // Act
        let result = QueryBuilder::default().build(&criteria, &catalog);

        // Assert
        assert!(matches!(
            result,
            Err(SearchError::UnknownGenre { ref name }) if name == "4242"
        ));
    }

    #[test]
    fn test_page_bounds() {
        // Arrange
        let catalog = catalog();
        let builder = QueryBuilder::default();
        let base = SearchCriteria::new().with_years(YearFilter::Single(2000));

        // Act & Assert
        assert!(matches!(
            builder.build(&base.clone().with_page(0), &catalog),
            Err(SearchError::InvalidCriteria { .. })
        ));
        assert!(builder.build(&base.clone().with_page(MAX_PAGE), &catalog).is_ok());
        assert!(matches!(
            builder.build(&base.with_page(MAX_PAGE + 1), &catalog),
            Err(SearchError::InvalidCriteria { .. })
        ));
        assert!(builder.popular(0).is_err());
    }

    #[test]
    fn test_hand_built_invalid_year_is_rejected() {
        // Arrange
        let catalog = catalog();
        let criteria = SearchCriteria::new().with_years(YearFilter::Range {
            min: Some(2010),
            max: Some(2000),
        });

        // Act
        let result = QueryBuilder::default().build(&criteria, &catalog);

        // Assert
        assert!(matches!(result, Err(SearchError::InvalidCriteria { .. })));
    }

    #[test]
    fn test_parse_reverses_build_for_discover() {
        // Arrange
        let catalog = catalog();
        let builder = QueryBuilder::default();
        let year_filters = [
            YearFilter::None,
            YearFilter::Single(1999),
            YearFilter::range(Some(2000), None).unwrap(),
            YearFilter::range(None, Some(2010)).unwrap(),
            YearFilter::range(Some(2000), Some(2010)).unwrap(),
        ];
        let genre_sets: [&[GenreId]; 3] = [
            &[],
            &[GenreId(28)],
            &[GenreId(12), GenreId(16), GenreId(35)],
        ];
        let votes = [None, vote("0"), vote("6.5"), vote("10")];

        for years in year_filters {
            for genres in genre_sets {
                for min_vote in votes {
                    let criteria = SearchCriteria::new()
                        .with_years(years)
                        .with_genre_ids(genres.iter().copied())
                        .with_min_vote(min_vote)
                        .with_page(3);

                    // Act
                    let parsed = builder
                        .parse(&builder.build(&criteria, &catalog).unwrap())
                        .unwrap();

                    // Assert
                    assert_eq!(parsed, criteria);
                }
            }
        }
    }

    #[test]
    fn test_parse_title_search() {
        // Arrange
        let catalog = catalog();
        let builder = QueryBuilder::default();
        let criteria = SearchCriteria::new()
            .with_title("Spirited Away")
            .with_years(YearFilter::Single(2001));

        // Act
        let parsed = builder
            .parse(&builder.build(&criteria, &catalog).unwrap())
            .unwrap();

        // Assert
        assert_eq!(parsed, criteria);
    }

    #[test]
    fn test_parse_strips_month_and_day() {
        // Arrange
        let descriptor = RequestDescriptor::new(Endpoint::Discover)
            .param("primary_release_date.gte", "1995-06-15")
            .param("page", "2");

        // Act
        let criteria = QueryBuilder::default().parse(&descriptor).unwrap();

        // Assert
        assert_eq!(
            criteria.years,
            YearFilter::Range {
                min: Some(1995),
                max: None
            }
        );
        assert_eq!(criteria.page, 2);
    }

    #[test]
    fn test_parse_rejects_trailing_text_after_year() {
        // Arrange
        let builder = QueryBuilder::default();
        let descriptors = [
            RequestDescriptor::new(Endpoint::Discover).param("primary_release_year", "19991"),
            RequestDescriptor::new(Endpoint::Discover).param("primary_release_year", "1999-05"),
            RequestDescriptor::new(Endpoint::Discover)
                .param("primary_release_date.gte", "2000garbage"),
            RequestDescriptor::new(Endpoint::Discover)
                .param("primary_release_date.lte", "2010-13-01"),
            RequestDescriptor::new(Endpoint::Discover)
                .param("primary_release_date.lte", "2010-1-1"),
        ];

        for descriptor in &descriptors {
            // Act
            let result = builder.parse(descriptor);

            // Assert
            assert!(
                matches!(result, Err(SearchError::InvalidCriteria { .. })),
                "accepted {descriptor}"
            );
        }
    }

    #[test]
    fn test_parse_accepts_bare_year_bound() {
        // Arrange
        let descriptor =
            RequestDescriptor::new(Endpoint::Discover).param("primary_release_date.lte", "2004");

        // Act
        let criteria = QueryBuilder::default().parse(&descriptor).unwrap();

        // Assert
        assert_eq!(
            criteria.years,
            YearFilter::Range {
                min: None,
                max: Some(2004)
            }
        );
    }

    #[test]
    fn test_parse_rejects_genre_list_endpoint() {
        // Arrange
        let builder = QueryBuilder::default();

        // Act
        let result = builder.parse(&builder.genre_list());

        // Assert
        assert!(matches!(result, Err(SearchError::InvalidCriteria { .. })));
    }

    #[test]
    fn test_popular_and_genre_list_descriptors() {
        // Arrange
        let builder = QueryBuilder::default();

        // Act
        let popular = builder.popular(4).unwrap();
        let genres = builder.genre_list();

        // Assert
        assert_eq!(popular.to_string(), "movie/popular?language=en-US&page=4");
        assert_eq!(genres.to_string(), "genre/movie/list?language=en-US");
    }
}
