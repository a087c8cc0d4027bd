//! Local re-filtering of an already fetched batch.

use cinefind_api::tmdb::Movie;

use crate::criteria::{SearchCriteria, YearFilter};

/// Applies search criteria to movies in memory.
///
/// Title, year, genre and vote predicates are ANDed; an empty criterion
/// matches everything.
#[derive(Debug, Clone, Copy)]
pub struct MovieFilterer<'a> {
    criteria: &'a SearchCriteria,
}

impl<'a> MovieFilterer<'a> {
    /// Filterer bound to `criteria`.
    #[must_use]
    pub const fn new(criteria: &'a SearchCriteria) -> Self {
        Self { criteria }
    }

    /// Keeps the movies that satisfy every criterion, in input order.
    #[must_use]
    pub fn filter(&self, movies: impl IntoIterator<Item = Movie>) -> Vec<Movie> {
        movies.into_iter().filter(|movie| self.matches(movie)).collect()
    }

    /// Whether `movie` satisfies every criterion.
    #[must_use]
    pub fn matches(&self, movie: &Movie) -> bool {
        self.title_matches(movie)
            && self.year_matches(movie)
            && self.genre_matches(movie)
            && self.vote_matches(movie)
    }

    fn title_matches(&self, movie: &Movie) -> bool {
        let Some(needle) = self.criteria.title_query() else {
            return true;
        };
        let needle = needle.to_lowercase();
        movie.original_title.to_lowercase().contains(&needle)
            || movie.title.to_lowercase().contains(&needle)
    }

    fn year_matches(&self, movie: &Movie) -> bool {
        match self.criteria.years {
            YearFilter::None => true,
            YearFilter::Single(year) => movie
                .release_date
                .as_deref()
                .is_some_and(|date| date.starts_with(&year.to_string())),
            range @ YearFilter::Range { .. } => movie
                .release_year()
                .is_some_and(|year| range.contains(year)),
        }
    }

    fn genre_matches(&self, movie: &Movie) -> bool {
        self.criteria.genre_ids.is_empty()
            || movie
                .genre_ids
                .iter()
                .any(|id| self.criteria.genre_ids.contains(id))
    }

    fn vote_matches(&self, movie: &Movie) -> bool {
        self.criteria
            .min_vote_average
            .is_none_or(|threshold| movie.vote_average >= threshold.value())
    }
}
