use crate::tokenizer::label_token;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Contributors beyond this many (in billing order) are left out of the document.
    pub max_contributors: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self { Self { max_contributors: 3 } }
}

/// Builds the token document a catalog item is vectorized from.
#[derive(Debug, Clone, Default)]
pub struct FeatureBuilder {
    config: FeatureConfig,
}

impl FeatureBuilder {
    pub fn new(config: FeatureConfig) -> Self { Self { config } }

    pub fn config(&self) -> &FeatureConfig { &self.config }

    /// Genre tokens, then the leading contributors, then the decade bucket.
    /// Tokens are verbatim labels so exact genre and director matches dominate.
    pub fn build<G, C>(&self, genres: &[G], contributors: &[C], release_year: Option<i32>) -> String
    where
        G: AsRef<str>,
        C: AsRef<str>,
    {
        let genre_tokens = genres.iter().map(|g| label_token(g.as_ref()));
        let contributor_tokens = contributors
            .iter()
            .map(|c| label_token(c.as_ref()))
            .filter(|t| !t.is_empty())
            .take(self.config.max_contributors);
        let decade = release_year.map(decade_token);

        genre_tokens
            .chain(contributor_tokens)
            .chain(decade)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub fn decade_token(year: i32) -> String {
    year.div_euclid(10).saturating_mul(10).to_string()
}
