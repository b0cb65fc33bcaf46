use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;

use crate::error::{Error, Result};
use crate::models::catalog::Question;
use crate::services::catalog_service::{CatalogService, EligibilityFilter};

/// Picks the question set for a new session from the eligible pool.
#[derive(Clone)]
pub struct QuestionSelector {
    catalog: CatalogService,
}

impl QuestionSelector {
    pub fn new(catalog: CatalogService) -> Self {
        Self { catalog }
    }

    /// Select up to `count` questions for the scope. Fewer eligible questions
    /// than requested is a valid degraded selection; an empty pool is not.
    pub async fn select(&self, filter: &EligibilityFilter, count: usize) -> Result<Vec<Question>> {
        let eligible = self.catalog.find_eligible_questions(filter).await?;
        if eligible.is_empty() {
            return Err(Error::NoQuestionsAvailable(
                "No questions match the requested scope".to_string(),
            ));
        }

        let mut rng = rand::thread_rng();
        Ok(sample_questions(eligible, count, &mut rng))
    }
}

/// Uniform sampling without replacement, then a shuffle so serving order
/// does not leak bank insertion order.
pub fn sample_questions<R: Rng + ?Sized>(
    pool: Vec<Question>,
    count: usize,
    rng: &mut R,
) -> Vec<Question> {
    let mut picked = pool.into_iter().choose_multiple(rng, count);
    picked.shuffle(rng);
    picked
}
