//! Superseding search requests.
//!
//! Every search gets a generation number and a cancellation token. Starting
//! a new search cancels the previous token, so a slow earlier search can
//! never overwrite the results of a later one.

use rabbithole_core::{Conversation, ConversationRepository, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A search that has been started but not yet run.
pub struct SearchRequest {
    generation: u64,
    query: String,
    token: CancellationToken,
    repository: Arc<dyn ConversationRepository>,
}

impl SearchRequest {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Run against the repository, stopping early if superseded.
    pub async fn run(self) -> SearchOutcome {
        let repository = self.repository;
        let query = self.query;

        tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                debug!("Search #{} for '{}' cancelled", self.generation, query);
                SearchOutcome::Cancelled { generation: self.generation }
            }
            result = repository.search(&query) => SearchOutcome::Completed {
                generation: self.generation,
                query,
                result,
            },
        }
    }
}

#[derive(Debug)]
pub enum SearchOutcome {
    Completed {
        generation: u64,
        query: String,
        result: Result<Vec<Conversation>>,
    },
    Cancelled {
        generation: u64,
    },
}

impl SearchOutcome {
    pub fn generation(&self) -> u64 {
        match self {
            SearchOutcome::Completed { generation, .. } => *generation,
            SearchOutcome::Cancelled { generation } => *generation,
        }
    }
}

/// Hands out search requests and remembers which one is current.
#[derive(Debug, Default)]
pub struct SearchCoordinator {
    generation: u64,
    in_flight: Option<CancellationToken>,
}

impl SearchCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(
        &mut self,
        query: impl Into<String>,
        repository: Arc<dyn ConversationRepository>,
    ) -> SearchRequest {
        self.cancel();

        let token = CancellationToken::new();
        self.in_flight = Some(token.clone());

        SearchRequest {
            generation: self.generation,
            query: query.into(),
            token,
            repository,
        }
    }

    /// Cancel whatever is in flight; its outcome will be ignored.
    pub fn cancel(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        self.generation += 1;
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.in_flight.is_some() && generation == self.generation
    }

    /// Mark `generation` as finished. Returns whether it was still current.
    pub fn finish(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.in_flight = None;
        true
    }
}
