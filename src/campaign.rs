//! Winner collection across repeated genetic searches.
//!
//! A campaign runs the genetic search from scratch over and over. Every
//! result scoring at least `min_winner_score` is appended to the store's
//! start file and offered as the new best. Once the store holds
//! `winner_count` starts, one last search seeded with all of them (the
//! champion run) is recorded the same way.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};
use rand::Rng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::archive::{ArchiveError, FieldStore};
use crate::field::{Field, Workspace};
use crate::ga::{GeneticConfig, GeneticResult, GeneticRunner};
use crate::random::rng_from_seed;

/// Configuration for a campaign.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CampaignConfig {
    /// Stored starts required before the champion run.
    pub winner_count: usize,

    /// Minimum score for a search result to count as a winner.
    pub min_winner_score: u64,

    /// Search attempts before giving up. 0 = unbounded.
    pub max_attempts: usize,

    /// Configuration of every search, champion included. Its seed, if any,
    /// seeds the campaign's generator.
    pub genetic: GeneticConfig,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            winner_count: 20,
            min_winner_score: 100_000,
            max_attempts: 0,
            genetic: GeneticConfig::default(),
        }
    }
}

impl CampaignConfig {
    pub fn with_winner_count(mut self, n: usize) -> Self {
        self.winner_count = n;
        self
    }

    pub fn with_min_winner_score(mut self, score: u64) -> Self {
        self.min_winner_score = score;
        self
    }

    pub fn with_max_attempts(mut self, n: usize) -> Self {
        self.max_attempts = n;
        self
    }

    pub fn with_genetic(mut self, genetic: GeneticConfig) -> Self {
        self.genetic = genetic;
        self
    }

    /// Validates the configuration.
    ///
    /// Returns `Err` with a description if any parameter is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.winner_count == 0 {
            return Err("winner_count must be at least 1".into());
        }
        self.genetic.validate()
    }
}

/// Result of a campaign.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CampaignResult {
    /// Searches run, the champion excluded.
    pub attempts: usize,

    /// Scores of the winners found by this campaign, in order.
    pub winner_scores: Vec<u64>,

    /// Starts in the store when the campaign ended.
    pub stored_starts: usize,

    /// The champion run, if the store reached `winner_count` starts.
    pub champion: Option<GeneticResult>,

    /// Best stored field when the campaign ended.
    pub best: Option<Field>,

    /// Whether the campaign was cancelled externally.
    pub cancelled: bool,
}

/// Runs campaigns against a [`FieldStore`].
pub struct Campaign;

impl Campaign {
    /// Runs a campaign with a generator built from `config.genetic.seed`.
    ///
    /// # Panics
    /// Panics if the configuration is invalid or the store and workspace
    /// extents differ.
    pub fn run(
        store: &FieldStore,
        workspace: &mut Workspace,
        config: &CampaignConfig,
    ) -> Result<CampaignResult, ArchiveError> {
        Self::run_with_cancel(store, workspace, config, None)
    }

    /// Runs a campaign with an optional cancellation token, checked before
    /// every search and forwarded into it.
    pub fn run_with_cancel(
        store: &FieldStore,
        workspace: &mut Workspace,
        config: &CampaignConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<CampaignResult, ArchiveError> {
        let mut rng = rng_from_seed(config.genetic.seed);
        Self::run_with_rng(store, workspace, config, &mut rng, cancel.as_deref())
    }

    /// Runs a campaign drawing from a caller-owned generator.
    pub fn run_with_rng<R: Rng>(
        store: &FieldStore,
        workspace: &mut Workspace,
        config: &CampaignConfig,
        rng: &mut R,
        cancel: Option<&AtomicBool>,
    ) -> Result<CampaignResult, ArchiveError> {
        config.validate().expect("invalid CampaignConfig");
        assert_eq!(
            store.dims(),
            workspace.dims(),
            "store extent does not match the workspace"
        );

        let mut stored_starts = store.read_starts(workspace)?.len();
        let mut winner_scores = Vec::new();
        let mut attempts = 0usize;
        let mut cancelled = false;

        info!(
            "campaign: {stored_starts}/{} starts stored, winners need {}",
            config.winner_count, config.min_winner_score
        );

        while stored_starts < config.winner_count {
            if config.max_attempts > 0 && attempts >= config.max_attempts {
                warn!("campaign gave up after {attempts} attempts");
                break;
            }
            if is_cancelled(cancel) {
                cancelled = true;
                break;
            }

            attempts += 1;
            let result = GeneticRunner::run_with_rng(workspace, &[], &config.genetic, rng, cancel);
            if result.cancelled {
                cancelled = true;
                break;
            }

            if result.best_score >= config.min_winner_score {
                record(store, workspace, &result.best)?;
                stored_starts += 1;
                winner_scores.push(result.best_score);
                info!(
                    "attempt {attempts}: winner {} ({stored_starts}/{})",
                    result.best_score, config.winner_count
                );
            } else {
                info!("attempt {attempts}: {} below threshold", result.best_score);
            }
        }

        let mut champion = None;
        if !cancelled && stored_starts >= config.winner_count {
            let starts = store.read_starts(workspace)?;
            info!("champion run from {} starts", starts.len());
            let result = GeneticRunner::run_with_rng(workspace, &starts, &config.genetic, rng, cancel);
            record(store, workspace, &result.best)?;
            info!("champion: {}", result.best_score);
            cancelled = result.cancelled;
            champion = Some(result);
        }

        Ok(CampaignResult {
            attempts,
            winner_scores,
            stored_starts: store.read_starts(workspace)?.len(),
            champion,
            best: store.read_best(workspace)?,
            cancelled,
        })
    }
}

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
}

/// Appends `field` to the starts and offers it as the new best.
fn record(store: &FieldStore, workspace: &mut Workspace, field: &Field) -> Result<(), ArchiveError> {
    store.append_start(field)?;
    if store.offer_best(field, workspace)? {
        info!("new stored best {}", field.score());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Dimensions, RepairStrategy};
    use tempfile::tempdir;

    fn small() -> Dimensions {
        Dimensions::new(7, 9).unwrap()
    }

    fn quick(winners: usize, min_score: u64) -> CampaignConfig {
        CampaignConfig::default()
            .with_winner_count(winners)
            .with_min_winner_score(min_score)
            .with_genetic(
                GeneticConfig::fast()
                    .with_block_size(2)
                    .with_stagnation_limit(2)
                    .with_seed(11),
            )
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_results_are_serializable() {
        fn assert_serde<T: Serialize + for<'de> Deserialize<'de>>() {}
        assert_serde::<CampaignResult>();
        assert_serde::<GeneticResult>();
        assert_serde::<crate::ga::Population>();
        assert_serde::<CampaignConfig>();
    }

    #[test]
    fn test_default_config() {
        let config = CampaignConfig::default();
        assert_eq!(config.winner_count, 20);
        assert_eq!(config.min_winner_score, 100_000);
        assert_eq!(config.max_attempts, 0);
        assert!(config.validate().is_ok());
        assert!(config.with_winner_count(0).validate().is_err());
    }

    #[test]
    fn test_collects_winners_and_champion() {
        let dir = tempdir().unwrap();
        let store = FieldStore::open(dir.path(), small()).unwrap();
        let mut ws = Workspace::new(small(), RepairStrategy::Carve);

        let result = Campaign::run(&store, &mut ws, &quick(2, 1)).unwrap();

        assert_eq!(result.attempts, 2);
        assert_eq!(result.winner_scores.len(), 2);
        assert_eq!(result.stored_starts, 3, "two winners plus the champion");
        assert!(!result.cancelled);

        let champion = result.champion.unwrap();
        let best = result.best.unwrap();
        let top_winner = result.winner_scores.iter().copied().max().unwrap();
        assert!(champion.best_score >= top_winner);
        assert_eq!(best.score(), champion.best_score);
    }

    #[test]
    fn test_resumes_from_stored_starts() {
        let dir = tempdir().unwrap();
        let store = FieldStore::open(dir.path(), small()).unwrap();
        let mut ws = Workspace::new(small(), RepairStrategy::Carve);
        for _ in 0..2 {
            store.append_start(&ws.empty_field()).unwrap();
        }

        let result = Campaign::run(&store, &mut ws, &quick(2, 1)).unwrap();

        assert_eq!(result.attempts, 0);
        assert!(result.winner_scores.is_empty());
        assert!(result.champion.is_some());
        assert_eq!(result.stored_starts, 3);
    }

    #[test]
    fn test_max_attempts_without_winners() {
        let dir = tempdir().unwrap();
        let store = FieldStore::open(dir.path(), small()).unwrap();
        let mut ws = Workspace::new(small(), RepairStrategy::Carve);
        let config = quick(1, u64::MAX).with_max_attempts(2);

        let result = Campaign::run(&store, &mut ws, &config).unwrap();

        assert_eq!(result.attempts, 2);
        assert!(result.winner_scores.is_empty());
        assert!(result.champion.is_none());
        assert!(result.best.is_none());
        assert_eq!(result.stored_starts, 0);
    }

    #[test]
    fn test_cancelled_before_first_attempt() {
        let dir = tempdir().unwrap();
        let store = FieldStore::open(dir.path(), small()).unwrap();
        let mut ws = Workspace::new(small(), RepairStrategy::Carve);
        let cancel = Arc::new(AtomicBool::new(true));

        let result = Campaign::run_with_cancel(&store, &mut ws, &quick(1, 1), Some(cancel)).unwrap();

        assert!(result.cancelled);
        assert_eq!(result.attempts, 0);
        assert!(result.champion.is_none());
    }
}
