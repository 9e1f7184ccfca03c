use crate::core::ledger::ValidationConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructConfig {
    /// Continue from the persisted ledger and checkpoint when present.
    pub resume: bool,
    /// Consecutive duplicate-id deferrals tolerated for one pending change.
    pub max_collision_retries: u32,
    /// Stop scanning after this many commits in one run.
    pub max_commits: Option<u64>,
    pub validation: ValidationConfig,
}

impl Default for ReconstructConfig {
    fn default() -> Self {
        Self {
            resume: true,
            max_collision_retries: 16,
            max_commits: None,
            validation: ValidationConfig::default(),
        }
    }
}

impl ReconstructConfig {
    /// Ignore persisted state and start from the first frame.
    pub fn fresh() -> Self {
        Self {
            resume: false,
            ..Self::default()
        }
    }
}
