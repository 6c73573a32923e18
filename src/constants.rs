/// Constants used by quota allocation.
pub mod allocator {
    /// Default number of top-ranked clusters considered by the capped policy.
    ///
    /// The per-cluster quota is derived from this cap (`budget / cap`), not
    /// from the number of clusters actually present.
    pub const DEFAULT_CLUSTER_CAP: usize = 100;
}

/// Constants used by configuration defaults.
pub mod config {
    /// Default RNG seed.
    pub const DEFAULT_SEED: u64 = 42;
    /// Default number of examples labeled per incremental round.
    pub const DEFAULT_BUDGET: usize = 1000;
    /// Default number of examples labeled in round zero.
    pub const DEFAULT_INITIAL_SIZE: usize = 1000;
    /// Default mini-batch size for the ordered inference pass.
    pub const DEFAULT_INFERENCE_BATCH_SIZE: usize = 128;
}

/// Constants used by the round driver.
pub mod engine {
    /// Offset mixed into per-round RNG seed derivation.
    pub const ROUND_SEED_OFFSET: u64 = 0xA11C_0DE5;
    /// Round index that seeds the labeled set.
    pub const FIRST_ROUND: usize = 0;
}

/// Constants used by pool snapshots and the round log.
pub mod persistence {
    /// Version tag written into every pool snapshot.
    pub const SNAPSHOT_VERSION: u8 = 1;
    /// Suffix of the temporary file used for atomic snapshot writes.
    pub const SNAPSHOT_TMP_SUFFIX: &str = "tmp";
    /// Default filename for the JSON-lines round log.
    pub const DEFAULT_ROUND_LOG_FILENAME: &str = "rounds.jsonl";
}

/// Constants used by the synthetic score provider.
pub mod synthetic {
    /// Seed salt for synthetic cluster assignment.
    pub const CLUSTER_SALT: u64 = 0xC1A5_7E25;
    /// Seed salt for synthetic scores.
    pub const SCORE_SALT: u64 = 0x5C0F_E5ED;
}
