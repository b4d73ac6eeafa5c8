// Detection, features, threshold search and overlays
pub mod directional_change;
pub mod features;
pub mod regime_summary;
pub mod supertrend;
pub mod threshold_selector;

pub use directional_change::{DirectionalChangeDetector, change_count, dc_indicator, detect};
pub use features::{build_observations, event_log_returns, log_returns, simple_returns};
pub use regime_summary::{RegimeStats, aligned_directions, summarize_regimes};
pub use supertrend::{SupertrendPoint, TrendDirection, supertrend};
pub use threshold_selector::{CandidateScore, Selection, ThresholdSelector};
