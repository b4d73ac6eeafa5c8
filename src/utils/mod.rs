mod maths_utils;
mod perf;
mod time_utils;

pub use time_utils::{
    TimeUtils, date_to_epoch_ms, epoch_ms_to_date_string, now_timestamp_ms, parse_timestamp_ms,
};

pub use maths_utils::{linspace, mean_and_stddev, rolling_mean};
pub(crate) use maths_utils::argmax;
