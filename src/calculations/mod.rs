pub mod backward_pass;
pub mod critical_path;
pub mod forward_pass;

use crate::dependency::DependencyType;
use crate::graph::Link;

/// Lag actually applied to an edge; buffer days only extend finish-to-start links.
pub(crate) fn effective_lag(link: &Link, buffer_days: i64) -> i64 {
    match link.kind {
        DependencyType::FinishToStart => link.lag + buffer_days,
        _ => link.lag,
    }
}
