use std::fmt::Debug;
use std::time::Duration;

/// A success/failure counter.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuccessRate {
    pub success: usize,
    pub fail: usize,
}

impl SuccessRate {
    pub fn record(&mut self, success: bool) {
        if success {
            self.success += 1;
        } else {
            self.fail += 1;
        }
    }
}

#[allow(unused)]
#[derive(Debug, Default)]
pub struct Statistic {
    pub num_expand: usize,
    pub num_blocked: usize,
    pub num_reachable: usize,
    pub num_lemmas: usize,
    pub num_reach_facts: usize,
    pub num_oracle_queries: usize,

    pub fact_cover: SuccessRate,
    pub gen_drop: SuccessRate,
    pub gen_widen: SuccessRate,
    pub push: SuccessRate,
    pub ctp_skip: SuccessRate,

    pub block_time: Duration,
    pub propagate_time: Duration,
}
