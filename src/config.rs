use clap::{Args, Parser};

/// hornet CHC engine
#[derive(Parser, Debug, Clone, Default)]
#[command(version, about)]
pub struct Config {
    #[command(flatten)]
    pub pdr: PdrOptions,

    /// random seed
    #[arg(long, default_value_t = 0)]
    pub rseed: u64,
}

#[derive(Args, Clone, Debug)]
pub struct PdrOptions {
    /// max level ceiling before giving up with unknown
    #[arg(long = "pdr-max-level", default_value_t = 1 << 16)]
    pub max_level: usize,

    /// max number of proof obligations expanded before giving up
    #[arg(long = "pdr-max-obligations", default_value_t = usize::MAX)]
    pub max_obligations: usize,

    /// oracle instances per pool slot
    #[arg(long = "pdr-pool", default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub pool: u32,

    /// cache counterexamples to pushing and skip doomed push attempts
    #[arg(long = "pdr-ctp", default_value_t = false)]
    pub ctp: bool,

    /// disable the literal-dropping generalizer
    #[arg(long = "pdr-no-drop", default_value_t = false)]
    pub no_drop: bool,

    /// disable the arithmetic bound-widening generalizer
    #[arg(long = "pdr-no-widen", default_value_t = false)]
    pub no_widen: bool,

    /// skip the oracle audit of the invariant before reporting unsat
    #[arg(long = "pdr-no-verify", default_value_t = false)]
    pub no_verify: bool,
}

impl Default for PdrOptions {
    fn default() -> Self {
        Self {
            max_level: 1 << 16,
            max_obligations: usize::MAX,
            pool: 1,
            ctp: false,
            no_drop: false,
            no_widen: false,
            no_verify: false,
        }
    }
}
