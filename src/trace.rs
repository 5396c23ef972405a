use decorum::{Filter, Level};
use std::env::args;
use tracing_subscriber::EnvFilter;

pub fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let input = args().skip(1).collect::<Vec<_>>().join(" ");
    let mut filter = Filter::new();
    for level in Level::EACH {
        filter.with_level(level);
        println!(
            "{:>8}: {} {:?} -> \"{}\" / \"{}\"",
            level,
            filter.is_profane(&input),
            filter.find(&input),
            filter.rewrite(&input),
            filter.censor(&input),
        );
    }
}
