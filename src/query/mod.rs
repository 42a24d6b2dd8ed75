pub mod executor;
pub mod highlight;
pub mod lexer;
pub mod parser;
pub mod scorer;
pub mod types;

pub use executor::{EvalOptions, QueryExecutor};
pub use parser::parse_query;
pub use scorer::{ScoreContext, Scorer, ScoringWeights, compare_hits, sort_hits};
pub use types::{
    AgeComparison, AgeFilter, AgeUnit, Field, Filter, FilterValue, Highlight, Joiner, Query,
    SearchHit,
};
