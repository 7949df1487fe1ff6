pub mod aggregator;

pub use aggregator::{AggregateError, ScoreWindow, WINDOW_SIZE, aggregate_score, class_penalty};
