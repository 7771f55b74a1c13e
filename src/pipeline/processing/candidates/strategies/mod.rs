// Individual extraction strategies
pub mod aggressive;
pub mod labeled_pattern;
pub mod next_lines;
pub mod same_line;

// Re-export the strategies
pub use aggressive::AggressiveStrategy;
pub use labeled_pattern::LabeledPatternStrategy;
pub use next_lines::NextLinesStrategy;
pub use same_line::SameLineStrategy;
