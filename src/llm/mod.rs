pub mod oracle;

pub use oracle::{Oracle, OracleError, OpenAiOracle, TagActionSuggestion};
