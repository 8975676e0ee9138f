pub mod proposal;
pub mod scraper_state;
pub mod story;
pub mod summary;
pub mod tag;

pub use proposal::{
    is_low_risk, AgentRun, AgentRunStatus, AgentRunType, ProposalData, ProposalPriority,
    ProposalStatus, ProposalType, TagProposal, TagProposalRow,
};
pub use scraper_state::{BatchStats, ScraperState, ScraperStateType, ScraperStatus};
pub use story::{NewStory, Story, StoryResponse};
pub use summary::{EnrichmentResult, FlatTags, Summary};
pub use tag::{GroupedTags, Tag, TagLevel};
