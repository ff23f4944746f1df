//! Ports - interfaces the application layer depends on

mod ports;
mod repositories;

pub use ports::{GatewayClient, GatewayResult, LanguageModel, LlmResult};
pub use repositories::{
    JoinRecordRepository, MembershipRepository, QuitRecordRepository, RepoResult,
};
