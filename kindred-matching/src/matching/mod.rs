pub mod compatibility;
pub mod daily_picks;
pub mod distance;
pub mod explanation;
pub mod feed;
pub mod ledger;
pub mod retriever;
