pub mod ledger;
pub mod pacer;
pub mod provider;
