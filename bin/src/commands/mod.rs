//! CLI command implementations.

pub(crate) mod consolidate;
pub(crate) mod history;
pub(crate) mod import;
pub(crate) mod purge;
pub(crate) mod status;
pub(crate) mod tickers;
pub(crate) mod update;
