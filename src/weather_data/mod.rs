pub(crate) mod api;
pub(crate) mod day_loader;
pub(crate) mod day_store;
pub(crate) mod error;
pub(crate) mod fetcher;
pub(crate) mod gap_filler;
pub(crate) mod window;
