pub(crate) mod bootstrap;
pub(crate) mod runner;
pub(crate) mod snapshot;
