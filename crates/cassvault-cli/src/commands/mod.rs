//! Command handlers, one module per subcommand.

pub(crate) mod backup;
pub(crate) mod config;
pub(crate) mod destination;
pub(crate) mod restore;
