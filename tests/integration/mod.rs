mod cli_contracts;
mod namespace_props;
mod restore_conflicts;
mod support;
mod sweeper;
mod trash_lifecycle;
