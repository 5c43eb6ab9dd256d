// Application layer: the operations behind each CLI command.

pub mod commands;
