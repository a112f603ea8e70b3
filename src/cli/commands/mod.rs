//! One module per `lockbox` subcommand.

pub mod delete;
pub mod get;
pub mod list;
pub mod set;
pub mod verify;
