//! Query functions organized by table.

pub mod events;
pub mod settings;
pub mod state;
