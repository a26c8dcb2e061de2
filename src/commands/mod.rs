//! One entry point per user action. Each takes the [`Store`](crate::state::Store)
//! plus whatever collaborator the action needs.

pub mod chat;
pub mod documents;
pub mod settings;
