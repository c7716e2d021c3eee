//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own session, auth-form, and ticket logic so route
//! handlers can stay focused on HTTP translation and cookie plumbing.

pub mod auth;
pub mod password;
pub mod screen;
pub mod session;
pub mod tickets;
