//! Terminal UI layer for interactive chat sessions.
//!
//! - [`chat_loop`]: the loop driver that owns the terminal and feeds input and
//!   task completions into [`crate::core::app::apply_action`].
//! - [`renderer`] and [`picker`]: frame composition for the chat and overlay views.
//! - [`markdown`]: width-aware markdown to styled lines.
//! - [`manager`]: the full-screen conversation manager.
//! - [`theme`] and [`loading`]: colours and the loading animation.
//!
//! Rendering reads [`crate::core::app::App`] and never mutates it.

pub mod chat_loop;
pub mod loading;
pub mod manager;
pub mod markdown;
pub mod picker;
pub mod renderer;
pub mod theme;
