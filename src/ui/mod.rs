//! Plain-text rendering of the session and the notification feed.

mod feed;
mod session;

pub use feed::render_feed;
pub use session::{render_message, render_session, step_marker};
