use std::fmt::Write;

use crate::notify::NotificationFeed;

pub fn render_feed(feed: &NotificationFeed) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Notifications ({} unread){}",
        feed.unread_count(),
        if feed.is_connected() { "" } else { " [offline]" }
    );
    if let Some(error) = feed.error() {
        let _ = writeln!(out, "[error] {error}");
    }
    if feed.notifications().is_empty() {
        let _ = writeln!(out, "  (empty)");
    }
    for n in feed.notifications() {
        let _ = writeln!(
            out,
            "  {} [{}] {} {}: {}",
            if n.read { ' ' } else { '*' },
            n.kind.label(),
            n.id,
            n.title,
            n.message
        );
    }
    out
}
