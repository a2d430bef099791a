use moodring_core::{NotificationAction, NotificationSink, Permission};
use std::io::Write;

/// Surfaces system-level care notifications as highlighted terminal lines.
pub struct TerminalNotifier<W: Write> {
    out: W,
    enabled: bool,
    permission: Permission,
    visible: Option<String>,
}

impl TerminalNotifier<std::io::Stdout> {
    pub fn stdout(enabled: bool) -> Self {
        Self::new(std::io::stdout(), enabled)
    }
}

impl<W: Write> TerminalNotifier<W> {
    pub fn new(out: W, enabled: bool) -> Self {
        Self {
            out,
            enabled,
            permission: if enabled { Permission::Default } else { Permission::Denied },
            visible: None,
        }
    }

    /// Tag of the notification currently on screen.
    pub fn visible(&self) -> Option<&str> {
        self.visible.as_deref()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// A terminal line can't be clicked, so the action is spelled out as a command.
fn action_hint(action: NotificationAction) -> &'static str {
    match action {
        NotificationAction::OpenChat => "run `moodring chat` to talk it through",
    }
}

impl<W: Write> NotificationSink for TerminalNotifier<W> {
    fn permission(&self) -> Permission {
        self.permission
    }

    fn request_permission(&mut self) -> Permission {
        self.permission = if self.enabled { Permission::Granted } else { Permission::Denied };
        self.permission
    }

    fn show(&mut self, title: &str, body: &str, tag: &str, on_click: NotificationAction) {
        if self.permission != Permission::Granted {
            return;
        }
        let hint = action_hint(on_click);
        if writeln!(self.out, "\n  ** {title} **\n  {body}\n  ({hint})\n").is_err() {
            tracing::warn!("failed to write notification to terminal");
        }
        self.visible = Some(tag.to_string());
    }

    fn close(&mut self, tag: &str) {
        if self.visible.as_deref() == Some(tag) {
            self.visible = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shows_only_after_grant() {
        let mut n = TerminalNotifier::new(Vec::new(), true);
        assert_eq!(n.permission(), Permission::Default);
        n.show("t", "hidden", "mood-care", NotificationAction::OpenChat);
        assert!(n.visible().is_none());

        assert_eq!(n.request_permission(), Permission::Granted);
        n.show("Title", "take a breath", "mood-care", NotificationAction::OpenChat);
        assert_eq!(n.visible(), Some("mood-care"));
        n.close("mood-care");
        assert!(n.visible().is_none());

        let out = String::from_utf8(n.into_inner()).unwrap();
        assert!(out.contains("take a breath"));
        assert!(out.contains("moodring chat"));
        assert!(!out.contains("hidden"));
    }

    #[test]
    fn disabled_sink_stays_denied() {
        let mut n = TerminalNotifier::new(Vec::new(), false);
        assert_eq!(n.request_permission(), Permission::Denied);
        n.show("t", "b", "mood-care", NotificationAction::OpenChat);
        assert!(n.into_inner().is_empty());
    }
}
