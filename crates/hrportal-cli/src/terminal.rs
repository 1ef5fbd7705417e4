use std::io::{self, Write};

use async_trait::async_trait;
use crossterm::style::{Color, StyledContent, Stylize};
use hrportal_core::auth::Navigator;
use hrportal_core::{Notice, NoticeLevel, Notifier};
use tokio::sync::mpsc;
use tracing::warn;

// Color palette
const PRIMARY: Color = Color::Rgb { r: 64, g: 128, b: 192 };
const SECONDARY: Color = Color::Rgb { r: 96, g: 160, b: 96 };
const ACCENT: Color = Color::Rgb { r: 192, g: 160, b: 64 };
const ERROR: Color = Color::Rgb { r: 192, g: 64, b: 64 };
const MUTED: Color = Color::Rgb { r: 128, g: 128, b: 128 };

fn level_color(level: NoticeLevel) -> Color {
    match level {
        NoticeLevel::Success => SECONDARY,
        NoticeLevel::Welcome => PRIMARY,
        NoticeLevel::Warning | NoticeLevel::SessionTimeout => ACCENT,
        NoticeLevel::Error => ERROR,
    }
}

fn level_icon(level: NoticeLevel) -> &'static str {
    match level {
        NoticeLevel::Success | NoticeLevel::Welcome => "✓",
        NoticeLevel::Warning | NoticeLevel::SessionTimeout => "!",
        NoticeLevel::Error => "✗",
    }
}

pub fn muted(text: &str) -> StyledContent<&str> {
    text.with(MUTED)
}

/// Popup-style notifier: notices are printed as framed, colored blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalNotifier;

impl TerminalNotifier {
    fn render(notice: &Notice) -> String {
        let color = level_color(notice.level);
        format!(
            "\n{} {}\n  {}\n",
            level_icon(notice.level).with(color).bold(),
            notice.title.as_str().with(color).bold(),
            notice.text
        )
    }
}

#[async_trait]
impl Notifier for TerminalNotifier {
    fn notify(&self, notice: &Notice) {
        eprint!("{}", Self::render(notice));
    }

    async fn alert(&self, notice: &Notice) {
        eprint!("{}", Self::render(notice));
        eprint!("{}", muted("  Press Enter to continue..."));
        let _ = io::stderr().flush();

        let waited = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            io::stdin().read_line(&mut line).map(|_| ())
        })
        .await;
        if !matches!(waited, Ok(Ok(()))) {
            warn!("Could not wait for acknowledgement on stdin");
        }
    }
}

/// Hands redirects to the command loop, which decides how to leave.
#[derive(Debug, Clone)]
pub struct TerminalNavigator {
    tx: mpsc::UnboundedSender<String>,
}

impl TerminalNavigator {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Navigator for TerminalNavigator {
    fn redirect(&self, path: &str) {
        if self.tx.send(path.to_string()).is_err() {
            warn!(path = path, "Redirect dropped, command loop already gone");
        }
    }
}
