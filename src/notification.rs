//! Desktop notifications for files sorted by the watcher.
//!
//! Delivery is best-effort. Nothing waits on the notifier process and a
//! failure to start it is logged at debug level only.

use std::process::Stdio;
use tokio::process::Command;

pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

/// Shells out to the platform's notification tool.
///
/// Must be called from within a tokio runtime so the child gets reaped.
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, message: &str) {
        let Some(mut command) = notify_command(title, message) else {
            return;
        };
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Err(e) = command.spawn() {
            tracing::debug!(error = %e, "desktop notification unavailable");
        }
    }
}

/// Does nothing. Used when notifications are switched off.
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _title: &str, _message: &str) {}
}

#[cfg(target_os = "linux")]
fn notify_command(title: &str, message: &str) -> Option<Command> {
    let mut command = Command::new("notify-send");
    command.args(["--app-name=Sortify", title, message]);
    Some(command)
}

#[cfg(target_os = "macos")]
fn notify_command(title: &str, message: &str) -> Option<Command> {
    let script = format!(
        "display notification {} with title {}",
        applescript_string(message),
        applescript_string(title)
    );
    let mut command = Command::new("osascript");
    command.args(["-e", &script]);
    Some(command)
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn notify_command(_title: &str, _message: &str) -> Option<Command> {
    None
}

#[cfg_attr(not(any(target_os = "macos", test)), allow(dead_code))]
fn applescript_string(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}
