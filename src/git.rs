// Thin wrapper over the `git` binary
//
// Used for fetch-if-absent provisioning of the model bundle and for shipping
// interaction logs. Remote URLs may embed credentials, so anything that ends
// up in diagnostics goes through `redact_url` first.

use anyhow::{bail, Context, Result};
use std::path::Path;
use tokio::process::Command;

/// Run `git <args>` (optionally inside `cwd`) and return stdout.
///
/// A non-zero exit is an error carrying stderr.
pub async fn run_git(args: &[&str], cwd: Option<&Path>) -> Result<String> {
    let mut cmd = Command::new("git");
    cmd.args(args).kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let shown = describe(args);
    tracing::debug!("Running {}", shown);

    let output = cmd
        .output()
        .await
        .with_context(|| format!("Failed to spawn {}", shown))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        // `git commit` with nothing to commit reports on stdout
        let detail = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        bail!("{} failed ({}): {}", shown, output.status, redact_text(&detail));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Strip `user:password@` from a URL
pub fn redact_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let rest = &url[scheme_end + 3..];
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{}://***@{}", &url[..scheme_end], &rest[at + 1..]),
        None => url.to_string(),
    }
}

fn redact_text(text: &str) -> String {
    text.split_whitespace()
        .map(|word| if word.contains("://") { redact_url(word) } else { word.to_string() })
        .collect::<Vec<_>>()
        .join(" ")
}

fn describe(args: &[&str]) -> String {
    let parts: Vec<String> = args.iter().map(|a| redact_url(a)).collect();
    format!("git {}", parts.join(" "))
}
