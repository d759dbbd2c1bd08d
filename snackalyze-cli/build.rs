// Build script to inject version information from git tags
//
// Emits SNACKALYZE_VERSION: the clean tag version when built from a tag,
// otherwise CARGO_PKG_VERSION suffixed with git describe output.
// Falls back to CARGO_PKG_VERSION when git is unavailable.

use std::process::Command;

fn main() {
    let version = get_git_version().unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=SNACKALYZE_VERSION={}", version);
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
    println!("cargo:rerun-if-changed=.git/refs/tags");
}

fn get_git_version() -> Option<String> {
    // "v0.3.0", "v0.3.0-5-gabc123", or "abc123-dirty"
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let described = String::from_utf8(output.stdout).ok()?;
    let described = described.trim();

    if let Some(tag) = described.strip_prefix('v') {
        // Keep only the tag part of "0.3.0-5-gabc123"
        let version = tag.split('-').next().unwrap_or(tag);
        return Some(version.to_string());
    }

    let base_version = env!("CARGO_PKG_VERSION");
    Some(match described.strip_suffix("-dirty") {
        Some(sha) => format!("{}-{}-dirty", base_version, sha),
        None => format!("{}-{}", base_version, described),
    })
}
