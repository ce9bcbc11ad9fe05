use std::env;
use std::process::Command;

/// Short commit hash of the checkout being built, if there is one.
fn git_hash() -> Option<String> {
    let out = Command::new("git")
        .args(["rev-parse", "--short=10", "HEAD"])
        .output()
        .ok()?;
    let stdout = String::from_utf8(out.stdout).ok()?;
    let hash = stdout.trim();
    (out.status.success() && !hash.is_empty()).then(|| hash.to_owned())
}

fn main() {
    for path in [".git/HEAD", ".git/refs"] {
        println!("cargo:rerun-if-changed={path}");
    }
    println!("cargo:rerun-if-env-changed=CODEMINIMAP_GIT_HASH");

    // Release tarballs carry no .git; packagers pass the hash in instead.
    let hash = env::var("CODEMINIMAP_GIT_HASH")
        .ok()
        .filter(|h| !h.is_empty())
        .or_else(git_hash)
        .unwrap_or_else(|| "unknown".to_owned());
    let profile = env::var("PROFILE").unwrap_or_default();

    println!("cargo:rustc-env=CODEMINIMAP_BUILD_GIT_HASH={hash}");
    println!("cargo:rustc-env=CODEMINIMAP_BUILD_PROFILE={profile}");
}
