use std::process::Command;

fn git_hash() -> Option<String> {
    let output = Command::new("git").args(["rev-parse", "--short", "HEAD"]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!hash.is_empty()).then_some(hash)
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=.git/HEAD");

    let built = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let hash = git_hash().unwrap_or_else(|| "unknown".to_string());
    let version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();

    println!("cargo:rustc-env=VULNREPRO_BUILD_DATE={built}");
    println!("cargo:rustc-env=VULNREPRO_GIT_HASH={hash}");
    // Shown by `vulnrepro --version`
    println!("cargo:rustc-env=VULNREPRO_LONG_VERSION={version} ({hash} {built})");
}
