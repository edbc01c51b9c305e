use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_OKD");

    let pkg_version = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());
    let flavor = if env::var_os("CARGO_FEATURE_OKD").is_some() {
        "okd"
    } else {
        "standard"
    };

    // Display string only; daemon compatibility compares CARGO_PKG_VERSION.
    let display = match git_short_sha() {
        Some(sha) => {
            println!("cargo:rustc-env=CAIRN_GIT_SHA={sha}");
            format!("{pkg_version} ({sha}, {flavor})")
        }
        None => {
            println!("cargo:rustc-env=CAIRN_GIT_SHA=");
            format!("{pkg_version} ({flavor})")
        }
    };
    println!("cargo:rustc-env=CAIRN_VERSION={display}");
}

fn git_short_sha() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let sha = String::from_utf8(output.stdout).ok()?.trim().to_string();
    (!sha.is_empty()).then_some(sha)
}
