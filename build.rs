use std::process::Command;

/// `git describe` の結果。git 管理外やコマンド失敗時は None
fn describe() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--always", "--dirty", "--tags"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let described = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!described.is_empty()).then_some(described)
}

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
    // パッケージング時などに外から固定できる
    println!("cargo:rerun-if-env-changed=POSE_COACH_VERSION");

    let crate_version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let version = match std::env::var("POSE_COACH_VERSION") {
        Ok(v) if !v.is_empty() => v,
        _ => match describe() {
            // 例: "0.1.0 (a1b2c3d-dirty)"
            Some(git) => format!("{} ({})", crate_version, git),
            None => crate_version,
        },
    };

    println!("cargo:rustc-env=GIT_VERSION={}", version);
}
