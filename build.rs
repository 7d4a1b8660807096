fn main() {
    // Re-run when HEAD moves (commit, checkout, ...)
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let describe = std::process::Command::new("git")
        .args(["describe", "--always", "--dirty", "--tags"])
        .output();

    let version = match describe {
        Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout).trim().to_string(),
        _ => "dev".to_string(),
    };

    println!("cargo:rustc-env=GIT_VERSION={}", version);
}
