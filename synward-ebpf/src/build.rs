use std::env;
use std::path::PathBuf;
use std::process::Command;

/// Build the kernel-side program before this crate compiles, so `loader.rs`
/// can embed the ELF with `include_bytes_aligned!`.
///
/// `synward-ebpf-xdp` lives outside the workspace and carries its own
/// `rust-toolchain.toml` (nightly + rust-src); its `.cargo/config.toml`
/// selects the `bpfel-unknown-none` target and `build-std`.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let xdp_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?)
        .parent()
        .ok_or("synward-ebpf has no parent directory")?
        .join("synward-ebpf-xdp");
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);

    println!("cargo:rerun-if-changed={}", xdp_dir.join("src").display());
    println!("cargo:rerun-if-changed={}", xdp_dir.join("Cargo.toml").display());

    // Cargo exports RUSTC, RUSTUP_TOOLCHAIN and friends to build scripts, all
    // pinned to the toolchain compiling *this* crate. Scrub them so the child
    // cargo honors the XDP crate's rust-toolchain.toml instead.
    let mut build = Command::new("cargo");
    build
        .current_dir(&xdp_dir)
        .args(["build", "--release"])
        .env("CARGO_TARGET_DIR", out_dir.join("xdp-target"));
    for var in [
        "RUSTC",
        "RUSTDOC",
        "RUSTUP_TOOLCHAIN",
        "RUSTC_WRAPPER",
        "RUSTC_WORKSPACE_WRAPPER",
    ] {
        build.env_remove(var);
    }

    let status = build
        .status()
        .map_err(|e| format!("failed to spawn cargo for synward-ebpf-xdp: {e}"))?;
    if !status.success() {
        return Err(
            "building synward-ebpf-xdp failed; see README.md for the nightly/rust-src \
             toolchain it needs"
                .into(),
        );
    }

    let elf = out_dir.join("xdp-target/bpfel-unknown-none/release/synward-ebpf-xdp");
    let embedded = out_dir.join("xdp.bpf.o");
    std::fs::copy(&elf, &embedded)
        .map_err(|e| format!("copying {} into OUT_DIR failed: {e}", elf.display()))?;

    Ok(())
}
