//! Generate UniFFI Kotlin bindings for the Android app
//!
//! Run: cargo run --bin generate-bindings [-- <android module dir>]
//!
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │ DEPENDENCY MAP - Output paths must match the Android module layout          │
//! │                                                                             │
//! │ Inputs:                                                                     │
//! │   target/release/libwordbook.so        ← Built library for bindgen          │
//! │                                                                             │
//! │ Outputs (default module dir: ../android/app):                               │
//! │   src/main/java/uniffi/wordbook/wordbook.kt   ← Kotlin bindings             │
//! │   src/main/jniLibs/<abi>/libwordbook.so       ← Native library per ABI      │
//! └─────────────────────────────────────────────────────────────────────────────┘

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Rust target triple and the Android ABI directory it lands in
const ANDROID_TARGETS: &[(&str, &str)] = &[
    ("aarch64-linux-android", "arm64-v8a"),
    ("armv7-linux-androideabi", "armeabi-v7a"),
    ("x86_64-linux-android", "x86_64"),
];

fn main() {
    let crate_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let workspace_root = crate_dir.parent().expect("No parent directory").to_path_buf();
    let module_dir = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| workspace_root.join("android/app"));

    println!("Building Rust library...");
    run_cmd("cargo", &["build", "--release", "-p", "wordbook"], &workspace_root);

    println!("Generating Kotlin bindings...");
    let generated = workspace_root.join("generated");
    run_cmd(
        "cargo",
        &[
            "run",
            "-p",
            "wordbook",
            "--bin",
            "uniffi-bindgen",
            "generate",
            "--library",
            "target/release/libwordbook.so",
            "--language",
            "kotlin",
            "--out-dir",
            &generated.to_string_lossy(),
        ],
        &workspace_root,
    );

    let kotlin_src = generated.join("uniffi/wordbook/wordbook.kt");
    let kotlin_dest = module_dir.join("src/main/java/uniffi/wordbook");
    fs::create_dir_all(&kotlin_dest).expect("Create Kotlin source dir");
    fs::copy(&kotlin_src, kotlin_dest.join("wordbook.kt")).expect("Copy Kotlin bindings");

    println!("Building Android libraries...");
    for (target, abi) in ANDROID_TARGETS {
        run_cmd(
            "cargo",
            &["build", "--release", "-p", "wordbook", "--target", target],
            &workspace_root,
        );
        let lib_dest = module_dir.join("src/main/jniLibs").join(abi);
        fs::create_dir_all(&lib_dest).expect("Create jniLibs dir");
        fs::copy(
            workspace_root
                .join("target")
                .join(target)
                .join("release/libwordbook.so"),
            lib_dest.join("libwordbook.so"),
        )
        .expect("Copy native library");
    }

    println!("Done! Bindings regenerated successfully.");
    println!("Generated files:");
    println!("  - {}/wordbook.kt (UniFFI generated)", kotlin_dest.display());
    for (_, abi) in ANDROID_TARGETS {
        println!(
            "  - {}/src/main/jniLibs/{}/libwordbook.so",
            module_dir.display(),
            abi
        );
    }
}

fn run_cmd(program: &str, args: &[&str], dir: &Path) {
    let status = Command::new(program)
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap_or_else(|e| panic!("Failed to run {}: {}", program, e));

    if !status.success() {
        panic!("{} failed with status: {}", program, status);
    }
}
