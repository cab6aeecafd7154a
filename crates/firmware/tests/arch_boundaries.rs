//! Architecture boundary tests, run with `cargo test -p firmware --test arch_boundaries`
//!
//! These tests enforce the layering rules:
//!   Rule 1: platform (HAL) depends on no other workspace crate
//!   Rule 2: bluetooth (protocol helpers) depends on no other workspace crate
//!   Rule 3: playback (streaming core) must not depend on firmware (board layer)
//!   Rule 4: no library crate pulls in a heap allocator or std-only runtime
//!
//! The manifests are read at compile time, so a violating edit fails here
//! before it can reach a target build.

// Architecture test file: expect/unwrap/panic are intentional test mechanisms.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]

const PLATFORM: &str = include_str!("../../platform/Cargo.toml");
const BLUETOOTH: &str = include_str!("../../bluetooth/Cargo.toml");
const PLAYBACK: &str = include_str!("../../playback/Cargo.toml");
const FIRMWARE: &str = include_str!("../Cargo.toml");

/// The `[dependencies]` table of `manifest`, without dev-dependencies.
fn runtime_deps(manifest: &str) -> &str {
    let start = manifest
        .find("[dependencies]")
        .expect("manifest has a [dependencies] table");
    let rest = &manifest[start..];
    let end = rest[1..].find("\n[").map_or(rest.len(), |i| i + 1);
    &rest[..end]
}

#[test]
fn platform_hal_is_independent() {
    let deps = runtime_deps(PLATFORM);
    for krate in ["playback", "bluetooth", "firmware"] {
        assert!(
            !deps.contains(&format!("{krate} =")),
            "platform must not depend on {krate}"
        );
    }
}

#[test]
fn bluetooth_helpers_are_leaf() {
    let deps = runtime_deps(BLUETOOTH);
    for krate in ["platform", "playback", "firmware"] {
        assert!(
            !deps.contains(&format!("{krate} =")),
            "bluetooth must not depend on {krate}"
        );
    }
}

#[test]
fn playback_does_not_reach_up_into_firmware() {
    assert!(!PLAYBACK.contains("firmware ="));
    assert!(runtime_deps(PLAYBACK).contains("platform ="));
}

#[test]
fn no_runtime_heap_or_host_runtime() {
    for (name, manifest) in [
        ("platform", PLATFORM),
        ("bluetooth", BLUETOOTH),
        ("playback", PLAYBACK),
        ("firmware", FIRMWARE),
    ] {
        let deps = runtime_deps(manifest);
        for banned in ["embedded-alloc", "tokio", "anyhow"] {
            assert!(
                !deps.contains(banned),
                "{name} runtime dependencies must not include {banned}"
            );
        }
    }
}

/// Naming the HAL traits from here proves the board layer sees them without
/// any firmware-internal types.
#[test]
fn hal_traits_reachable_from_board_layer() {
    fn _output<T: platform::AudioOutput>() {}
    fn _bus<T: platform::I2sBus>() {}
    fn _net<T: platform::TcpConnect>() {}
    fn _storage<T: platform::Storage>() {}
    fn _sink<T: platform::A2dpSink>() {}
}
