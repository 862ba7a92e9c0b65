//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `tundra_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("tundra_core ping={}", tundra_core::ping());
    println!("tundra_core version={}", tundra_core::core_version());
}
