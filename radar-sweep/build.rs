//! Build script for radar-sweep

include!("../build_info.rs");
