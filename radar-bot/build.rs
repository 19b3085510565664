//! Build script for radar-bot

include!("../build_info.rs");
