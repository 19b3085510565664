//! Release sweep
//!
//! Polls the catalog for every tracked artist, detects genuinely new
//! releases and notifies the artist's subscribers.

pub mod differ;
pub mod dispatcher;
pub mod sweep;

pub use differ::{evaluate, judge, Evaluation, Verdict};
pub use dispatcher::{dispatch, DeliveryFailure, DispatchReport};
pub use sweep::{run_sweep, ArtistFailure, SweepSummary};
