//! One sweep over every tracked artist
//!
//! Artists are processed one at a time. A failure for one artist is logged
//! and recorded, then the sweep continues with the next.

use crate::differ::evaluate;
use crate::dispatcher::dispatch;
use radar_common::db::artists;
use radar_common::{Error, RadarContext, Result};
use tracing::{error, info};

/// An artist whose processing failed
#[derive(Debug)]
pub struct ArtistFailure {
    pub artist_id: String,
    pub error: Error,
}

/// Totals of one sweep
#[derive(Debug, Default)]
pub struct SweepSummary {
    pub artists: usize,
    pub seeded: usize,
    pub releases: usize,
    pub delivered: usize,
    pub failed_deliveries: usize,
    pub failures: Vec<ArtistFailure>,
}

impl SweepSummary {
    fn fail(&mut self, artist_id: &str, error: Error) {
        error!(artist_id = %artist_id, "Artist sweep failed: {}", error);
        self.failures.push(ArtistFailure {
            artist_id: artist_id.to_string(),
            error,
        });
    }
}

/// Sweep all tracked artists, or only `only` when it is non-empty
///
/// Errors only when the artist list itself cannot be read.
pub async fn run_sweep(ctx: &RadarContext, only: &[String]) -> Result<SweepSummary> {
    let artist_ids = if only.is_empty() {
        artists::list_artist_ids(&ctx.db).await?
    } else {
        only.to_vec()
    };

    info!("Sweeping {} artists", artist_ids.len());

    let mut summary = SweepSummary::default();
    for artist_id in artist_ids {
        summary.artists += 1;
        sweep_artist(ctx, &artist_id, &mut summary).await;
    }

    info!(
        artists = summary.artists,
        seeded = summary.seeded,
        releases = summary.releases,
        delivered = summary.delivered,
        failed_deliveries = summary.failed_deliveries,
        failed_artists = summary.failures.len(),
        "Sweep complete"
    );

    Ok(summary)
}

/// Evaluate one artist and dispatch every release whose state write applied
///
/// Failures are recorded in the summary; a failed dispatch never prevents
/// the artist's other release from going out.
async fn sweep_artist(ctx: &RadarContext, artist_id: &str, summary: &mut SweepSummary) {
    let mut evaluation = match evaluate(ctx, artist_id).await {
        Ok(evaluation) => evaluation,
        Err(e) => {
            summary.fail(artist_id, e);
            return;
        }
    };
    if evaluation.seeded {
        summary.seeded += 1;
    }
    for e in evaluation.write_failures.drain(..) {
        summary.fail(artist_id, e);
    }

    for release in evaluation.events() {
        summary.releases += 1;
        match dispatch(ctx, artist_id, release).await {
            Ok(report) => {
                summary.delivered += report.delivered;
                summary.failed_deliveries += report.failures.len();
            }
            Err(e) => summary.fail(artist_id, e),
        }
    }
}
