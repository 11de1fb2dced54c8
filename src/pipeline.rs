use crate::{
    config::Config,
    export, extract,
    load::{self, LoadError, LoadReport},
    marketdata::api_caller::CandleSource,
    model::{Stage, StageOutcome},
    transform,
};

/// How a run that did not fail ended.
#[derive(Debug, PartialEq)]
pub enum RunOutcome {
    /// Rows reached the destination table.
    Loaded(LoadReport),
    /// The run stopped cleanly after `Stage` produced nothing to pass on.
    Skipped(Stage),
}

/// One extract → transform → load pass.
///
/// An empty or failed extract/transform stops the run cleanly and the later stages
/// are not invoked. A load failure is returned as an error; the caller decides
/// the exit status.
pub async fn run<S: CandleSource>(source: &S, config: &Config) -> Result<RunOutcome, LoadError> {
    log::info!("--- ETL pipeline started ---");

    let bars = match extract::extract(source, config).await {
        StageOutcome::Rows(bars) => bars,
        StageOutcome::Empty => {
            log::warn!("Extraction produced no rows. Skipping pipeline execution.");
            return Ok(RunOutcome::Skipped(Stage::Extract));
        }
        StageOutcome::Failed(reason) => {
            log::warn!("Extraction failed ({}). Skipping pipeline execution.", reason);
            return Ok(RunOutcome::Skipped(Stage::Extract));
        }
    };

    let rows = match transform::transform(bars) {
        StageOutcome::Rows(rows) => rows,
        StageOutcome::Empty => {
            log::warn!("Transformation produced no rows. Skipping load step.");
            return Ok(RunOutcome::Skipped(Stage::Transform));
        }
        StageOutcome::Failed(reason) => {
            log::warn!("Transformation failed ({}). Skipping load step.", reason);
            return Ok(RunOutcome::Skipped(Stage::Transform));
        }
    };

    if let Some(path) = &config.preview_csv {
        match export::write_preview(path, &rows) {
            Ok(()) => log::info!("Preview written to {}", path.display()),
            Err(e) => log::warn!("Could not write preview {}: {}", path.display(), e),
        }
    }

    let report = load::load(&rows, &config.destination, config.strategy).await?;

    log::info!("--- ETL pipeline finished ---");
    Ok(RunOutcome::Loaded(report))
}
