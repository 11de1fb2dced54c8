use std::time::Duration;

use chrono::Local;
use tokio::time::{self, MissedTickBehavior};

use crate::{
    config::Config,
    constants,
    load::LoadError,
    marketdata::api_caller::CandleSource,
    pipeline::{self, RunOutcome},
};

/// Runs the pipeline now and then once per day, one pass at a time.
/// Stops after `max_runs` passes when given, or on the first load failure.
pub async fn run_daily<S: CandleSource>(
    source: &S,
    mut config: Config,
    max_runs: Option<u64>,
) -> Result<(), LoadError> {
    log::info!(
        "Scheduling daily ETL every {}s",
        constants::SCHEDULE_PERIOD_SECS
    );
    let mut interval = time::interval(Duration::from_secs(constants::SCHEDULE_PERIOD_SECS));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut iteration = 0u64;
    while max_runs.is_none_or(|max| iteration < max) {
        interval.tick().await;
        iteration += 1;

        if let Err(e) = config.roll_to(Local::now().date_naive()) {
            log::error!("Could not move date window, keeping previous one: {}", e);
        }

        match pipeline::run(source, &config).await? {
            RunOutcome::Loaded(report) => log::info!(
                "Run {}: loaded {} rows, table holds {}",
                iteration,
                report.written,
                report.table_count
            ),
            RunOutcome::Skipped(stage) => {
                log::warn!("Run {}: nothing to load after {}", iteration, stage)
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Destination, LoadStrategy};
    use crate::marketdata::{api_caller::WideCandles, fake::FakeSource};
    use std::{env, fs};

    fn config(path: std::path::PathBuf) -> Config {
        Config::new(
            vec!["AAPL".into()],
            30,
            Local::now().date_naive(),
            Destination::Sqlite { path },
            LoadStrategy::Upsert,
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn bounded_schedule_runs_once_and_returns() {
        let dir = env::temp_dir().join(format!("financial_etl_schedule_{}", std::process::id()));
        let source = FakeSource::new(WideCandles::new());

        run_daily(&source, config(dir.join("financial_data.db")), Some(1))
            .await
            .unwrap();
        assert_eq!(source.calls.get(), 1);

        let _ = fs::remove_dir_all(&dir);
    }
}
