use std::path::Path;

use onair_core::{
    Clock, Config, DisplayState, HttpSource, Orchestrator, RecordingOutput, RefreshOutcome,
    RefreshSettings, SystemClock, TimeInstant,
};
use serde::Serialize;

#[derive(Serialize)]
struct CheckReport {
    now: TimeInstant,
    refresh: Option<RefreshOutcome>,
    state: Option<DisplayState>,
    pattern: Option<String>,
    airings: Vec<String>,
}

/// One schedule refresh and one classification, without touching the lights.
pub fn run(path: &Path, at: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(path)?;
    let now = match at {
        Some(text) => TimeInstant::parse_schedule_timestamp(text)
            .map_err(|e| format!("invalid --at {text:?}: {e}"))?,
        None => SystemClock.now(),
    };

    let source = HttpSource::new(&config.fetch)?;
    let mut orch = Orchestrator::new(source, RecordingOutput::new(), RefreshSettings::from(&config));
    let report = orch.tick(now);

    let state = report.display.or(orch.state().displayed());
    let airings = orch
        .state()
        .window()
        .map(|window| {
            window
                .iter()
                .map(|interval| format!("{}..{}", interval.start(), interval.end()))
                .collect()
        })
        .unwrap_or_default();

    let failed = match &report.refresh {
        Some(RefreshOutcome::Failed { error, .. }) => Some(error.clone()),
        _ => None,
    };

    let check = CheckReport {
        now,
        refresh: report.refresh,
        state,
        pattern: state.map(|s| s.pattern().to_string()),
        airings,
    };
    println!("{}", serde_json::to_string_pretty(&check)?);

    match failed {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}
