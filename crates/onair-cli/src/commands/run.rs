use std::path::Path;

use onair_core::clock::sync_clock;
use onair_core::output::{from_config, play_startup};
use onair_core::{
    Clock, Config, Connectivity, CoreError, HostConnectivity, HttpSource, LogOutput, Orchestrator,
    OutputLines, OutputPattern, PlausibleClock, RefreshError, RefreshSettings, SystemClock, ThreadSleeper,
};
use tracing::{error, info};

pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    // The output lines are part of the config, so they are taken from the
    // parsed file before the rest of it is validated. An unparseable file
    // leaves nothing to drive but the log.
    let parsed = Config::read(path);
    let mut outputs: Box<dyn OutputLines> = match &parsed {
        Ok(config) => from_config(&config.outputs),
        Err(_) => Box::new(LogOutput),
    };
    let mut sleeper = ThreadSleeper;
    play_startup(outputs.as_mut(), &mut sleeper);

    let config = match parsed.and_then(|config| config.validate().map(|()| config)) {
        Ok(config) => config,
        Err(e) => return halt(outputs.as_mut(), e.into()),
    };

    if let Err(e) = bring_up(&config, outputs.as_mut(), &mut sleeper) {
        return halt(outputs.as_mut(), e);
    }

    let source = match HttpSource::new(&config.fetch) {
        Ok(source) => source,
        Err(e) => return halt(outputs.as_mut(), RefreshError::from(e).into()),
    };
    let settings = RefreshSettings::from(&config);
    info!(
        category = %settings.category,
        schedule_every = ?settings.schedule_interval,
        display_every = ?settings.display_interval,
        "starting refresh loop"
    );
    Orchestrator::new(source, outputs, settings).run(&SystemClock, &mut sleeper)
}

/// Network and clock: everything that must hold before the first fetch.
fn bring_up(
    config: &Config,
    outputs: &mut dyn OutputLines,
    sleeper: &mut ThreadSleeper,
) -> Result<(), CoreError> {
    info!(
        route_one = config.routing.route_one,
        route_two = config.routing.route_two,
        "routing"
    );

    let mut network = HostConnectivity::for_url(&config.fetch.url_prefix)?;
    network.connect(&config.network)?;

    let floor = config.timing.clock_floor()?;
    let mut clock = PlausibleClock::new(SystemClock, floor);
    sync_clock(
        &mut clock,
        outputs,
        sleeper,
        config.timing.time_sync_retry(),
        config.timing.time_sync_max_attempts,
    )?;
    info!(now = %SystemClock.now(), "time");

    outputs.set(OutputPattern::ALL_OFF);
    Ok(())
}

/// Show the pattern for `e` and fail with it.
fn halt<O: OutputLines + ?Sized>(outputs: &mut O, e: CoreError) -> Result<(), Box<dyn std::error::Error>> {
    let state = e.display_state();
    outputs.set(state.pattern());
    error!(%state, "halting: {e}");
    Err(e.into())
}
