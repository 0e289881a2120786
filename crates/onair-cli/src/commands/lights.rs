use std::path::Path;

use onair_core::output::{from_config, play_startup};
use onair_core::{Config, DisplayState, OutputLines, OutputPattern, ThreadSleeper};

enum Lights {
    Pattern(OutputPattern),
    Startup,
}

fn parse(name: &str) -> Result<Lights, String> {
    match name {
        "all_on" => Ok(Lights::Pattern(OutputPattern::ALL_ON)),
        "all_off" => Ok(Lights::Pattern(OutputPattern::ALL_OFF)),
        "startup" => Ok(Lights::Startup),
        other => other
            .parse::<DisplayState>()
            .map(|state| Lights::Pattern(state.pattern())),
    }
}

/// Drive the configured lines by hand, e.g. to check the wiring.
pub fn run(path: &Path, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let lights = parse(name)?;
    // Without a config file there are no lines to drive; patterns are logged.
    let config = if path.exists() {
        Config::read(path)?
    } else {
        Config::default()
    };

    let mut outputs = from_config(&config.outputs);
    match lights {
        Lights::Pattern(pattern) => {
            outputs.set(pattern);
            println!("{pattern}");
        }
        Lights::Startup => {
            play_startup(outputs.as_mut(), &mut ThreadSleeper);
            println!("startup");
        }
    }
    Ok(())
}
