//! Headless runner - steps a level at the fixed tick with scripted or random input
//!
//! Usage: `headless [level.ron] [script.ron | --soak SEED] [seconds]`
//!
//! Without arguments the bundled platformer level and its script are played. Every frame
//! advances exactly one fixed tick, so runs are reproducible. The process exits with an
//! error if the level fails to load or any invariant breaks.

mod invariants;
mod script;
mod soak;

use bevy::app::ScheduleRunnerPlugin;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use std::time::Duration;

use invariants::RunReport;
use script::{InputScript, ScriptPlayback};
use shared::{
    load_level_file, tick_duration, LevelDesc, LoadedLevel, Locomotion, LocomotionPlugin,
    LocomotionSet, PlatformerCharacter, PlayerId, TopDownCharacter, FIXED_TIMESTEP_HZ,
};
use soak::SoakDriver;

const BUNDLED_LEVEL: &str = include_str!("../../assets/levels/platformer.ron");
const BUNDLED_SCRIPT: &str = include_str!("../../assets/scripts/platformer_run.ron");
const DEFAULT_SECONDS: f32 = 12.0;

#[derive(Clone, Debug, PartialEq)]
enum InputSource {
    Bundled,
    Script(String),
    Soak(u64),
}

#[derive(Clone, Debug, PartialEq)]
struct RunArgs {
    level: Option<String>,
    input: InputSource,
    seconds: f32,
}

impl RunArgs {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut parsed = RunArgs {
            level: None,
            input: InputSource::Bundled,
            seconds: DEFAULT_SECONDS,
        };
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            if arg == "--soak" {
                let seed = args.next().ok_or("--soak needs a seed")?;
                let seed = seed.parse().map_err(|e| format!("bad soak seed {seed:?}: {e}"))?;
                parsed.input = InputSource::Soak(seed);
            } else if arg.ends_with(".ron") {
                if parsed.level.is_none() {
                    parsed.level = Some(arg);
                } else {
                    parsed.input = InputSource::Script(arg);
                }
            } else {
                let seconds: f32 = arg.parse().map_err(|_| format!("unexpected argument {arg:?}"))?;
                if !seconds.is_finite() || seconds <= 0.0 {
                    return Err(format!("run length must be positive, got {seconds}"));
                }
                parsed.seconds = seconds;
            }
        }
        Ok(parsed)
    }

    fn frames(&self) -> u64 {
        (self.seconds as f64 * FIXED_TIMESTEP_HZ).ceil() as u64
    }
}

/// Frames left before the run ends
#[derive(Resource)]
struct RunLength(u64);

fn load_inputs(app: &mut App, args: &RunArgs) -> Result<LevelDesc, String> {
    let level = match &args.level {
        Some(path) => load_level_file(path)?,
        None => LevelDesc::from_ron_str(BUNDLED_LEVEL)?,
    };
    match &args.input {
        InputSource::Bundled => {
            let script = InputScript::from_ron_str(BUNDLED_SCRIPT)?;
            app.insert_resource(ScriptPlayback::new(script));
            app.add_systems(Update, script::drive_script.in_set(LocomotionSet::Input));
        }
        InputSource::Script(path) => {
            app.insert_resource(ScriptPlayback::new(InputScript::load(path)?));
            app.add_systems(Update, script::drive_script.in_set(LocomotionSet::Input));
        }
        InputSource::Soak(seed) => {
            info!("Soak run with seed {}", seed);
            app.insert_resource(SoakDriver::new(*seed));
            app.add_systems(Update, soak::drive_soak.in_set(LocomotionSet::Input));
        }
    }
    Ok(level)
}

fn summary_row<C: Locomotion>(player: &PlayerId, character: &C) -> (PlayerId, Vec2, f32, bool) {
    (*player, character.position(), character.health(), character.is_dead())
}

fn finish_run(
    mut length: ResMut<RunLength>,
    report: Res<RunReport>,
    platformers: Query<(&PlayerId, &PlatformerCharacter)>,
    top_downs: Query<(&PlayerId, &TopDownCharacter)>,
    mut exit: MessageWriter<AppExit>,
) {
    length.0 = length.0.saturating_sub(1);
    if length.0 > 0 {
        return;
    }

    let mut rows: Vec<_> = platformers
        .iter()
        .map(|(p, c)| summary_row(p, c))
        .chain(top_downs.iter().map(|(p, c)| summary_row(p, c)))
        .collect();
    rows.sort_by_key(|row| row.0);
    invariants::log_report(&report, &rows);

    if report.is_clean() {
        exit.write(AppExit::Success);
    } else {
        exit.write(AppExit::error());
    }
}

/// Load the run's inputs and add the headless systems. Plugins must already be added.
fn configure_run(app: &mut App, args: &RunArgs) -> Result<(), String> {
    let level = load_inputs(app, args)?;
    info!(
        "Running level {:?} for {:.1}s ({} frames)",
        level.name,
        args.seconds,
        args.frames()
    );
    app.insert_resource(LoadedLevel(level));
    app.init_resource::<RunReport>();
    app.insert_resource(RunLength(args.frames()));

    app.add_systems(
        Update,
        (invariants::tally_messages, invariants::check_invariants, finish_run)
            .chain()
            .after(LocomotionSet::Publish),
    );
    Ok(())
}

fn main() -> AppExit {
    let mut app = App::new();

    // One frame per fixed tick, as fast as the machine allows
    app.add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::ZERO)));
    app.add_plugins(bevy::log::LogPlugin::default());
    app.insert_resource(TimeUpdateStrategy::ManualDuration(tick_duration()));
    app.add_plugins(LocomotionPlugin);

    let configured = RunArgs::parse(std::env::args().skip(1))
        .and_then(|args| configure_run(&mut app, &args));
    if let Err(e) = configured {
        error!("Failed to start run: {}", e);
        return AppExit::error();
    }

    app.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<RunArgs, String> {
        RunArgs::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.level, None);
        assert_eq!(args.input, InputSource::Bundled);
        assert_eq!(args.frames(), 600);
    }

    #[test]
    fn test_level_script_and_length() {
        let args = parse(&["a.ron", "b.ron", "3"]).unwrap();
        assert_eq!(args.level.as_deref(), Some("a.ron"));
        assert_eq!(args.input, InputSource::Script("b.ron".into()));
        assert_eq!(args.frames(), 150);
    }

    #[test]
    fn test_soak_and_bad_args() {
        let args = parse(&["level.ron", "--soak", "99"]).unwrap();
        assert_eq!(args.input, InputSource::Soak(99));
        assert!(parse(&["--soak"]).is_err());
        assert!(parse(&["--soak", "x"]).is_err());
        assert!(parse(&["-2"]).is_err());
        assert!(parse(&["what"]).is_err());
    }

    fn test_app(args: &RunArgs) -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, LocomotionPlugin));
        app.insert_resource(TimeUpdateStrategy::ManualDuration(tick_duration()));
        configure_run(&mut app, args).unwrap();
        app
    }

    #[test]
    fn test_bundled_run_keeps_invariants() {
        let args = parse(&[]).unwrap();
        let mut app = test_app(&args);
        for _ in 0..args.frames() {
            app.update();
        }
        let report = app.world().resource::<RunReport>();
        assert_eq!(report.frames, args.frames());
        assert!(report.is_clean(), "{:?}", report.violations);
        assert!(report.events.contains_key(&PlayerId(0)));
    }

    #[test]
    fn test_soak_run_keeps_invariants() {
        let mut app = test_app(&parse(&["--soak", "3", "2"]).unwrap());
        for _ in 0..100 {
            app.update();
        }
        let report = app.world().resource::<RunReport>();
        assert!(report.is_clean(), "{:?}", report.violations);
    }

    #[test]
    fn test_bundled_files_parse() {
        let level = LevelDesc::from_ron_str(BUNDLED_LEVEL).unwrap();
        assert!(!level.players.is_empty());
        let script = InputScript::from_ron_str(BUNDLED_SCRIPT).unwrap();
        assert!(!script.steps.is_empty());

        let top_down = LevelDesc::from_ron_str(include_str!("../../assets/levels/topdown.ron")).unwrap();
        assert_eq!(top_down.players.len(), 2);
        InputScript::from_ron_str(include_str!("../../assets/scripts/topdown_gate.ron")).unwrap();
    }
}
