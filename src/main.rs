//! Snail Race native entry point
//!
//! Terminal spectator: takes the player's predictions, rolls until every
//! snail has finished, saves the result and prints the statistics.
//! The browser build uses `snail_race::web` instead.

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::error::Error;
    use std::rc::Rc;

    use snail_race::consts::TRACK_LENGTH;
    use snail_race::persistence::{HttpBackend, PersistenceGateway, SaveTracker};
    use snail_race::platform::Sleeper;
    use snail_race::sim::{Color, GamePhase, RaceOutcome, RandomDice};
    use snail_race::stats::RaceStats;
    use snail_race::{RaceController, RaceSnapshot, RollReport, Settings};

    pub const USAGE: &str = "usage: snail-race <winner> <loser> [--fast] [--offline]\n\
        colors: red, blue, yellow, green, orange, purple";

    /// Command line options
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Args {
        pub winner: Color,
        pub loser: Color,
        /// Skip reveal pauses and retry waits
        pub fast: bool,
        /// Don't talk to the statistics service
        pub offline: bool,
    }

    impl Args {
        pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, String> {
            let mut colors = Vec::new();
            let mut fast = false;
            let mut offline = false;

            for arg in args {
                match arg.as_str() {
                    "--fast" => fast = true,
                    "--offline" => offline = true,
                    "-h" | "--help" => return Err(String::new()),
                    flag if flag.starts_with('-') => return Err(format!("unknown option {flag}")),
                    name => {
                        let color =
                            Color::from_str(name).ok_or_else(|| format!("unknown color {name:?}"))?;
                        colors.push(color);
                    }
                }
            }

            let &[winner, loser] = colors.as_slice() else {
                return Err("expected a winner and a loser prediction".to_string());
            };
            if winner == loser {
                return Err("winner and loser predictions must differ".to_string());
            }

            Ok(Self {
                winner,
                loser,
                fast,
                offline,
            })
        }
    }

    /// One line per lane, e.g. `red    |..@......|`
    pub fn render_track(snapshot: &RaceSnapshot) -> String {
        let mut out = String::new();
        for (color, position) in snapshot.snail_positions.iter() {
            let lane: String = (0..TRACK_LENGTH)
                .map(|square| if square == position { '@' } else { '.' })
                .collect();
            out.push_str(&format!("{:<7}|{lane}|", color.as_str()));
            if let Some(rank) = snapshot.finish_order.iter().position(|c| *c == color) {
                out.push_str(&format!(" #{}", rank + 1));
            }
            out.push('\n');
        }
        out
    }

    fn print_results(outcome: &RaceOutcome) {
        println!("Race complete after {} rolls", outcome.total_rolls);
        for (rank, color) in outcome.standings() {
            println!("  {rank}. {}", color.snail_name());
        }
        if let (Some(picks), Some(score)) = (outcome.predictions, outcome.score()) {
            let mark = |ok: bool| if ok { "correct" } else { "wrong" };
            println!("Predicted winner {}: {}", picks.winner, mark(score.winner_correct));
            println!("Predicted last place {}: {}", picks.loser, mark(score.loser_correct));
            println!("Verdict: {:?}", score.verdict());
        }
    }

    fn print_stats(stats: &RaceStats) {
        println!("All-time statistics ({} races)", stats.total_races);
        let top = stats.top_colors();
        if top.is_empty() {
            println!("  Most wins: none yet");
        } else {
            let names: Vec<&str> = top.iter().map(|c| c.as_str()).collect();
            println!("  Most wins: {} ({})", names.join(" & "), stats.max_wins());
        }
        for row in stats.breakdown() {
            println!("  {:<7} {:>4} ({}%)", row.color.as_str(), row.wins, row.percentage_label());
        }
    }

    pub async fn run<S>(args: Args, settings: Settings, sleeper: S) -> Result<(), Box<dyn Error>>
    where
        S: Sleeper + Clone + 'static,
    {
        let seed = settings.seed_or_random();
        log::info!("Dice seed {seed}");

        let tracker = SaveTracker::new();
        let race = RaceController::new(
            RandomDice::seeded(seed),
            sleeper.clone(),
            settings.timings,
            tracker.clone(),
        );
        let gateway = Rc::new(PersistenceGateway::new(
            HttpBackend::new(&settings.api_base_url),
            sleeper,
            &settings,
            tracker,
        ));

        race.submit_predictions(args.winner, args.loser)?;
        println!(
            "Predicted winner: {}, predicted last place: {}",
            args.winner, args.loser
        );

        let mut save = None;
        while race.phase() == GamePhase::Racing {
            let RollReport::Moved { plan, outcome } = race.roll_dice().await? else {
                break;
            };
            let snapshot = race.snapshot();
            println!(
                "\nRoll {}: {} + {}",
                snapshot.total_rolls, plan.initial.0, plan.initial.1
            );
            if plan.needs_reroll() {
                println!("  Finished snail rolled, rerolling...");
            }
            println!("  {}", plan.final_pair().describe());
            print!("{}", render_track(&snapshot));

            if let (Some(outcome), false) = (outcome, args.offline) {
                let gateway = gateway.clone();
                let race_id = snapshot.race_id;
                save = Some(tokio::task::spawn_local(async move {
                    gateway.save_race_result(race_id, &outcome).await
                }));
            }
        }

        let outcome = race.outcome().ok_or("race ended without a result")?;
        println!();
        print_results(&outcome);

        let Some(save) = save else {
            return Ok(());
        };
        match save.await? {
            Ok(_) => {
                println!("\nResult saved.");
                match gateway.fetch_stats().await {
                    Ok(stats) => print_stats(&stats),
                    Err(err) => log::warn!("Could not load statistics: {err}"),
                }
            }
            Err(err) => println!("\nCould not save race result: {err}"),
        }
        Ok(())
    }

}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    use std::process::ExitCode;

    use snail_race::Settings;
    use snail_race::platform::{InstantSleeper, TokioSleeper};

    env_logger::init();
    log::info!("Snail Race (native) starting...");

    let args = match cli::Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(msg) => {
            if !msg.is_empty() {
                eprintln!("error: {msg}");
            }
            eprintln!("{}", cli::USAGE);
            return ExitCode::from(2);
        }
    };
    let settings = Settings::load();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: could not start runtime: {err}");
            return ExitCode::FAILURE;
        }
    };
    let local = tokio::task::LocalSet::new();

    let result = if args.fast {
        local.block_on(&runtime, cli::run(args, settings, InstantSleeper::new()))
    } else {
        local.block_on(&runtime, cli::run(args, settings, TokioSleeper))
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is snail_race::web::start, this is just to satisfy the compiler
}
