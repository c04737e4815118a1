use colored::Colorize;
use tracing::info;
use tracing_subscriber;

use clap::{value_t, App, Arg, ArgMatches};

use zfx_dissemination::settings::{Experiment, LateEffects};
use zfx_dissemination::simulation::{Completion, Coordinator};
use zfx_dissemination::storage::Storage;
use zfx_dissemination::Result;

const DEFAULT_DB: &str = "dissemination.db";

/// Overrides `field` with the value of `name` when the flag was given.
macro_rules! override_with {
    ($matches:ident, $name:expr, $t:ty, $field:expr) => {
        if $matches.is_present($name) {
            $field = value_t!($matches, $name, $t).unwrap_or_else(|e| e.exit());
        }
    };
}

fn experiment_from(matches: &ArgMatches) -> Result<Experiment> {
    let mut experiment = Experiment::load(matches.value_of("config"))?;
    override_with!(matches, "id", u64, experiment.id);
    override_with!(matches, "timer", u64, experiment.deadline_secs);
    override_with!(matches, "nodes", usize, experiment.node_count);
    override_with!(matches, "domains", usize, experiment.multicast_domains);
    override_with!(matches, "fanout", usize, experiment.gossip_fanout);
    override_with!(matches, "delay", u64, experiment.mean_delay_ms);
    override_with!(matches, "alive", f64, experiment.alive_probability);
    override_with!(matches, "loss", f64, experiment.loss_probability);
    override_with!(matches, "corrupt", f64, experiment.corruption_probability);
    override_with!(matches, "late-effects", LateEffects, experiment.late_effects);
    experiment.validate()?;
    Ok(experiment)
}

fn option_arg<'a>(name: &'a str, help: &'a str) -> Arg<'a, 'a> {
    Arg::with_name(name).long(name).value_name(name).help(help).takes_value(true)
}

fn main() -> Result<()> {
    let matches = App::new("simulate")
        .version("0.1")
        .author("zero.fx labs ltd.")
        .about("Compares message dissemination strategies over a simulated faulty network")
        .arg(Arg::with_name("verbose").short("v").long("verbose").help("Enables debug output"))
        .arg(
            Arg::with_name("remove-db")
                .short("r")
                .long("remove-db")
                .help("Removes previous experiments before running"),
        )
        .arg(option_arg("config", "Experiment configuration file"))
        .arg(option_arg("db", "Path of the experiment database"))
        .arg(option_arg("id", "Experiment id"))
        .arg(option_arg("timer", "Deadline of each run in seconds, 0 for none"))
        .arg(option_arg("nodes", "Number of nodes"))
        .arg(option_arg("domains", "Number of multicast domains"))
        .arg(option_arg("fanout", "Peers contacted per gossiping node per round"))
        .arg(option_arg("delay", "Mean network delay in milliseconds"))
        .arg(option_arg("alive", "Probability that a node is alive"))
        .arg(option_arg("loss", "Message loss probability"))
        .arg(option_arg("corrupt", "Message corruption probability"))
        .arg(
            option_arg("late-effects", "What happens to hops in flight at the deadline")
                .possible_values(&["land", "discard"]),
        )
        .get_matches();

    let level =
        if matches.is_present("verbose") { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_level(false)
        .with_target(false)
        .without_time()
        .compact()
        .with_max_level(level)
        .init();

    let experiment = experiment_from(&matches)?;
    let storage = Storage::open(matches.value_of("db").unwrap_or(DEFAULT_DB))?;
    if matches.is_present("remove-db") {
        storage.clear()?;
        info!("{}", "removed previous experiments".yellow());
    }

    info!("{}", "==== Preparing Simulation ====".bold().cyan());
    info!("{:?}", experiment);
    let coordinator = Coordinator::new(experiment, storage)?;

    let sys = actix::System::new();
    let reports = sys.block_on(async move { coordinator.run_all().await })?;

    info!("{}", "==== Simulation Finished ====".bold().cyan());
    for report in reports.iter() {
        match &report.completion {
            Completion::Finished(_) => info!("{}", format!("{}", report.summary).green()),
            Completion::Expired(_) => info!("{}", format!("{}", report.summary).red()),
            Completion::NotRun(err) => {
                info!("{}", format!("{} not run: {}", report.strategy, err).yellow())
            }
        }
    }
    Ok(())
}
