mod training;

use std::path::Path;

use blackjack_ql_drivers::parse_config_from_file;
use clap::Parser;
use log::info;

const DEFAULT_CONFIG_PATH: &str = "~/.blackjack_ql.yml";

#[derive(Debug, Parser)]
#[command(author, about, long_about = None)]
struct CommandLineArgs {
    /// The path of the config file
    #[arg(short, long, default_value_t = String::from(DEFAULT_CONFIG_PATH))]
    config: String,
}

fn main() {
    env_logger::init();

    let mut args = CommandLineArgs::parse();
    if args.config == DEFAULT_CONFIG_PATH {
        let home_dir = home::home_dir().expect("Cannot find home directory");
        let config_file_path = home_dir.join(".blackjack_ql.yml");
        if !config_file_path.exists() {
            panic!("Config file not exists");
        }
        if config_file_path.is_dir() {
            panic!("This should be a path rather than a directory");
        }
        args.config = String::from(config_file_path.to_str().unwrap());
    }
    let args = args;

    let config = parse_config_from_file(&args.config);
    let rule: blackjack_ql::Rule = config
        .rule
        .clone()
        .try_into()
        .expect("invalid rule configuration");
    let hp: blackjack_ql::Hyperparameters = config.hyperparameters.clone().into();
    let merge_policy = config
        .trainer
        .merge_policy()
        .expect("invalid merge policy configuration");

    info!(
        "training for {} episodes on {} thread(s)",
        config.trainer.episodes, config.trainer.number_of_threads
    );
    let snapshot = training::train(
        &rule,
        hp,
        config.trainer.episodes,
        config.trainer.number_of_threads,
        merge_policy,
        config.trainer.report_interval,
    )
    .expect("training failed");

    info!(
        "training finished: {} learned pairs, epsilon {:.6}, alpha {:.6}",
        snapshot.len(),
        snapshot.epsilon,
        snapshot.alpha
    );
    snapshot
        .write_to(Path::new(&config.trainer.output_path))
        .expect("failed to write table snapshot");
}
