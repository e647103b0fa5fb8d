use blackjack_ql::MergePolicy;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub rule: ConfigRule,
    pub hyperparameters: ConfigHyperparameters,
    pub trainer: ConfigTrainer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigRule {
    pub number_of_decks: u8,
    pub penetration: f64,
}

impl TryInto<blackjack_ql::Rule> for ConfigRule {
    type Error = blackjack_ql::Error;

    fn try_into(self) -> Result<blackjack_ql::Rule, Self::Error> {
        blackjack_ql::Rule::new(self.number_of_decks, self.penetration)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigHyperparameters {
    pub alpha: f64,
    pub epsilon: f64,
    pub gamma: f64,
    pub epsilon_min: f64,
    pub epsilon_decay: f64,
    pub alpha_min: f64,
    pub alpha_decay: f64,
}

impl From<ConfigHyperparameters> for blackjack_ql::Hyperparameters {
    fn from(config: ConfigHyperparameters) -> Self {
        blackjack_ql::Hyperparameters {
            alpha: config.alpha,
            epsilon: config.epsilon,
            gamma: config.gamma,
            epsilon_min: config.epsilon_min,
            epsilon_decay: config.epsilon_decay,
            alpha_min: config.alpha_min,
            alpha_decay: config.alpha_decay,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigTrainer {
    pub episodes: u64,
    pub number_of_threads: usize,
    pub merge_policy: String,
    pub report_interval: u64,
    pub output_path: String,
}

impl ConfigTrainer {
    pub fn merge_policy(&self) -> Result<MergePolicy, serde::de::value::Error> {
        self.merge_policy.parse()
    }
}

/// Reads the content of a given config file and parses it to a Config.
///
/// Panics if any error occurs.
pub fn parse_config_from_file(filename: &str) -> Config {
    let file_content = fs::read_to_string(filename).unwrap();
    serde_yaml::from_str(&file_content).unwrap()
}
