use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};

use crate::simulation::Game;
use crate::{Action, Hyperparameters, QTable, Result, Rule, StateKey, TableSnapshot};

/// Tabular Q-learning agent. Owns its own game (and therefore its own
/// shoe), plays one round per episode, and updates its value table from the
/// observed transitions and terminal payouts.
pub struct QLearningAgent {
    table: QTable,
    hp: Hyperparameters,
    game: Game,
}

impl QLearningAgent {
    pub fn new(rule: &Rule, hp: Hyperparameters) -> QLearningAgent {
        QLearningAgent {
            table: QTable::new(),
            hp,
            game: Game::new(rule),
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.hp.epsilon
    }

    pub fn alpha(&self) -> f64 {
        self.hp.alpha
    }

    pub fn gamma(&self) -> f64 {
        self.hp.gamma
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    pub fn into_table(self) -> QTable {
        self.table
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Current table plus hyperparameters, ready to persist.
    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot::new(&self.table, self.hp.epsilon, self.hp.alpha, self.hp.gamma)
    }

    /// Epsilon-greedy action choice: a uniform legal action with
    /// probability epsilon, the greedy one otherwise. `None` when the state
    /// admits no actions at all.
    pub fn act(&self, state: &StateKey) -> Option<Action> {
        let legal_actions = state.legal_actions();
        if legal_actions.is_empty() {
            return None;
        }
        if thread_rng().gen::<f64>() <= self.hp.epsilon {
            legal_actions.choose(&mut thread_rng()).copied()
        } else {
            self.table.best_action(state)
        }
    }

    /// One Bellman update:
    /// `Q[s,a] <- (1-alpha)*Q[s,a] + alpha*(reward + gamma*max_a' Q[s',a'])`.
    pub fn update(&mut self, state: &StateKey, action: Action, next_state: &StateKey, reward: f64) {
        let alpha = self.hp.alpha;
        let original = self.table.value(state, action);
        let sampled = reward + self.hp.gamma * self.table.max_value(next_state);
        self.table
            .set_value(state, action, (1.0 - alpha) * original + alpha * sampled);
    }

    /// The greedy policy at a state, tie-broken like [`QTable::best_action`].
    pub fn policy_for(&self, state: &StateKey) -> Option<Action> {
        self.table.best_action(state)
    }

    /// Plays one full round end-to-end and learns from it. Returns the
    /// round's net return (the payout sum across hands).
    ///
    /// Reward is sparse: a hand's closing transition is held back and
    /// rewarded with that hand's settlement payout; every other transition
    /// is recorded immediately with reward zero. When the dealer deals a
    /// natural, no player hand ever acts and no update is recorded.
    pub fn run_episode(&mut self) -> Result<f64> {
        // Closing transitions, one per hand in order, rewarded at settlement.
        let mut deferred: Vec<(StateKey, Action, StateKey)> = Vec::new();

        self.game.deal_to_player()?;
        self.game.deal_to_dealer(true)?;
        self.game.deal_to_player()?;
        self.game.deal_to_dealer(false)?;

        if !self.game.is_dealer_blackjack() {
            while self.game.current_hand() < self.game.number_of_hands() {
                // A freshly split hand holds a single card until it is
                // topped up here.
                if self.game.current_hand_len() == 1 {
                    self.game.deal_to_player()?;
                }

                let state = self.game.observed_state();
                let action = match self.act(&state) {
                    Some(action) => action,
                    None => break,
                };
                match action {
                    Action::Hit => self.game.hit()?,
                    Action::Stand => self.game.stand()?,
                    Action::Double => self.game.double_down()?,
                    Action::Split => self.game.split()?,
                }

                let hand_over = self.game.is_hand_over();
                let next_state = self.game.observed_state();

                if !hand_over {
                    self.update(&state, action, &next_state, 0.0);
                    // Both halves of a split get an immediate zero-reward
                    // transition.
                    if action == Action::Split {
                        if let Some(sibling_state) = self.game.peek_next_hand_state() {
                            self.update(&state, action, &sibling_state, 0.0);
                        }
                    }
                } else {
                    deferred.push((state, action, next_state));
                }

                self.game.advance_hand()?;
            }
        }

        let payouts = self.game.settle()?;
        let net_return = payouts.iter().sum();
        for (i, (state, action, next_state)) in deferred.into_iter().enumerate() {
            self.update(&state, action, &next_state, payouts[i]);
        }

        self.game.reset()?;
        self.decay_schedules();
        Ok(net_return)
    }

    /// Once per completed episode, epsilon and alpha decay toward their
    /// floors and never cross them.
    fn decay_schedules(&mut self) {
        self.hp.epsilon = self.hp.epsilon_min.max(self.hp.epsilon * self.hp.epsilon_decay);
        self.hp.alpha = self.hp.alpha_min.max(self.hp.alpha * self.hp.alpha_decay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::RoundPhase;

    fn test_rule() -> Rule {
        Rule::new(1, 0.9).unwrap()
    }

    fn open_state() -> StateKey {
        StateKey {
            player_total: 16,
            is_soft: false,
            dealer_up: 10,
            can_split: false,
            can_double: true,
            can_act: true,
            true_count: 0,
        }
    }

    fn terminal_state() -> StateKey {
        StateKey {
            player_total: 20,
            is_soft: false,
            dealer_up: 10,
            can_split: false,
            can_double: false,
            can_act: false,
            true_count: 0,
        }
    }

    #[test]
    fn act_returns_no_action_for_terminal_states() {
        let agent = QLearningAgent::new(&test_rule(), Hyperparameters::default());
        assert_eq!(agent.act(&terminal_state()), None);
    }

    #[test]
    fn act_always_picks_a_legal_action() {
        let agent = QLearningAgent::new(&test_rule(), Hyperparameters::default());
        let state = open_state();
        let legal_actions = state.legal_actions();
        for _ in 0..200 {
            let action = agent.act(&state).unwrap();
            assert!(legal_actions.contains(&action));
        }
    }

    #[test]
    fn act_is_greedy_when_epsilon_is_zero() {
        let hp = Hyperparameters {
            epsilon: 0.0,
            ..Hyperparameters::default()
        };
        let mut agent = QLearningAgent::new(&test_rule(), hp);
        let state = open_state();
        agent.table.set_value(&state, Action::Stand, 0.7);
        for _ in 0..100 {
            assert_eq!(agent.act(&state), Some(Action::Stand));
        }
    }

    #[test]
    fn update_applies_the_bellman_rule() {
        let hp = Hyperparameters {
            alpha: 0.1,
            gamma: 0.5,
            ..Hyperparameters::default()
        };
        let mut agent = QLearningAgent::new(&test_rule(), hp);
        let state = open_state();
        let next = open_state();
        agent.table.set_value(&next, Action::Hit, 2.0);

        agent.update(&state, Action::Stand, &next, 0.0);
        // (1 - 0.1)*0 + 0.1*(0 + 0.5*2.0)
        assert!((agent.table.value(&state, Action::Stand) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn update_with_zero_gamma_converges_to_the_reward() {
        let hp = Hyperparameters {
            alpha: 0.25,
            gamma: 0.0,
            ..Hyperparameters::default()
        };
        let mut agent = QLearningAgent::new(&test_rule(), hp);
        let state = open_state();
        let next = terminal_state();
        agent.table.set_value(&state, Action::Stand, -3.0);

        for _ in 0..200 {
            agent.update(&state, Action::Stand, &next, 1.5);
        }
        assert!((agent.table.value(&state, Action::Stand) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn decay_never_crosses_the_floors() {
        let hp = Hyperparameters {
            epsilon: 1.0,
            epsilon_min: 0.01,
            epsilon_decay: 0.5,
            alpha: 0.01,
            alpha_min: 0.0001,
            alpha_decay: 0.5,
            ..Hyperparameters::default()
        };
        let mut agent = QLearningAgent::new(&test_rule(), hp);
        for _ in 0..50 {
            agent.decay_schedules();
            assert!(agent.epsilon() >= 0.01);
            assert!(agent.alpha() >= 0.0001);
        }
        assert_eq!(agent.epsilon(), 0.01);
        assert_eq!(agent.alpha(), 0.0001);
    }

    #[test]
    fn policy_for_reads_the_table_without_writing() {
        let mut agent = QLearningAgent::new(&test_rule(), Hyperparameters::default());
        let state = open_state();
        agent.table.set_value(&state, Action::Hit, 0.3);
        assert_eq!(agent.policy_for(&state), Some(Action::Hit));
        assert_eq!(agent.table().len(), 1);
    }

    #[test]
    fn episodes_learn_and_leave_the_game_reset_ready() {
        let mut agent = QLearningAgent::new(&test_rule(), Hyperparameters::default());
        let initial_epsilon = agent.epsilon();
        for _ in 0..2000 {
            let net_return = agent.run_episode().unwrap();
            assert!(net_return.is_finite());
            assert_eq!(agent.game().phase(), RoundPhase::Dealing);
            assert_eq!(agent.game().number_of_hands(), 1);
        }
        assert!(!agent.table().is_empty());
        assert!(agent.epsilon() < initial_epsilon);
    }

    #[test]
    fn snapshot_carries_the_current_hyperparameters() {
        let agent = QLearningAgent::new(&test_rule(), Hyperparameters::default());
        let snapshot = agent.snapshot();
        assert_eq!(snapshot.epsilon, 1.0);
        assert_eq!(snapshot.alpha, 0.01);
        assert_eq!(snapshot.gamma, 0.999);
        assert!(snapshot.is_empty());
    }
}
