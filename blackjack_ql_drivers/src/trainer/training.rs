use blackjack_ql::learning::QLearningAgent;
use blackjack_ql::{Hyperparameters, MergePolicy, QTable, Result, Rule, TableSnapshot};
use log::info;

/// Runs the full episode budget and returns a snapshot of the learned
/// table.
///
/// With one thread this is the plain sequential loop. With more, the budget
/// is split evenly across workers that each own a private agent (shoe, game
/// and table included), and the finished tables are folded together under
/// the given merge policy; the first worker's final epsilon and alpha go
/// into the snapshot. The shared-nothing workers are what make the episodes
/// safe to run concurrently.
pub fn train(
    rule: &Rule,
    hp: Hyperparameters,
    episodes: u64,
    number_of_threads: usize,
    merge_policy: MergePolicy,
    report_interval: u64,
) -> Result<TableSnapshot> {
    if number_of_threads <= 1 {
        let (table, epsilon, alpha) = train_worker(rule, hp, episodes, report_interval, 0)?;
        return Ok(TableSnapshot::new(&table, epsilon, alpha, hp.gamma));
    }

    let share = episodes / number_of_threads as u64;
    let remainder = episodes % number_of_threads as u64;

    let mut handles = Vec::with_capacity(number_of_threads - 1);
    for worker_id in 1..number_of_threads {
        let rule = *rule;
        let handle = std::thread::spawn(move || {
            train_worker(&rule, hp, share, report_interval, worker_id)
        });
        handles.push(handle);
    }

    // The remainder lands on the worker running on this thread.
    let (mut table, epsilon, alpha) = train_worker(rule, hp, share + remainder, report_interval, 0)?;
    for handle in handles {
        let (worker_table, _, _) = handle.join().expect("training worker panicked")?;
        table.merge_from(worker_table, merge_policy);
    }
    info!(
        "merged {} worker tables ({:?}): {} learned pairs",
        number_of_threads,
        merge_policy,
        table.len()
    );
    Ok(TableSnapshot::new(&table, epsilon, alpha, hp.gamma))
}

fn train_worker(
    rule: &Rule,
    hp: Hyperparameters,
    episodes: u64,
    report_interval: u64,
    worker_id: usize,
) -> Result<(QTable, f64, f64)> {
    let mut agent = QLearningAgent::new(rule, hp);
    let mut total_return = 0.0;
    for episode in 1..=episodes {
        total_return += agent.run_episode()?;
        if report_interval > 0 && episode % report_interval == 0 {
            info!(
                "worker {}: {}/{} episodes, {} learned pairs, epsilon {:.6}, alpha {:.6}, mean return {:+.4}",
                worker_id,
                episode,
                episodes,
                agent.table().len(),
                agent.epsilon(),
                agent.alpha(),
                total_return / episode as f64
            );
        }
    }

    let epsilon = agent.epsilon();
    let alpha = agent.alpha();
    Ok((agent.into_table(), epsilon, alpha))
}
