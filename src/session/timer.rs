//! Per-round countdown
//!
//! A `RoundTimer` belongs to exactly one round. The session actor polls it in
//! its `select!` loop and drops it when the round ends, so a timer can never
//! fire into a later round.

use std::time::Duration;
use tokio::time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior};

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// One more second elapsed
    Tick { question_index: usize, remaining: u16 },
    Expired { question_index: usize },
}

#[derive(Debug)]
pub struct RoundTimer {
    question_index: usize,
    deadline: Instant,
    ticker: Option<Interval>,
}

impl RoundTimer {
    pub fn start(question_index: usize, limit: Duration, ticks: bool) -> Self {
        let now = Instant::now();
        let ticker = ticks.then(|| {
            let mut ticker = interval_at(now + TICK, TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });

        Self {
            question_index,
            deadline: now + limit,
            ticker,
        }
    }

    /// Wait for the next tick or the deadline. Cancel safe.
    pub async fn next(&mut self) -> TimerEvent {
        let question_index = self.question_index;
        let deadline = self.deadline;

        let Some(ticker) = self.ticker.as_mut() else {
            sleep_until(deadline).await;
            return TimerEvent::Expired { question_index };
        };

        tokio::select! {
            biased;

            _ = sleep_until(deadline) => TimerEvent::Expired { question_index },
            at = ticker.tick() => {
                if at >= deadline {
                    TimerEvent::Expired { question_index }
                } else {
                    TimerEvent::Tick {
                        question_index,
                        remaining: whole_seconds(deadline - at),
                    }
                }
            }
        }
    }
}

/// Round up to whole seconds for display
fn whole_seconds(d: Duration) -> u16 {
    let secs = d.as_millis().div_ceil(1000);
    u16::try_from(secs).unwrap_or(u16::MAX)
}

/// Next event of an optional timer; pends forever while no round is running
pub async fn next_timer_event(timer: &mut Option<RoundTimer>) -> TimerEvent {
    match timer {
        Some(timer) => timer.next().await,
        None => std::future::pending().await,
    }
}
