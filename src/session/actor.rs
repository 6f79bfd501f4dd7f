use super::timer::{next_timer_event, RoundTimer, TimerEvent};
use super::{BeginOutcome, Session, SessionCommand};
use crate::protocol::{deliver, HostEvent};
use crate::registry::RoomRegistry;
use crate::types::Phase;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use ulid::Ulid;

/// Drive one session until it ends.
///
/// Commands are applied strictly in arrival order, interleaved with the events
/// of the current round's timer. On exit the session removes itself from the
/// registry and is dropped, which closes every member's outbox.
pub async fn run(
    mut session: Session,
    mut commands: mpsc::Receiver<SessionCommand>,
    registry: Arc<RoomRegistry>,
    key: Ulid,
    send_ticks: bool,
) {
    let room_id = session.room_id();
    let mut timer: Option<RoundTimer> = None;

    session.announce();

    loop {
        tokio::select! {
            cmd = commands.recv() => {
                match cmd {
                    Some(cmd) => apply(&mut session, &mut timer, cmd, send_ticks),
                    None => {
                        tracing::debug!("Room {}: all handles dropped", room_id);
                        session.shutdown();
                        break;
                    }
                }
            }

            event = next_timer_event(&mut timer) => {
                on_timer(&mut session, &mut timer, event);
            }
        }

        if session.phase() == Phase::Ended {
            break;
        }
    }

    registry.release(room_id, key).await;
    drop(session);
    tracing::info!("Room {}: session closed", room_id);
}

fn apply(
    session: &mut Session,
    timer: &mut Option<RoundTimer>,
    cmd: SessionCommand,
    send_ticks: bool,
) {
    match cmd {
        SessionCommand::BeginRound => match session.begin_round(Instant::now()) {
            Ok(BeginOutcome::Started {
                question_index,
                limit,
            }) => {
                *timer = Some(RoundTimer::start(question_index, limit, send_ticks));
                // everyone may have left since the last round
                if session.round_complete() {
                    close_round(session, timer);
                }
            }
            Ok(BeginOutcome::GameOver) => *timer = None,
            Err(e) => session.reject_host(&e),
        },

        SessionCommand::EndRound => close_round(session, timer),

        SessionCommand::ShowLeaderboard => {
            if let Err(e) = session.show_leaderboard() {
                session.reject_host(&e);
            }
        }

        SessionCommand::Join {
            conn,
            username,
            outbox,
            reply,
        } => {
            let result = session.join(conn.clone(), &username, outbox);
            let joined = result.is_ok();
            if reply.send(result).is_err() && joined {
                // the joining connection went away while waiting
                session.leave(&conn);
            }
        }

        SessionCommand::Answer { conn, choice } => {
            match session.record_answer(&conn, choice, Instant::now()) {
                Ok(true) => close_round(session, timer),
                Ok(false) => {}
                Err(e) => session.reject_player(&conn, &e),
            }
        }

        SessionCommand::Leave { conn } => {
            if session.leave(&conn).is_some() && session.round_complete() {
                close_round(session, timer);
            }
        }

        SessionCommand::HostLeft => {
            *timer = None;
            session.host_left();
        }

        SessionCommand::Snapshot { reply } => {
            let _ = reply.send(session.snapshot());
        }

        SessionCommand::Shutdown => {
            *timer = None;
            session.shutdown();
        }
    }
}

fn close_round(session: &mut Session, timer: &mut Option<RoundTimer>) {
    match session.end_round() {
        Ok(_) => *timer = None,
        Err(e) => session.reject_host(&e),
    }
}

fn on_timer(session: &mut Session, timer: &mut Option<RoundTimer>, event: TimerEvent) {
    match event {
        TimerEvent::Tick {
            question_index,
            remaining,
        } => {
            if session.active_question() == Some(question_index) {
                deliver(session.host(), HostEvent::Tick { remaining });
            }
        }
        TimerEvent::Expired { question_index } => {
            *timer = None;
            if session.active_question() == Some(question_index) {
                tracing::debug!("Room {}: time is up", session.room_id());
                if let Err(e) = session.end_round() {
                    tracing::warn!("Room {}: could not end round: {}", session.room_id(), e);
                }
            }
        }
    }
}
