use anyhow::Result;
use std::time::Duration;
use tokio::select;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::events::{CompletionHook, FrameEvent, StopReason};
use crate::playback::{Flipbook, StartOptions};
use crate::store::Frame;

/// Control messages accepted by the engine task. Queries carry a oneshot
/// reply so callers never touch engine state directly.
pub enum Command {
    Append(Frame),
    ReplaceAll(Vec<Frame>),
    Clear,
    SetUniformDuration(Duration),
    Start(StartOptions),
    Stop,
    Scrub {
        offset: usize,
        reply: oneshot::Sender<Option<usize>>,
    },
    Peek(oneshot::Sender<Option<Frame>>),
    FrameAt {
        offset: usize,
        reply: oneshot::Sender<Option<Frame>>,
    },
    Status(oneshot::Sender<Status>),
    Subscribe(oneshot::Sender<mpsc::Receiver<FrameEvent>>),
    OnComplete(CompletionHook),
}

/// Snapshot of engine state answered by [`Command::Status`].
#[derive(Debug, Clone)]
pub struct Status {
    pub count: usize,
    pub total_duration: Duration,
    pub current_index: usize,
    pub animating: bool,
}

/// The single-threaded executor the flipbook is pinned to: one task owns all
/// state and everything else talks to it over the command channel.
///
/// The tick timer is the `sleep_until` branch, armed only while a deadline
/// is set. Stop, scrub, and sequence replacement rewrite the deadline before
/// the loop polls again, so a cancelled animation can never ghost-tick.
/// Cancelling the token tears the engine down without firing the completion
/// hook.
pub async fn run(
    mut book: Flipbook,
    mut rx: mpsc::Receiver<Command>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut deadline: Option<Instant> = None;

    loop {
        select! {
            _ = cancel.cancelled() => {
                debug!("engine cancelled");
                break;
            }

            maybe_cmd = rx.recv() => {
                match maybe_cmd {
                    Some(cmd) => apply(&mut book, cmd, &mut deadline),
                    None => {
                        debug!("all handles dropped, engine exiting");
                        break;
                    }
                }
            }

            _ = sleep_until(deadline.unwrap_or_else(far_future)), if deadline.is_some() => {
                // Schedule from the deadline that just fired, not from
                // "now", so emission cadence does not drift.
                let base = deadline.take().unwrap_or_else(Instant::now);
                deadline = book.tick().map(|delay| base + delay);
            }
        }
    }

    Ok(())
}

fn apply(book: &mut Flipbook, cmd: Command, deadline: &mut Option<Instant>) {
    match cmd {
        Command::Append(frame) => book.append(frame),
        Command::ReplaceAll(frames) => {
            // Open choice in the design: a swap cancels the pending tick
            // immediately rather than letting it fire against stale data.
            book.replace_all(frames);
            *deadline = None;
        }
        Command::Clear => {
            book.clear();
            *deadline = None;
        }
        Command::SetUniformDuration(duration) => book.set_uniform_duration(duration),
        Command::Start(opts) => {
            *deadline = book.start(opts).map(|delay| Instant::now() + delay);
        }
        Command::Stop => {
            book.stop(StopReason::UserStopped);
            *deadline = None;
        }
        Command::Scrub { offset, reply } => {
            let accepted = book.set_current_frame(offset);
            *deadline = None;
            let _ = reply.send(accepted);
        }
        Command::Peek(reply) => {
            let _ = reply.send(book.peek().cloned());
        }
        Command::FrameAt { offset, reply } => {
            let _ = reply.send(book.frame_at(offset).cloned());
        }
        Command::Status(reply) => {
            let _ = reply.send(Status {
                count: book.len(),
                total_duration: book.total_duration(),
                current_index: book.current_index(),
                animating: book.is_animating(),
            });
        }
        Command::Subscribe(reply) => {
            let _ = reply.send(book.subscribe());
        }
        Command::OnComplete(hook) => book.set_completion_hook(hook),
    }
}

fn far_future() -> Instant {
    // Placeholder for the disabled timer branch; never polled.
    Instant::now() + Duration::from_secs(86_400)
}
