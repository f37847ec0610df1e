use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::events::{FrameEvent, StopReason};
use crate::playback::{Flipbook, StartOptions};
use crate::store::Frame;
use crate::tasks::engine::{self, Command, Status};

const COMMAND_QUEUE: usize = 64;

/// Spawns the engine task on the current runtime and returns the handle for
/// it. Cancelling the token tears the engine down; dropping every handle
/// does the same.
pub fn spawn(cancel: CancellationToken) -> (FlipbookHandle, JoinHandle<anyhow::Result<()>>) {
    let (tx, rx) = mpsc::channel(COMMAND_QUEUE);
    let task = tokio::spawn(engine::run(Flipbook::new(), rx, cancel));
    (FlipbookHandle { tx }, task)
}

/// Cloneable front door to a running engine task. Every method marshals
/// onto the engine's own task, so callers may live on any thread.
#[derive(Clone)]
pub struct FlipbookHandle {
    tx: mpsc::Sender<Command>,
}

impl FlipbookHandle {
    pub async fn append(&self, frame: Frame) -> Result<(), Error> {
        self.send(Command::Append(frame)).await
    }

    pub async fn replace_all(&self, frames: Vec<Frame>) -> Result<(), Error> {
        self.send(Command::ReplaceAll(frames)).await
    }

    pub async fn clear(&self) -> Result<(), Error> {
        self.send(Command::Clear).await
    }

    pub async fn set_uniform_duration(&self, duration: Duration) -> Result<(), Error> {
        self.send(Command::SetUniformDuration(duration)).await
    }

    pub async fn start(&self, opts: StartOptions) -> Result<(), Error> {
        self.send(Command::Start(opts)).await
    }

    pub async fn stop(&self) -> Result<(), Error> {
        self.send(Command::Stop).await
    }

    /// Scrubs to `offset`. `Ok(None)` means the offset was out of range and
    /// the position is unchanged; autoplay is halted either way.
    pub async fn scrub(&self, offset: usize) -> Result<Option<usize>, Error> {
        let (reply, answer) = oneshot::channel();
        self.send(Command::Scrub { offset, reply }).await?;
        answer.await.map_err(|_| Error::EngineClosed)
    }

    pub async fn peek(&self) -> Result<Option<Frame>, Error> {
        let (reply, answer) = oneshot::channel();
        self.send(Command::Peek(reply)).await?;
        answer.await.map_err(|_| Error::EngineClosed)
    }

    pub async fn frame_at(&self, offset: usize) -> Result<Option<Frame>, Error> {
        let (reply, answer) = oneshot::channel();
        self.send(Command::FrameAt { offset, reply }).await?;
        answer.await.map_err(|_| Error::EngineClosed)
    }

    pub async fn status(&self) -> Result<Status, Error> {
        let (reply, answer) = oneshot::channel();
        self.send(Command::Status(reply)).await?;
        answer.await.map_err(|_| Error::EngineClosed)
    }

    pub async fn is_animating(&self) -> Result<bool, Error> {
        Ok(self.status().await?.animating)
    }

    pub async fn len(&self) -> Result<usize, Error> {
        Ok(self.status().await?.count)
    }

    pub async fn total_duration(&self) -> Result<Duration, Error> {
        Ok(self.status().await?.total_duration)
    }

    /// Valid scrub range, empty while the store is empty.
    pub async fn index_range(&self) -> Result<std::ops::Range<usize>, Error> {
        Ok(0..self.status().await?.count)
    }

    /// Registers on the continuous push channel.
    pub async fn subscribe(&self) -> Result<mpsc::Receiver<FrameEvent>, Error> {
        let (reply, answer) = oneshot::channel();
        self.send(Command::Subscribe(reply)).await?;
        answer.await.map_err(|_| Error::EngineClosed)
    }

    /// Registers the completion hook, replacing any previous one.
    pub async fn on_complete(
        &self,
        hook: impl FnMut(StopReason) + Send + 'static,
    ) -> Result<(), Error> {
        self.send(Command::OnComplete(Box::new(hook))).await
    }

    async fn send(&self, cmd: Command) -> Result<(), Error> {
        self.tx.send(cmd).await.map_err(|_| Error::EngineClosed)
    }
}
