// src/controller/sync.rs

use std::future::{poll_fn, Future};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures_core::future::BoxFuture;
use futures_core::Stream;
use tracing::debug;

use protondrive_common::models::{
    classify_sync_line, is_transfer_line, Severity, SyncProgressLine, SyncSummary, ToolLine, ToolStream,
};
use protondrive_common::{ControllerError, Result};

use crate::eventbus::ActivityLog;

/// Live output of a running `rclone sync`.
///
/// Lines arrive in the order rclone wrote them and end with exactly one
/// [`SyncProgressLine::Finished`]. Dropping the value stops the transfer.
pub struct SyncProgress {
    stream: ToolStream,
    remote: String,
    activity: ActivityLog,
    summary: SyncSummary,
    last_error: Option<String>,
    /// `(success, partial)` once the terminal line has been produced.
    outcome: Option<(bool, bool)>,
    /// Terminal activity still being published, and the line it holds back.
    reporting: Option<(BoxFuture<'static, ()>, SyncProgressLine)>,
}

impl SyncProgress {
    pub(crate) fn new(stream: ToolStream, remote: String, activity: ActivityLog) -> Self {
        Self {
            stream,
            remote,
            activity,
            summary: SyncSummary::default(),
            last_error: None,
            outcome: None,
            reporting: None,
        }
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some() && self.reporting.is_none()
    }

    /// Counters so far.
    pub fn summary(&self) -> &SyncSummary {
        &self.summary
    }

    /// Cancel safe: an interrupted call loses no output.
    pub async fn next(&mut self) -> Option<SyncProgressLine> {
        poll_fn(|cx| Pin::new(&mut *self).poll_next(cx)).await
    }

    /// Stop the transfer. Output already produced is still delivered and
    /// the terminal line reports failure.
    pub fn cancel(&mut self) {
        if self.outcome.is_none() && !self.stream.is_cancelled() {
            debug!("Cancelling sync to {}", self.remote);
            self.stream.cancel();
        }
    }

    /// Drain the remaining output.
    pub async fn finish(mut self) -> Result<SyncSummary> {
        while self.next().await.is_some() {}
        match self.outcome {
            Some((true, _)) => Ok(self.summary),
            Some((false, partial)) => Err(ControllerError::SyncFailed {
                partial,
                diagnostic: self.failure_diagnostic(),
            }),
            None => Err(ControllerError::SyncFailed {
                partial: self.summary.transfer_lines > 0,
                diagnostic: "sync output ended unexpectedly".into(),
            }),
        }
    }

    /// Turn one raw line into a progress item. `None` means skip it, or that
    /// the terminal line is parked in `reporting`.
    fn absorb(&mut self, line: Option<ToolLine>) -> Option<SyncProgressLine> {
        let (success, exit_code) = match line {
            Some(ToolLine::Output(text)) => {
                let text = text.trim_end().to_string();
                if text.trim().is_empty() {
                    return None;
                }
                let severity = classify_sync_line(&text);
                self.summary.lines += 1;
                if is_transfer_line(&text) {
                    self.summary.transfer_lines += 1;
                }
                if severity == Severity::Error {
                    self.summary.errors += 1;
                    self.last_error = Some(text.clone());
                }
                return Some(SyncProgressLine::Output { text, severity });
            }
            Some(ToolLine::Exit { success, code }) => (success, code),
            None => (false, None),
        };

        let partial = !success && self.summary.transfer_lines > 0;
        self.summary.exit_code = exit_code;
        self.outcome = Some((success, partial));

        let (severity, message) = if success {
            (
                Severity::Success,
                format!("Sync to {} finished ({} lines)", self.remote, self.summary.lines),
            )
        } else if self.stream.is_cancelled() {
            (Severity::Warning, format!("Sync to {} was stopped", self.remote))
        } else {
            let note = if partial { " (remote may be partially updated)" } else { "" };
            (
                Severity::Error,
                format!("Sync to {} failed{}: {}", self.remote, note, self.failure_diagnostic()),
            )
        };
        let activity = self.activity.clone();
        self.reporting = Some((
            Box::pin(async move { activity.record(severity, message).await }),
            SyncProgressLine::Finished {
                success,
                exit_code,
                partial,
            },
        ));
        None
    }

    fn failure_diagnostic(&self) -> String {
        if let Some(line) = &self.last_error {
            return line.clone();
        }
        if self.stream.is_cancelled() {
            return "sync was cancelled".to_string();
        }
        match self.summary.exit_code {
            Some(code) => format!("rclone sync exited with code {}", code),
            None => "rclone sync was terminated".to_string(),
        }
    }
}

impl Stream for SyncProgress {
    type Item = SyncProgressLine;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some((publish, _)) = this.reporting.as_mut() {
                ready!(publish.as_mut().poll(cx));
                return Poll::Ready(this.reporting.take().map(|(_, line)| line));
            }
            if this.outcome.is_some() {
                return Poll::Ready(None);
            }
            let line = ready!(this.stream.poll_next_line(cx));
            if let Some(item) = this.absorb(line) {
                return Poll::Ready(Some(item));
            }
        }
    }
}

impl std::fmt::Debug for SyncProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncProgress")
            .field("remote", &self.remote)
            .field("summary", &self.summary)
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventbus::EventBus;
    use futures_util::StreamExt;

    fn progress(lines: &[&str], success: bool, code: Option<i32>) -> SyncProgress {
        let stream = ToolStream::scripted(lines.iter().copied(), success, code);
        SyncProgress::new(stream, "protondrive:backup".into(), ActivityLog::new(EventBus::new()))
    }

    #[tokio::test]
    async fn skips_blank_lines_and_ends_with_finished() {
        let items: Vec<_> = progress(&["Checks: 1", "", "Transferred: 1 / 1, 100%"], true, Some(0))
            .collect()
            .await;
        assert_eq!(items.len(), 3);
        assert!(matches!(&items[1], SyncProgressLine::Output { severity: Severity::Success, .. }));
        assert_eq!(
            items[2],
            SyncProgressLine::Finished { success: true, exit_code: Some(0), partial: false }
        );
    }

    #[tokio::test]
    async fn failure_after_transfer_is_partial() {
        let err = progress(
            &["Transferred: 1 / 2, 50%", "2024/05/01 ERROR : b.txt: quota exceeded"],
            false,
            Some(1),
        )
        .finish()
        .await
        .unwrap_err();
        match err {
            ControllerError::SyncFailed { partial, diagnostic } => {
                assert!(partial);
                assert!(diagnostic.contains("quota exceeded"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn finish_counts_lines() {
        let summary = progress(&["Copied (new) a.txt", "Transferred: 1 / 1, 100%"], true, Some(0))
            .finish()
            .await
            .unwrap();
        assert_eq!(summary.lines, 2);
        assert_eq!(summary.transfer_lines, 2);
        assert_eq!(summary.errors, 0);
        assert_eq!(summary.exit_code, Some(0));
    }
}
