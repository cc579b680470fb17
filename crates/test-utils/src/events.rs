use std::time::Duration;

use autorunner::exec::{SessionEvent, SessionOutcome, SessionOutput};
use autorunner::host::HostEvent;
use tokio::sync::mpsc;

/// Output lines and the single outcome of a finished session.
#[derive(Debug)]
pub struct Transcript {
    pub lines: Vec<String>,
    pub outcome: SessionOutcome,
    /// Events received after `Finished`; always expected to be empty.
    pub trailing: Vec<SessionEvent>,
}

/// Drain a session's output to the end, panicking after `limit`.
pub async fn transcript(output: SessionOutput, limit: Duration) -> Transcript {
    let events = crate::with_timeout_of(limit, output.collect()).await;

    let mut lines = Vec::new();
    let mut iter = events.into_iter();
    let outcome = loop {
        match iter.next() {
            Some(SessionEvent::Output(line)) => lines.push(line),
            Some(SessionEvent::Finished(outcome)) => break outcome,
            None => panic!("session output closed without Finished"),
        }
    };

    Transcript {
        lines,
        outcome,
        trailing: iter.collect(),
    }
}

/// Receive host events until one matches `pred`, returning it and everything
/// seen before it.
pub async fn host_event_matching<F>(
    rx: &mut mpsc::UnboundedReceiver<HostEvent>,
    limit: Duration,
    mut pred: F,
) -> (HostEvent, Vec<HostEvent>)
where
    F: FnMut(&HostEvent) -> bool,
{
    crate::with_timeout_of(limit, async {
        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            if pred(&event) {
                return (event, seen);
            }
            seen.push(event);
        }
        panic!("host event channel closed; seen: {seen:?}");
    })
    .await
}
