//! Policy boundary and the background inference worker.
//!
//! A [`Policy`] maps a flattened observation history to an action vector.
//! [`PolicyRunner::Inline`] calls it on the control tick;
//! [`PolicyRunner::Background`] hands it to a [`PolicyWorker`] thread, keeps
//! at most one inference in flight and consumes the newest finished result
//! on a later tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

use crate::error::SimviewError;

/// External inference function. `None` means "no result this time"; the
/// caller holds its previous action.
pub trait Policy: Send {
    /// Action for a flattened observation history.
    fn predict(&mut self, observation: &[f32]) -> Option<Vec<f32>>;
}

/// [`Policy`] backed by a closure.
pub struct FnPolicy<F>(pub F);

impl<F> Policy for FnPolicy<F>
where
    F: FnMut(&[f32]) -> Option<Vec<f32>> + Send,
{
    fn predict(&mut self, observation: &[f32]) -> Option<Vec<f32>> {
        (self.0)(observation)
    }
}

enum PolicyRequest {
    Predict(Vec<f32>),
    Shutdown,
}

/// Outcome of one background inference.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyResult {
    /// Monotonic id of the request this answers.
    pub request: u64,
    /// The action, or `None` if the policy produced nothing.
    pub action: Option<Vec<f32>>,
}

/// Background thread running a [`Policy`].
pub struct PolicyWorker {
    request_tx: mpsc::Sender<(u64, PolicyRequest)>,
    result: triple_buffer::Output<Option<PolicyResult>>,
    busy: Arc<AtomicBool>,
    next_request: u64,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl PolicyWorker {
    /// Spawn the inference thread.
    ///
    /// # Errors
    ///
    /// Returns [`SimviewError::ThreadSpawn`] if the thread fails to spawn.
    pub fn spawn(policy: Box<dyn Policy>) -> Result<Self, SimviewError> {
        let (request_tx, request_rx) = mpsc::channel();
        let (result_input, result_output) = triple_buffer::triple_buffer(&None);
        let busy = Arc::new(AtomicBool::new(false));
        let worker_busy = Arc::clone(&busy);

        let thread = std::thread::Builder::new()
            .name("policy-worker".into())
            .spawn(move || {
                Self::thread_loop(policy, &request_rx, result_input, &worker_busy);
            })
            .map_err(SimviewError::ThreadSpawn)?;

        Ok(Self {
            request_tx,
            result: result_output,
            busy,
            next_request: 0,
            thread: Some(thread),
        })
    }

    /// Whether an inference is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Start an inference unless one is already running. Returns whether the
    /// request was accepted; overlapping requests are dropped.
    pub fn request(&mut self, observation: Vec<f32>) -> bool {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        let id = self.next_request;
        self.next_request += 1;
        if self
            .request_tx
            .send((id, PolicyRequest::Predict(observation)))
            .is_err()
        {
            self.busy.store(false, Ordering::Release);
            log::warn!("policy worker is gone, dropping request");
            return false;
        }
        true
    }

    /// Newest finished inference not yet consumed.
    pub fn try_recv(&mut self) -> Option<PolicyResult> {
        let _ = self.result.update();
        self.result.output_buffer_mut().take()
    }

    /// Shut down the background thread and wait for it to finish.
    pub fn shutdown(&mut self) {
        let _ = self.request_tx.send((u64::MAX, PolicyRequest::Shutdown));
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }

    fn thread_loop(
        mut policy: Box<dyn Policy>,
        request_rx: &mpsc::Receiver<(u64, PolicyRequest)>,
        mut result_input: triple_buffer::Input<Option<PolicyResult>>,
        busy: &AtomicBool,
    ) {
        while let Ok((request, message)) = request_rx.recv() {
            let PolicyRequest::Predict(observation) = message else {
                break;
            };
            let action = policy.predict(&observation);
            if action.is_none() {
                log::warn!("policy returned no action for request {request}");
            }
            // Publish before clearing busy: once idle, the result is visible.
            result_input.write(Some(PolicyResult { request, action }));
            busy.store(false, Ordering::Release);
        }
    }
}

impl Drop for PolicyWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Where policy inference runs.
pub enum PolicyRunner {
    /// No policy: the previous action is always held.
    None,
    /// Called synchronously on the control tick.
    Inline(Box<dyn Policy>),
    /// Called on a worker thread; results arrive on a later tick.
    Background(PolicyWorker),
}

impl PolicyRunner {
    /// Feed the newest observation and return a fresh action if one is
    /// available this tick.
    pub fn tick(&mut self, observation: &[f32]) -> Option<Vec<f32>> {
        match self {
            Self::None => None,
            Self::Inline(policy) => policy.predict(observation),
            Self::Background(worker) => {
                let finished = worker.try_recv().and_then(|r| r.action);
                let _ = worker.request(observation.to_vec());
                finished
            }
        }
    }

    /// Whether any policy is attached.
    #[must_use]
    pub fn is_some(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Whether a background inference is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Background(worker) if worker.is_busy())
    }
}

impl std::fmt::Debug for PolicyRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::None => "None",
            Self::Inline(_) => "Inline",
            Self::Background(_) => "Background",
        };
        f.write_str(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn wait_for(worker: &mut PolicyWorker) -> PolicyResult {
        for _ in 0..500 {
            if let Some(result) = worker.try_recv() {
                return result;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        panic!("policy worker produced nothing");
    }

    fn wait_idle(worker: &PolicyWorker) {
        for _ in 0..500 {
            if !worker.is_busy() {
                return;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        panic!("policy worker stayed busy");
    }

    #[test]
    fn inline_policy_runs_immediately() {
        let mut runner = PolicyRunner::Inline(Box::new(FnPolicy(|obs: &[f32]| {
            Some(vec![obs.iter().sum::<f32>()])
        })));
        assert_eq!(runner.tick(&[1.0, 2.0]), Some(vec![3.0]));
        assert!(PolicyRunner::None.tick(&[1.0]).is_none());
    }

    #[test]
    fn worker_round_trip() {
        let mut worker =
            PolicyWorker::spawn(Box::new(FnPolicy(|obs: &[f32]| Some(obs.to_vec())))).unwrap();
        assert!(worker.request(vec![0.5, -0.5]));
        let result = wait_for(&mut worker);
        assert_eq!(result.request, 0);
        assert_eq!(result.action, Some(vec![0.5, -0.5]));
        wait_idle(&worker);
    }

    #[test]
    fn overlapping_requests_are_dropped() {
        // The policy blocks until the test lets it go.
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let gate = std::sync::Mutex::new(gate_rx);
        let mut worker = PolicyWorker::spawn(Box::new(FnPolicy(move |_: &[f32]| {
            gate.lock().ok()?.recv().ok()?;
            Some(vec![1.0])
        })))
        .unwrap();

        assert!(worker.request(vec![0.0]));
        assert!(worker.is_busy());
        assert!(!worker.request(vec![1.0]));
        gate_tx.send(()).unwrap();
        let result = wait_for(&mut worker);
        assert_eq!(result.request, 0);
        wait_idle(&worker);
        assert!(worker.request(vec![2.0]));
        gate_tx.send(()).unwrap();
        assert_eq!(wait_for(&mut worker).request, 1);
    }

    #[test]
    fn failed_inference_is_reported_as_none() {
        let mut worker = PolicyWorker::spawn(Box::new(FnPolicy(|_: &[f32]| None))).unwrap();
        assert!(worker.request(vec![0.0]));
        assert_eq!(wait_for(&mut worker).action, None);
    }
}
