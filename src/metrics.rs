//! Best-effort memory measurement of a running child process.

use std::time::Duration;

use sysinfo::{Pid, System};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;

const SAMPLE_INTERVAL: Duration = Duration::from_millis(50);

/// Samples the child's resident memory while it runs and reports the
/// peak in MiB. Strictly best-effort: a dead pid, a denied read, or a
/// process too short-lived to be sampled all yield 0.
pub struct MemorySampler {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<u64>,
}

impl MemorySampler {
    pub fn spawn(pid: u32) -> Self {
        let (stop, mut stop_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let pid = Pid::from_u32(pid);
            let mut system = System::new();
            let mut peak_bytes: u64 = 0;
            loop {
                if !system.refresh_process(pid) {
                    break;
                }
                if let Some(process) = system.process(pid) {
                    peak_bytes = peak_bytes.max(process.memory());
                }
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = sleep(SAMPLE_INTERVAL) => {}
                }
            }
            peak_bytes / (1024 * 1024)
        });
        Self { stop, handle }
    }

    /// Stop sampling and return the peak reading in MiB.
    pub async fn finish(self) -> u64 {
        let _ = self.stop.send(());
        self.handle.await.unwrap_or(0)
    }
}
