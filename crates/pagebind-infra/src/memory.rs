//! Process heap sampling backed by `sysinfo`

use std::sync::Mutex;

use pagebind_processing::HeapSampler;
use sysinfo::{Pid, System};

/// Reports the resident memory of the current process.
///
/// Inert (always `None`) on platforms `sysinfo` does not support.
pub struct ProcessHeapSampler {
    pid: Option<Pid>,
    system: Mutex<System>,
}

impl ProcessHeapSampler {
    pub fn new() -> Self {
        let pid = if sysinfo::IS_SUPPORTED_SYSTEM {
            sysinfo::get_current_pid()
                .map_err(|e| tracing::warn!(error = e, "Cannot resolve current pid"))
                .ok()
        } else {
            None
        };
        if pid.is_none() {
            tracing::info!("Process memory sampling unavailable on this host");
        }

        Self {
            pid,
            system: Mutex::new(System::new()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.pid.is_some()
    }
}

impl Default for ProcessHeapSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl HeapSampler for ProcessHeapSampler {
    fn sample(&self) -> Option<u64> {
        let pid = self.pid?;
        let mut system = match self.system.lock() {
            Ok(guard) => guard,
            Err(e) => {
                tracing::error!(error = %e, "Failed to acquire system lock for memory sample");
                return None;
            }
        };
        if !system.refresh_process(pid) {
            return None;
        }
        system.process(pid).map(|p| p.memory())
    }
}

impl std::fmt::Debug for ProcessHeapSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHeapSampler")
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}
