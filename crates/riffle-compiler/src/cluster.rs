//! Bounded cluster-information lookup and instance-type selection.
//!
//! The provider call may block on a remote job manager, so it runs on a
//! dedicated worker thread that reports through a channel; the compiler
//! waits with a deadline. The result is written once — a worker completing
//! after the timeout sends into a dropped channel and is harmless.

use std::collections::BTreeMap;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use riffle_core::error::{Error, Result};
use riffle_core::instance::{ClusterInfo, InstanceTypeDescription};

/// Fetch the available instance types, waiting at most `timeout`.
///
/// Distinguishes three failures: the provider reported an error, the
/// provider answered with an empty instance map, and the deadline expired.
pub fn fetch_instance_types(
    provider: Arc<dyn ClusterInfo>,
    timeout: Duration,
) -> Result<BTreeMap<String, InstanceTypeDescription>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("compiler-cluster-info".to_string())
        .spawn(move || {
            let _ = tx.send(provider.instance_types());
        })
        .map_err(|e| Error::ClusterInfo(format!("could not start lookup worker: {e}")))?;

    match rx.recv_timeout(timeout) {
        Ok(Ok(types)) if types.is_empty() => Err(Error::ClusterInfo(
            "no instances are currently registered at the job manager; \
             if the system has recently started, retry in a few seconds"
                .to_string(),
        )),
        Ok(Ok(types)) => Ok(types),
        Ok(Err(e)) => Err(Error::ClusterInfo(format!(
            "available instances could not be determined: {e}"
        ))),
        Err(RecvTimeoutError::Timeout) => Err(Error::ClusterInfo(format!(
            "lookup of available instances timed out after {} ms",
            timeout.as_millis()
        ))),
        Err(RecvTimeoutError::Disconnected) => Err(Error::ClusterInfo(
            "lookup worker terminated without an answer".to_string(),
        )),
    }
}

/// Pick the instance type to schedule on.
///
/// Among types reporting hardware, prefer the one offering more instances
/// without losing much memory (more instances and memory x 1.2 above the
/// best so far), or significantly more total memory at a comparable core
/// count (instances x cores at least the best's and memory x 1.5 above).
/// Deterministic because the map iterates in key order.
pub fn pick_instance_type(
    types: &BTreeMap<String, InstanceTypeDescription>,
) -> Result<InstanceTypeDescription> {
    let mut best: Option<&InstanceTypeDescription> = None;
    let mut best_instances: u64 = 0;
    let mut best_cores: u64 = 0;
    let mut best_memory: u64 = 0;

    for descr in types.values() {
        let Some(hardware) = &descr.hardware else {
            // no hardware reported yet, typically an unregistered type
            continue;
        };
        let instances = descr.max_instances as u64;
        let cores = hardware.num_cores as u64;
        let memory = instances * hardware.free_memory_bytes;

        let take = match best {
            None => true,
            Some(_) => {
                (instances > best_instances && (memory as f64 * 1.2) as u64 > best_memory)
                    || (instances * cores >= best_instances * best_cores
                        && (memory as f64 * 1.5) as u64 > best_memory)
            }
        };
        if take {
            best = Some(descr);
            best_instances = instances;
            best_cores = cores;
            best_memory = memory;
        }
    }

    best.cloned().ok_or_else(|| {
        Error::ClusterInfo(
            "no instances are currently registered at the job manager; \
             if the system has recently started, retry in a few seconds"
                .to_string(),
        )
    })
}
