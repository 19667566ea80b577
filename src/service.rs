use std::{sync::Arc, time::Duration};

use log::{debug, info, warn};
use tokio::{runtime::Handle, sync::Semaphore, task::JoinHandle};
use uuid::Uuid;

use crate::{
    accessor::{AccessFlags, AccessGrantor, ResourceAccessor},
    config::TransferConfig,
    copy::{copy_stream, CancelFlag, CopyReport},
    errors::{Result, TransferError, STATUS_SUCCESS},
    id::ResourceId,
    pick::{PickOutcome, PickRequest, PickSlot, Picker},
};

/// Picks documents through the host picker and copies bytes between
/// resources.
///
/// Copies run on tokio's blocking pool, at most
/// [`TransferConfig::max_concurrent_copies`] at a time. Only one pick can be
/// waiting for the picker; starting another one fails the earlier caller with
/// [`TransferError::Superseded`].
pub struct TransferService {
    accessor: Arc<dyn ResourceAccessor>,
    grantor: Arc<dyn AccessGrantor>,
    picker: Arc<dyn Picker>,
    config: TransferConfig,
    workers: Arc<Semaphore>,
    picks: PickSlot,
}

impl TransferService {
    pub fn new(
        accessor: Arc<dyn ResourceAccessor>,
        grantor: Arc<dyn AccessGrantor>,
        picker: Arc<dyn Picker>,
        config: TransferConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            accessor,
            grantor,
            picker,
            workers: Arc::new(Semaphore::new(config.max_concurrent_copies)),
            config,
            picks: PickSlot::default(),
        })
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Asks the picker for a document of any type and returns it once the
    /// host has answered through [`TransferService::complete_pick`].
    ///
    /// The picked document gets persistable read and write grants before it
    /// is handed back. The returned future always resolves: with the
    /// document, or with `PickCancelled`, `Superseded`, `TimedOut` or the
    /// picker's own failure.
    pub async fn request_pick(&self) -> Result<ResourceId> {
        let request = PickRequest::any_document();
        debug!("Launching picker for {}", request.token);
        let reply = self
            .picks
            .open(&request, self.picker.as_ref())
            .map_err(|e| {
                warn!("Picker failed to launch: {}", e);
                e
            })?;

        let answer = match self.config.pick_timeout() {
            Some(limit) => match tokio::time::timeout(limit, reply).await {
                Ok(answer) => answer,
                Err(_) => {
                    self.picks.discard(request.token);
                    warn!("Pick {} timed out after {:?}", request.token, limit);
                    return Err(TransferError::TimedOut);
                }
            },
            None => reply.await,
        };

        // A dropped sender means the slot went away with the service.
        let outcome = answer.map_err(|_| TransferError::Superseded)??;
        match outcome {
            PickOutcome::Selected(id) => {
                self.grantor
                    .take_persistable(&id, AccessFlags::READ | AccessFlags::WRITE)?;
                info!("Picked {}", id);
                Ok(id)
            }
            PickOutcome::NoSelection | PickOutcome::Cancelled => {
                debug!("Pick {} ended without a document", request.token);
                Err(TransferError::PickCancelled)
            }
        }
    }

    /// Delivers the picker's answer for the request carrying `token`.
    pub fn complete_pick(&self, token: Uuid, outcome: PickOutcome) -> Result<()> {
        self.picks.resolve(token, Ok(outcome)).map_err(|e| {
            warn!("Ignoring picker answer for {}: {}", token, e);
            e
        })
    }

    /// Fails the request carrying `token` with a host-side error.
    pub fn fail_pick(&self, token: Uuid, error: TransferError) -> Result<()> {
        self.picks.resolve(token, Err(error))
    }

    /// Token of the pick currently waiting for the picker, if any.
    pub fn pending_pick(&self) -> Option<Uuid> {
        self.picks.pending_token()
    }

    /// Starts copying `source` into `destination` on a worker and returns at
    /// once.
    ///
    /// Must be called from within a tokio runtime.
    pub fn copy(
        &self,
        source: ResourceId,
        destination: ResourceId,
    ) -> Result<CopyHandle> {
        let runtime = Handle::try_current()
            .map_err(|e| TransferError::Other(anyhow::anyhow!(e)))?;

        let cancel = CancelFlag::new();
        let task = runtime.spawn(run_on_worker(
            self.accessor.clone(),
            self.workers.clone(),
            source,
            destination,
            self.config.chunk_size,
            cancel.clone(),
        ));

        Ok(CopyHandle {
            cancel,
            task,
            timeout: self.config.copy_timeout(),
        })
    }

    /// Copies and reduces the result to a status code: `0` on success, the
    /// error's [`TransferError::status_code`] otherwise.
    pub async fn copy_status(&self, source: &str, destination: &str) -> i32 {
        match self.copy_files(source, destination).await {
            Ok(_) => STATUS_SUCCESS,
            Err(e) => e.status_code(),
        }
    }

    /// Parses both identifiers, copies and waits for the outcome.
    pub async fn copy_files(&self, source: &str, destination: &str) -> Result<CopyReport> {
        info!("Copying {} to {}", source, destination);
        let result = match (ResourceId::parse(source), ResourceId::parse(destination)) {
            (Ok(source), Ok(destination)) => match self.copy(source, destination) {
                Ok(handle) => handle.wait().await,
                Err(e) => Err(e),
            },
            (Err(e), _) | (_, Err(e)) => Err(e),
        };

        match &result {
            Ok(report) => info!(
                "Copied {} bytes from {} to {} in {:?}",
                report.bytes, source, destination, report.elapsed
            ),
            Err(e) => warn!("Copy from {} to {} failed: {}", source, destination, e),
        }
        result
    }
}

/// A copy running on a worker.
///
/// Dropping the handle leaves the copy running to completion.
pub struct CopyHandle {
    cancel: CancelFlag,
    task: JoinHandle<Result<CopyReport>>,
    timeout: Option<Duration>,
}

impl CopyHandle {
    /// Stops the copy. [`CopyHandle::wait`] returns `Cancelled` at once; the
    /// worker stops at its next chunk boundary and releases both streams
    /// then.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the copy to finish, fail or be cancelled.
    ///
    /// A copy blocked inside a read or write does not hold this up: when the
    /// configured copy timeout elapses or the copy is cancelled, the error is
    /// returned straight away and the detached worker releases its streams
    /// once its pending call returns.
    pub async fn wait(self) -> Result<CopyReport> {
        let CopyHandle {
            cancel,
            mut task,
            timeout,
        } = self;

        let deadline = async {
            match timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            joined = &mut task => joined?,
            _ = cancel.cancelled() => Err(TransferError::Cancelled),
            _ = deadline => {
                cancel.cancel();
                warn!("Copy timed out after {:?}", timeout.unwrap_or_default());
                Err(TransferError::TimedOut)
            }
        }
    }
}

async fn run_on_worker(
    accessor: Arc<dyn ResourceAccessor>,
    workers: Arc<Semaphore>,
    source: ResourceId,
    destination: ResourceId,
    chunk_size: usize,
    cancel: CancelFlag,
) -> Result<CopyReport> {
    let _permit = workers
        .acquire_owned()
        .await
        .map_err(|e| TransferError::Other(anyhow::anyhow!(e)))?;
    if cancel.is_cancelled() {
        return Err(TransferError::Cancelled);
    }

    tokio::task::spawn_blocking(move || {
        transfer(accessor.as_ref(), &source, &destination, chunk_size, &cancel)
    })
    .await?
}

/// Opens both ends and copies. The streams live only in this scope, so they
/// are released on every return path.
fn transfer(
    accessor: &dyn ResourceAccessor,
    source: &ResourceId,
    destination: &ResourceId,
    chunk_size: usize,
    cancel: &CancelFlag,
) -> Result<CopyReport> {
    let mut reader = accessor.open_read(source)?;
    let mut writer = accessor.open_write(destination)?;
    copy_stream(&mut *reader, &mut *writer, chunk_size, cancel)
}
