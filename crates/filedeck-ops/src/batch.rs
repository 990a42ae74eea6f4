//! Runs a whole [`OperationRequest`] and folds the results into an outcome.

use std::path::{Path, PathBuf};

use filedeck_core::OpError;
use tracing::{debug, info};

use crate::conflict;
use crate::engine::{Engine, leaf_name};
use crate::naming;
use crate::operation::{OperationKind, OperationRequest};
use crate::progress::{OperationOutcome, OperationProgress};

impl Engine {
    /// Execute `request` on the calling thread.
    ///
    /// Multi-source requests process sources in order and keep going after
    /// a failing source, so the outcome always accounts for every item. Once
    /// cancelled, the remaining items are recorded as cancelled failures.
    pub fn execute(
        &self,
        request: &OperationRequest,
        mut on_progress: impl FnMut(OperationProgress),
    ) -> OperationOutcome {
        let kind = request.kind();
        let items = request.item_count();

        if let Err(err) = request.validate() {
            info!(%kind, error = %err, "Operation rejected");
            return OperationOutcome::failed(kind, items, primary_path(request), &err);
        }

        info!(%kind, items, "Operation started");
        let mut outcome = OperationOutcome::new(kind, request.affected_directory());

        match request {
            OperationRequest::Copy {
                sources,
                destination,
            } => self.each_source(sources, kind, &mut outcome, &mut on_progress, |source| {
                let name = leaf_name(source).ok_or_else(|| no_name(source))?;
                let target = conflict::resolve(&destination.join(name));
                self.copy(source, &target).map(drop)
            }),
            OperationRequest::Move {
                sources,
                destination,
            } => self.each_source(sources, kind, &mut outcome, &mut on_progress, |source| {
                self.move_into(source, destination).map(drop)
            }),
            OperationRequest::Delete { sources } => {
                self.each_source(sources, kind, &mut outcome, &mut on_progress, |source| {
                    self.delete(source)
                })
            }
            OperationRequest::Compress {
                sources,
                destination,
            } => {
                let result = match naming::archive_name(sources) {
                    Some(name) => {
                        let archive = conflict::resolve(&destination.join(name));
                        let mut report = |path: &Path, index: usize, total: usize| {
                            on_progress(progress(kind, path, index, total, 0, 0));
                        };
                        self.compress_with(sources, &archive, &mut report)
                            .map(drop)
                            .map_err(|err| (archive, err))
                    }
                    None => Err((destination.clone(), OpError::invalid_request("cannot name the archive"))),
                };
                match result {
                    Ok(()) => outcome.record_success(),
                    Err((path, err)) => outcome.record_failure(path, &err),
                }
            }
            OperationRequest::Extract {
                archive,
                destination,
            } => {
                on_progress(progress(kind, archive, 0, 1, 0, 0));
                self.single(&mut outcome, archive, || {
                    self.extract(archive, destination.as_deref()).map(drop)
                });
            }
            OperationRequest::Rename { source, new_name } => {
                on_progress(progress(kind, source, 0, 1, 0, 0));
                self.single(&mut outcome, source, || {
                    self.rename(source, new_name).map(drop)
                });
            }
            OperationRequest::CreateFolder { parent, name } => {
                let path = parent.join(name);
                on_progress(progress(kind, &path, 0, 1, 0, 0));
                self.single(&mut outcome, &path, || {
                    self.create_folder(parent, name).map(drop)
                });
            }
        }

        info!(
            %kind,
            succeeded = outcome.success_count,
            failed = outcome.failure_count,
            "Operation finished"
        );
        outcome
    }

    fn each_source(
        &self,
        sources: &[PathBuf],
        kind: OperationKind,
        outcome: &mut OperationOutcome,
        on_progress: &mut impl FnMut(OperationProgress),
        mut run: impl FnMut(&Path) -> Result<(), OpError>,
    ) {
        let total = sources.len();
        for (index, source) in sources.iter().enumerate() {
            if outcome.is_cancelled() || self.checkpoint().is_err() {
                outcome.record_failure(source, &OpError::Cancelled);
                continue;
            }

            on_progress(progress(
                kind,
                source,
                index,
                total,
                outcome.success_count,
                outcome.failure_count,
            ));

            match run(source) {
                Ok(()) => {
                    debug!(%kind, path = %source.display(), "Item done");
                    outcome.record_success();
                }
                Err(err) => outcome.record_failure(source, &err),
            }
        }
    }

    fn single(
        &self,
        outcome: &mut OperationOutcome,
        path: &Path,
        run: impl FnOnce() -> Result<(), OpError>,
    ) {
        match self.checkpoint().and_then(|()| run()) {
            Ok(()) => outcome.record_success(),
            Err(err) => outcome.record_failure(path, &err),
        }
    }
}

fn progress(
    kind: OperationKind,
    path: &Path,
    index: usize,
    total: usize,
    succeeded: usize,
    failed: usize,
) -> OperationProgress {
    OperationProgress {
        kind,
        current_item: leaf_name(path).unwrap_or_else(|| path.display().to_string()),
        index,
        total,
        succeeded,
        failed,
    }
}

fn no_name(path: &Path) -> OpError {
    OpError::invalid_request(format!("{} has no name", path.display()))
}

/// The path an up-front rejection is reported against.
fn primary_path(request: &OperationRequest) -> PathBuf {
    match request {
        OperationRequest::Copy { destination, .. }
        | OperationRequest::Move { destination, .. }
        | OperationRequest::Compress { destination, .. } => destination.clone(),
        OperationRequest::Delete { sources } => sources.first().cloned().unwrap_or_default(),
        OperationRequest::Extract { archive, .. } => archive.clone(),
        OperationRequest::Rename { source, .. } => source.clone(),
        OperationRequest::CreateFolder { parent, name } => parent.join(name),
    }
}
