//! One engine transaction from init to release

use std::sync::Arc;

use pkbridge_config::Config;
use pkbridge_errors::{Error, TransactionError};
use pkbridge_events::EventEmitter;
use pkbridge_net::{Fetcher, XferCommand};
use pkbridge_types::{InfoKind, Role, Status};

use crate::action_log::{ActionLog, FileActionLog};
use crate::context::JobContext;
use crate::engine::{Engine, TransFlags};
use crate::error_list;
use crate::translator::EventTranslator;

/// An initialized engine transaction bound to one job
///
/// [`Transaction::end`] runs exactly once: explicitly, through
/// [`Transaction::finish`], or on drop.
pub struct Transaction<'e, E: Engine + ?Sized> {
    engine: &'e mut E,
    translator: EventTranslator,
    context: JobContext,
    config: Config,
    ended: bool,
}

impl<'e, E: Engine + ?Sized> Transaction<'e, E> {
    /// Start a transaction and hook the job up to it
    ///
    /// # Errors
    ///
    /// Returns an error if the engine refuses to start a transaction, the
    /// configured fetch command is empty, or no job token is active.
    pub fn initialize(
        engine: &'e mut E,
        context: JobContext,
        config: &Config,
        flags: TransFlags,
    ) -> Result<Self, Error> {
        let action_log = FileActionLog::new(
            config.transaction.log_file.clone(),
            config.transaction.log_prefix.clone(),
        );
        Self::initialize_with_log(engine, context, config, flags, Box::new(action_log))
    }

    /// Like [`Transaction::initialize`] with a custom action log
    ///
    /// # Errors
    ///
    /// See [`Transaction::initialize`].
    pub fn initialize_with_log(
        engine: &'e mut E,
        context: JobContext,
        config: &Config,
        flags: TransFlags,
        action_log: Box<dyn ActionLog>,
    ) -> Result<Self, Error> {
        let fetcher = match &config.transaction.xfer_command {
            Some(command) => Some(Arc::new(XferCommand::new(command.clone())?) as Arc<dyn Fetcher>),
            None => None,
        };

        engine.init(flags).map_err(error_list::bare_error)?;
        engine.set_fetcher(fetcher);

        let transaction = Self {
            translator: EventTranslator::new(
                context.clone(),
                action_log,
                config.transaction.use_delta,
            ),
            engine,
            context,
            config: config.clone(),
            ended: false,
        };

        let interrupt = transaction.engine.interrupt_handle();
        // on failure the engine transaction is released by drop
        transaction.context.bridge().register_interrupt(interrupt)?;

        tracing::debug!(job = %transaction.context.job_id(), ?flags, "transaction initialized");
        Ok(transaction)
    }

    #[must_use]
    pub fn context(&self) -> &JobContext {
        &self.context
    }

    /// Queue the job's local package files
    ///
    /// # Errors
    ///
    /// Fails on the first file the engine cannot load, naming that file.
    pub fn add_targets(&mut self) -> Result<(), Error> {
        for path in &self.context.params().full_paths {
            self.engine.add_file(path).map_err(|failure| {
                TransactionError::engine(
                    failure.code,
                    Some(path.display().to_string()),
                    failure.message,
                )
            })?;
        }
        Ok(())
    }

    /// Resolve and check the transaction, then apply the hold policy
    ///
    /// # Errors
    ///
    /// Returns the engine failure with its detail list summarized, or
    /// `TransactionError::PackageHeld` when a held package would be removed.
    pub fn simulate(&mut self) -> Result<(), Error> {
        self.engine
            .prepare(&mut self.translator)
            .map_err(error_list::into_error)?;

        if let Some(held) = self
            .engine
            .pending_removes()
            .into_iter()
            .find(|pkg| self.config.is_held(&pkg.name))
        {
            return Err(TransactionError::PackageHeld {
                package: held.name.clone(),
            }
            .into());
        }

        Ok(())
    }

    /// Report what a commit would change, stopping early on cancellation
    pub fn packages(&self) {
        for package in self.engine.pending_adds() {
            if self.context.is_cancelled() {
                return;
            }
            let info = if self.engine.is_installed(&package.name) {
                InfoKind::Updating
            } else {
                InfoKind::Installing
            };
            self.context
                .emit_package(info, package.package_id(), package.description.clone());
        }

        let info = match self.context.role() {
            Role::UpdatePackages => InfoKind::Obsoleting,
            _ => InfoKind::Removing,
        };
        for package in self.engine.pending_removes() {
            if self.context.is_cancelled() {
                return;
            }
            self.context
                .emit_package(info, package.package_id(), package.description.clone());
        }
    }

    /// Apply the transaction unless the job was already cancelled
    ///
    /// # Errors
    ///
    /// Returns the engine failure with its detail list summarized.
    pub fn commit(&mut self) -> Result<(), Error> {
        if self.context.is_cancelled() {
            tracing::debug!(job = %self.context.job_id(), "skipping commit of cancelled job");
            return Ok(());
        }

        self.context.emit_allow_cancel(false);
        self.context.emit_status(Status::Running);

        self.translator
            .set_pending_downloads(self.engine.pending_adds());
        self.engine
            .commit(&mut self.translator)
            .map_err(error_list::into_error)
            .map_err(Into::into)
    }

    /// Flush downloads and output, then release the engine transaction.
    ///
    /// Later calls do nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to release the transaction.
    pub fn end(&mut self) -> Result<(), Error> {
        if self.ended {
            return Ok(());
        }
        self.ended = true;

        self.engine.set_fetcher(None);
        self.translator.finish();
        self.engine
            .release()
            .map_err(error_list::bare_error)
            .map_err(Into::into)
    }

    /// End the transaction and close the job with the first error seen
    pub fn finish(mut self, result: Result<(), Error>) -> bool {
        let ended = self.end();
        let error = result.err().or_else(|| ended.err());
        self.context.finish(error)
    }
}

impl<E: Engine + ?Sized> Drop for Transaction<'_, E> {
    fn drop(&mut self) {
        if let Err(e) = self.end() {
            tracing::warn!("failed to release transaction: {e}");
        }
    }
}
