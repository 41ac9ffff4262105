//! Worker bodies for the supported job roles

use pkbridge_config::Config;
use pkbridge_errors::Error;

use crate::context::JobContext;
use crate::engine::{Engine, TransFlags};
use crate::error_list;
use crate::transaction::Transaction;

/// Install the job's local package files.
///
/// Signature checking is switched off for the duration unless the job
/// asked for trusted packages only. Returns whether the job succeeded.
pub fn install_files<E: Engine + ?Sized>(
    engine: &mut E,
    context: &JobContext,
    config: &Config,
) -> bool {
    let only_trusted = context.params().only_trusted;
    let mut error: Option<Error> = None;

    if !only_trusted {
        if let Err(failure) = engine.set_signature_checking(false) {
            error = Some(error_list::bare_error(failure).into());
        }
    }

    if error.is_none() {
        error = match Transaction::initialize(&mut *engine, context.clone(), config, TransFlags::empty()) {
            Ok(mut transaction) => {
                let result = transaction
                    .add_targets()
                    .and_then(|()| transaction.simulate())
                    .and_then(|()| transaction.commit());
                let ended = transaction.end();
                result.err().or_else(|| ended.err())
            }
            Err(e) => Some(e),
        };
    }

    if !only_trusted {
        if let Err(failure) = engine.set_signature_checking(true) {
            if error.is_none() {
                error = Some(error_list::bare_error(failure).into());
            }
        }
    }

    context.finish(error)
}

/// Report what installing the job's files would change, without committing
pub fn simulate_install_files<E: Engine + ?Sized>(
    engine: &mut E,
    context: &JobContext,
    config: &Config,
) -> bool {
    let mut transaction =
        match Transaction::initialize(engine, context.clone(), config, TransFlags::empty()) {
            Ok(transaction) => transaction,
            Err(e) => return context.finish(Some(e)),
        };

    let result = transaction
        .add_targets()
        .and_then(|()| transaction.simulate());
    if result.is_ok() {
        transaction.packages();
    }
    transaction.finish(result)
}

/// Simulate and commit whatever the engine already has queued
///
/// Used for package jobs whose targets were selected before the worker
/// started; the job role only changes how progress is reported.
pub fn commit_queued<E: Engine + ?Sized>(
    engine: &mut E,
    context: &JobContext,
    config: &Config,
    flags: TransFlags,
) -> bool {
    let mut transaction = match Transaction::initialize(engine, context.clone(), config, flags) {
        Ok(transaction) => transaction,
        Err(e) => return context.finish(Some(e)),
    };

    let result = transaction.simulate().and_then(|()| transaction.commit());
    transaction.finish(result)
}
