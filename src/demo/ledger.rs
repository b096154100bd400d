/*!
 * Account Ledger Demo
 *
 * Depositing threads hand transactions to one account thread through an
 * `Exchange`. The account owns its balance outright: nothing else can see
 * or mutate it, so there is no shared mutable state beyond the exchange.
 *
 * Overdraft checks live here, not in the exchange. An empty slot means
 * "nothing to process yet" and blocks; insufficient funds means "process
 * and reject" and never blocks.
 */

use super::config::DemoConfig;
use crate::core::errors::{ExchangeError, HarnessError};
use crate::core::limits::{LEDGER_AMOUNT_UNIT, LEDGER_DEBIT_EVERY, MAX_LEDGER_PRODUCERS};
use crate::core::sync::CancellationToken;
use crate::exchange::{Exchange, ExchangeStats};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, info, warn};

/// One unit of work passed through the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transaction {
    Credit { producer: usize, seq: usize, amount: u64 },
    Debit { producer: usize, seq: usize, amount: u64 },
}

impl Transaction {
    /// Deterministic transaction for `producer`'s `seq`-th submission
    pub fn generate(producer: usize, seq: usize) -> Self {
        let amount = LEDGER_AMOUNT_UNIT * (seq as u64 % 5 + 1);
        if (seq + 1) % LEDGER_DEBIT_EVERY == 0 {
            Transaction::Debit {
                producer,
                seq,
                amount,
            }
        } else {
            Transaction::Credit {
                producer,
                seq,
                amount,
            }
        }
    }

    pub fn amount(&self) -> u64 {
        match self {
            Transaction::Credit { amount, .. } | Transaction::Debit { amount, .. } => *amount,
        }
    }
}

/// Business-rule rejections, distinct from "nothing to process yet"
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: u64, available: u64 },
}

/// Summary of a ledger run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReport {
    pub processed: usize,
    pub credits: usize,
    pub debits: usize,
    pub rejected: usize,
    pub credited_total: u64,
    pub debited_total: u64,
    pub balance: u64,
    /// Exchange counters at the end of the run
    pub exchange: Option<ExchangeStats>,
}

/// Account state, owned by exactly one thread
#[derive(Debug, Default)]
pub struct Account {
    report: LedgerReport,
}

impl Account {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn balance(&self) -> u64 {
        self.report.balance
    }

    /// Apply a transaction, returning the new balance
    ///
    /// A rejected debit is still counted as processed.
    pub fn apply(&mut self, transaction: Transaction) -> Result<u64, LedgerError> {
        self.report.processed += 1;

        match transaction {
            Transaction::Credit { amount, .. } => {
                self.report.credits += 1;
                self.report.credited_total += amount;
                self.report.balance += amount;
                Ok(self.report.balance)
            }
            Transaction::Debit { amount, .. } => {
                if amount > self.report.balance {
                    self.report.rejected += 1;
                    return Err(LedgerError::InsufficientFunds {
                        requested: amount,
                        available: self.report.balance,
                    });
                }
                self.report.debits += 1;
                self.report.debited_total += amount;
                self.report.balance -= amount;
                Ok(self.report.balance)
            }
        }
    }

    pub fn into_report(self) -> LedgerReport {
        self.report
    }
}

/// Run producers and one account thread over a shared exchange
///
/// A failed producer or account cancels the run so everyone else stops
/// waiting on the exchange.
pub fn run_ledger(config: &DemoConfig) -> Result<LedgerReport, HarnessError> {
    let exchange = Arc::new(Exchange::<Transaction>::new());
    let token = CancellationToken::new();
    let total = config.total_items();

    info!(
        exchange = %exchange.id(),
        producers = config.producers,
        items_per_producer = config.items_per_producer,
        "starting ledger demo"
    );

    let account = {
        let exchange = exchange.clone();
        let token = token.clone();
        spawn_named("ledger-account".to_string(), move || {
            run_account(&exchange, &token, total)
        })?
    };

    let mut producers = Vec::with_capacity(config.producers.min(MAX_LEDGER_PRODUCERS));
    for producer in 0..config.producers {
        let exchange = exchange.clone();
        let worker_token = token.clone();
        let items = config.items_per_producer;
        let spawned = spawn_named(format!("ledger-producer-{}", producer), move || {
            run_producer(&exchange, &worker_token, producer, items)
        });

        match spawned {
            Ok(handle) => producers.push(handle),
            Err(e) => {
                token.cancel();
                return Err(e);
            }
        }
    }

    let mut failure = None;
    for handle in producers {
        let name = thread_name(&handle);
        if handle.join().is_err() {
            warn!(thread = %name, "producer panicked, cancelling ledger run");
            token.cancel();
            if failure.is_none() {
                failure = Some(HarnessError::Panicked { thread: name });
            }
        }
    }

    let account_name = thread_name(&account);
    let mut report = account.join().map_err(|_| {
        token.cancel();
        HarnessError::Panicked {
            thread: account_name,
        }
    })?;

    if let Some(failure) = failure {
        return Err(failure);
    }

    report.exchange = Some(exchange.stats());
    info!(
        processed = report.processed,
        rejected = report.rejected,
        balance = report.balance,
        "ledger demo finished"
    );
    Ok(report)
}

fn run_producer(
    exchange: &Exchange<Transaction>,
    token: &CancellationToken,
    producer: usize,
    items: usize,
) {
    let _cancel = token.cancel_on_panic();

    for seq in 0..items {
        let transaction = Transaction::generate(producer, seq);
        if let Err(rejected) = exchange.deposit_cancellable(transaction, token) {
            debug!(producer, seq, error = %rejected, "producer stopped");
            return;
        }
    }
}

fn run_account(
    exchange: &Exchange<Transaction>,
    token: &CancellationToken,
    total: usize,
) -> LedgerReport {
    // Producers parked on a full slot must not outlive a failed account
    let _cancel = token.cancel_on_panic();
    let mut account = Account::new();

    for _ in 0..total {
        let transaction = match exchange.withdraw_cancellable(token) {
            Ok(transaction) => transaction,
            Err(ExchangeError::Cancelled) => {
                debug!(processed = account.report.processed, "account stopped");
                break;
            }
            Err(e) => {
                warn!(error = %e, "unexpected exchange error");
                break;
            }
        };

        match account.apply(transaction) {
            Ok(balance) => debug!(?transaction, balance, "applied"),
            Err(e) => debug!(?transaction, error = %e, "rejected"),
        }
    }

    account.into_report()
}

fn spawn_named<F, R>(name: String, f: F) -> Result<JoinHandle<R>, HarnessError>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    thread::Builder::new()
        .name(name.clone())
        .spawn(f)
        .map_err(|e| HarnessError::spawn(name, e))
}

fn thread_name<R>(handle: &JoinHandle<R>) -> String {
    handle.thread().name().unwrap_or("<unnamed>").to_string()
}
