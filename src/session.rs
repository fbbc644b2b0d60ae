//! Front ends driving a [`Matcher`]: batch replay, line-by-line interactive
//! input and random batch generation.
//!
//! Program output (snapshots, trades, summaries) goes to the given writer;
//! diagnostics go through `tracing`.

use crate::config::GeneratorConfig;
use crate::generator::{self, Generator};
use crate::matcher::Matcher;
use crate::order::book::Snapshot;
use crate::order::wire;
use crate::timer::Timer;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Wire(#[from] wire::Error),
    #[error(transparent)]
    Generator(#[from] generator::Error),
    #[error("Failed to Encode JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to Read/Write: {0}")]
    Io(#[from] io::Error),
}

/// Outcome of a batch replay.
#[derive(Debug, Clone)]
pub struct Report {
    /// Orders accepted by the book.
    pub added: usize,
    /// Batch elements that did not decode into a valid order.
    pub skipped: usize,
    /// Valid orders the book refused (duplicate or conflicting ids).
    pub rejected: usize,
    /// Time spent matching, loading excluded.
    pub elapsed: Duration,
    pub state: Snapshot,
}

/// Print the snapshot followed by the trades of the latest add, one JSON
/// object per line.
fn write_state(matcher: &Matcher, out: &mut impl Write) -> Result<(), Error> {
    serde_json::to_writer(&mut *out, &matcher.get_state())?;
    writeln!(out)?;
    for trade in matcher.last_trades() {
        serde_json::to_writer(&mut *out, trade)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Load a batch file and add its orders in file order.
///
/// Elements that fail to decode are logged and skipped. With `show_details`
/// every order is echoed with its trades and the resulting snapshot.
pub fn replay(path: &Path, show_details: bool, out: &mut impl Write) -> Result<Report, Error> {
    let mut timer = Timer::start();
    writeln!(out, "Parsing {}...", path.display())?;

    let mut skipped = 0;
    let orders: Vec<_> = wire::load_orders_batch(path)?
        .into_iter()
        .enumerate()
        .filter_map(|(index, decoded)| match decoded {
            Ok(order) => Some(order),
            Err(e) => {
                warn!(index, error = %e, "skipping invalid order");
                skipped += 1;
                None
            }
        })
        .collect();
    writeln!(
        out,
        "Loaded {} in {} seconds.",
        path.display(),
        timer.lap().as_secs_f64()
    )?;

    let mut matcher = Matcher::with_tree_map(show_details);
    let total = orders.len();
    let mut rejected = 0;
    for order in orders {
        let echo = show_details
            .then(|| wire::encode_order(&order))
            .transpose()?;
        if matcher.add(order).is_err() {
            rejected += 1;
            continue;
        }
        if let Some(echo) = echo {
            writeln!(out, ">> {echo}")?;
            write_state(&matcher, out)?;
        }
    }

    let elapsed = timer.lap();
    let state = matcher.get_state();
    writeln!(out)?;
    writeln!(out, "Final order book state:")?;
    serde_json::to_writer(&mut *out, &state)?;
    writeln!(out)?;
    writeln!(out)?;
    writeln!(out, "Elapsed time: {} seconds.", elapsed.as_secs_f64())?;
    if !elapsed.is_zero() {
        writeln!(
            out,
            "{:.2} orders per second.",
            total as f64 / elapsed.as_secs_f64()
        )?;
    }

    info!(
        added = total - rejected,
        skipped,
        rejected,
        elapsed_ms = elapsed.as_millis() as u64,
        "batch replayed"
    );

    Ok(Report {
        added: total - rejected,
        skipped,
        rejected,
        elapsed,
        state,
    })
}

/// Read one JSON order per line and print the book after each of them.
///
/// Blank lines are ignored and `exit` ends the session. Lines that do not
/// decode, and orders the book refuses, are reported and skipped.
pub fn interactive(input: impl BufRead, out: &mut impl Write) -> Result<Matcher, Error> {
    writeln!(
        out,
        "To add an order to the order book, insert a JSON line.\nType 'exit' to quit the program.\n"
    )?;

    let mut matcher = Matcher::with_tree_map(true);
    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" {
            break;
        }

        let order = match wire::decode_order(line) {
            Ok(order) => order,
            Err(e) => {
                warn!(error = %e, "skipping invalid order line");
                writeln!(out, "error: {e}")?;
                continue;
            }
        };
        match matcher.add(order) {
            Ok(()) => write_state(&matcher, out)?,
            Err(e) => writeln!(out, "error: {e}")?,
        }
    }

    writeln!(out, "\nSession ended.")?;
    Ok(matcher)
}

/// Write `count` random orders to `output`.
pub fn generate(
    cfg: &GeneratorConfig,
    count: usize,
    output: &Path,
    out: &mut impl Write,
) -> Result<Duration, Error> {
    let mut timer = Timer::start();
    let mut generator = Generator::new(cfg)?;

    writeln!(out, "Generating data...")?;
    let orders = generator.orders(count);
    wire::save_orders_batch(output, &orders)?;

    let elapsed = timer.lap();
    writeln!(
        out,
        "Generated {count} orders in {} seconds. Saved data to {}.",
        elapsed.as_secs_f64(),
        output.display()
    )?;
    info!(count, output = %output.display(), "orders generated");

    Ok(elapsed)
}
