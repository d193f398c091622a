//! Scripted workloads driven from the command line.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Barrier;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{ensure, Context, Result};
use occ_engine::{CommitOutcome, SerialDatabase, TransactionMetrics, TransactionView};
use rand::Rng;
use tracing::info;

fn incr(view: &mut TransactionView, key: &str) -> occ_engine::Result<()> {
    let current = view.read(key)?.as_int().unwrap_or_default();
    view.write(key, current + 1);
    Ok(())
}

fn incr_all(view: &mut TransactionView) -> occ_engine::Result<()> {
    for key in ["x", "y", "z"] {
        incr(view, key)?;
    }
    Ok(())
}

fn committed_ints(db: &SerialDatabase) -> BTreeMap<String, i64> {
    db.snapshot()
        .into_iter()
        .filter_map(|(k, v)| v.as_int().map(|n| (k.into_string(), n)))
        .collect()
}

fn expect_state(db: &SerialDatabase, expected: &[(&str, i64)]) -> Result<()> {
    let expected: BTreeMap<String, i64> =
        expected.iter().map(|(k, v)| (k.to_string(), *v)).collect();
    let actual = committed_ints(db);
    ensure!(
        actual == expected,
        "store is {} but expected {:?}",
        db,
        expected
    );
    Ok(())
}

/// Replay the two-phase x/y/z scenario, printing the store after each step.
///
/// Fails on the first step whose outcome differs from the expected one.
pub fn walkthrough(db: &SerialDatabase) -> Result<()> {
    println!("validation: {}", db.config().validation.as_str());

    let init = db.execute(|view| {
        view.write("x", 0);
        view.write("y", 0);
        view.write("z", 0);
        Ok(())
    })?;
    ensure!(init.is_committed(), "initial transaction aborted");
    println!("init          -> {}", db);
    expect_state(db, &[("x", 0), ("y", 0), ("z", 0)])?;

    let mut t1 = db.begin(incr_all);
    let mut t2 = db.begin(incr_all);
    t1.read_phase()?;
    t2.read_phase()?;

    let t1_ok = t1.validate_and_write_phase()?;
    println!("T1 commit={:<5} -> {}", t1_ok, db);
    ensure!(t1_ok, "T1 should commit");
    expect_state(db, &[("x", 1), ("y", 1), ("z", 1)])?;

    let t2_ok = t2.validate_and_write_phase()?;
    println!("T2 commit={:<5} -> {}", t2_ok, db);
    ensure!(!t2_ok, "T2 should abort after T1 overwrote its reads");
    if let Some(conflict) = t2.conflict().and_then(|v| v.first_conflict()) {
        println!(
            "   T2 read '{}', overwritten by tn {}",
            conflict.key, conflict.committed_tn
        );
    }
    expect_state(db, &[("x", 1), ("y", 1), ("z", 1)])?;

    let mut t3 = db.begin(|view| incr(view, "x"));
    let mut t4 = db.begin(|view| incr(view, "y"));
    t3.read_phase()?;
    t4.read_phase()?;

    let t3_ok = t3.validate_and_write_phase()?;
    println!("T3 commit={:<5} -> {}", t3_ok, db);
    let t4_ok = t4.validate_and_write_phase()?;
    println!("T4 commit={:<5} -> {}", t4_ok, db);
    ensure!(t3_ok && t4_ok, "T3 and T4 touch disjoint keys and should both commit");
    expect_state(db, &[("x", 2), ("y", 2), ("z", 1)])?;

    println!("committed transactions: {}", db.current_tn());
    Ok(())
}

/// Outcome of a contention run.
#[derive(Debug)]
pub struct ContentionReport {
    /// Sum over every contended key
    pub sum: i64,
    /// Increments requested (`threads * rounds`)
    pub expected: i64,
    /// Attempts discarded by validation and retried
    pub retries: u64,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
    /// Database counters at the end of the run
    pub metrics: TransactionMetrics,
}

/// Run `rounds` committed increments from each of `threads` threads over
/// `keys` shared keys, retrying every aborted attempt.
pub fn contention(
    db: &SerialDatabase,
    threads: usize,
    rounds: usize,
    keys: usize,
) -> Result<ContentionReport> {
    let names: Vec<String> = (0..keys).map(|i| format!("k{}", i)).collect();

    let mut seed = db.view();
    for name in &names {
        seed.write(name.as_str(), 0);
    }
    db.append_commit(seed);

    let retries = AtomicU64::new(0);
    let barrier = Barrier::new(threads);
    let started = Instant::now();

    thread::scope(|s| -> Result<()> {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let (names, retries, barrier) = (&names, &retries, &barrier);
                s.spawn(move || -> occ_engine::Result<()> {
                    let mut rng = rand::thread_rng();
                    barrier.wait();
                    for _ in 0..rounds {
                        let key = &names[rng.gen_range(0..names.len())];
                        while let CommitOutcome::Aborted { .. } =
                            db.execute(|view| incr(view, key))?
                        {
                            retries.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Ok(())
                })
            })
            .collect();

        for handle in handles {
            handle
                .join()
                .map_err(|_| anyhow::anyhow!("worker thread panicked"))??;
        }
        Ok(())
    })?;

    let elapsed = started.elapsed();
    let mut sum = 0;
    for name in &names {
        sum += db
            .read(name.as_str())?
            .as_int()
            .with_context(|| format!("{} is not an integer", name))?;
    }

    let report = ContentionReport {
        sum,
        expected: (threads * rounds) as i64,
        retries: retries.load(Ordering::Relaxed),
        elapsed,
        metrics: db.metrics(),
    };
    info!(
        target: "occ::cli",
        sum = report.sum,
        retries = report.retries,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Contention run finished"
    );
    Ok(report)
}
