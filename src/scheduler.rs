// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Runs every batch of a render across a pool of worker threads.
//!
//! Batch indices go into a channel; each worker pulls indices until the
//! channel is empty and runs the kernel on them with its own trajectory
//! buffer.  An optional monitor thread logs the canvas's progress and
//! saves snapshots of it until the last worker hangs up.

use crossbeam::channel::{self, RecvTimeoutError};
use crossbeam::thread::ScopedJoinHandle;
use log::{debug, info, warn};
use std::time::{Duration, Instant};

use crate::canvas::{Canvas, CanvasSink};
use crate::error::{Error, Result};
use crate::kernel::{render_batch, trajectory_buffer, RenderRequest};
use crate::mask::Mask;
use crate::precision::Real;

/// Saves the canvas while it is still being rendered.
pub struct Snapshot<'a> {
    /// Time between two saves.
    pub interval: Duration,
    /// Writes the snapshot.  Failures are logged and the render goes on.
    pub save: &'a (dyn Fn(&Canvas) -> Result<()> + Sync),
}

/// What watches a render while it runs.  The default watches nothing.
#[derive(Default)]
pub struct Monitor<'a> {
    /// Interval of the progress log.
    pub report: Option<Duration>,
    /// Periodic snapshots.
    pub snapshot: Option<Snapshot<'a>>,
}

impl<'a> Monitor<'a> {
    fn tick(&self) -> Option<Duration> {
        let snapshot = self.snapshot.as_ref().map(|s| s.interval);
        match (self.report, snapshot) {
            (Some(r), Some(s)) => Some(r.min(s)),
            (r, s) => r.or(s),
        }
    }
}

/// Renders all `template.batches` batches of `template` into `canvas` on
/// `workers` threads, with `monitor` watching.
pub fn render<T: Real>(
    template: &RenderRequest<T>,
    canvas: &Canvas,
    mask: Option<&Mask>,
    workers: usize,
    monitor: Monitor,
) -> Result<()> {
    template.validate(Some(template.slice_count))?;
    let workers = workers.max(1);

    let (batches_tx, batches_rx) = channel::unbounded();
    for batch in 0..template.batches {
        batches_tx
            .send(batch)
            .map_err(|_| Error::Configuration("batch queue closed early".into()))?;
    }
    drop(batches_tx);

    let (alive_tx, alive_rx) = channel::unbounded::<()>();
    let started = Instant::now();
    info!(
        "rendering {}x{} in {} batches on {} workers",
        template.image_width, template.image_height, template.batches, workers
    );

    crossbeam::scope(|spawner| -> Result<()> {
        let handles: Vec<ScopedJoinHandle<Result<usize>>> = (0..workers)
            .map(|rank| {
                let batches = batches_rx.clone();
                let alive = alive_tx.clone();
                spawner.spawn(move |_| -> Result<usize> {
                    let _alive = alive;
                    let mut slices = trajectory_buffer(template);
                    let mut sink = CanvasSink::new(canvas, mask);
                    let mut done = 0;
                    for batch in batches.iter() {
                        render_batch(&template.with_batch(batch), Some(&mut slices[..]), &mut sink)?;
                        done += 1;
                    }
                    debug!("worker {} finished after {} batches", rank, done);
                    Ok(done)
                })
            })
            .collect();
        drop(alive_tx);

        if let Some(tick) = monitor.tick() {
            let monitor = &monitor;
            spawner.spawn(move |_| watch(monitor, tick, canvas, started, &alive_rx));
        }

        let mut total = 0;
        for handle in handles {
            total += handle.join().map_err(|_| Error::Worker)??;
        }
        debug!("{} batches rendered", total);
        Ok(())
    })
    .map_err(|_| Error::Worker)??;

    info!("render finished in {:.2}s", started.elapsed().as_secs_f64());
    Ok(())
}

/// Runs the monitor's report and snapshot, each when its interval is up,
/// until `alive` disconnects.
fn watch(
    monitor: &Monitor,
    tick: Duration,
    canvas: &Canvas,
    started: Instant,
    alive: &channel::Receiver<()>,
) {
    let pixels = canvas.len() as f64;
    let mut last = 0.0;
    let mut reported = Instant::now();
    let mut saved = Instant::now();
    while let Err(RecvTimeoutError::Timeout) = alive.recv_timeout(tick) {
        if let Some(snapshot) = &monitor.snapshot {
            if saved.elapsed() >= snapshot.interval {
                info!("saving snapshot at {:.5}%", canvas.total_progress() * 100.0);
                if let Err(e) = (snapshot.save)(canvas) {
                    warn!("snapshot failed: {}", e);
                }
                saved = Instant::now();
                continue;
            }
        }
        if let Some(interval) = monitor.report {
            if reported.elapsed() >= interval {
                let progress = canvas.total_progress();
                let elapsed = started.elapsed();
                let speed = (progress - last) * pixels / reported.elapsed().as_secs_f64();
                info!(
                    "{:>9.5}% done, {:.1}s elapsed, {} remaining, {:.0} px/s",
                    progress * 100.0,
                    elapsed.as_secs_f64(),
                    remaining(elapsed, progress),
                    speed
                );
                last = progress;
                reported = Instant::now();
            }
        }
    }
}

/// Estimated time left, extrapolated linearly from the time spent so far.
fn remaining(elapsed: Duration, progress: f64) -> String {
    if progress < 1e-5 {
        return "unknown".to_string();
    }
    let left = elapsed.as_secs_f64() / progress - elapsed.as_secs_f64();
    let secs = left.max(0.0) as u64;
    format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}
