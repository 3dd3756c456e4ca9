extern crate buddhaslice;
extern crate num;
extern crate rand;

use buddhaslice::{render_batch, trajectory_buffer, Bounds, MaskRegion, RenderRequest, RenderSink};
use num::Complex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

#[derive(Default)]
struct Recorder {
    admitted: usize,
    progress: Vec<(u64, f64)>,
    contributions: Vec<(u64, i64)>,
    computed: Vec<u64>,
    refuse: bool,
}

impl RenderSink<f64> for Recorder {
    fn admit(&mut self, _: i32, _: i32) -> bool {
        self.admitted += 1;
        !self.refuse
    }
    fn progress(&mut self, batch: u64, progress: f64) {
        self.progress.push((batch, progress));
    }
    fn contribute(&mut self, index: u64, weight: i64) {
        self.contributions.push((index, weight));
    }
    fn computed(&mut self, index: u64) {
        self.computed.push(index);
    }
}

fn request(width: u64, height: u64) -> RenderRequest<f64> {
    RenderRequest {
        batches: 1,
        batch: 0,
        image: Bounds::new(-2.0, 2.0, -2.0, 2.0),
        image_width: width,
        image_height: height,
        mask: None,
        dpp: 1,
        slice_offset: 0,
        slice_count: 1,
        max_iter: 100,
    }
}

fn run(req: &RenderRequest<f64>, buffered: bool) -> Recorder {
    let mut rec = Recorder::default();
    let mut buffer = trajectory_buffer(req);
    let slices = if buffered { Some(&mut buffer[..]) } else { None };
    render_batch(req, slices, &mut rec).unwrap();
    rec
}

fn escape_time(c: Complex<f64>, max_iter: usize) -> usize {
    let mut z = Complex::new(0.0, 0.0);
    for k in 0..=max_iter {
        z = z * z + c;
        if z.re.abs() >= 2.0 || z.im.abs() >= 2.0 {
            return k;
        }
    }
    max_iter + 1
}

#[test]
fn first_slice_weights_are_escape_times() {
    // With one slice at offset zero, the captured iterate is c itself and
    // lands back on the pixel it was sampled from.
    let req = request(32, 32);
    let rec = run(&req, true);
    let seen: HashMap<u64, i64> = rec.contributions.iter().cloned().collect();
    assert_eq!(seen.len(), rec.contributions.len());

    for index in 0..32 * 32 {
        let c = Complex::new(
            (index % 32) as f64 * 0.125 - 2.0,
            (index / 32) as f64 * 0.125 - 2.0,
        );
        let k = escape_time(c, req.max_iter);
        if k < req.max_iter {
            assert_eq!(seen.get(&index), Some(&(k as i64)), "pixel {}", index);
        } else {
            assert_eq!(seen.get(&index), None, "pixel {}", index);
        }
    }
}

#[test]
fn batches_partition_the_image() {
    let mut rng = StdRng::seed_from_u64(6656);
    for _ in 0..20 {
        let (width, height) = (rng.gen_range(1, 12), rng.gen_range(1, 12));
        let batches = rng.gen_range(1, 40);
        let mut seen = vec![0; (width * height) as usize];
        for batch in 0..batches {
            let req = RenderRequest { batches, batch, ..request(width, height) };
            for index in run(&req, false).computed {
                seen[index as usize] += 1;
            }
        }
        assert!(seen.iter().all(|&n| n == 1), "{}x{} in {} batches", width, height, batches);
    }
}

#[test]
fn progress_never_decreases_and_ends_at_one() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..20 {
        let batches = rng.gen_range(1, 9);
        let req = RenderRequest {
            batches,
            batch: rng.gen_range(0, batches),
            dpp: rng.gen_range(1, 4),
            slice_count: 3,
            ..request(9, 7)
        };
        let rec = run(&req, true);
        assert!(rec.progress.windows(2).all(|w| w[0].1 <= w[1].1));
        assert_eq!(rec.progress.last().map(|p| p.1), Some(1.0));
        assert!(rec.progress.iter().all(|&(b, p)| b == req.batch && p >= 0.0 && p <= 1.0));
    }
}

#[test]
fn refusing_mask_silences_the_image_but_not_completion() {
    let req = RenderRequest {
        mask: Some(MaskRegion::new(Bounds::new(-2.5, 2.5, -2.5, 2.5), 16, 16).unwrap()),
        dpp: 2,
        slice_count: 4,
        ..request(8, 8)
    };
    let mut rec = Recorder { refuse: true, ..Recorder::default() };
    let mut buffer = trajectory_buffer(&req);
    render_batch(&req, Some(&mut buffer[..]), &mut rec).unwrap();
    assert!(rec.contributions.is_empty());
    assert_eq!(rec.admitted, 8 * 8 * 4);
    assert_eq!(rec.computed.len(), 64);
}

#[test]
fn unreached_slices_project_from_the_origin() {
    // Only pixel 0 (-2-2i) is rendered; it escapes at iteration 0, so
    // slices 1 and 2 still hold 0+0i, which maps to pixel (2, 2).
    let req = RenderRequest { batches: 16, slice_count: 3, ..request(4, 4) };
    let rec = run(&req, true);
    assert_eq!(rec.computed, vec![0]);
    assert_eq!(rec.contributions, vec![(0, 0), (10, -1), (10, -2)]);
}

#[test]
fn weights_drop_by_one_per_slice() {
    let req = RenderRequest { slice_count: 5, slice_offset: 2, max_iter: 60, ..request(16, 16) };
    let rec = run(&req, true);
    assert!(!rec.contributions.is_empty());
    // Points escaping late enough fill the whole window; their five
    // contributions arrive in slice order with weights m, m-1, ...
    let mut runs = 0;
    for window in rec.contributions.windows(5) {
        if window.windows(2).all(|w| w[0].1 - 1 == w[1].1) {
            runs += 1;
        }
    }
    assert!(runs > 0);
}

#[test]
fn offset_window_weighs_by_escape_time_minus_slice() {
    // Pixel 37 samples c = 0.5, which escapes at count 4; its orbit passes
    // 0.75 (pixel 37) and 1.0625 (pixel 38) on counts 1 and 2.
    let req = RenderRequest { batches: 64, batch: 37, slice_offset: 1, slice_count: 2, ..request(8, 8) };
    let rec = run(&req, true);
    assert_eq!(rec.computed, vec![37]);
    assert_eq!(rec.contributions, vec![(37, 4), (38, 3)]);
}

#[test]
fn buffer_absence_only_skips_the_iteration() {
    let req = RenderRequest { batches: 3, batch: 2, dpp: 2, slice_count: 4, ..request(10, 10) };
    let with = run(&req, true);
    let without = run(&req, false);
    assert!(!with.contributions.is_empty());
    assert!(without.contributions.is_empty());
    assert_eq!(with.computed, without.computed);
    assert_eq!(with.progress, without.progress);
}
