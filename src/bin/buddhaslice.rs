extern crate buddhaslice;
extern crate clap;

use buddhaslice::settings::{self, Settings};
use buddhaslice::{export, scheduler, Canvas, Error, Mask, Monitor, Result, Snapshot};
use clap::{App, Arg, ArgMatches};
use log::info;
use std::path::PathBuf;
use std::str::FromStr;

#[cfg(feature = "double-precision")]
type Precision = f64;
#[cfg(not(feature = "double-precision"))]
type Precision = f32;

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> std::result::Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> std::result::Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const SETTINGS: &str = "settings";
const OUTPUT: &str = "output";
const RAW: &str = "raw";
const MASK: &str = "mask";
const SIZE: &str = "size";
const THREADS: &str = "threads";
const CORES: &str = "cores";
const ITERATIONS: &str = "iterations";
const DPP: &str = "dpp";
const SLICE: &str = "slice";
const NO_PNG: &str = "no-png";
const NO_RAW: &str = "no-raw";

fn args<'a>() -> ArgMatches<'a> {
    App::new("buddhaslice")
        .version("0.1.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Sliced Buddhabrot renderer")
        .arg(
            Arg::with_name(SETTINGS)
                .long(SETTINGS)
                .short("c")
                .takes_value(true)
                .default_value(settings::DEFAULT_PATH)
                .help("JSON settings file; missing files fall back to the defaults"),
        )
        .arg(
            Arg::with_name(OUTPUT)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("PNG tile path, with {x} and {y} standing for the tile position"),
        )
        .arg(
            Arg::with_name(RAW)
                .long(RAW)
                .short("r")
                .takes_value(true)
                .help("Raw canvas dump path"),
        )
        .arg(
            Arg::with_name(MASK)
                .long(MASK)
                .short("m")
                .takes_value(true)
                .help("Mask image; black cells are skipped"),
        )
        .arg(
            Arg::with_name(SIZE)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .validator(|s| validate_pair::<u64>(&s, 'x', "Could not parse output image size"))
                .help("Size of output image, e.g. 800x600"),
        )
        .arg(
            Arg::with_name(THREADS)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        u64::max_value(),
                        "Could not parse batch count",
                        "Batch count must be at least 1",
                    )
                })
                .help("Number of batches the image is split into"),
        )
        .arg(
            Arg::with_name(CORES)
                .long(CORES)
                .short("j")
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        0,
                        4096,
                        "Could not parse worker count",
                        "Worker count must be between 0 and 4096",
                    )
                })
                .help("Number of worker threads; 0 uses one per CPU"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        usize::max_value(),
                        "Could not parse iteration count",
                        "Iteration count must be at least 1",
                    )
                })
                .help("Maximum iterations per sample"),
        )
        .arg(
            Arg::with_name(DPP)
                .long(DPP)
                .short("d")
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        1024,
                        "Could not parse supersampling factor",
                        "Supersampling factor must be between 1 and 1024",
                    )
                })
                .help("Subsamples per pixel along each axis"),
        )
        .arg(
            Arg::with_name(SLICE)
                .long(SLICE)
                .short("l")
                .takes_value(true)
                .validator(|s| validate_pair::<usize>(&s, ',', "Could not parse slice window"))
                .help("Captured iterations as OFFSET,COUNT"),
        )
        .arg(Arg::with_name(NO_PNG).long(NO_PNG).help("Skip the PNG tiles"))
        .arg(Arg::with_name(NO_RAW).long(NO_RAW).help("Skip the raw dump"))
        .get_matches()
}

fn value<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<Option<T>> {
    match matches.value_of(name) {
        None => Ok(None),
        Some(s) => T::from_str(s)
            .map(Some)
            .map_err(|_| Error::Settings(format!("could not parse --{} {}", name, s))),
    }
}

/// Command line values override the settings file.
fn apply_overrides(settings: &mut Settings, matches: &ArgMatches) -> Result<()> {
    if let Some(out) = matches.value_of(OUTPUT) {
        settings.path_out = out.to_string();
    }
    if let Some(raw) = matches.value_of(RAW) {
        settings.path_raw = PathBuf::from(raw);
    }
    if let Some(mask) = matches.value_of(MASK) {
        settings.path_mask = Some(PathBuf::from(mask));
    }
    if let Some(size) = matches.value_of(SIZE) {
        let (width, height) = parse_pair(size, 'x')
            .ok_or_else(|| Error::Settings(format!("could not parse image size {}", size)))?;
        settings.width = width;
        settings.height = height;
    }
    if let Some(slice) = matches.value_of(SLICE) {
        let (offset, count) = parse_pair(slice, ',')
            .ok_or_else(|| Error::Settings(format!("could not parse slice window {}", slice)))?;
        settings.slice_offset = offset;
        settings.slice = count;
    }
    if let Some(threads) = value(matches, THREADS)? {
        settings.threads = threads;
    }
    if let Some(cores) = value(matches, CORES)? {
        settings.cores = cores;
    }
    if let Some(iterations) = value(matches, ITERATIONS)? {
        settings.max_iter = iterations;
    }
    if let Some(dpp) = value(matches, DPP)? {
        settings.dpp = dpp;
    }
    if matches.is_present(NO_PNG) {
        settings.export.png = false;
        settings.export.png_at_end = false;
    }
    if matches.is_present(NO_RAW) {
        settings.export.raw = false;
        settings.export.raw_at_end = false;
    }
    Ok(())
}

fn run(matches: &ArgMatches) -> Result<()> {
    let mut settings = Settings::load(matches.value_of(SETTINGS).unwrap_or(settings::DEFAULT_PATH))?;
    apply_overrides(&mut settings, matches)?;
    settings.validate()?;

    let mask = settings.path_mask.as_ref().map(Mask::open).transpose()?;
    let request = settings.request::<Precision>(mask.as_ref())?;
    let canvas = Canvas::new(settings.width, settings.height, settings.threads, settings.aggregate);

    info!(
        "{}x{} px, {} iterations, dpp {}, slice {}+{}, {} batches",
        settings.width,
        settings.height,
        settings.max_iter,
        settings.dpp,
        settings.slice_offset,
        settings.slice,
        settings.threads
    );
    let save = |canvas: &Canvas| -> Result<()> {
        export::save_snapshot(canvas, &settings, false).map(|_| ())
    };
    let monitor = Monitor {
        report: settings.report_interval(),
        snapshot: settings
            .snapshot_interval()
            .map(|interval| Snapshot { interval, save: &save }),
    };
    scheduler::render(&request, &canvas, mask.as_ref(), settings.worker_count(), monitor)?;

    for path in export::save_snapshot(&canvas, &settings, true)? {
        println!("{}", path.display());
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let matches = args();
    if let Err(e) = run(&matches) {
        eprintln!("Render failure: {}", e);
        std::process::exit(1);
    }
}
