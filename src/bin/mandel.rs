use clap::{App, Arg, ArgMatches};
use failure::{format_err, Error};
use log::info;
use mandel::params::{self, ViewArgs};
use mandel::{registry, RenderCache, RenderedImage};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

fn validate_range<T: FromStr + PartialOrd>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
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

fn validate_radius(s: &str) -> Result<(), String> {
    match f64::from_str(s) {
        Ok(r) if r > 0.0 && r.is_finite() => Ok(()),
        Ok(_) => Err("Escape radius must be a positive number".to_string()),
        Err(_) => Err("Could not parse escape radius".to_string()),
    }
}

const OUTPUT: &str = "output";
const WIDTH: &str = "width";
const HEIGHT: &str = "height";
const ITERATIONS: &str = "iterations";
const X0: &str = "x0";
const Y0: &str = "y0";
const X1: &str = "x1";
const Y1: &str = "y1";
const RADIUS: &str = "radius";
const PALETTE: &str = "palette";
const THREADS: &str = "threads";
const LIST: &str = "list-palettes";

// View parameters are deliberately lenient: bad or out-of-range values
// are defaulted or clamped by `params`, never rejected.
fn view_arg(name: &'static str, help: &'static str) -> Arg<'static, 'static> {
    Arg::with_name(name)
        .long(name)
        .takes_value(true)
        .allow_hyphen_values(true)
        .help(help)
}

fn args<'a>() -> ArgMatches<'a> {
    let max_threads = num_cpus::get();

    App::new("mandel")
        .version("0.1.0")
        .about("Histogram-colored Mandelbrot renderer")
        .arg(
            Arg::with_name(OUTPUT)
                .required_unless(LIST)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output PNG file"),
        )
        .arg(view_arg(WIDTH, "Image width in pixels [320..5120]"))
        .arg(view_arg(HEIGHT, "Image height in pixels [240..4096]"))
        .arg(view_arg(ITERATIONS, "Iterations per pixel [16..10240]").short("i"))
        .arg(view_arg(X0, "Real part of the first corner [-2.0..1.0]"))
        .arg(view_arg(Y0, "Imaginary part of the first corner [-1.2..1.2]"))
        .arg(view_arg(X1, "Real part of the second corner [-2.0..1.0]"))
        .arg(view_arg(Y1, "Imaginary part of the second corner [-1.2..1.2]"))
        .arg(
            Arg::with_name(RADIUS)
                .long(RADIUS)
                .short("r")
                .takes_value(true)
                .validator(|s| validate_radius(&s))
                .help("Escape radius"),
        )
        .arg(
            Arg::with_name(PALETTE)
                .long(PALETTE)
                .short("p")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .help("Palette to color with; repeat to write one image per palette"),
        )
        .arg(
            Arg::with_name(THREADS)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        max_threads,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", max_threads),
                    )
                })
                .help("Number of threads to use in the renderer"),
        )
        .arg(
            Arg::with_name(LIST)
                .long(LIST)
                .short("l")
                .help("List the available palettes and exit"),
        )
        .get_matches()
}

/// Where the image for `palette` goes.  With more than one palette
/// the palette name is appended to the file stem.
fn output_path(base: &Path, palette: &str, several: bool) -> PathBuf {
    if !several {
        return base.to_path_buf();
    }
    let stem = base
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("mandel");
    let ext = base.extension().and_then(OsStr::to_str).unwrap_or("png");
    base.with_file_name(format!("{}-{}.{}", stem, palette, ext))
}

fn write_image(path: &Path, img: &RenderedImage) -> Result<(), Error> {
    img.to_rgba_image().save(path)?;
    Ok(())
}

fn run(matches: &ArgMatches) -> Result<(), Error> {
    let palettes = registry()?;
    if matches.is_present(LIST) {
        for name in palettes.names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let output = matches
        .value_of(OUTPUT)
        .map(Path::new)
        .ok_or_else(|| format_err!("No output file given"))?;
    let view = ViewArgs {
        width: matches.value_of(WIDTH),
        height: matches.value_of(HEIGHT),
        iterations: matches.value_of(ITERATIONS),
        x0: matches.value_of(X0),
        y0: matches.value_of(Y0),
        x1: matches.value_of(X1),
        y1: matches.value_of(Y1),
    }
    .fingerprint();
    let radius = match matches.value_of(RADIUS) {
        Some(r) => f64::from_str(r)?,
        None => params::DEFAULT_RADIUS,
    };
    let threads = match matches.value_of(THREADS) {
        Some(t) => usize::from_str(t)?,
        None => num_cpus::get(),
    };
    let names: Vec<&str> = match matches.values_of(PALETTE) {
        Some(values) => values.collect(),
        None => vec![mandel::palette::DEFAULT_PALETTE],
    };

    // Resolve every name up front so a typo fails before any rendering.
    let chosen = names
        .iter()
        .map(|name| palettes.get(name).map(|p| (*name, p)))
        .collect::<Result<Vec<_>, _>>()?;

    info!("rendering {:?} on {} threads", view, threads);
    let cache = RenderCache::new();
    for (name, palette) in &chosen {
        let img = cache.get_or_render(&view, radius, threads, palette)?;
        let path = output_path(output, name, chosen.len() > 1);
        write_image(&path, &img)?;
        println!("{}", path.display());
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let matches = args();
    if let Err(e) = run(&matches) {
        eprintln!("Render failure: {}", e);
        std::process::exit(1);
    }
}
