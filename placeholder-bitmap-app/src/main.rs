use std::{fs, path::PathBuf};

use anyhow::{bail, Context};
use placeholder_bitmap::{
    pnm::{PnmEncoder, PnmFormat},
    BitmapConfig, EmptyJpegGenerator, FactoryConfig, FactoryFlavor, PlaceholderGenerator,
};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(|s| s.as_str()).unwrap_or("help");

    match cmd {
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        "bitmap" => cmd_bitmap(&args[2..]),
        "jpeg" => cmd_jpeg(&args[2..]),
        other => bail!("unknown command: {other} (run `placeholder-bitmap-app help`)"),
    }
}

fn print_help() {
    eprintln!(
        r#"placeholder-bitmap-app

USAGE:
  placeholder-bitmap-app bitmap <width> <height> [--config <alpha8|rgb565|argb4444|argb8888>]
                                                 [--flavor <jpeg|direct>] [--out <file.pam>]
  placeholder-bitmap-app jpeg <width> <height> <file.jpg>
"#
    );
}

fn parse_dimension(args: &[String], index: usize, name: &str) -> anyhow::Result<u32> {
    let raw = args
        .get(index)
        .with_context(|| format!("missing <{name}>"))?;
    raw.parse()
        .with_context(|| format!("invalid {name}: {raw}"))
}

fn cmd_bitmap(args: &[String]) -> anyhow::Result<()> {
    let width = parse_dimension(args, 0, "width")?;
    let height = parse_dimension(args, 1, "height")?;

    let mut config = FactoryConfig::default();
    let mut bitmap_config = BitmapConfig::default();
    let mut out = PathBuf::from("placeholder.pam");

    let mut options = args[2..].iter();
    while let Some(option) = options.next() {
        let value = options
            .next()
            .with_context(|| format!("missing value for {option}"))?;
        match option.as_str() {
            "--config" => bitmap_config = value.parse()?,
            "--flavor" => config.flavor = value.parse::<FactoryFlavor>()?,
            "--out" => out = PathBuf::from(value),
            other => bail!("unknown option: {other}"),
        }
    }

    let counter = config.bitmap_counter();
    let pool = config.byte_buffer_pool();
    let factory = config.build_factory(counter.clone(), pool.clone())?;

    let bitmap = factory
        .create_bitmap(width, height, bitmap_config)
        .with_context(|| format!("creating {width}x{height} {bitmap_config:?} bitmap"))?;
    log::info!(
        "created {}x{} {:?} bitmap ({} bytes) with the {} factory",
        bitmap.width(),
        bitmap.height(),
        bitmap.config(),
        bitmap.byte_count(),
        config.flavor
    );
    log::debug!(
        "counter: {} bitmaps / {} bytes; live encoded buffers: {}",
        counter.count(),
        counter.size(),
        pool.live_buffers()
    );

    PnmEncoder::new(&bitmap, PnmFormat::Pam)
        .encode_to_file(&out)
        .with_context(|| format!("writing {}", out.display()))?;
    println!("wrote {}", out.display());
    Ok(())
}

fn cmd_jpeg(args: &[String]) -> anyhow::Result<()> {
    let width = parse_dimension(args, 0, "width")?;
    let height = parse_dimension(args, 1, "height")?;
    let out = args.get(2).context("missing <file.jpg>")?;

    let (Ok(width), Ok(height)) = (i16::try_from(width), i16::try_from(height)) else {
        bail!("placeholder jpegs are limited to {} pixels per side", i16::MAX);
    };

    let config = FactoryConfig::default();
    let jpeg = EmptyJpegGenerator::new(config.byte_buffer_pool()).generate(width, height)?;
    fs::write(out, &jpeg[..]).with_context(|| format!("writing {out}"))?;
    log::info!("wrote {}x{} placeholder jpeg ({} bytes)", width, height, jpeg.size());
    println!("wrote {out}");
    Ok(())
}
