use std::env;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use image::{ImageBuffer, LumaA};
use log::{error, info};
use supernote_reader::{NoteReader, Raster};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        eprintln!("Usage: supernote-reader <input.note> [--out-dir DIR] [--pages SPEC]");
        eprintln!("  SPEC selects pages: '*' (all, default), '3', '0-5', or '1,4,7'");
        process::exit(1);
    }
    let input = PathBuf::from(args.remove(0));

    let mut out_dir: Option<PathBuf> = None;
    let mut page_spec = String::from("*");
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--out-dir" => {
                i += 1;
                out_dir = args.get(i).map(PathBuf::from);
            }
            "--pages" => {
                i += 1;
                if let Some(spec) = args.get(i) {
                    page_spec = spec.clone();
                }
            }
            other => {
                eprintln!("unknown argument: {}", other);
                process::exit(1);
            }
        }
        i += 1;
    }

    if let Err(err) = run(&input, out_dir.as_deref(), &page_spec) {
        error!("{}: {}", input.display(), err);
        process::exit(1);
    }
}

fn run(input: &Path, out_dir: Option<&Path>, page_spec: &str) -> Result<(), Box<dyn Error>> {
    let reader = NoteReader::open(input)?;
    let pages = parse_page_spec(page_spec, reader.page_count())?;

    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("note");
    let dir = out_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(stem));
    fs::create_dir_all(&dir)?;

    for index in pages {
        let raster = reader.decode_page(index)?;
        let path = dir.join(format!("page_{:03}.png", index));
        save_png(&raster, &path)?;
        info!("wrote {}", path.display());
    }
    Ok(())
}

fn save_png(raster: &Raster, path: &Path) -> Result<(), Box<dyn Error>> {
    let buf: ImageBuffer<LumaA<u8>, Vec<u8>> = ImageBuffer::from_raw(
        raster.width(),
        raster.height(),
        raster.interleaved_luma_alpha(),
    )
    .ok_or("raster plane length mismatch")?;
    buf.save(path)?;
    Ok(())
}

/// Expand a page selection: `*`/`all`, a single number, `A-B` ranges, and
/// comma-separated combinations of both.
fn parse_page_spec(spec: &str, total: usize) -> Result<Vec<usize>, String> {
    let spec = spec.trim();
    if spec.is_empty() || spec == "*" || spec == "all" {
        return Ok((0..total).collect());
    }

    let mut pages = Vec::new();
    for part in spec.split(',') {
        let part = part.trim();
        if let Some((start, end)) = part.split_once('-') {
            let start = parse_page_number(start, total)?;
            let end = parse_page_number(end, total)?;
            if start > end {
                return Err(format!(
                    "start page {} is greater than end page {}",
                    start, end
                ));
            }
            pages.extend(start..=end);
        } else {
            pages.push(parse_page_number(part, total)?);
        }
    }
    Ok(pages)
}

fn parse_page_number(text: &str, total: usize) -> Result<usize, String> {
    let page: usize = text
        .trim()
        .parse()
        .map_err(|_| format!("invalid page number: {}", text))?;
    if page >= total {
        return Err(format!(
            "page {} is out of range (0-{})",
            page,
            total.saturating_sub(1)
        ));
    }
    Ok(page)
}
