use colored::Colorize;
use raster_codec::converter::psnr;
use raster_codec::format::gif::{encode_frame_data, read_sub_blocks};
use raster_codec::{lzw_decode, CodecResult, FormFactor, GifConfig, JpegConfig, RasterConverter};

fn main() -> CodecResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        print_usage();
        std::process::exit(1);
    }

    let command = &args[1];
    let input = &args[2];

    match command.as_str() {
        "jpeg" => {
            let Some(output) = args.get(3) else {
                eprintln!("{} Output file required", "Error:".red().bold());
                std::process::exit(1);
            };
            let quality = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(85);
            let form = match args.get(5).map(String::as_str) {
                Some("420") => FormFactor::Yuv420,
                _ => FormFactor::Yuv444,
            };
            jpeg_roundtrip(input, output, quality, form)?;
        }
        "lzw" => {
            let Some(output) = args.get(3) else {
                eprintln!("{} Output file required", "Error:".red().bold());
                std::process::exit(1);
            };
            let code_size = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(8);
            lzw_compress(input, output, code_size)?;
        }
        "unlzw" => {
            let Some(output) = args.get(3) else {
                eprintln!("{} Output file required", "Error:".red().bold());
                std::process::exit(1);
            };
            lzw_expand(input, output)?;
        }
        "benchmark" => {
            benchmark(input)?;
        }
        _ => {
            eprintln!("{} Unknown command: {}", "Error:".red().bold(), command);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}

fn jpeg_roundtrip(input: &str, output: &str, quality: u8, form: FormFactor) -> CodecResult<()> {
    println!(
        "{} {} → {} (quality: {}, form: {:#04x})",
        "JPEG".cyan().bold(),
        input.yellow(),
        output.green(),
        quality.to_string().magenta(),
        form as u8
    );

    let config = JpegConfig {
        form_factor: form,
        ..JpegConfig::lossy(quality)
    };
    let converter = RasterConverter::new().with_jpeg(config);
    let original = image::open(input)?;
    let result = converter.jpeg_roundtrip(&original)?;
    result.image.save(output)?;

    let raw_size = original.width() as usize * original.height() as usize * 3;
    let coded = result.scan.total_size();
    let ratio = coded as f64 / raw_size as f64 * 100.0;

    if result.frame.clean {
        println!("{}", "✓ Round trip complete!".green().bold());
    } else {
        println!("{}", "! Scan decoded with errors".yellow().bold());
    }
    println!(
        "  {} {}x{}",
        "Dimensions:".dimmed(),
        original.width().to_string().white(),
        original.height().to_string().white()
    );
    println!("  {} {} bytes", "Raw:       ".dimmed(), raw_size.to_string().white());
    println!(
        "  {} {} bytes ({} MCUs)",
        "Coded:     ".dimmed(),
        coded.to_string().white(),
        result.scan.mcus
    );
    println!("  {} {}%", "Ratio:     ".dimmed(), format!("{:.1}", ratio).cyan());
    println!(
        "  {} {} dB",
        "PSNR:      ".dimmed(),
        format!("{:.2}", psnr(&original, &result.image)).magenta()
    );

    Ok(())
}

fn lzw_compress(input: &str, output: &str, code_size: u8) -> CodecResult<()> {
    println!(
        "{} {} → {} (code size: {})",
        "LZW".cyan().bold(),
        input.yellow(),
        output.green(),
        code_size.to_string().magenta()
    );

    let data = std::fs::read(input)?;
    let config = GifConfig {
        min_code_size: code_size,
        ..GifConfig::default()
    };
    let encoded = encode_frame_data(&data, &config)?;
    std::fs::write(output, &encoded)?;

    let ratio = if data.is_empty() {
        0.0
    } else {
        encoded.len() as f64 / data.len() as f64 * 100.0
    };
    println!("{}", "✓ Compressed successfully!".green().bold());
    println!("  {} {} bytes", "Input: ".dimmed(), data.len().to_string().white());
    println!("  {} {} bytes", "Output:".dimmed(), encoded.len().to_string().white());
    println!("  {} {}%", "Ratio: ".dimmed(), format!("{:.1}", ratio).cyan());

    Ok(())
}

fn lzw_expand(input: &str, output: &str) -> CodecResult<()> {
    println!(
        "{} {} → {}",
        "UNLZW".cyan().bold(),
        input.yellow(),
        output.green()
    );

    let data = std::fs::read(input)?;
    let Some((&code_size, rest)) = data.split_first() else {
        eprintln!("{} Empty input", "Error:".red().bold());
        std::process::exit(1);
    };
    let (stream, _) = read_sub_blocks(rest)?;
    let (decoded, clean) = lzw_decode(&stream, code_size)?;
    std::fs::write(output, &decoded)?;

    if clean {
        println!("{}", "✓ Expanded successfully!".green().bold());
    } else {
        println!("{}", "! Stream ended without an end code".yellow().bold());
    }
    println!("  {} {} bytes", "Output:".dimmed(), decoded.len().to_string().white());

    Ok(())
}

fn benchmark(input: &str) -> CodecResult<()> {
    let img = image::open(input)?;
    let raw_size = img.width() as usize * img.height() as usize * 3;

    println!();
    println!("{}", "═══ JPEG Pipeline Benchmark ═══".cyan().bold());
    println!(
        "{} {} ({}x{}, {} bytes raw)",
        "Input:".dimmed(),
        input.yellow(),
        img.width(),
        img.height(),
        raw_size
    );
    println!();
    println!(
        "{:>6} {:>6} {:>10} {:>8} {:>8} {:>10}",
        "Q".white().bold(),
        "Form".white().bold(),
        "Size".white().bold(),
        "Ratio".white().bold(),
        "PSNR".white().bold(),
        "Time".white().bold()
    );
    println!("{}", "─".repeat(54).dimmed());

    for q in [95u8, 85, 75, 50, 25] {
        for config in [JpegConfig::lossy(q), JpegConfig::subsampled(q)] {
            let form = config.form_factor;
            let converter = RasterConverter::new().with_jpeg(config);
            let start = std::time::Instant::now();
            let result = converter.jpeg_roundtrip(&img)?;
            let elapsed = start.elapsed();

            let size = result.scan.total_size();
            println!(
                "{:>6} {:>6} {:>10} {:>7}% {:>8} {:>8}ms",
                q.to_string().cyan(),
                format!("{:#04x}", form as u8).yellow(),
                size.to_string().white(),
                format!("{:.1}", size as f64 / raw_size as f64 * 100.0).magenta(),
                format!("{:.2}", psnr(&img, &result.image)).green(),
                format!("{:.2}", elapsed.as_secs_f64() * 1000.0).dimmed()
            );
        }
    }

    println!();
    println!("{}", "✓ Benchmark complete!".green().bold());

    Ok(())
}

fn print_usage() {
    println!();
    println!(
        "{} {}",
        "Raster Codec".cyan().bold(),
        raster_codec::VERSION.green()
    );
    println!();
    println!("{}", "USAGE:".yellow().bold());
    println!(
        "  {} {} <input> <output.png> [quality] [444|420]",
        "rastercodec".white(),
        "jpeg".green()
    );
    println!(
        "  {} {} <input> <output> [code-size]",
        "rastercodec".white(),
        "lzw".green()
    );
    println!(
        "  {} {} <input> <output>",
        "rastercodec".white(),
        "unlzw".green()
    );
    println!("  {} {} <input>", "rastercodec".white(), "benchmark".green());
    println!();
    println!("{}", "OPTIONS:".yellow().bold());
    println!("  {} 1-100 (default: 85)", "Quality:  ".dimmed());
    println!("  {} 2-8 (default: 8)", "Code size:".dimmed());
    println!();
    println!("{}", "EXAMPLES:".yellow().bold());
    println!("  {} photo.png photo_q75.png 75 420", "rastercodec jpeg".cyan());
    println!("  {} notes.txt notes.lzw", "rastercodec lzw".cyan());
    println!("  {} notes.lzw notes.txt", "rastercodec unlzw".cyan());
    println!();
}
