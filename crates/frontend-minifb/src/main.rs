//! qspi-bench command-line frontend.
//!
//! Runs the verification bench against the built-in reference DUT model,
//! writes the captured frame and the run report, and optionally shows the
//! frame in a window.
//!
//! The reference data streamed over the quad-SPI interface comes from a
//! binary file; the DUT model echoes it back through its scan-out raster,
//! so a passing run both checks the protocol and produces an image.
//!
//! Fault-injection options (`--corrupt-bit`, `--drop-hold`, ...) flip the
//! model into a non-compliant mode so the bench's failure paths can be
//! exercised from the command line.

use std::env;
use std::fs;
use std::path::Path;
use std::process;

use minifb::{Key, Scale, ScaleMode, Window, WindowOptions};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

use qspi_bench_core::{
    BenchConfig, NibbleOrder, ProtocolVariant, ReferenceDut, TestBench, VISIBLE_HEIGHT,
    VISIBLE_WIDTH,
};

fn usage(program: &str) -> ! {
    eprintln!("qspi-bench - quad-SPI pixel-stream verification bench");
    eprintln!("Usage: {} <data.bin> [options]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -o, --output <file>   Write the captured frame (raw 3-3-2 bytes)");
    eprintln!("  --report <file>       Write the run report (QSPB format)");
    eprintln!("  --variant a|b         Hold line on bit 6 (a, default) or bit 7 (b)");
    eprintln!("  --low-first           Stream low nibbles before high nibbles");
    eprintln!("  --threshold N         Leading-blank cycles before sampling starts");
    eprintln!("  --drain N             Drain cycles after the last nibble");
    eprintln!("  --timeout N           Per-nibble handshake budget in cycles");
    eprintln!("  --pace N              Model handshake pacing (1 = every cycle)");
    eprintln!("  --corrupt-bit N       Model drives instruction bit N inverted");
    eprintln!("  --drop-hold N         Model drops the hold line at dummy cycle N");
    eprintln!("  --no-enable-drop      Model never releases the bus");
    eprintln!("  --mute-sclk           Model never pulses the handshake");
    eprintln!("  --view                Show the captured frame in a window");
    eprintln!();
    eprintln!("Set RUST_LOG=debug for per-phase bench tracing.");
    process::exit(1);
}

fn flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

fn value<T: std::str::FromStr>(args: &[String], name: &str) -> Option<T> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args[1].starts_with('-') {
        usage(&args[0]);
    }

    let data_path = &args[1];
    let data = fs::read(data_path).unwrap_or_else(|e| {
        eprintln!("Error: {}: {}", data_path, e);
        process::exit(1);
    });
    if data.is_empty() {
        eprintln!("Error: {}: reference data is empty", data_path);
        process::exit(1);
    }
    tracing::info!(bytes = data.len(), "loaded reference data from {data_path}");

    let variant = match value::<String>(&args, "--variant").as_deref() {
        None | Some("a") => ProtocolVariant::hold_bit6(),
        Some("b") => ProtocolVariant::hold_bit7(),
        Some(other) => {
            eprintln!("Error: unknown variant '{}' (expected a or b)", other);
            process::exit(1);
        }
    };
    let order = if flag(&args, "--low-first") {
        NibbleOrder::LowFirst
    } else {
        NibbleOrder::HighFirst
    };

    let mut config = BenchConfig { variant, nibble_order: order, ..BenchConfig::default() };
    if let Some(threshold) = value(&args, "--threshold") {
        config.leading_blank_threshold = threshold;
    }
    if let Some(drain) = value(&args, "--drain") {
        config.drain_cycles = drain;
    }
    if let Some(timeout) = value(&args, "--timeout") {
        config.handshake_timeout = timeout;
    }

    let mut dut = ReferenceDut::new(variant);
    dut.nibble_order = order;
    if let Some(pace) = value(&args, "--pace") {
        dut.pace = pace;
    }
    dut.corrupt_instruction_bit = value(&args, "--corrupt-bit");
    dut.drop_hold_at = value(&args, "--drop-hold");
    dut.suppress_enable_drop = flag(&args, "--no-enable-drop");
    dut.mute_sclk = flag(&args, "--mute-sclk");

    let mut bench = TestBench::new(dut, data, config);

    let (report, failed) = match bench.run() {
        Ok(report) => (report, false),
        Err(err) => {
            eprintln!("FAIL: {}", err);
            (bench.failure_report(&err), true)
        }
    };
    println!(
        "{}: {}/{} nibbles, {} pixels captured, {} cycles ({} us simulated)",
        if report.passed { "PASS" } else { "FAIL" },
        report.nibbles_transferred,
        report.expected_nibbles,
        report.captured_pixels,
        report.rising_edges,
        report.simulated_ns / 1_000,
    );

    let output = value::<String>(&args, "-o").or_else(|| value(&args, "--output"));
    if let Some(path) = output {
        bench.frame.write_binary(Path::new(&path)).unwrap_or_else(|e| {
            eprintln!("Error: {}: {}", path, e);
            process::exit(1);
        });
        tracing::info!(pixels = bench.frame.len(), "frame written to {path}");
    }
    if let Some(path) = value::<String>(&args, "--report") {
        report.save(Path::new(&path)).unwrap_or_else(|e| {
            eprintln!("Error: {}: {}", path, e);
            process::exit(1);
        });
        tracing::info!("report written to {path}");
    }

    if flag(&args, "--view") && !bench.frame.is_empty() {
        view_frame(&bench.frame.as_pixel_buffer());
    }

    if failed {
        process::exit(1);
    }
}

/// Display the captured frame until the window closes or Escape is pressed.
/// A partial capture is padded with black.
fn view_frame(pixels: &[u32]) {
    let mut buffer = vec![0u32; VISIBLE_WIDTH * VISIBLE_HEIGHT];
    let n = pixels.len().min(buffer.len());
    buffer[..n].copy_from_slice(&pixels[..n]);

    let mut window = Window::new(
        "qspi-bench - captured frame",
        VISIBLE_WIDTH,
        VISIBLE_HEIGHT,
        WindowOptions {
            scale: Scale::X1,
            scale_mode: ScaleMode::AspectRatioStretch,
            resize: true,
            ..Default::default()
        },
    )
    .expect("Failed to create window");
    window.set_target_fps(60);

    while window.is_open() && !window.is_key_down(Key::Escape) {
        window
            .update_with_buffer(&buffer, VISIBLE_WIDTH, VISIBLE_HEIGHT)
            .expect("window update");
    }
}
