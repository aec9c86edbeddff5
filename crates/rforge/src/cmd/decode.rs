use std::fs::File;
use std::io::BufReader;

use rforge_frame::{BinaryConfig, FrameReader, ProtocolArbiter, TextConfig};
use tracing::info;

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::{print_counters, print_frames, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let file = File::open(&args.capture)
        .map_err(|err| io_error(&format!("failed opening {}", args.capture.display()), err))?;
    let arbiter = ProtocolArbiter::with_config(
        args.mode.into(),
        BinaryConfig {
            max_payload: args.max_payload,
        },
        TextConfig::default(),
    );
    let mut reader = FrameReader::with_arbiter(BufReader::new(file), arbiter);

    let limit = args.count.unwrap_or(usize::MAX);
    let mut frames = Vec::new();
    for frame in reader.by_ref().take(limit) {
        frames.push(frame.map_err(|err| frame_error("decode failed", err))?);
    }

    let counters = reader.counters();
    info!(
        frames = frames.len(),
        crc_errors = counters.crc_errors,
        oversize = counters.oversize_payloads,
        overlong = counters.overlong_lines,
        protocol = reader.arbiter().active_protocol().map(|p| p.name()).unwrap_or("none"),
        "capture decoded"
    );

    if args.summary {
        print_counters(&counters, format);
    } else {
        print_frames(&frames, format);
    }
    Ok(SUCCESS)
}
