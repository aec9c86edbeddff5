use std::fs::File;

use comfy_table::{presets::UTF8_FULL, Table};
use rforge_frame::{Command, FrameWriter, ParserMode, ProtocolArbiter};
use serde::Serialize;
use tracing::info;

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_json, print_raw, OutputFormat};

#[derive(Serialize)]
struct EncodedOutput<'a> {
    command: &'a str,
    code: u8,
    size: usize,
    hex: String,
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let command = Command::parse(&args.command)
        .ok_or_else(|| CliError::new(USAGE, format!("unknown command: {}", args.command)))?;
    let payload = resolve_payload(&args)?;
    let mode = if args.text {
        ParserMode::Text
    } else {
        ParserMode::Binary
    };
    let mut arbiter = ProtocolArbiter::new(mode);

    if let Some(path) = &args.output {
        let file = File::create(path)
            .map_err(|err| io_error(&format!("failed creating {}", path.display()), err))?;
        let mut writer = FrameWriter::with_arbiter(file, arbiter);
        writer
            .send(command, &payload)
            .map_err(|err| frame_error("encode failed", err))?;
        info!(%command, path = %path.display(), "frame written");
        return Ok(SUCCESS);
    }

    let bytes = arbiter
        .encode_command(command, &payload)
        .map_err(|err| frame_error("encode failed", err))?;
    match format {
        OutputFormat::Raw => print_raw(&bytes),
        OutputFormat::Json => print_json(&EncodedOutput {
            command: command.name(),
            code: command.as_u8(),
            size: bytes.len(),
            hex: hex::encode(&bytes),
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["COMMAND", "SIZE", "BYTES"])
                .add_row(vec![
                    command.to_string(),
                    bytes.len().to_string(),
                    spaced_hex(&bytes),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{command}: {}", spaced_hex(&bytes)),
    }
    Ok(SUCCESS)
}

fn resolve_payload(args: &EncodeArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(digits) = &args.hex {
        return parse_hex(digits);
    }
    Ok(Vec::new())
}

/// Hex digits, optionally separated by whitespace, `:` or `-`.
fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != '-')
        .collect();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(&digits);
    hex::decode(digits)
        .map_err(|err| CliError::new(USAGE, format!("--hex is not valid hex: {err}")))
}

fn spaced_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
