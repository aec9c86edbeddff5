use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use rforge_frame::{Frame, LinkCounters};
use rforge_stream::{encode_text, ChannelStats, DataFrame};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    command: &'a str,
    code: u8,
    sequence: u16,
    payload_size: usize,
    payload: String,
    payload_hex: String,
}

impl<'a> FrameOutput<'a> {
    fn new(frame: &'a Frame) -> Self {
        Self {
            command: frame.command.name(),
            code: frame.command.as_u8(),
            sequence: frame.sequence,
            payload_size: frame.payload.len(),
            payload: payload_preview(&frame.payload),
            payload_hex: hex::encode(&frame.payload),
        }
    }
}

/// Print decoded link frames. JSON output is one object per line.
pub fn print_frames(frames: &[Frame], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for frame in frames {
                print_json(&FrameOutput::new(frame));
            }
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["#", "COMMAND", "CODE", "SEQ", "SIZE", "PAYLOAD"]);
            for (index, frame) in frames.iter().enumerate() {
                table.add_row(vec![
                    index.to_string(),
                    frame.command.to_string(),
                    format!("0x{:02X}", frame.command.as_u8()),
                    frame.sequence.to_string(),
                    frame.payload.len().to_string(),
                    payload_preview(&frame.payload),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for frame in frames {
                println!(
                    "command={} seq={} size={} payload={}",
                    frame.command,
                    frame.sequence,
                    frame.payload.len(),
                    payload_preview(&frame.payload)
                );
            }
        }
        OutputFormat::Raw => {
            for frame in frames {
                print_raw(&frame.payload);
            }
        }
    }
}

/// Print data frames as a whole (table) or one per line.
pub fn print_data_frames(frames: &[DataFrame], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let mut table = new_table(vec!["TIMESTAMP_US", "CHANNEL", "VALUE"]);
            for frame in frames {
                for channel in &frame.channels {
                    table.add_row(vec![
                        frame.timestamp_us.to_string(),
                        channel.channel_id.to_string(),
                        channel.value.to_string(),
                    ]);
                }
            }
            println!("{table}");
        }
        _ => {
            for frame in frames {
                print_data_frame(frame, format);
            }
        }
    }
}

/// Print one data frame on its own line. Tables degrade to pretty lines.
pub fn print_data_frame(frame: &DataFrame, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(frame),
        OutputFormat::Table | OutputFormat::Pretty => {
            let channels = frame
                .channels
                .iter()
                .map(|c| format!("ch{}={}", c.channel_id, c.value))
                .collect::<Vec<_>>()
                .join(" ");
            println!("t={}us {channels}", frame.timestamp_us);
        }
        OutputFormat::Raw => {
            let mut line = encode_text(frame).to_vec();
            line.push(b'\n');
            print_raw(&line);
        }
    }
}

#[derive(Serialize)]
struct StatsOutput<'a> {
    channel: u16,
    window: usize,
    #[serde(flatten)]
    stats: &'a ChannelStats,
}

pub fn print_stats(channel: u16, window: usize, stats: &ChannelStats, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&StatsOutput {
            channel,
            window,
            stats,
        }),
        OutputFormat::Table => {
            let mut table =
                new_table(vec!["CHANNEL", "SAMPLES", "MEAN", "PEAK_TO_PEAK", "FREQ_HZ"]);
            table.add_row(vec![
                channel.to_string(),
                stats.sample_count.to_string(),
                format!("{:.6}", stats.mean),
                format!("{:.6}", stats.peak_to_peak),
                format!("{:.3}", stats.frequency_hz),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!(
                "channel={} samples={} mean={:.6} p2p={:.6} freq={:.3}Hz",
                channel, stats.sample_count, stats.mean, stats.peak_to_peak, stats.frequency_hz
            );
        }
    }
}

#[derive(Serialize)]
struct CountersOutput {
    frames: u64,
    crc_errors: u64,
    oversize_payloads: u64,
    overlong_lines: u64,
}

/// Link-quality summary after a decode run.
pub fn print_counters(counters: &LinkCounters, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&CountersOutput {
            frames: counters.frames_decoded,
            crc_errors: counters.crc_errors,
            oversize_payloads: counters.oversize_payloads,
            overlong_lines: counters.overlong_lines,
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["FRAMES", "CRC_ERRORS", "OVERSIZE", "OVERLONG"]);
            table.add_row(vec![
                counters.frames_decoded.to_string(),
                counters.crc_errors.to_string(),
                counters.oversize_payloads.to_string(),
                counters.overlong_lines.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!(
            "frames={} crc_errors={} oversize={} overlong={}",
            counters.frames_decoded,
            counters.crc_errors,
            counters.oversize_payloads,
            counters.overlong_lines
        ),
        OutputFormat::Raw => {}
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) if !text.chars().any(char::is_control) => text.to_string(),
        _ => format!("<binary {} bytes>", payload.len()),
    }
}
