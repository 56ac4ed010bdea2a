use std::io::IsTerminal;
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use aidlink_client::{AuxFlags, ImageFrame, SendReport};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
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
struct ImageOutput<'a> {
    event: &'static str,
    peer: String,
    width: u32,
    height: u32,
    format: &'a str,
    name: &'a str,
    notes: &'a str,
    payload_size: usize,
    row_stride_bits: u32,
    gain: [f32; 4],
    bias: [f32; 4],
    aux_flags: u32,
    auto_gain_bias: bool,
    timestamp: String,
}

#[derive(Serialize)]
struct ReportOutput<'a> {
    event: &'static str,
    name: &'a str,
    peer: String,
    attempts: u32,
    polls: u32,
    header_bytes: usize,
    string_bytes: usize,
    payload_bytes: usize,
    chunks: usize,
    timestamp: String,
}

pub fn print_image(frame: &ImageFrame, peer: SocketAddr, format: OutputFormat) {
    let header = &frame.header;
    let format_str = frame.format_str();
    let name = frame.name_str();
    let notes = frame.notes_str();

    match format {
        OutputFormat::Json => {
            let out = ImageOutput {
                event: "image-received",
                peer: peer.to_string(),
                width: header.width,
                height: header.height,
                format: &format_str,
                name: &name,
                notes: &notes,
                payload_size: frame.payload.len(),
                row_stride_bits: header.row_stride_bits,
                gain: header.gain,
                bias: header.bias,
                aux_flags: header.aux_flags.bits(),
                auto_gain_bias: header.aux_flags.contains(AuxFlags::AUTO_GAIN_BIAS),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["NAME", "SIZE", "FORMAT", "BYTES", "GAIN", "BIAS", "PEER"])
                .add_row(vec![
                    name.to_string(),
                    format!("{}x{}", header.width, header.height),
                    format_str.to_string(),
                    frame.payload.len().to_string(),
                    channel_list(&header.gain),
                    channel_list(&header.bias),
                    peer.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "name={:?} size={}x{} format={:?} bytes={} gain={} bias={} flags={:#x} peer={}",
                name,
                header.width,
                header.height,
                format_str,
                frame.payload.len(),
                channel_list(&header.gain),
                channel_list(&header.bias),
                header.aux_flags.bits(),
                peer,
            );
            if !notes.is_empty() {
                println!("  notes: {notes}");
            }
        }
    }
}

pub fn print_report(name: &str, report: &SendReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ReportOutput {
                event: "image-sent",
                name,
                peer: report.peer.to_string(),
                attempts: report.attempts,
                polls: report.polls,
                header_bytes: report.header_bytes,
                string_bytes: report.string_bytes,
                payload_bytes: report.payload_bytes,
                chunks: report.chunks,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["NAME", "PEER", "ATTEMPTS", "POLLS", "BYTES", "CHUNKS"])
                .add_row(vec![
                    name.to_string(),
                    report.peer.to_string(),
                    report.attempts.to_string(),
                    report.polls.to_string(),
                    total_bytes(report).to_string(),
                    report.chunks.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "sent {:?} to {} ({} bytes, {} chunk(s), attempts={}, polls={})",
                name,
                report.peer,
                total_bytes(report),
                report.chunks,
                report.attempts,
                report.polls,
            );
        }
    }
}

fn total_bytes(report: &SendReport) -> usize {
    report.header_bytes + report.string_bytes + report.payload_bytes
}

fn channel_list(values: &[f32; 4]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
