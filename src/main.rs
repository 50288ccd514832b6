mod acc;
mod config;
mod ecg;
mod emitter;
mod error;
mod leads;
mod packet;
mod sample;
mod sequence;
mod session;
mod sink;
mod status;
mod stream;

use config::Config;
use session::{Session, StreamKind};
use status::QrsEstimate;
use std::io::BufRead;

/// One line of a captured notification log
#[derive(Debug, PartialEq)]
enum CaptureLine {
    Data(StreamKind, Vec<u8>),
    Battery(u8),
    Qrs(QrsEstimate),
}

/// Parse `qrs <avg_qrs> <avg_qrs_ms> <0|1>`
fn parse_qrs(value: &str) -> Result<QrsEstimate, String> {
    let fields: Vec<&str> = value.split_whitespace().collect();
    let [avg_qrs, avg_qrs_ms, is_qrs] = fields[..] else {
        return Err(format!("Expected 3 QRS fields, got {}", fields.len()));
    };

    Ok(QrsEstimate {
        avg_qrs: avg_qrs
            .parse()
            .map_err(|e| format!("Invalid QRS count {}: {}", avg_qrs, e))?,
        avg_qrs_ms: avg_qrs_ms
            .parse()
            .map_err(|e| format!("Invalid QRS duration {}: {}", avg_qrs_ms, e))?,
        is_qrs: match is_qrs {
            "0" | "false" => false,
            "1" | "true" => true,
            other => return Err(format!("Invalid QRS flag: {}", other)),
        },
    })
}

/// Parse `ecg <hex>`, `acc <hex>`, `battery <percent>` or `qrs <fields>`.
/// Blank lines and `#` comments yield `Ok(None)`.
fn parse_capture_line(line: &str) -> Result<Option<CaptureLine>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (tag, value) = line
        .split_once(char::is_whitespace)
        .ok_or_else(|| format!("Missing value in line: {}", line))?;
    let value = value.trim();

    if tag == "battery" {
        let percent = value
            .parse::<u8>()
            .map_err(|e| format!("Invalid battery level {}: {}", value, e))?;
        return Ok(Some(CaptureLine::Battery(percent)));
    }

    if tag == "qrs" {
        return parse_qrs(value).map(|qrs| Some(CaptureLine::Qrs(qrs)));
    }

    let kind = StreamKind::all()
        .into_iter()
        .find(|kind| kind.suffix() == tag)
        .ok_or_else(|| format!("Unknown stream: {}", tag))?;
    let bytes = hex::decode(value).map_err(|e| format!("Invalid hex payload: {}", e))?;

    Ok(Some(CaptureLine::Data(kind, bytes)))
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::warn!("{}, using default settings", e);
            Config::default()
        }
    };

    // The bus needs a broker bridge draining it; replay only records to files
    let session = match Session::open(&config, None) {
        Ok(session) => session,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let stdin = std::io::stdin();
    for (number, line) in stdin.lock().lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::error!("Failed to read capture: {}", e);
                break;
            }
        };

        match parse_capture_line(&line) {
            Ok(Some(CaptureLine::Data(kind, bytes))) => {
                if let Err(e) = session.notify(kind, &bytes) {
                    log::error!("{}", e);
                    break;
                }
            }
            Ok(Some(CaptureLine::Battery(percent))) => session.notify_battery(&[percent]),
            Ok(Some(CaptureLine::Qrs(estimate))) => session.set_qrs_estimate(estimate),
            Ok(None) => {}
            Err(e) => log::warn!("Skipping capture line {}: {}", number + 1, e),
        }
    }

    session.close();
}
