#![doc = include_str!("../readme.md")]

use clap::Parser;
use rs978::prelude::*;
use serde::Serialize;
use std::io;

#[derive(Serialize)]
struct TimedMessage {
    /// Offset of the frame from the start of the stream, in seconds
    timestamp: f64,
    /// The raw frame line
    frame: String,
    rs_errors: usize,
    #[serde(flatten)]
    message: Option<UatMessage>,
}

#[derive(Debug, Parser)]
#[command(
    name = "decode978",
    version,
    about = "Demodulate and decode UAT 978 MHz ADS-B and FIS-B signals"
)]
struct Options {
    /// Emit raw frame lines only, without the decoded form
    #[arg(long, default_value = "false")]
    raw: bool,

    /// Emit one JSON object per frame instead of the decoded form
    #[arg(long, default_value = "false")]
    json: bool,

    /// Individual raw frame lines to decode instead of demodulating
    /// samples from the standard input
    msgs: Vec<String>,
}

fn display(frame: &RawFrame, options: &Options) {
    if options.json {
        let timed = TimedMessage {
            timestamp: frame.seconds(),
            frame: frame.to_string(),
            rs_errors: frame.rs_errors,
            message: UatMessage::from_frame(frame).ok(),
        };
        match serde_json::to_string(&timed) {
            Ok(line) => println!("{line}"),
            Err(e) => eprintln!("failed to serialize frame: {e}"),
        }
        return;
    }
    println!("{frame}");
    if options.raw {
        return;
    }
    match UatMessage::from_frame(frame) {
        Ok(message) => {
            println!("# {:.6}s", frame.seconds());
            print!("{message}");
            println!();
        }
        Err(e) => {
            eprintln!("undecodable frame at {:.6}s: {e}", frame.seconds())
        }
    }
}

fn main() -> io::Result<()> {
    tracing_subscriber::fmt::init();
    let options = Options::parse();

    if !options.msgs.is_empty() {
        for msg in &options.msgs {
            match msg.parse::<RawFrame>() {
                Ok(frame) => display(&frame, &options),
                Err(e) => eprintln!("skipping {msg}: {e}"),
            }
        }
        return Ok(());
    }

    let demod = Demodulator::new();
    let stdin = io::stdin();
    demod.run(stdin.lock(), |frame| display(&frame, &options))
}
