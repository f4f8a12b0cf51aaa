use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    thread,
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use i8080::{
    hosts::{
        cpm::{Console, Diagnostic},
        invaders::Cabinet,
    },
    scheduler::{FramePacer, Scheduler, Tick, Timing},
    trace::{Silent, Trace, Tracer},
    Halt, Machine, Stop,
};

#[derive(Parser, Debug)]
#[command(name = "i8080", version, about = "Run Intel 8080 programs on emulated hosts")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run CP/M diagnostic programs, one thread each, and report which passed.
    Diag {
        #[arg(required = true)]
        roms: Vec<PathBuf>,
        /// The program reports once through BDOS function 9 and that report ends the run.
        #[arg(long)]
        halting: bool,
    },
    /// Run a Space Invaders ROM headless in real time.
    Invaders {
        rom: PathBuf,
        #[arg(long, default_value_t = 5)]
        seconds: u32,
        /// Log every instruction at TRACE level.
        #[arg(long)]
        trace: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let fallback = if cli.verbose { "i8080=debug" } else { "i8080=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();

    let outcome = match cli.command {
        Command::Diag { roms, halting } => diagnose(roms, halting),
        Command::Invaders { rom, seconds, trace } => invaders(&rom, seconds, trace),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            error!("{failure:#}");
            ExitCode::FAILURE
        }
    }
}

struct Report {
    stop: Stop,
    printed: String,
    cycles: u64,
}

impl Report {
    fn passed(&self) -> bool {
        self.stop.is_success() && !self.printed.contains("ERROR")
    }
}

fn run_console(rom: &Path, halting: bool) -> Result<Report> {
    let image = std::fs::read(rom).with_context(|| format!("reading {}", rom.display()))?;
    let report = if halting {
        let mut machine = Diagnostic::new(&image)?.boot()?;
        let stop = machine.run();
        Report { stop, printed: machine.printed().to_owned(), cycles: machine.chip().cycles() }
    } else {
        let mut machine = Console::new(&image)?.boot()?;
        let stop = machine.run();
        Report { stop, printed: machine.printed().to_owned(), cycles: machine.chip().cycles() }
    };
    Ok(report)
}

fn diagnose(roms: Vec<PathBuf>, halting: bool) -> Result<()> {
    let runs: Vec<_> = roms
        .into_iter()
        .map(|rom| {
            let worker = thread::Builder::new()
                .name(rom.display().to_string())
                .spawn({
                    let rom = rom.clone();
                    move || run_console(&rom, halting)
                });
            (rom, worker)
        })
        .collect();

    let mut failed = 0;
    for (rom, worker) in runs {
        let name = rom.display();
        let report = match worker {
            Ok(handle) => match handle.join() {
                Ok(report) => report,
                Err(_) => Err(anyhow::anyhow!("worker panicked")),
            },
            Err(spawn) => Err(spawn.into()),
        };
        match report {
            Ok(report) if report.passed() => {
                info!(rom = %name, cycles = report.cycles, "{}", report.stop);
                println!("PASS {name}");
            }
            Ok(report) => {
                failed += 1;
                warn!(rom = %name, cycles = report.cycles, printed = %report.printed.trim_end(), "{}", report.stop);
                println!("FAIL {name}: {}", report.stop);
            }
            Err(problem) => {
                failed += 1;
                println!("FAIL {name}: {problem:#}");
            }
        }
    }
    if failed > 0 {
        bail!("{failed} diagnostic(s) failed");
    }
    Ok(())
}

fn invaders(rom: &Path, seconds: u32, trace: bool) -> Result<()> {
    let image = std::fs::read(rom).with_context(|| format!("reading {}", rom.display()))?;
    let mut machine = Machine::new(Cabinet::load(&image)?)?;
    let timing = Timing::default();
    let mut scheduler = Scheduler::new(timing);
    let mut tracer: Box<dyn Trace> = if trace { Box::new(Tracer) } else { Box::new(Silent) };

    let frames = seconds * timing.frame_rate;
    let started = Instant::now();
    scheduler.start(started);
    let mut pacer = FramePacer::new(&timing, started);
    let mut total = Tick::default();
    let mut idle = Duration::ZERO;
    for frame in 0..frames {
        match scheduler.tick_traced(&mut machine, Instant::now(), tracer.as_mut()) {
            Ok(tick) => total += tick,
            Err(Stop::Halt(Halt::Instruction)) => {
                info!(frame, "program halted");
                break;
            }
            Err(stop) => {
                return Err(stop).with_context(|| format!("frame {frame} at {:#06X}", machine.chip().pc()));
            }
        }
        idle += pacer.wait();
    }

    let lit: u32 = machine.video_ram().iter().map(|byte| byte.count_ones()).sum();
    println!(
        "{} cycles, {} of {} interrupts taken, {lit} pixels lit, {:.1}s elapsed ({:.1}s idle)",
        total.cycles,
        total.accepted,
        total.presented,
        started.elapsed().as_secs_f32(),
        idle.as_secs_f32(),
    );
    Ok(())
}
