mod logging;

use std::{
    collections::HashMap,
    io::{self, IsTerminal},
    process::ExitCode,
};

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Table};

use gatesim::{
    import,
    simulation::{settle, GateKind, LogicValue, PinKey},
    timing::{calculate_delay, schedule_settle, DelayMode, EventTarget, PropagationScheduler},
    truth_table::{self, GateSpec},
    Config,
};

#[derive(Parser)]
#[command(name = "gatesim", version, about = "Settle four-valued logic gate circuits and print truth tables")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    verbosity: Verbosity<WarnLevel>,

    /// JSON config file with settle and timing settings.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Import a circuit, settle it and print the level of every sink.
    Settle {
        #[arg(value_name = "CIRCUIT")]
        circuit: String,

        /// Toggle the source with this index (in document order) after the first settle, then settle again. Repeatable.
        #[arg(long, value_name = "INDEX")]
        toggle: Vec<usize>,

        /// Print the wire changes of the last settle as a timed playback in this mode.
        #[arg(long, value_enum)]
        playback: Option<ModeArg>,
    },

    /// Print the truth table of a single gate.
    Table {
        kind: GateKind,

        #[arg(long, default_value_t = 2)]
        arity: usize,

        /// Live input levels such as `10` or `1z`, used to mark the current row.
        #[arg(long)]
        live: Option<String>,
    },

    /// Print how long a change takes to pass through a gate.
    Delay {
        kind: GateKind,

        #[arg(long, value_enum, default_value_t = ModeArg::Realistic)]
        mode: ModeArg,

        #[arg(long)]
        speed: Option<f64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Instant,
    Smooth,
    Realistic,
}

impl From<ModeArg> for DelayMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Instant => DelayMode::Instant,
            ModeArg::Smooth => DelayMode::Smooth,
            ModeArg::Realistic => DelayMode::Realistic,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(&logging::LogConfig { level_filter: cli.verbosity.tracing_level_filter(), use_env_filter: !cli.verbosity.is_present(), with_ansi: io::stderr().is_terminal() });

    let config = match &cli.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: could not load config '{path}': {e}");
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };

    let result = match cli.command {
        Command::Settle { circuit, toggle, playback } => run_settle(&config, &circuit, &toggle, playback),
        Command::Table { kind, arity, live } => run_table(kind, arity, live.as_deref()),
        Command::Delay { kind, mode, speed } => {
            let timing = match speed {
                Some(speed) => config.timing.with_speed(speed),
                None => config.timing,
            };
            println!("{}", calculate_delay(kind, mode.into(), &timing));
            Ok(ExitCode::SUCCESS)
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_settle(config: &Config, filename: &str, toggles: &[usize], playback: Option<ModeArg>) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut imported = import::import(filename)?;
    let names: HashMap<PinKey, usize> = imported.pins.iter().map(|(number, pin)| (*pin, *number)).collect();

    let mut report = settle(&mut imported.circuit, &config.settle);
    if !toggles.is_empty() {
        for index in toggles {
            let source = *imported.sources.get(*index).ok_or_else(|| format!("there is no source with index {index}"))?;
            imported.circuit.toggle_source(source)?;
        }
        report = settle(&mut imported.circuit, &config.settle);
    }

    let mut sinks = Table::new();
    sinks.load_preset(UTF8_FULL_CONDENSED).set_header(vec!["sink", "pin", "level"]);
    for (i, sink) in imported.sinks.iter().enumerate() {
        let pin = imported.circuit.sink(*sink).map(|s| s.input());
        let level = imported.circuit.sink_level(*sink).unwrap_or(LogicValue::HiZ);
        sinks.add_row(vec![Cell::new(i), Cell::new(pin.and_then(|p| names.get(&p)).map_or("?".to_string(), |n| n.to_string())), Cell::new(level.name())]);
    }
    println!("{sinks}");

    let wire_name = |wire| {
        imported.circuit.wire(wire).map_or("?".to_string(), |w| w.drivers().iter().map(|d| names.get(d).map_or("?".to_string(), |n| n.to_string())).collect::<Vec<_>>().join("+"))
    };

    let mut changes = Table::new();
    changes.load_preset(UTF8_FULL_CONDENSED).set_header(vec!["wire (drivers)", "from", "to", "pass"]);
    for change in &report.changed_wires {
        changes.add_row(vec![Cell::new(wire_name(change.wire)), Cell::new(change.previous.name()), Cell::new(change.level.name()), Cell::new(change.pass)]);
    }
    println!("{changes}");

    if let Some(mode) = playback {
        let mut timing = config.timing;
        timing.mode = mode.into();
        let mut scheduler = PropagationScheduler::new();
        schedule_settle(&mut scheduler, &imported.circuit, &report, 0.0, &timing);

        let mut events = Table::new();
        events.load_preset(UTF8_FULL_CONDENSED).set_header(vec!["time (ms)", "target", "level", "gate"]);
        for event in scheduler.process_events(f64::INFINITY) {
            let target = match event.target {
                EventTarget::Wire(wire) => format!("wire {}", wire_name(wire)),
                EventTarget::Pin(pin) => format!("pin {}", names.get(&pin).map_or("?".to_string(), |n| n.to_string())),
            };
            events.add_row(vec![
                Cell::new(event.scheduled_time),
                Cell::new(target),
                Cell::new(event.level.name()),
                Cell::new(event.gate_kind.map_or(String::new(), |k| k.to_string())),
            ]);
        }
        println!("{events}");
    }

    if report.converged {
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("warning: circuit did not settle after {} passes; it has unresolved feedback", report.iterations);
        Ok(ExitCode::from(2))
    }
}

fn run_table(kind: GateKind, arity: usize, live: Option<&str>) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut table = truth_table::generate(&GateSpec::for_kind(kind, arity))?;
    if let Some(live) = live {
        let levels = live.chars().map(|c| LogicValue::parse(&c.to_string()).ok_or_else(|| format!("invalid level '{c}'"))).collect::<Result<Vec<_>, _>>()?;
        table.update_current_row(&levels);
    }

    let mut out = Table::new();
    let mut header: Vec<String> = vec!["row".to_string()];
    header.extend(table.input_names.iter().cloned());
    header.push(table.output_name.clone());
    out.load_preset(UTF8_FULL_CONDENSED).set_header(header);
    for row in &table.rows {
        let mut cells = vec![Cell::new(if row.is_current { format!("> {}", row.id) } else { row.id.clone() })];
        cells.extend(row.inputs.iter().map(|v| Cell::new(v)));
        cells.push(Cell::new(row.output));
        out.add_row(cells);
    }
    println!("{kind} ({} inputs)", table.input_names.len());
    println!("{out}");
    Ok(ExitCode::SUCCESS)
}
