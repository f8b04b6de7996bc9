pub mod handlers;

use clap::{value_parser, Arg, ArgAction, Command};

pub fn build_cli() -> Command {
    Command::new("geoset")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Geospatial imagery dataset producer with a bounded output queue")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug-level logging (overridden by RUST_LOG)"),
        )
        .subcommand(cmd_run())
        .subcommand(cmd_queue())
        .subcommand(cmd_bbox_size())
}

fn queue_db_arg() -> Arg {
    Arg::new("queue-db")
        .long("queue-db")
        .value_name("PATH")
        .value_parser(value_parser!(std::path::PathBuf))
        .help("Queue database file (default: GEOSET_QUEUE_DB or output_queue.db)")
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Print a JSON envelope instead of text")
}

fn positive_usize(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .value_name("N")
        .value_parser(value_parser!(u64).range(1..))
        .help(help)
}

fn cmd_run() -> Command {
    Command::new("run")
        .about("Produce imagery for every configured modality")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("PATH")
                .value_parser(value_parser!(std::path::PathBuf))
                .help("Config file (default: ./geoset.toml)"),
        )
        .arg(positive_usize(
            "max-unprocessed",
            "Ceiling on outputs waiting for the consumer",
        ))
        .arg(queue_db_arg())
        .arg(positive_usize("batch-size", "Items per chunk"))
        .arg(positive_usize("num-workers", "Concurrent item pipelines"))
}

fn cmd_queue() -> Command {
    let key_arg = || {
        Arg::new("key")
            .required(true)
            .value_name("KEY")
            .help("Output path as queued")
    };

    Command::new("queue")
        .about("Inspect and maintain the output queue")
        .subcommand_required(true)
        .arg(queue_db_arg().global(true))
        .arg(json_arg().global(true))
        .subcommand(Command::new("status").about("Pending and processing counts"))
        .subcommand(
            Command::new("list").about("List live rows, oldest first").arg(
                Arg::new("status")
                    .long("status")
                    .value_parser(["pending", "processing"])
                    .help("Only rows with this status"),
            ),
        )
        .subcommand(Command::new("next").about("Oldest pending key, without claiming it"))
        .subcommand(
            Command::new("claim")
                .about("Mark a pending key as processing")
                .arg(key_arg()),
        )
        .subcommand(
            Command::new("complete")
                .about("Remove a key after consuming it")
                .arg(key_arg()),
        )
        .subcommand(Command::new("sweep").about("Remove rows whose file no longer exists"))
}

fn cmd_bbox_size() -> Command {
    Command::new("bbox-size")
        .about("Bbox size in degrees for a target pixel resolution")
        .arg(
            Arg::new("width")
                .long("width")
                .required(true)
                .value_parser(value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new("height")
                .long("height")
                .required(true)
                .value_parser(value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new("zoom")
                .long("zoom")
                .default_value("18")
                .value_parser(value_parser!(u8).range(0..=22)),
        )
        .arg(json_arg())
}
