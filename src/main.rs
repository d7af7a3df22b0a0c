use catalogdl::configuration::{create_config, ConfigFolder};
use catalogdl::startup::{list_profiles, run, show_history, RunOptions};
use clap::{value_parser, Arg, ArgAction, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let profile_arg = Arg::new("profile")
        .short('p')
        .long("profile")
        .value_name("PROFILE")
        .help("Bundled profile name, profile in ~/.catalogdl/profiles, or path to a YAML file");

    let args = Command::new("catalogdl")
        .about("🎵 Download, tag and organise an artist's catalog 🎵")
        .subcommand(
            Command::new("run")
                .about("🚀 Search, download and tag the catalog of one or more artists")
                .arg(profile_arg.clone().action(ArgAction::Append))
                .arg(
                    Arg::new("all")
                        .long("all")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("profile")
                        .help("Run every available profile"),
                )
                .arg(
                    Arg::new("max-songs")
                        .long("max-songs")
                        .value_name("N")
                        .value_parser(value_parser!(usize))
                        .help("Override the profile's candidate cap"),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Search and show where each song would go, without downloading"),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("🛠️ Create or update ~/.catalogdl with the config and bundled profiles"),
        )
        .subcommand(Command::new("profiles").about("📇 List available artist profiles"))
        .subcommand(
            Command::new("history")
                .about("📜 List recorded downloads")
                .arg(profile_arg),
        )
        .get_matches();

    let cfg_folder = ConfigFolder::new()?;

    match args.subcommand() {
        Some(("run", sub)) => {
            let options = RunOptions {
                profiles: sub
                    .get_many::<String>("profile")
                    .map(|values| values.cloned().collect())
                    .unwrap_or_default(),
                all: sub.get_flag("all"),
                max_songs: sub.get_one::<usize>("max-songs").copied(),
                dry_run: sub.get_flag("dry-run"),
            };
            println!("\x1b[1m\x1b[34mStarting catalogdl...\x1b[0m");
            run(cfg_folder, options).await
        }
        Some(("config", _)) => {
            println!("\x1b[1m\x1b[34mConfiguring catalogdl...\x1b[0m");
            Ok(create_config(&cfg_folder)?)
        }
        Some(("profiles", _)) => list_profiles(&cfg_folder),
        Some(("history", sub)) => {
            show_history(&cfg_folder, sub.get_one::<String>("profile").map(String::as_str))
        }
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    println!("\x1b[1m\x1b[31mInvalid command!\x1b[0m\n");
    println!("📖 Available Commands:");
    println!("  \x1b[1m\x1b[32mcatalogdl run -p <PROFILE>\x1b[0m - 🚀 Download an artist's catalog");
    println!("  \x1b[1m\x1b[32mcatalogdl run --all\x1b[0m        - 🚀 Download every profile");
    println!("  \x1b[1m\x1b[32mcatalogdl config\x1b[0m           - 🛠️  Create or update configuration");
    println!("  \x1b[1m\x1b[32mcatalogdl profiles\x1b[0m         - 📇 List artist profiles");
    println!("  \x1b[1m\x1b[32mcatalogdl history\x1b[0m          - 📜 List recorded downloads");
    println!("\x1b[33mAdd --dry-run to preview a run without downloading.\x1b[0m\n");
}
