use clap::{Arg, ArgMatches, Command};
use std::process;

use metadata_rs::actions;
use metadata_rs::config::Config;
use metadata_rs::output;

#[tokio::main]
async fn main() {
    env_logger::init();

    let app = create_app();
    let matches = app.get_matches();

    let result = run_report(matches).await;
    process::exit(result);
}

fn create_app() -> Command {
    let packages = Arg::new("packages")
        .help("Packages to report on, as [category/]package")
        .action(clap::ArgAction::Set)
        .num_args(1..)
        .required(true);

    Command::new("metadata")
        .version("0.3.0")
        .about("Reports package maintainers, herds and ChangeLog authorship")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("nocolor")
                .long("nocolor")
                .help("Disable colored output")
                .global(true)
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Verbose output (include herd maintainer roles)")
                .global(true)
                .action(clap::ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("metadata")
                .about("Full report: herd, maintainers, description, ChangeLog fallback")
                .arg(
                    Arg::new("no_legacy_fallback")
                        .long("no-legacy-fallback")
                        .help("Leave the Maintainer field empty instead of showing herds")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(packages.clone()),
        )
        .subcommand(
            Command::new("maintainer")
                .about("Maintainer emails only, herd names when there are none")
                .arg(packages.clone()),
        )
        .subcommand(
            Command::new("changelog")
                .about("Ranked ChangeLog contributor summary")
                .arg(packages),
        )
        .subcommand(
            Command::new("herd")
                .about("Resolve a herd to its maintainers")
                .arg(
                    Arg::new("all")
                        .long("all")
                        .short('a')
                        .help("List all herd names")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(Arg::new("herd").help("Herd name").num_args(0..=1)),
        )
}

async fn run_report(matches: ArgMatches) -> i32 {
    if matches.get_flag("nocolor") {
        output::nocolor();
    }

    let mut config = Config::new().await;
    if matches.get_flag("verbose") {
        config.verbose = true;
    }

    match matches.subcommand() {
        Some(("metadata", sub)) => {
            if sub.get_flag("no_legacy_fallback") {
                config.legacy_herd_fallback = false;
            }
            actions::action_metadata(&package_args(sub), &config).await
        }
        Some(("maintainer", sub)) => actions::action_maintainer(&package_args(sub), &config).await,
        Some(("changelog", sub)) => actions::action_changelog(&package_args(sub), &config).await,
        Some(("herd", sub)) => {
            let all = sub.get_flag("all");
            let herd = sub.get_one::<String>("herd").map(String::as_str);
            actions::action_herd(herd, all, &config).await
        }
        _ => 1,
    }
}

fn package_args(matches: &ArgMatches) -> Vec<String> {
    matches
        .get_many::<String>("packages")
        .unwrap_or_default()
        .cloned()
        .collect()
}
