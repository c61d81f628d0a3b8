use crate::CLAP_STYLING;
use clap::{arg, command};
use clinickit::handlers::DEFAULT_PAGES_ROOT;
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("clinickit")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("clinickit")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(
            arg!(-v --"verbose" "Log more detail (-v info, -vv debug, -vvv trace)")
                .required(false)
                .action(clap::ArgAction::Count)
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            command!("annotate")
                .about(
                    "Gate the create, edit and delete buttons of the clinic pages behind \
                permission checks",
                )
                .arg(
                    arg!([ROOT])
                        .required(false)
                        .help("Directory holding the page components")
                        .default_value(DEFAULT_PAGES_ROOT),
                )
                .arg(
                    arg!(-m --"map" <PATH>)
                        .required(false)
                        .help("JSON object mapping page file names to module identifiers")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(--"auth-module" <SPECIFIER>)
                        .required(false)
                        .help("Module that exports usePermission")
                        .default_value(clinickit_core::annotate::DEFAULT_AUTH_MODULE),
                )
                .arg(
                    arg!(-n --"dry-run")
                        .required(false)
                        .help("Report what would change without writing any file")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("smoke")
                .about("Drive the clinic REST API and summarise what worked")
                .subcommand_required(true)
                .subcommand(smoke_command(
                    "modules",
                    "List, edit and create records across the main modules",
                ))
                .subcommand(smoke_command(
                    "system",
                    "Create then edit a record in every module, chaining dependent ids",
                ))
                .subcommand(
                    smoke_command(
                        "exams",
                        "Check that every exam of a patient has a reachable download",
                    )
                    .arg(
                        arg!(-p --"patient-id" <ID>)
                            .required(false)
                            .help("Patient whose exams are checked")
                            .value_parser(clap::value_parser!(i64))
                            .default_value("1"),
                    ),
                )
                .subcommand(smoke_command(
                    "menu",
                    "Decode the login token and show the menu its permissions unlock",
                )),
        )
}

fn smoke_command(name: &'static str, about: &'static str) -> clap::Command {
    clap::Command::new(name)
        .about(about)
        .arg(
            arg!(-u --"api-url" <URL>)
                .required(true)
                .help("Base URL of the API, e.g. https://clinic.example/api")
                .value_parser(clap::value_parser!(Url)),
        )
        .arg(
            arg!(-e --"email" <EMAIL>)
                .required(false)
                .help("Login email (prompted when omitted)"),
        )
        .arg(
            arg!(-P --"password" <PASSWORD>)
                .required(false)
                .help("Login password (prompted when omitted)"),
        )
        .arg(
            arg!(-t --"timeout" <SECONDS>)
                .required(false)
                .help("Request timeout in seconds")
                .value_parser(clap::value_parser!(u64))
                .default_value("30"),
        )
}
