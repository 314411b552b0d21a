use crate::CLAP_STYLING;
use clap::{arg, command};
use sitemapper::parse_site_arg;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitemapper")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitemapper")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner, progress and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("crawl")
                .about(
                    "Resolve a site's sitemap tree and list every page with its title and \
                category.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("The site root to crawl (https:// is assumed when omitted)")
                        .value_parser(parse_site_arg)
                        .conflicts_with("hosts-file"),
                )
                .arg(
                    arg!(-H --"hosts-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of site roots to crawl")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .conflicts_with("url"),
                )
                .group(
                    clap::ArgGroup::new("source")
                        .args(["url", "hosts-file"])
                        .required(true),
                )
                .arg(
                    arg!(-w --"workers" <NUM_WORKERS>)
                        .required(false)
                        .help("Maximum number of page-title fetches in flight at once")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Per-request timeout in seconds")
                        .value_parser(clap::value_parser!(u64).range(1..))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"max-depth" <DEPTH>)
                        .required(false)
                        .help("Maximum nesting depth of sitemap indexes below the root")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("8"),
                )
                .arg(
                    arg!(--"fail-fast")
                        .required(false)
                        .help("Abort a site's crawl when a nested sitemap fails (default: skip it)")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, csv, markdown")
                        .value_parser(["text", "json", "csv", "markdown"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: print to stdout)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(--"verbose")
                        .required(false)
                        .help("Enable debug logging (overridden by RUST_LOG)")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}
