use clap::Parser;
use libcoursemirror::auth::{session_cookies_for, StorageStateFile, DEFAULT_COOKIE_CACHE};
use libcoursemirror::catalogue::{resolve_root, RootTarget, DEFAULT_TARGET};
use libcoursemirror::{
    init_mirror, CookieSet, MirrorRule, Result, Update, DEFAULT_RETRY_DELAY_MS,
};
use owo_colors::{OwoColorize, Stream::Stdout};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::mpsc::channel;

const MAX_BUFFER_SIZE: usize = 100;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Offline copies of course catalogues",
    long_about = "Walks a course catalogue from its root and mirrors every course's \
    documents, assignment files and folders into a matching directory tree."
)]
pub struct Cli {
    #[arg(
        default_value = DEFAULT_TARGET,
        help = "Catalogue root url, course url or alias (maths, cs)."
    )]
    target: String,
    #[arg(
        default_value = "./output",
        help = "Directory to create for the mirror. Must not exist yet.",
        long,
        short
    )]
    output_directory: String,
    #[arg(help = "Leave categories labelled Archive out of the mirror.", long)]
    skip_archives: bool,
    #[arg(
        help = "Session cookie to send, as NAME=VALUE. Can be repeated. \
        Takes precedence over the cookie cache.",
        long = "cookie",
        value_name = "NAME=VALUE"
    )]
    cookies: Vec<String>,
    #[arg(
        default_value = DEFAULT_COOKIE_CACHE,
        help = "Browser storage-state file to read session cookies from for catalogues behind single sign-on.",
        long
    )]
    cookie_cache: PathBuf,
    #[arg(
        default_value_t = DEFAULT_RETRY_DELAY_MS,
        help = "Pause in milliseconds before retrying a failed download.",
        long
    )]
    retry_delay_ms: u64,
}

fn load_cookies(cli: &Cli, target: &RootTarget) -> Result<CookieSet> {
    if !cli.cookies.is_empty() {
        return cli
            .cookies
            .iter()
            .map(|pair| CookieSet::parse_pair(pair))
            .collect();
    }
    session_cookies_for(target, &StorageStateFile::new(&cli.cookie_cache))
}

pub async fn mirror(cli: Cli) -> ExitCode {
    let target = resolve_root(&cli.target);
    let cookies = match load_cookies(&cli, &target) {
        Ok(c) => c,
        Err(e) => {
            println!("{}", e.if_supports_color(Stdout, |text| text.red()));
            return ExitCode::FAILURE;
        }
    };

    println!(
        "Mirroring {} into {}....",
        target.url, cli.output_directory
    );
    let rule = MirrorRule {
        include_archives: !cli.skip_archives,
        retry_delay_ms: cli.retry_delay_ms,
        ..Default::default()
    };
    let output_directory = cli.output_directory.clone();
    let (tx, mut rx) = channel::<Update>(MAX_BUFFER_SIZE);
    let handle = tokio::spawn(async move {
        init_mirror(&target.url, &output_directory, rule, &cookies, tx).await
    });

    while let Some(update) = rx.recv().await {
        match update {
            Update::MessageUpdate(msg) => {
                if msg.is_error {
                    println!(
                        "{} | {}",
                        msg.content.if_supports_color(Stdout, |text| text.red()),
                        msg.resource_name
                    );
                } else {
                    println!("{} | {}", msg.content, msg.resource_name);
                }
            }
            Update::CourseUpdate(report) => {
                println!(
                    "Found {:3} files ({} saved): {}",
                    report.attempted,
                    report.saved,
                    report.directory.display()
                );
            }
        };
    }

    match handle.await {
        Ok(Ok(summary)) => {
            println!(
                "{} course(s) mirrored, {} of {} file(s) saved. {}",
                summary.courses, summary.saved, summary.attempted, cli.output_directory
            );
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            println!("Mirror wasn't able to complete");
            println!("{}", e.if_supports_color(Stdout, |text| text.red()));
            ExitCode::FAILURE
        }
        Err(e) => {
            println!("Mirror task stopped unexpectedly. {}", e);
            ExitCode::FAILURE
        }
    }
}
